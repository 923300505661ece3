//! Hierarchical state machine: message dispatch and the transition engine.

use crate::core::{Disposition, LogRec, LogRecords, Message, State, StateKey, Target};
use crate::enforcement::{check_hierarchy, violations_of, UsageViolation};
use crate::engine::context::{Context, Control, Phase};
use crate::engine::looper::{LocalLoop, MessageLoop};
use crate::engine::stack::StateStack;
use crate::engine::{HsmError, MachineConfig, MachineHooks, Registry};
use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// A hierarchical state machine.
///
/// States are registered with a parent, forming a forest. At any time the
/// machine has an active stack: the current leaf state and all of its
/// ancestors. A message is offered to the leaf first and then to each
/// ancestor until one handles it. Transitions requested while processing run
/// once the message is done: states below the common ancestor are exited
/// leaf first, then the destination's chain is entered root first.
///
/// Messages are processed one at a time, to completion, on the thread that
/// owns the machine's message loop.
///
/// # Example
///
/// ```rust
/// use hsmind::core::{Disposition, Message, State};
/// use hsmind::engine::{Context, Machine};
/// use hsmind::state_keys;
///
/// state_keys! {
///     enum Light { Powered, Off, On }
/// }
///
/// const TOGGLE: i32 = 1;
///
/// struct Switch(Light);
///
/// impl State<Light> for Switch {
///     fn process_message(&mut self, msg: &Message, ctx: &mut Context<'_, Light>) -> Disposition {
///         if msg.what != TOGGLE {
///             return Disposition::NotHandled;
///         }
///         ctx.transition_to(self.0);
///         Disposition::Handled
///     }
/// }
///
/// struct Root;
///
/// impl State<Light> for Root {
///     fn process_message(&mut self, _msg: &Message, _ctx: &mut Context<'_, Light>) -> Disposition {
///         Disposition::Handled
///     }
/// }
///
/// let mut machine = Machine::new("light", ());
/// machine.add_state(Light::Powered, Root, None).unwrap();
/// machine.add_state(Light::Off, Switch(Light::On), Some(Light::Powered)).unwrap();
/// machine.add_state(Light::On, Switch(Light::Off), Some(Light::Powered)).unwrap();
/// machine.set_initial_state(Light::Off);
/// machine.start().unwrap();
///
/// machine.run_message(Message::new(TOGGLE)).unwrap();
/// assert_eq!(machine.current_state(), Some(Light::On.into()));
/// ```
pub struct Machine<K: StateKey, E = ()> {
    name: String,
    id: Uuid,
    env: E,
    looper: Box<dyn MessageLoop>,
    registry: Registry<K, E>,
    stack: StateStack<K>,
    control: Control<K>,
    initial: Option<K>,
    config: MachineConfig,
    log_records: LogRecords,
    started: bool,
    quit: bool,
}

impl<K: StateKey, E: MachineHooks> Machine<K, E> {
    /// Create a machine attached to a loop owned by the calling thread.
    pub fn new(name: impl Into<String>, env: E) -> Self {
        Self::with_loop(name, env, LocalLoop::for_current_thread())
    }

    /// Create a machine attached to the given message loop.
    pub fn with_loop(name: impl Into<String>, env: E, looper: impl MessageLoop + 'static) -> Self {
        Self::with_boxed_loop(name, env, Box::new(looper))
    }

    pub fn with_boxed_loop(name: impl Into<String>, env: E, looper: Box<dyn MessageLoop>) -> Self {
        let config = MachineConfig::default();
        Self {
            name: name.into(),
            id: Uuid::new_v4(),
            env,
            looper,
            registry: Registry::new(),
            stack: StateStack::new(),
            control: Control::new(config.on_usage_violation),
            initial: None,
            log_records: LogRecords::with_capacity(config.log_rec_size),
            config,
            started: false,
            quit: false,
        }
    }

    /// Replace the configuration. Log records are reset.
    pub fn with_config(mut self, config: MachineConfig) -> Self {
        self.log_records = LogRecords::with_capacity(config.log_rec_size);
        self.log_records
            .set_only_transitions(config.log_only_transitions);
        self.control.strategy = config.on_usage_violation;
        self.config = config;
        self
    }

    /// Register a state under `parent`.
    ///
    /// An unknown parent is registered too and must be given its own
    /// behaviour with a later `add_state` before the machine starts.
    pub fn add_state(
        &mut self,
        key: K,
        state: impl State<K, E> + 'static,
        parent: Option<K>,
    ) -> Result<(), HsmError> {
        self.add_boxed_state(key, Box::new(state), parent)
    }

    pub fn add_boxed_state(
        &mut self,
        key: K,
        state: Box<dyn State<K, E>>,
        parent: Option<K>,
    ) -> Result<(), HsmError> {
        if self.started || self.quit {
            return Err(HsmError::AlreadyStarted {
                machine: self.name.clone(),
            });
        }
        self.registry.add(key, state, parent)?;
        if self.config.debug {
            debug!(
                machine = %self.name,
                state = key.name(),
                parent = parent.as_ref().map(StateKey::name).unwrap_or("<none>"),
                "state added"
            );
        }
        Ok(())
    }

    /// Remove a state unless it is unknown, active or has children.
    ///
    /// Returns whether the state was removed.
    pub fn remove_state(&mut self, key: K) -> bool {
        let removed = self.registry.remove(key);
        if self.config.debug {
            debug!(machine = %self.name, state = key.name(), removed, "remove state");
        }
        removed
    }

    /// Set the state that receives the first message.
    pub fn set_initial_state(&mut self, key: K) {
        if self.config.debug {
            debug!(machine = %self.name, state = key.name(), "initial state set");
        }
        self.initial = Some(key);
    }

    /// Freeze the hierarchy and enter the initial state and its ancestors,
    /// root first.
    ///
    /// Every problem with the hierarchy is reported at once through
    /// [`HsmError::InvalidHierarchy`].
    pub fn start(&mut self) -> Result<(), HsmError> {
        if self.started || self.quit {
            return Err(HsmError::AlreadyStarted {
                machine: self.name.clone(),
            });
        }
        let violations = violations_of(check_hierarchy(&self.registry, self.initial));
        let Some(initial) = self.initial.filter(|_| violations.is_empty()) else {
            return Err(HsmError::InvalidHierarchy(violations));
        };

        self.complete_construction(initial);
        info!(machine = %self.name, initial = initial.name(), "state machine started");
        self.dispatch(Message::init());
        Ok(())
    }

    fn complete_construction(&mut self, initial: K) {
        let max_depth = self.registry.max_depth();
        if self.config.debug {
            debug!(machine = %self.name, max_depth, "complete construction");
        }
        self.stack.reserve(max_depth);
        self.stack.setup_initial(Target::State(initial), &self.registry);
        for &target in self.stack.as_slice() {
            self.registry.set_active(target, true);
        }
        self.started = true;
    }

    /// Request a transition from outside a state callback.
    ///
    /// The transition runs after the next dispatched message. A later request
    /// replaces an earlier one that has not run yet.
    pub fn transition_to(&mut self, target: impl Into<Target<K>>) {
        self.control.request(target.into(), Phase::Idle, &self.name);
    }

    /// Process one message to completion, including any transitions it
    /// causes.
    ///
    /// Must be called on the loop's owning thread unless the machine runs in
    /// test mode. Messages arriving after the machine has quit are dropped.
    pub fn run_message(&mut self, msg: Message) -> Result<(), HsmError> {
        self.check_thread()?;
        if self.quit {
            debug!(machine = %self.name, what = msg.what, "message dropped, machine has quit");
            return Ok(());
        }
        if !self.started {
            return Err(HsmError::NotStarted {
                machine: self.name.clone(),
                what: msg.what,
            });
        }
        if msg.is_init() {
            warn!(machine = %self.name, "init command ignored, machine already started");
            return Ok(());
        }
        self.dispatch(msg);
        Ok(())
    }

    /// Queue a message on the machine's loop.
    pub fn send_message(&mut self, msg: Message) {
        self.looper.post(msg);
    }

    /// Run every message pending on the loop, including those queued while
    /// running. Returns how many were run.
    pub fn run_pending(&mut self) -> Result<usize, HsmError> {
        self.check_thread()?;
        let mut count = 0;
        while let Some(msg) = self.looper.next_message() {
            self.run_message(msg)?;
            count += 1;
        }
        Ok(count)
    }

    /// Queue a quit command behind pending messages.
    pub fn quit(&mut self) {
        self.looper.post(Message::quit());
    }

    /// Queue a quit command ahead of pending messages.
    pub fn quit_now(&mut self) {
        self.looper.post_at_front(Message::quit());
    }

    fn check_thread(&self) -> Result<(), HsmError> {
        if self.config.test_mode || self.looper.is_current_thread() {
            Ok(())
        } else {
            Err(HsmError::WrongThread {
                machine: self.name.clone(),
            })
        }
    }

    fn dispatch(&mut self, msg: Message) {
        let reserved = msg.is_reserved();
        if self.config.debug {
            debug!(machine = %self.name, what = msg.what, "handle message");
        }
        if !reserved {
            self.env.on_pre_handle_message(&msg);
        }

        let processed = if msg.is_init() {
            // The initial chain is not a transition.
            self.invoke_enter(0, Phase::Idle);
            None
        } else {
            self.process_message(&msg)
        };
        self.perform_transitions(processed, &msg);

        if !reserved && !self.quit {
            self.env.on_post_handle_message(&msg);
        }
    }

    /// Offer `msg` to the active stack, leaf first. Returns the state that
    /// handled it.
    fn process_message(&mut self, msg: &Message) -> Option<Target<K>> {
        if msg.is_quit() {
            self.control.pending = Some(Target::Quitting);
            return self.stack.top();
        }

        for index in (0..self.stack.len()).rev() {
            let Some(target) = self.stack.get(index) else {
                break;
            };
            let disposition = match target {
                Target::Halting => {
                    self.env.halted_process_message(msg);
                    Disposition::Handled
                }
                Target::Quitting => Disposition::NotHandled,
                Target::State(_) => match self.registry.behavior_mut(target) {
                    Some(state) => {
                        let mut ctx =
                            Context::new(&mut self.env, &mut self.control, &self.name, Phase::Idle);
                        state.process_message(msg, &mut ctx)
                    }
                    None => Disposition::NotHandled,
                },
            };
            if self.config.debug {
                debug!(
                    machine = %self.name,
                    state = target.name(),
                    handled = disposition.is_handled(),
                    "process message"
                );
            }
            if disposition.is_handled() {
                return Some(target);
            }
        }

        debug!(machine = %self.name, what = msg.what, "unhandled message");
        self.env.unhandled_message(msg);
        None
    }

    /// Run the pending transition, following redirects until the destination
    /// stops changing.
    fn perform_transitions(&mut self, processed: Option<Target<K>>, msg: &Message) {
        let org = self.stack.top();
        self.record(msg, processed, org);

        let Some(mut dest) = self.control.pending else {
            return;
        };
        loop {
            if !self.registry.contains(dest) {
                self.control.pending = None;
                self.control.report(
                    UsageViolation::UnknownTransitionTarget {
                        target: dest.name().to_string(),
                    },
                    &self.name,
                );
                return;
            }

            let common = self.stack.setup_entering(dest, &self.registry);
            if self.config.debug {
                debug!(
                    machine = %self.name,
                    dest = dest.name(),
                    common = common.as_ref().map(Target::name).unwrap_or("<none>"),
                    "transition cycle"
                );
            }
            self.invoke_exit(common);
            let entering = self.stack.push_entering();
            self.invoke_enter(entering, Phase::Transitioning);
            self.move_deferred_to_front();

            match self.control.pending {
                Some(next) if next != dest => dest = next,
                _ => break,
            }
        }
        self.control.pending = None;

        debug!(
            machine = %self.name,
            from = org.as_ref().map(Target::name).unwrap_or("<none>"),
            to = dest.name(),
            "transition complete"
        );
        match dest {
            Target::Quitting => {
                info!(machine = %self.name, "state machine quitting");
                self.env.on_quitting();
                self.cleanup_after_quitting();
            }
            Target::Halting => {
                info!(machine = %self.name, "state machine halting");
                self.env.on_halting();
            }
            Target::State(_) => {}
        }
    }

    fn record(&mut self, msg: &Message, processed: Option<Target<K>>, org: Option<Target<K>>) {
        if msg.is_reserved() {
            return;
        }
        let record = if self.log_records.only_transitions() {
            self.control.pending.is_some()
        } else {
            self.env.record_log_rec(msg)
        };
        if !record {
            return;
        }
        let name = |t: Option<Target<K>>| t.map(|t| t.name().to_string());
        self.log_records.add(LogRec {
            time: Utc::now(),
            what: msg.what,
            info: self.env.log_rec_string(msg),
            state: name(processed),
            org_state: name(org),
            dest_state: name(self.control.pending),
        });
    }

    /// Exit states leaf first until `common` is on top.
    fn invoke_exit(&mut self, common: Option<Target<K>>) {
        while let Some(top) = self.stack.top() {
            if Some(top) == common {
                break;
            }
            if let Some(state) = self.registry.behavior_mut(top) {
                let mut ctx = Context::new(
                    &mut self.env,
                    &mut self.control,
                    &self.name,
                    Phase::Transitioning,
                );
                state.exit(&mut ctx);
            }
            if self.config.debug {
                debug!(machine = %self.name, state = top.name(), "exit");
            }
            self.registry.set_active(top, false);
            self.stack.pop();
        }
    }

    /// Enter states from `start` to the top of the stack, root first. All
    /// but the last enter run in `phase`; the last one always runs idle.
    fn invoke_enter(&mut self, start: usize, phase: Phase) {
        let len = self.stack.len();
        for index in start..len {
            let Some(target) = self.stack.get(index) else {
                break;
            };
            let phase = if index + 1 == len { Phase::Idle } else { phase };
            if self.config.debug {
                debug!(machine = %self.name, state = target.name(), "enter");
            }
            if let Some(state) = self.registry.behavior_mut(target) {
                let mut ctx = Context::new(&mut self.env, &mut self.control, &self.name, phase);
                state.enter(&mut ctx);
            }
            self.registry.set_active(target, true);
        }
    }

    fn move_deferred_to_front(&mut self) {
        for msg in self.control.deferred.drain(..).rev() {
            self.looper.post_at_front(msg);
        }
    }

    fn cleanup_after_quitting(&mut self) {
        self.env.cleanup_after_quitting();
        self.registry.clear();
        self.stack.clear();
        self.control.deferred.clear();
        self.initial = None;
        self.quit = true;
    }

    /// Leaf of the active stack; `None` before start and after quitting.
    pub fn current_state(&self) -> Option<Target<K>> {
        self.stack.top()
    }

    /// The active stack, root-most first.
    pub fn active_states(&self) -> &[Target<K>] {
        self.stack.as_slice()
    }

    pub fn is_active(&self, key: K) -> bool {
        self.registry.is_active(Target::State(key))
    }

    pub fn parent_of(&self, key: K) -> Option<K> {
        self.registry
            .parent_of(Target::State(key))
            .and_then(|t| t.key())
    }

    /// Registered user states, in no particular order.
    pub fn states(&self) -> Vec<K> {
        self.registry.keys().collect()
    }

    /// Number of registered user states.
    pub fn state_count(&self) -> usize {
        self.registry.len()
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn is_halted(&self) -> bool {
        self.stack.top() == Some(Target::Halting)
    }

    pub fn is_quit(&self) -> bool {
        self.quit
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Identifier of this machine instance, carried by its dumps.
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn env(&self) -> &E {
        &self.env
    }

    pub fn env_mut(&mut self) -> &mut E {
        &mut self.env
    }

    pub fn config(&self) -> &MachineConfig {
        &self.config
    }

    pub fn log_records(&self) -> &LogRecords {
        &self.log_records
    }

    /// Usage violations reported so far.
    pub fn violations(&self) -> &[UsageViolation] {
        &self.control.violations
    }

    /// Messages waiting on the loop.
    pub fn pending_messages(&self) -> usize {
        self.looper.pending()
    }

    pub fn set_debug(&mut self, debug: bool) {
        self.config.debug = debug;
    }

    /// Resize the log record ring, forgetting existing records.
    pub fn set_log_rec_size(&mut self, size: usize) {
        self.config.log_rec_size = size;
        self.log_records.set_capacity(size);
    }

    pub fn set_log_only_transitions(&mut self, enable: bool) {
        self.config.log_only_transitions = enable;
        self.log_records.set_only_transitions(enable);
    }
}
