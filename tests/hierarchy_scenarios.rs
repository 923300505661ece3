//! End-to-end scenarios for message dispatch and transitions.

use hsmind::core::{Disposition, Message, State, StateKey, Target, INIT_CMD};
use hsmind::dump::MachineDump;
use hsmind::enforcement::{UsageViolation, ViolationStrategy};
use hsmind::engine::{Context, HsmError, LocalLoop, Machine, MachineConfig, MachineHooks};
use hsmind::state_keys;
use std::thread;

state_keys! {
    enum Key { Root, A, B, C, D }
}

const NOOP: i32 = 0;
const GO_C: i32 = 1;
const GO_ROOT: i32 = 2;
const GO_SELF: i32 = 3;
const DEFER: i32 = 4;
const ROOT_ONLY: i32 = 5;

#[derive(Default)]
struct Recorder {
    events: Vec<String>,
    unhandled: usize,
    halted: usize,
    halting: usize,
    quitting: usize,
    cleanups: usize,
    pre: Vec<i32>,
    post: Vec<i32>,
}

impl Recorder {
    fn take(&mut self) -> Vec<String> {
        std::mem::take(&mut self.events)
    }
}

impl MachineHooks for Recorder {
    fn on_pre_handle_message(&mut self, msg: &Message) {
        self.pre.push(msg.what);
    }

    fn on_post_handle_message(&mut self, msg: &Message) {
        self.post.push(msg.what);
    }

    fn unhandled_message(&mut self, _msg: &Message) {
        self.unhandled += 1;
    }

    fn halted_process_message(&mut self, _msg: &Message) {
        self.halted += 1;
    }

    fn on_halting(&mut self) {
        self.halting += 1;
    }

    fn on_quitting(&mut self) {
        self.quitting += 1;
    }

    fn cleanup_after_quitting(&mut self) {
        self.cleanups += 1;
    }

    fn what_to_string(&self, what: i32) -> Option<String> {
        match what {
            GO_C => Some("GO_C".to_string()),
            GO_ROOT => Some("GO_ROOT".to_string()),
            _ => None,
        }
    }
}

struct Node {
    key: Key,
    redirect_on_enter: Option<Key>,
    redirect_on_exit: Option<Key>,
    deferred: bool,
}

impl Node {
    fn new(key: Key) -> Self {
        Self {
            key,
            redirect_on_enter: None,
            redirect_on_exit: None,
            deferred: false,
        }
    }

    fn redirect_on_enter(mut self, to: Key) -> Self {
        self.redirect_on_enter = Some(to);
        self
    }

    fn redirect_on_exit(mut self, to: Key) -> Self {
        self.redirect_on_exit = Some(to);
        self
    }
}

impl State<Key, Recorder> for Node {
    fn enter(&mut self, ctx: &mut Context<'_, Key, Recorder>) {
        ctx.env_mut().events.push(format!("enter:{}", self.key.name()));
        if let Some(to) = self.redirect_on_enter.take() {
            ctx.transition_to(to);
        }
    }

    fn exit(&mut self, ctx: &mut Context<'_, Key, Recorder>) {
        ctx.env_mut().events.push(format!("exit:{}", self.key.name()));
        if let Some(to) = self.redirect_on_exit.take() {
            ctx.transition_to(to);
        }
    }

    fn process_message(
        &mut self,
        msg: &Message,
        ctx: &mut Context<'_, Key, Recorder>,
    ) -> Disposition {
        ctx.env_mut()
            .events
            .push(format!("process:{}:{}", self.key.name(), msg.what));
        match (self.key, msg.what) {
            (Key::B, GO_C) => ctx.transition_to(Key::C),
            (Key::B, GO_ROOT) => ctx.transition_to(Key::Root),
            (Key::B, GO_SELF) => ctx.transition_to(Key::B),
            (Key::B, DEFER) if !self.deferred => {
                self.deferred = true;
                ctx.defer_message(msg);
                ctx.transition_to(Key::C);
            }
            (Key::C, DEFER) => {}
            (Key::Root, ROOT_ONLY) => {}
            _ => return Disposition::NotHandled,
        }
        Disposition::Handled
    }
}

/// Root -> A -> B, Root -> C, D detached root.
fn build(config: MachineConfig, nodes: Vec<(Node, Option<Key>)>) -> Machine<Key, Recorder> {
    let mut machine = Machine::new("scenario", Recorder::default()).with_config(config);
    for (node, parent) in nodes {
        let key = node.key;
        machine.add_state(key, node, parent).unwrap();
    }
    machine.set_initial_state(Key::B);
    machine
}

fn default_nodes() -> Vec<(Node, Option<Key>)> {
    vec![
        (Node::new(Key::Root), None),
        (Node::new(Key::A), Some(Key::Root)),
        (Node::new(Key::B), Some(Key::A)),
        (Node::new(Key::C), Some(Key::Root)),
        (Node::new(Key::D), None),
    ]
}

fn started() -> Machine<Key, Recorder> {
    let mut machine = build(MachineConfig::default(), default_nodes());
    machine.start().unwrap();
    machine.env_mut().take();
    machine
}

fn stack(machine: &Machine<Key, Recorder>) -> Vec<Target<Key>> {
    machine.active_states().to_vec()
}

fn chain(keys: &[Key]) -> Vec<Target<Key>> {
    keys.iter().copied().map(Target::State).collect()
}

#[test]
fn initial_stack_is_the_initial_states_chain() {
    let mut machine = build(MachineConfig::default(), default_nodes());
    machine.start().unwrap();

    assert_eq!(stack(&machine), chain(&[Key::Root, Key::A, Key::B]));
    assert_eq!(machine.current_state(), Some(Target::State(Key::B)));
    assert_eq!(machine.env().events, vec!["enter:Root", "enter:A", "enter:B"]);
    assert!(machine.env().pre.is_empty());
    assert!(machine.log_records().is_empty());
}

#[test]
fn sibling_transition_exits_to_common_ancestor() {
    let mut machine = started();

    machine.run_message(Message::new(GO_C)).unwrap();

    assert_eq!(machine.env_mut().take(), vec!["process:B:1", "exit:B", "exit:A", "enter:C"]);
    assert_eq!(stack(&machine), chain(&[Key::Root, Key::C]));
    assert!(!machine.is_active(Key::A));
    assert!(!machine.is_active(Key::B));
    assert_eq!(machine.env().pre, vec![GO_C]);
    assert_eq!(machine.env().post, vec![GO_C]);
}

#[test]
fn unhandled_message_reaches_hook_once() {
    let mut machine = started();

    machine.run_message(Message::new(NOOP)).unwrap();

    assert_eq!(machine.env_mut().take(), vec!["process:B:0", "process:A:0", "process:Root:0"]);
    assert_eq!(machine.env().unhandled, 1);
    assert_eq!(machine.current_state(), Some(Target::State(Key::B)));
    let rec = machine.log_records().get(0).unwrap();
    assert_eq!(rec.state, None);
    assert_eq!(rec.dest_state, None);
}

#[test]
fn ancestor_handles_what_the_leaf_declines() {
    let mut machine = started();

    machine.run_message(Message::new(ROOT_ONLY)).unwrap();

    assert_eq!(machine.env().unhandled, 0);
    let rec = machine.log_records().get(0).unwrap();
    assert_eq!(rec.state.as_deref(), Some("Root"));
    assert_eq!(rec.org_state.as_deref(), Some("B"));
}

#[test]
fn halting_routes_later_messages_to_halted_hook() {
    let mut machine = started();

    machine.transition_to(Target::<Key>::Halting);
    machine.run_message(Message::new(NOOP)).unwrap();

    assert_eq!(machine.env().halting, 1);
    assert!(machine.is_halted());
    assert_eq!(stack(&machine), vec![Target::<Key>::Halting]);
    machine.env_mut().take();

    machine.run_message(Message::new(GO_C)).unwrap();

    assert_eq!(machine.env().halted, 1);
    assert_eq!(machine.env().halting, 1);
    assert_eq!(machine.env().unhandled, 0);
    assert!(machine.env().events.is_empty());
    assert!(machine.is_halted());
}

#[test]
fn quitting_tears_down_and_drops_later_messages() {
    let mut machine = started();

    machine.transition_to(Target::<Key>::Quitting);
    machine.run_message(Message::new(NOOP)).unwrap();

    assert_eq!(machine.env().quitting, 1);
    assert_eq!(machine.env().cleanups, 1);
    assert!(machine.env().post.is_empty());
    assert!(machine.is_quit());
    assert_eq!(machine.state_count(), 0);
    assert_eq!(machine.current_state(), None);
    assert_eq!(
        machine.env_mut().take(),
        vec![
            "process:B:0",
            "process:A:0",
            "process:Root:0",
            "exit:B",
            "exit:A",
            "exit:Root"
        ]
    );

    machine.run_message(Message::new(GO_C)).unwrap();

    assert!(machine.env().events.is_empty());
    assert_eq!(machine.env().quitting, 1);
    assert_eq!(machine.env().pre, vec![NOOP]);
}

#[test]
fn quit_command_runs_through_the_loop() {
    let mut machine = started();

    machine.send_message(Message::new(NOOP));
    machine.quit();
    machine.send_message(Message::new(GO_C));

    assert_eq!(machine.run_pending().unwrap(), 3);
    assert!(machine.is_quit());
    assert_eq!(machine.env().pre, vec![NOOP]);
    assert_eq!(machine.env().quitting, 1);
}

#[test]
fn quit_now_jumps_the_queue() {
    let mut machine = started();

    machine.send_message(Message::new(GO_C));
    machine.quit_now();

    machine.run_pending().unwrap();

    assert!(machine.is_quit());
    assert!(machine.env().pre.is_empty());
}

#[test]
fn self_transition_exits_and_enters_once() {
    let mut machine = started();

    machine.run_message(Message::new(GO_SELF)).unwrap();

    assert_eq!(machine.env_mut().take(), vec!["process:B:3", "exit:B", "enter:B"]);
    assert_eq!(stack(&machine), chain(&[Key::Root, Key::A, Key::B]));
}

#[test]
fn transition_to_active_ancestor_reenters_it() {
    let mut machine = started();

    machine.run_message(Message::new(GO_ROOT)).unwrap();

    assert_eq!(
        machine.env_mut().take(),
        vec!["process:B:2", "exit:B", "exit:A", "exit:Root", "enter:Root"]
    );
    assert_eq!(stack(&machine), vec![Target::State(Key::Root)]);
}

#[test]
fn disjoint_transition_empties_the_stack() {
    let mut machine = started();

    machine.transition_to(Key::D);
    machine.run_message(Message::new(NOOP)).unwrap();

    assert_eq!(stack(&machine), vec![Target::State(Key::D)]);
    assert!(!machine.is_active(Key::Root));
}

#[test]
fn redirect_from_final_enter_is_not_a_violation() {
    let nodes = vec![
        (Node::new(Key::Root), None),
        (Node::new(Key::A), Some(Key::Root)),
        (Node::new(Key::B), Some(Key::A)),
        (Node::new(Key::C).redirect_on_enter(Key::D), Some(Key::Root)),
        (Node::new(Key::D), None),
    ];
    let mut machine = build(MachineConfig::default(), nodes);
    machine.start().unwrap();
    machine.env_mut().take();

    machine.run_message(Message::new(GO_C)).unwrap();

    assert_eq!(
        machine.env_mut().take(),
        vec![
            "process:B:1",
            "exit:B",
            "exit:A",
            "enter:C",
            "exit:C",
            "exit:Root",
            "enter:D"
        ]
    );
    assert_eq!(stack(&machine), vec![Target::State(Key::D)]);
    assert!(machine.violations().is_empty());
    // GO_C is dispatched once, the redirect does not replay it.
    assert_eq!(machine.env().pre, vec![GO_C]);
}

#[test]
fn redirect_from_exit_is_reported_and_followed() {
    let nodes = vec![
        (Node::new(Key::Root), None),
        (Node::new(Key::A).redirect_on_exit(Key::D), Some(Key::Root)),
        (Node::new(Key::B), Some(Key::A)),
        (Node::new(Key::C), Some(Key::Root)),
        (Node::new(Key::D), None),
    ];
    let mut machine = build(MachineConfig::default(), nodes);
    machine.start().unwrap();
    machine.env_mut().take();

    machine.run_message(Message::new(GO_C)).unwrap();

    assert_eq!(
        machine.violations(),
        &[UsageViolation::TransitionDuringTransition {
            pending: "C".to_string(),
            requested: "D".to_string(),
        }]
    );
    assert_eq!(stack(&machine), vec![Target::State(Key::D)]);
}

#[test]
fn redirect_from_intermediate_enter_is_reported_and_followed() {
    let nodes = vec![
        (Node::new(Key::Root), None),
        (Node::new(Key::A).redirect_on_enter(Key::D), Some(Key::Root)),
        (Node::new(Key::B), Some(Key::A)),
        (Node::new(Key::C), Some(Key::Root)),
        (Node::new(Key::D), None),
    ];
    let mut machine = build(MachineConfig::default(), nodes);
    machine.set_initial_state(Key::D);
    machine.start().unwrap();
    machine.env_mut().take();

    machine.transition_to(Key::B);
    machine.run_message(Message::new(NOOP)).unwrap();

    assert_eq!(
        machine.violations(),
        &[UsageViolation::TransitionDuringTransition {
            pending: "B".to_string(),
            requested: "D".to_string(),
        }]
    );
    assert_eq!(
        machine.env_mut().take(),
        vec![
            "process:D:0",
            "exit:D",
            "enter:Root",
            "enter:A",
            "enter:B",
            "exit:B",
            "exit:A",
            "exit:Root",
            "enter:D"
        ]
    );
    assert_eq!(stack(&machine), chain(&[Key::D]));
}

#[test]
fn redirect_while_entering_initial_chain_is_not_reported() {
    let nodes = vec![
        (Node::new(Key::Root), None),
        (Node::new(Key::A).redirect_on_enter(Key::D), Some(Key::Root)),
        (Node::new(Key::B), Some(Key::A)),
        (Node::new(Key::C), Some(Key::Root)),
        (Node::new(Key::D), None),
    ];
    let mut machine = build(MachineConfig::default(), nodes);
    machine.start().unwrap();

    assert!(machine.violations().is_empty());
    assert_eq!(
        machine.env_mut().take(),
        vec![
            "enter:Root",
            "enter:A",
            "enter:B",
            "exit:B",
            "exit:A",
            "exit:Root",
            "enter:D"
        ]
    );
    assert_eq!(stack(&machine), chain(&[Key::D]));
}

#[test]
fn readding_a_child_as_root_is_a_parent_conflict() {
    let mut machine = build(MachineConfig::default(), default_nodes());

    let err = machine.add_state(Key::A, Node::new(Key::A), None).unwrap_err();

    assert_eq!(
        err,
        HsmError::ParentConflict {
            state: "A".to_string(),
            existing: "Root".to_string(),
            requested: "<none>".to_string(),
        }
    );
    assert_eq!(machine.parent_of(Key::A), Some(Key::Root));
}

#[test]
#[should_panic(expected = "state machine scenario")]
fn panic_strategy_aborts_on_violation() {
    let nodes = vec![
        (Node::new(Key::Root), None),
        (Node::new(Key::A).redirect_on_exit(Key::D), Some(Key::Root)),
        (Node::new(Key::B), Some(Key::A)),
        (Node::new(Key::C), Some(Key::Root)),
        (Node::new(Key::D), None),
    ];
    let config = MachineConfig {
        on_usage_violation: ViolationStrategy::Panic,
        ..MachineConfig::default()
    };
    let mut machine = build(config, nodes);
    machine.start().unwrap();

    machine.run_message(Message::new(GO_C)).unwrap();
}

#[test]
fn last_transition_request_wins() {
    let mut machine = started();

    machine.transition_to(Key::C);
    machine.transition_to(Key::D);
    machine.run_message(Message::new(NOOP)).unwrap();

    assert_eq!(stack(&machine), vec![Target::State(Key::D)]);
    assert!(!machine.env().events.contains(&"enter:C".to_string()));
}

#[test]
fn deferred_message_is_redelivered_after_transition() {
    let mut machine = started();

    machine.send_message(Message::new(DEFER));
    machine.send_message(Message::new(NOOP));
    let count = machine.run_pending().unwrap();

    assert_eq!(count, 3);
    assert_eq!(
        machine.env_mut().take(),
        vec![
            "process:B:4",
            "exit:B",
            "exit:A",
            "enter:C",
            "process:C:4",
            "process:C:0",
            "process:Root:0"
        ]
    );
    assert_eq!(machine.pending_messages(), 0);
}

#[test]
fn removing_unknown_or_active_state_is_a_no_op() {
    let mut machine = build(MachineConfig::default(), default_nodes());

    assert!(!machine.remove_state(Key::A));
    assert_eq!(machine.state_count(), 5);

    machine.start().unwrap();
    assert!(!machine.remove_state(Key::B));
    assert!(machine.remove_state(Key::D));
    assert_eq!(machine.state_count(), 4);
}

#[test]
fn messages_from_a_foreign_thread_are_rejected() {
    let foreign = thread::spawn(|| thread::current().id()).join().unwrap();
    let mut machine: Machine<Key, Recorder> =
        Machine::with_loop("foreign", Recorder::default(), LocalLoop::for_thread(foreign));
    machine.add_state(Key::Root, Node::new(Key::Root), None).unwrap();
    machine.set_initial_state(Key::Root);
    machine.start().unwrap();

    let err = machine.run_message(Message::new(NOOP)).unwrap_err();
    assert!(matches!(err, HsmError::WrongThread { .. }));
    assert!(machine.env().pre.is_empty());
}

#[test]
fn test_mode_accepts_any_thread() {
    let foreign = thread::spawn(|| thread::current().id()).join().unwrap();
    let config = MachineConfig {
        test_mode: true,
        ..MachineConfig::default()
    };
    let mut machine: Machine<Key, Recorder> =
        Machine::with_loop("foreign", Recorder::default(), LocalLoop::for_thread(foreign))
            .with_config(config);
    machine.add_state(Key::Root, Node::new(Key::Root), None).unwrap();
    machine.set_initial_state(Key::Root);
    machine.start().unwrap();

    machine.run_message(Message::new(ROOT_ONLY)).unwrap();
    assert_eq!(machine.env().pre, vec![ROOT_ONLY]);
}

#[test]
fn host_init_command_is_ignored_after_start() {
    let mut machine = started();

    machine.run_message(Message::new(INIT_CMD)).unwrap();

    assert!(machine.env().events.is_empty());
    assert!(machine.env().pre.is_empty());
}

#[test]
fn start_reports_every_hierarchy_problem() {
    let mut machine: Machine<Key, Recorder> = Machine::new("broken", Recorder::default());
    machine.add_state(Key::B, Node::new(Key::B), Some(Key::A)).unwrap();
    machine.add_state(Key::C, Node::new(Key::C), Some(Key::Root)).unwrap();

    match machine.start() {
        Err(HsmError::InvalidHierarchy(violations)) => assert!(violations.len() >= 3),
        other => panic!("expected invalid hierarchy, got {other:?}"),
    }
    assert!(!machine.is_started());
}

#[test]
fn log_ring_keeps_most_recent_records() {
    let mut machine = started();
    machine.set_log_rec_size(3);

    for what in 10..15 {
        machine.run_message(Message::new(what)).unwrap();
    }

    let records = machine.log_records();
    assert_eq!(records.len(), 3);
    assert_eq!(records.total(), 5);
    let whats: Vec<i32> = records.iter().map(|r| r.what).collect();
    assert_eq!(whats, vec![12, 13, 14]);
}

#[test]
fn only_transitions_are_logged_when_asked() {
    let mut machine = started();
    machine.set_log_only_transitions(true);

    machine.run_message(Message::new(NOOP)).unwrap();
    machine.run_message(Message::new(GO_C)).unwrap();

    assert_eq!(machine.log_records().len(), 1);
    assert_eq!(machine.log_records().get(0).unwrap().what, GO_C);
}

#[test]
fn dump_survives_quitting() {
    let mut machine = started();
    machine.run_message(Message::new(GO_C)).unwrap();
    machine.quit_now();
    machine.run_pending().unwrap();

    let dump = machine.dump();
    assert_eq!(dump.current_state, None);
    assert_eq!(dump.total_records, 1);
    assert_eq!(dump.what_keys[0].what_string.as_deref(), Some("GO_C"));
    assert!(dump.to_string().contains("curState=<QUIT>"));

    let restored = MachineDump::from_json(&dump.to_json().unwrap()).unwrap();
    assert_eq!(restored, dump);
}
