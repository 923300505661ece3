//! Builder for constructing state machines.

use crate::builder::error::BuildError;
use crate::core::{State, StateKey};
use crate::engine::{LocalLoop, Machine, MachineConfig, MachineHooks, MessageLoop};

type Registration<K, E> = (K, Box<dyn State<K, E>>, Option<K>);

/// Builder for constructing state machines with a fluent API.
pub struct MachineBuilder<K: StateKey, E = ()> {
    name: String,
    env: E,
    looper: Option<Box<dyn MessageLoop>>,
    states: Vec<Registration<K, E>>,
    initial: Option<K>,
    config: MachineConfig,
}

impl<K: StateKey, E: MachineHooks> MachineBuilder<K, E> {
    /// Create a new builder.
    pub fn new(name: impl Into<String>, env: E) -> Self {
        Self {
            name: name.into(),
            env,
            looper: None,
            states: Vec::new(),
            initial: None,
            config: MachineConfig::default(),
        }
    }

    /// Add a root state.
    pub fn state(mut self, key: K, state: impl State<K, E> + 'static) -> Self {
        self.states.push((key, Box::new(state), None));
        self
    }

    /// Add a state under `parent`.
    pub fn child(mut self, key: K, state: impl State<K, E> + 'static, parent: K) -> Self {
        self.states.push((key, Box::new(state), Some(parent)));
        self
    }

    /// Set the initial state (required).
    pub fn initial(mut self, key: K) -> Self {
        self.initial = Some(key);
        self
    }

    /// Attach the machine to a specific loop instead of one owned by the
    /// calling thread.
    pub fn looper(mut self, looper: impl MessageLoop + 'static) -> Self {
        self.looper = Some(Box::new(looper));
        self
    }

    pub fn config(mut self, config: MachineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn debug(mut self, debug: bool) -> Self {
        self.config.debug = debug;
        self
    }

    pub fn test_mode(mut self, test_mode: bool) -> Self {
        self.config.test_mode = test_mode;
        self
    }

    /// Build the state machine, not yet started.
    /// Returns an error if required fields are missing or a state cannot
    /// be registered.
    pub fn build(self) -> Result<Machine<K, E>, BuildError> {
        let initial = self.initial.ok_or(BuildError::MissingInitialState)?;
        if self.states.is_empty() {
            return Err(BuildError::NoStates);
        }

        let looper = self
            .looper
            .unwrap_or_else(|| Box::new(LocalLoop::for_current_thread()));
        let mut machine =
            Machine::with_boxed_loop(self.name, self.env, looper).with_config(self.config);
        for (key, state, parent) in self.states {
            machine.add_boxed_state(key, state, parent)?;
        }
        machine.set_initial_state(initial);
        Ok(machine)
    }

    /// Build and start the state machine.
    pub fn start(self) -> Result<Machine<K, E>, BuildError> {
        let mut machine = self.build()?;
        machine.start()?;
        Ok(machine)
    }
}
