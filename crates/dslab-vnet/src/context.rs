//! Simulation time access.

use std::cell::Cell;
use std::rc::Rc;

/// Source of the current simulation time.
///
/// The network never advances time itself, it only reads it.
pub trait Clock {
    /// Returns the current simulation time.
    fn time(&self) -> f64;
}

/// Clock which is advanced manually by its owner, e.g. by an external event loop or a test.
///
/// Clones share the same time value.
#[derive(Clone, Default)]
pub struct ManualClock {
    time: Rc<Cell<f64>>,
}

impl ManualClock {
    /// Creates a clock set to zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves the clock to the specified time.
    ///
    /// Panics if the time goes backwards.
    pub fn set_time(&self, time: f64) {
        assert!(
            time >= self.time.get(),
            "Simulation time can not go backwards: {} -> {}",
            self.time.get(),
            time
        );
        self.time.set(time);
    }

    /// Advances the clock by the specified duration.
    pub fn advance(&self, duration: f64) {
        self.set_time(self.time.get() + duration);
    }
}

impl Clock for ManualClock {
    fn time(&self) -> f64 {
        self.time.get()
    }
}

/// Named view of the simulation clock used by network components for logging.
#[derive(Clone)]
pub struct NetworkContext {
    name: String,
    clock: Rc<dyn Clock>,
}

impl NetworkContext {
    /// Creates a context with the given component name.
    pub fn new(name: &str, clock: Rc<dyn Clock>) -> Self {
        Self {
            name: name.to_string(),
            clock,
        }
    }

    /// Returns the component name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the current simulation time.
    pub fn time(&self) -> f64 {
        self.clock.time()
    }
}
