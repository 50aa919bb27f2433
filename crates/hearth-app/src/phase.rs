//! Application lifecycle state machine.

/// Where the application is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Initialization,
    EventPolling,
    Simulation,
    Updating,
    Rendering,
    Termination,
}

/// Phase, running flag and quit request.
///
/// `quit` only records the request; the loop observes it at the next
/// frame boundary through [`Lifecycle::should_continue`].
#[derive(Debug)]
pub struct Lifecycle {
    phase: Phase,
    running: bool,
    quitting: bool,
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self {
            phase: Phase::Initialization,
            running: false,
            quitting: false,
        }
    }
}

impl Lifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn is_quitting(&self) -> bool {
        self.quitting
    }

    /// Initialization finished; start polling events.
    pub fn start(&mut self) {
        debug_assert_eq!(self.phase, Phase::Initialization);
        self.running = true;
        self.phase = Phase::EventPolling;
    }

    /// Step through one stage of the frame cycle and return the new phase.
    ///
    /// Outside the running cycle the phase is left untouched.
    pub fn advance(&mut self) -> Phase {
        self.phase = match self.phase {
            Phase::EventPolling => Phase::Simulation,
            Phase::Simulation => Phase::Updating,
            Phase::Updating => Phase::Rendering,
            Phase::Rendering => Phase::EventPolling,
            other => other,
        };
        self.phase
    }

    pub fn quit(&mut self, quitting: bool) {
        self.quitting = quitting;
    }

    /// Whether another frame should run.
    pub fn should_continue(&self) -> bool {
        self.running && !self.quitting
    }

    /// Leave the frame cycle for good.
    pub fn terminate(&mut self) {
        self.running = false;
        self.phase = Phase::Termination;
    }
}
