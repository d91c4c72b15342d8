/// Lifecycle of an [`ActiveClock`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockState {
    Idle,
    Running,
    Paused,
    Stopped,
}

/// Accumulates active (non-paused) seconds from an externally observed
/// monotonic timebase.
///
/// Every operation takes the current raw monotonic reading `now` in seconds;
/// the origin is arbitrary as long as readings never decrease. Feeding time
/// in from the outside keeps the clock deterministic under test and lets the
/// embedding event loop stamp all events from one source.
///
/// All operations are total: calls that do not apply in the current state
/// are no-ops.
#[derive(Debug, Clone)]
pub struct ActiveClock {
    state: ClockState,
    /// Active seconds banked up to the last pause or stop.
    banked: f64,
    /// Raw reading at which the current running stretch began.
    resumed_at: f64,
}

impl Default for ActiveClock {
    fn default() -> Self {
        Self {
            state: ClockState::Idle,
            banked: 0.0,
            resumed_at: 0.0,
        }
    }
}

impl ActiveClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ClockState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == ClockState::Running
    }

    /// Re-arms from zero and starts measuring. Valid in any state; starting
    /// an already-running clock restarts it (new-session semantics).
    pub fn start(&mut self, now: f64) {
        self.banked = 0.0;
        self.resumed_at = now;
        self.state = ClockState::Running;
    }

    /// Freezes accumulation. No-op unless running.
    pub fn pause(&mut self, now: f64) {
        if self.state == ClockState::Running {
            self.banked += (now - self.resumed_at).max(0.0);
            self.state = ClockState::Paused;
        }
    }

    /// Resumes accumulation from the frozen total. No-op unless paused.
    pub fn resume(&mut self, now: f64) {
        if self.state == ClockState::Paused {
            self.resumed_at = now;
            self.state = ClockState::Running;
        }
    }

    /// Finalizes the accumulated total. No-op unless running or paused.
    pub fn stop(&mut self, now: f64) {
        match self.state {
            ClockState::Running => {
                self.banked += (now - self.resumed_at).max(0.0);
                self.state = ClockState::Stopped;
            }
            ClockState::Paused => self.state = ClockState::Stopped,
            _ => {}
        }
    }

    /// Active seconds accumulated so far. While running this grows with
    /// `now`; otherwise it returns the frozen total (0 while idle). Negative
    /// deltas from a misbehaving timebase are clamped, so the result never
    /// decreases between calls with non-decreasing `now`.
    pub fn elapsed(&self, now: f64) -> f64 {
        match self.state {
            ClockState::Running => self.banked + (now - self.resumed_at).max(0.0),
            _ => self.banked,
        }
    }
}
