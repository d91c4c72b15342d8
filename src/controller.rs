use crate::clock::ActiveClock;
use crate::metrics::{self, MetricsSnapshot, WeakKeyEntry};
use crate::policy::{self, TypingPolicy};
use crate::session::{KeyInput, TypingSession};
use crate::time_series::{
    WpmSample, WpmSeriesEstimator, DEFAULT_SMOOTHING_TAU_SECS, DEFAULT_WINDOW_SECS,
};
use chrono::{DateTime, Local};
use serde::Serialize;

/// Session lifecycle. `Idle` is reachable again from `Finished` via
/// [`SessionController::reset`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Running,
    Paused,
    Finished,
}

/// Per-run settings handed to [`SessionController::configure`].
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    /// `None` means unlimited: the run ends only when the target is consumed.
    pub time_limit_secs: Option<f64>,
    pub policy: TypingPolicy,
    pub window_secs: f64,
    /// `None` disables smoothing of the wpm series.
    pub smoothing_tau_secs: Option<f64>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            time_limit_secs: None,
            policy: TypingPolicy::default(),
            window_secs: DEFAULT_WINDOW_SECS,
            smoothing_tau_secs: Some(DEFAULT_SMOOTHING_TAU_SECS),
        }
    }
}

/// Final result of a completed run, emitted exactly once per session.
#[derive(Debug, Clone, Serialize)]
pub struct SessionOutcome {
    pub wpm: f64,
    pub accuracy_percent: f64,
    pub elapsed_seconds: f64,
    /// Std dev of the sampled wpm series; lower is steadier.
    pub consistency: f64,
    pub weak_keys: Vec<WeakKeyEntry>,
    pub series: Vec<WpmSample>,
    pub completed_at: DateTime<Local>,
}

type FinishHook = Box<dyn FnMut(&SessionOutcome) + Send>;

/// Orchestrates one typing run: validates lifecycle transitions, stamps
/// incoming events with active time, enforces the time limit, and emits the
/// final outcome.
///
/// Every method takes the raw monotonic `now` (seconds, arbitrary origin)
/// the surrounding event loop observed for the event it is delivering.
/// Transitions attempted from the wrong phase are no-ops — stray events from
/// a UI are expected, not errors.
///
/// The controller assumes events arrive one at a time on a single thread.
/// Cursor, log, and tallies are updated across multiple fields per event, so
/// an embedder dispatching from several threads must serialize access behind
/// one mutex or a command queue; there is no internal locking.
///
/// For endless modes, feed more text via [`extend_target`](Self::extend_target)
/// before the cursor reaches the end of the current target; completion fires
/// the moment the cursor consumes it.
pub struct SessionController {
    session: TypingSession,
    clock: ActiveClock,
    estimator: WpmSeriesEstimator,
    config: SessionConfig,
    phase: Phase,
    outcome: Option<SessionOutcome>,
    finish_hook: Option<FinishHook>,
}

impl Default for SessionController {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionController {
    pub fn new() -> Self {
        let config = SessionConfig::default();
        Self {
            session: TypingSession::default(),
            clock: ActiveClock::new(),
            estimator: WpmSeriesEstimator::new(config.window_secs, config.smoothing_tau_secs),
            config,
            phase: Phase::Idle,
            outcome: None,
            finish_hook: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_finished(&self) -> bool {
        self.phase == Phase::Finished
    }

    pub fn session(&self) -> &TypingSession {
        &self.session
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// The emitted result, present once the run has finished.
    pub fn outcome(&self) -> Option<&SessionOutcome> {
        self.outcome.as_ref()
    }

    /// Registers a callback invoked once with the outcome when a run
    /// finishes (a storage or summary collaborator, typically).
    pub fn set_finish_hook(&mut self, hook: impl FnMut(&SessionOutcome) + Send + 'static) {
        self.finish_hook = Some(Box::new(hook));
    }

    /// Sets up the target text and run settings. Valid only while idle.
    pub fn configure(&mut self, text: &str, config: SessionConfig) {
        if self.phase != Phase::Idle {
            return;
        }
        self.session.reset(text);
        self.estimator = WpmSeriesEstimator::new(config.window_secs, config.smoothing_tau_secs);
        self.config = config;
    }

    /// Returns to idle from any phase, keeping the configured target text so
    /// the same prompt can be run again.
    pub fn reset(&mut self) {
        let text = self.session.target_text();
        self.session.reset(&text);
        self.clock = ActiveClock::new();
        self.estimator.reset();
        self.outcome = None;
        self.phase = Phase::Idle;
    }

    /// Idle → Running. An empty target finishes on the spot with zero
    /// metrics.
    pub fn start(&mut self, now: f64) {
        if self.phase != Phase::Idle {
            return;
        }
        self.session.begin(now);
        self.clock.start(now);
        self.phase = Phase::Running;
        if self.session.is_complete() {
            self.finish(now);
        }
    }

    /// Running → Paused.
    pub fn pause(&mut self, now: f64) {
        if self.phase == Phase::Running {
            self.clock.pause(now);
            self.phase = Phase::Paused;
        }
    }

    /// Paused → Running.
    pub fn resume(&mut self, now: f64) {
        if self.phase == Phase::Paused {
            self.clock.resume(now);
            self.phase = Phase::Running;
        }
    }

    /// Applies one input event. A keystroke arriving while paused resumes
    /// the run first (any key resumes). Completion of the target finishes
    /// the run.
    pub fn on_keystroke(&mut self, key: KeyInput, now: f64) {
        if self.phase == Phase::Paused {
            self.resume(now);
        }
        if self.phase != Phase::Running {
            return;
        }
        let t = self.clock.elapsed(now);
        policy::apply_key(&mut self.session, self.config.policy, key, t);
        self.estimator.sample_up_to(t, &self.session.log);
        if self.session.is_complete() {
            self.finish(now);
        }
    }

    /// Periodic driver: advances the series cadence and enforces the time
    /// limit. No-op outside Running.
    pub fn tick(&mut self, now: f64) {
        if self.phase != Phase::Running {
            return;
        }
        let t = self.clock.elapsed(now);
        self.estimator.sample_up_to(t, &self.session.log);
        if let Some(limit) = self.config.time_limit_secs {
            if t >= limit {
                self.finish(now);
            }
        }
    }

    /// Running|Paused → Finished: freezes the clock, closes the series, and
    /// emits the outcome.
    pub fn finish(&mut self, now: f64) {
        if self.phase != Phase::Running && self.phase != Phase::Paused {
            return;
        }
        self.clock.stop(now);
        self.session.end(now);
        self.phase = Phase::Finished;

        let elapsed = self.clock.elapsed(now);
        self.estimator.sample_up_to(elapsed, &self.session.log);

        let series: Vec<WpmSample> = self.estimator.samples().collect();
        let wpm_values: Vec<f64> = series.iter().map(|s| s.wpm).collect();
        let outcome = SessionOutcome {
            wpm: metrics::wpm(self.session.correct_count(), elapsed),
            accuracy_percent: metrics::accuracy(&self.session.log),
            elapsed_seconds: elapsed,
            consistency: metrics::std_dev(&wpm_values).unwrap_or(0.0),
            weak_keys: metrics::weak_keys_ranked(&self.session.weak_keys),
            series,
            completed_at: Local::now(),
        };
        if let Some(hook) = self.finish_hook.as_mut() {
            hook(&outcome);
        }
        self.outcome = Some(outcome);
    }

    /// Live metrics for a polling renderer. Valid in any phase.
    pub fn current_snapshot(&self, now: f64) -> MetricsSnapshot {
        metrics::snapshot(&self.session, self.clock.elapsed(now))
    }

    /// The wpm series collected so far, oldest first.
    pub fn current_series(&self) -> impl Iterator<Item = WpmSample> + '_ {
        self.estimator.samples()
    }

    /// Most recent series sample, if any.
    pub fn latest_sample(&self) -> Option<WpmSample> {
        self.estimator.latest()
    }

    /// Appends text to the target mid-run (endless modes). Cursor and log
    /// are untouched.
    pub fn extend_target(&mut self, more: &str) {
        self.session.extend_target(more);
    }
}
