use crate::metrics::MIN_ELAPSED_SECS;
use crate::session::Keystroke;
use serde::Serialize;
use std::collections::VecDeque;

/// Active seconds between consecutive series samples.
pub const SAMPLE_INTERVAL_SECS: f64 = 0.1;
/// Default trailing-window width for the live series.
pub const DEFAULT_WINDOW_SECS: f64 = 10.0;
/// Default EMA time constant for smoothing the series.
pub const DEFAULT_SMOOTHING_TAU_SECS: f64 = 2.0;
/// Ring-buffer bound: an hour of samples at 10 Hz.
pub const SERIES_CAPACITY: usize = 36_000;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WpmSample {
    pub t: f64,
    pub wpm: f64,
}

impl WpmSample {
    pub fn new(t: f64, wpm: f64) -> Self {
        Self { t, wpm }
    }
}

impl From<(f64, f64)> for WpmSample {
    fn from(v: (f64, f64)) -> Self {
        WpmSample { t: v.0, wpm: v.1 }
    }
}

impl From<WpmSample> for (f64, f64) {
    fn from(s: WpmSample) -> Self {
        (s.t, s.wpm)
    }
}

/// Produces the wpm-over-time series for graphing.
///
/// The estimate at time `t` is a trailing-window rate: correct characters
/// logged within `[max(0, t - window), t]`, scaled to per-minute with the
/// window width floored at [`MIN_ELAPSED_SECS`]. Before the window fills,
/// the denominator is the time actually elapsed, not the full width, so the
/// early series is neither starved nor inflated. A cumulative all-time
/// average is deliberately not offered: it pins the early series to blown-up
/// values at small `t` and then decays no matter how the typist performs.
///
/// Samples are taken on a fixed cadence of [`SAMPLE_INTERVAL_SECS`] of
/// *active* time, starting one interval after session start; `sample_up_to`
/// may be called at any frequency and emits every sample the cadence owes.
/// When a time constant is configured, each raw value passes through a
/// time-aware exponential moving average with `alpha = 1 - exp(-dt/tau)`.
/// The buffer is bounded; once full, the oldest samples fall off the front.
#[derive(Debug, Clone)]
pub struct WpmSeriesEstimator {
    window_secs: f64,
    tau_secs: Option<f64>,
    capacity: usize,
    samples: VecDeque<WpmSample>,
    /// 1-based index of the next sample; sample times are computed as
    /// `index * SAMPLE_INTERVAL_SECS` rather than accumulated, so the
    /// cadence never drifts.
    next_index: u64,
    ema: Option<f64>,
}

impl Default for WpmSeriesEstimator {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_SECS, Some(DEFAULT_SMOOTHING_TAU_SECS))
    }
}

impl WpmSeriesEstimator {
    pub fn new(window_secs: f64, tau_secs: Option<f64>) -> Self {
        Self::with_capacity(window_secs, tau_secs, SERIES_CAPACITY)
    }

    /// Same as [`new`](Self::new) with an explicit ring-buffer bound.
    pub fn with_capacity(window_secs: f64, tau_secs: Option<f64>, capacity: usize) -> Self {
        Self {
            window_secs: window_secs.max(MIN_ELAPSED_SECS),
            tau_secs: tau_secs.filter(|tau| *tau > 0.0),
            capacity: capacity.max(1),
            samples: VecDeque::new(),
            next_index: 1,
            ema: None,
        }
    }

    pub fn window_secs(&self) -> f64 {
        self.window_secs
    }

    /// Discards all samples and re-arms the cadence for a new run.
    pub fn reset(&mut self) {
        self.samples.clear();
        self.next_index = 1;
        self.ema = None;
    }

    /// The raw trailing-window estimate at active time `t`, from a log
    /// ordered by timestamp. Pure; does not advance the cadence.
    pub fn window_wpm_at(&self, t: f64, log: &[Keystroke]) -> f64 {
        let window_start = (t - self.window_secs).max(0.0);
        let lo = log.partition_point(|k| k.t < window_start);
        let hi = log.partition_point(|k| k.t <= t);
        let correct = log[lo..hi]
            .iter()
            .filter(|k| k.outcome.is_correct())
            .count();
        let effective_secs = (t - window_start).max(MIN_ELAPSED_SECS);
        (correct as f64 / 5.0) / (effective_secs / 60.0)
    }

    /// Emits every sample owed up to active time `t`. Idempotent for a
    /// given `t`; call it from ticks and keystrokes alike.
    pub fn sample_up_to(&mut self, t: f64, log: &[Keystroke]) {
        while self.next_index as f64 * SAMPLE_INTERVAL_SECS <= t {
            let at = self.next_index as f64 * SAMPLE_INTERVAL_SECS;
            let raw = self.window_wpm_at(at, log);
            let value = match self.tau_secs {
                Some(tau) => {
                    let alpha = 1.0 - (-SAMPLE_INTERVAL_SECS / tau).exp();
                    let smoothed = match self.ema {
                        Some(prev) => prev + alpha * (raw - prev),
                        None => raw,
                    };
                    self.ema = Some(smoothed);
                    smoothed
                }
                None => raw,
            };
            if self.samples.len() == self.capacity {
                self.samples.pop_front();
            }
            self.samples.push_back(WpmSample::new(at, value));
            self.next_index += 1;
        }
    }

    /// All samples collected so far, oldest first. Restartable: each call
    /// iterates the buffer from the beginning.
    pub fn samples(&self) -> impl Iterator<Item = WpmSample> + '_ {
        self.samples.iter().copied()
    }

    pub fn latest(&self) -> Option<WpmSample> {
        self.samples.back().copied()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}
