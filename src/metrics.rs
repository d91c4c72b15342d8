use crate::session::{KeyTally, Keystroke, TypingSession};
use itertools::Itertools;
use serde::Serialize;
use std::collections::HashMap;

/// Floor applied to every elapsed-time denominator so rates stay finite at
/// t ≈ 0.
pub const MIN_ELAPSED_SECS: f64 = 0.001;

/// One ranked weak-key row: a target character with its historical miss
/// rate for this session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeakKeyEntry {
    pub character: char,
    pub miss_rate: f64,
    pub hits: u32,
    pub misses: u32,
}

impl WeakKeyEntry {
    pub fn attempts(&self) -> u32 {
        self.hits + self.misses
    }
}

/// Point-in-time metrics derived from a session. Never stored; recompute on
/// demand.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub wpm: f64,
    pub accuracy_percent: f64,
    pub elapsed_seconds: f64,
    pub weak_keys_ranked: Vec<WeakKeyEntry>,
}

/// Percentage of logged keystrokes that were correct. An empty log counts
/// as 100: no attempts, no mistakes.
pub fn accuracy(log: &[Keystroke]) -> f64 {
    if log.is_empty() {
        return 100.0;
    }
    let correct = log.iter().filter(|k| k.outcome.is_correct()).count();
    100.0 * correct as f64 / log.len() as f64
}

/// Standard words-per-minute: one word is five correct characters.
pub fn wpm(correct_chars: usize, active_seconds: f64) -> f64 {
    let secs = active_seconds.max(MIN_ELAPSED_SECS);
    (correct_chars as f64 / 5.0) / (secs / 60.0)
}

/// Ranks tallied characters by miss rate, worst first; ties broken by total
/// attempts (more attempts first), then by character for a stable order.
/// Characters with no attempts are excluded.
pub fn weak_keys_ranked(tallies: &HashMap<char, KeyTally>) -> Vec<WeakKeyEntry> {
    tallies
        .iter()
        .filter(|(_, tally)| tally.total() > 0)
        .map(|(&character, tally)| WeakKeyEntry {
            character,
            miss_rate: tally.misses as f64 / tally.total() as f64,
            hits: tally.hits,
            misses: tally.misses,
        })
        .sorted_by(|a, b| {
            b.miss_rate
                .total_cmp(&a.miss_rate)
                .then(b.attempts().cmp(&a.attempts()))
                .then(a.character.cmp(&b.character))
        })
        .collect()
}

/// Derives a full snapshot from the session's current state.
pub fn snapshot(session: &TypingSession, elapsed_seconds: f64) -> MetricsSnapshot {
    MetricsSnapshot {
        wpm: wpm(session.correct_count(), elapsed_seconds),
        accuracy_percent: accuracy(&session.log),
        elapsed_seconds,
        weak_keys_ranked: weak_keys_ranked(&session.weak_keys),
    }
}

pub fn mean(data: &[f64]) -> Option<f64> {
    if data.is_empty() {
        return None;
    }
    Some(data.iter().sum::<f64>() / data.len() as f64)
}

/// Population standard deviation. Used as the consistency figure over the
/// sampled wpm series: lower is steadier.
pub fn std_dev(data: &[f64]) -> Option<f64> {
    let m = mean(data)?;
    let variance = data.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / data.len() as f64;
    Some(variance.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::{apply_char, TypingPolicy};
    use crate::session::Outcome;

    fn stroke(t: f64, ch: char, correct: bool) -> Keystroke {
        Keystroke {
            t,
            ch,
            outcome: if correct {
                Outcome::Correct
            } else {
                Outcome::Incorrect
            },
        }
    }

    #[test]
    fn accuracy_of_empty_log_is_perfect() {
        assert_eq!(accuracy(&[]), 100.0);
    }

    #[test]
    fn accuracy_all_correct() {
        let log: Vec<_> = (0..7).map(|i| stroke(i as f64, 'a', true)).collect();
        assert_eq!(accuracy(&log), 100.0);
    }

    #[test]
    fn accuracy_counts_misses() {
        let log = vec![
            stroke(0.0, 'a', true),
            stroke(0.1, 'x', false),
            stroke(0.2, 'c', true),
            stroke(0.3, 'd', true),
        ];
        assert_eq!(accuracy(&log), 75.0);
    }

    #[test]
    fn wpm_formula() {
        assert_eq!(wpm(0, 60.0), 0.0);
        assert_eq!(wpm(5, 60.0), 1.0);
        // Doubling the time halves the rate.
        assert_eq!(wpm(10, 60.0), 2.0 * wpm(10, 120.0));
    }

    #[test]
    fn wpm_is_finite_at_zero_elapsed() {
        let v = wpm(3, 0.0);
        assert!(v.is_finite());
        assert_eq!(v, (3.0 / 5.0) / (MIN_ELAPSED_SECS / 60.0));
    }

    #[test]
    fn weak_keys_ranked_orders_by_miss_rate_then_volume() {
        let mut tallies = HashMap::new();
        tallies.insert('a', KeyTally { hits: 9, misses: 1 }); // 10%
        tallies.insert('b', KeyTally { hits: 1, misses: 1 }); // 50%
        tallies.insert('c', KeyTally { hits: 2, misses: 2 }); // 50%, more attempts
        tallies.insert('d', KeyTally { hits: 0, misses: 0 }); // excluded

        let ranked = weak_keys_ranked(&tallies);
        let order: Vec<char> = ranked.iter().map(|e| e.character).collect();
        assert_eq!(order, vec!['c', 'b', 'a']);
        assert_eq!(ranked[0].miss_rate, 0.5);
        assert_eq!(ranked[2].attempts(), 10);
    }

    #[test]
    fn snapshot_reflects_session_state() {
        let mut session = TypingSession::new("abc");
        session.begin(0.0);
        apply_char(&mut session, TypingPolicy::Normal, 'a', 0.5);
        apply_char(&mut session, TypingPolicy::Normal, 'x', 1.0);

        let snap = snapshot(&session, 1.0);
        assert_eq!(snap.accuracy_percent, 50.0);
        assert_eq!(snap.elapsed_seconds, 1.0);
        // One correct char in one second.
        assert!((snap.wpm - 12.0).abs() < 1e-9);
        assert_eq!(snap.weak_keys_ranked[0].character, 'b');
    }

    #[test]
    fn mean_and_std_dev() {
        assert_eq!(mean(&[]), None);
        assert_eq!(mean(&[10.0, 20.0, 30.0]), Some(20.0));
        assert_eq!(std_dev(&[]), None);
        assert_eq!(std_dev(&[5.0, 5.0, 5.0]), Some(0.0));
        let sd = std_dev(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        assert!((sd.expect("non-empty") - 2.0).abs() < 1e-12);
    }
}
