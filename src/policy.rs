use crate::session::{KeyInput, Keystroke, Outcome, TypingSession};
use serde::{Deserialize, Serialize};

/// Cursor-advance policy for a run. The two modes are mutually exclusive and
/// never mixed within one session.
///
/// `Normal` (the default): the cursor always advances, correct or not, so
/// mistakes stay visible at the position they were made until backspaced.
/// Invariant: `log.len() == cursor` at every point.
///
/// `Strict`: the cursor advances only on a correct match; incorrect
/// keystrokes are still logged (they count against accuracy and the expected
/// key's tally) but do not move the cursor. Invariant: the number of correct
/// entries in the log equals `cursor`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypingPolicy {
    #[default]
    Normal,
    Strict,
}

/// Tallies are case-folded so `A` and `a` feed one bucket.
fn tally_key(c: char) -> char {
    c.to_lowercase().next().unwrap_or(c)
}

/// Applies one character keystroke at active time `t`.
///
/// No-op unless the session is running and the cursor is inside the target;
/// a completed target is the caller's cue to finish, not an error.
pub fn apply_char(session: &mut TypingSession, policy: TypingPolicy, ch: char, t: f64) {
    if !session.is_running() {
        return;
    }
    let expected = match session.expected_char(session.cursor) {
        Some(c) => c,
        None => return,
    };

    let outcome = if ch == expected {
        Outcome::Correct
    } else {
        Outcome::Incorrect
    };
    session.log.push(Keystroke { t, ch, outcome });

    let tally = session.weak_keys.entry(tally_key(expected)).or_default();
    match outcome {
        Outcome::Correct => tally.hits += 1,
        Outcome::Incorrect => tally.misses += 1,
    }

    match policy {
        TypingPolicy::Normal => session.cursor += 1,
        TypingPolicy::Strict => {
            if outcome.is_correct() {
                session.cursor += 1;
            }
        }
    }
}

/// Undoes the most recent keystroke: truncates the log, reverses the tally
/// it incremented, and steps the cursor back if that keystroke had advanced
/// it. No-op on an empty log or outside a running session.
pub fn apply_backspace(session: &mut TypingSession, policy: TypingPolicy) {
    if !session.is_running() {
        return;
    }
    let last = match session.log.last().copied() {
        Some(k) => k,
        None => return,
    };

    let advanced = match policy {
        TypingPolicy::Normal => true,
        TypingPolicy::Strict => last.outcome.is_correct(),
    };
    // The position the keystroke was scored against: one left of the cursor
    // if it advanced, at the cursor otherwise.
    let pos = if advanced {
        match session.cursor.checked_sub(1) {
            Some(p) => p,
            None => return,
        }
    } else {
        session.cursor
    };
    session.log.pop();

    if let Some(expected) = session.expected_char(pos) {
        let key = tally_key(expected);
        let mut emptied = false;
        if let Some(tally) = session.weak_keys.get_mut(&key) {
            match last.outcome {
                Outcome::Correct => tally.hits = tally.hits.saturating_sub(1),
                Outcome::Incorrect => tally.misses = tally.misses.saturating_sub(1),
            }
            emptied = tally.total() == 0;
        }
        // Drop emptied entries so undo restores the exact pre-keystroke map.
        if emptied {
            session.weak_keys.remove(&key);
        }
    }

    if advanced {
        session.cursor -= 1;
    }
}

/// Dispatches a logical input event under the configured policy.
pub fn apply_key(session: &mut TypingSession, policy: TypingPolicy, key: KeyInput, t: f64) {
    match key {
        KeyInput::Char(c) => apply_char(session, policy, c, t),
        KeyInput::Backspace => apply_backspace(session, policy),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::KeyTally;

    fn running(target: &str) -> TypingSession {
        let mut session = TypingSession::new(target);
        session.begin(0.0);
        session
    }

    #[test]
    fn normal_advances_on_correct_and_incorrect() {
        let mut session = running("ab");
        apply_char(&mut session, TypingPolicy::Normal, 'a', 0.1);
        apply_char(&mut session, TypingPolicy::Normal, 'x', 0.2);
        assert_eq!(session.cursor, 2);
        assert_eq!(session.log.len(), 2);
        assert_eq!(session.log[0].outcome, Outcome::Correct);
        assert_eq!(session.log[1].outcome, Outcome::Incorrect);
        assert!(session.is_complete());
    }

    #[test]
    fn strict_blocks_on_error() {
        let mut session = running("ab");
        apply_char(&mut session, TypingPolicy::Strict, 'x', 0.1);
        assert_eq!(session.cursor, 0);
        assert_eq!(session.log.len(), 1);
        apply_char(&mut session, TypingPolicy::Strict, 'a', 0.2);
        assert_eq!(session.cursor, 1);
        assert_eq!(session.log.len(), 2);
    }

    #[test]
    fn tallies_score_the_expected_char_not_the_typed_one() {
        let mut session = running("ab");
        apply_char(&mut session, TypingPolicy::Normal, 'x', 0.1);
        assert_eq!(
            session.weak_keys.get(&'a'),
            Some(&KeyTally { hits: 0, misses: 1 })
        );
        assert_eq!(session.weak_keys.get(&'x'), None);
    }

    #[test]
    fn tallies_fold_case() {
        let mut session = running("Ab");
        apply_char(&mut session, TypingPolicy::Normal, 'A', 0.1);
        apply_char(&mut session, TypingPolicy::Normal, 'x', 0.2);
        // 'A' hit and 'b' miss both land on lowercase keys.
        assert_eq!(
            session.weak_keys.get(&'a'),
            Some(&KeyTally { hits: 1, misses: 0 })
        );
        assert_eq!(
            session.weak_keys.get(&'b'),
            Some(&KeyTally { hits: 0, misses: 1 })
        );
    }

    #[test]
    fn backspace_is_exact_inverse_normal() {
        let mut session = running("abc");
        apply_char(&mut session, TypingPolicy::Normal, 'a', 0.1);

        let cursor = session.cursor;
        let log_len = session.log.len();
        let weak_keys = session.weak_keys.clone();

        apply_char(&mut session, TypingPolicy::Normal, 'z', 0.2);
        apply_backspace(&mut session, TypingPolicy::Normal);

        assert_eq!(session.cursor, cursor);
        assert_eq!(session.log.len(), log_len);
        assert_eq!(session.weak_keys, weak_keys);
    }

    #[test]
    fn backspace_is_exact_inverse_strict() {
        let mut session = running("abc");
        apply_char(&mut session, TypingPolicy::Strict, 'a', 0.1);

        let cursor = session.cursor;
        let log_len = session.log.len();
        let weak_keys = session.weak_keys.clone();

        for ch in ['b', 'x'] {
            apply_char(&mut session, TypingPolicy::Strict, ch, 0.2);
            apply_backspace(&mut session, TypingPolicy::Strict);
            assert_eq!(session.cursor, cursor);
            assert_eq!(session.log.len(), log_len);
            assert_eq!(session.weak_keys, weak_keys);
        }
    }

    #[test]
    fn backspace_reversal_removes_emptied_tally() {
        let mut session = running("ab");
        apply_char(&mut session, TypingPolicy::Normal, 'x', 0.1);
        apply_backspace(&mut session, TypingPolicy::Normal);
        assert_eq!(session.weak_keys.get(&'a'), None);
    }

    #[test]
    fn backspace_at_start_is_noop() {
        let mut session = running("ab");
        apply_backspace(&mut session, TypingPolicy::Normal);
        assert_eq!(session.cursor, 0);
        assert!(session.log.is_empty());
    }

    #[test]
    fn char_past_end_is_noop() {
        let mut session = running("a");
        apply_char(&mut session, TypingPolicy::Normal, 'a', 0.1);
        apply_char(&mut session, TypingPolicy::Normal, 'b', 0.2);
        assert_eq!(session.cursor, 1);
        assert_eq!(session.log.len(), 1);
    }

    #[test]
    fn ignored_unless_running() {
        let mut session = TypingSession::new("ab");
        apply_char(&mut session, TypingPolicy::Normal, 'a', 0.1);
        assert!(session.log.is_empty());

        session.begin(0.0);
        apply_char(&mut session, TypingPolicy::Normal, 'a', 0.1);
        session.end(1.0);
        apply_char(&mut session, TypingPolicy::Normal, 'b', 1.1);
        apply_backspace(&mut session, TypingPolicy::Normal);
        assert_eq!(session.log.len(), 1);
        assert_eq!(session.cursor, 1);
    }

    #[test]
    fn normal_invariant_log_len_equals_cursor() {
        let mut session = running("abcdef");
        let keys = [
            KeyInput::Char('a'),
            KeyInput::Char('x'),
            KeyInput::Backspace,
            KeyInput::Char('b'),
            KeyInput::Backspace,
            KeyInput::Backspace,
            KeyInput::Char('a'),
            KeyInput::Char('b'),
            KeyInput::Char('y'),
            KeyInput::Backspace,
            KeyInput::Char('c'),
        ];
        for key in keys {
            apply_key(&mut session, TypingPolicy::Normal, key, 0.0);
            assert_eq!(session.log.len(), session.cursor);
        }
        assert_eq!(session.cursor, 3);
    }

    #[test]
    fn strict_invariant_correct_entries_equal_cursor() {
        let mut session = running("abcdef");
        let keys = [
            KeyInput::Char('x'),
            KeyInput::Char('x'),
            KeyInput::Backspace,
            KeyInput::Char('a'),
            KeyInput::Char('b'),
            KeyInput::Backspace,
            KeyInput::Char('b'),
            KeyInput::Char('q'),
            KeyInput::Char('c'),
        ];
        for key in keys {
            apply_key(&mut session, TypingPolicy::Strict, key, 0.0);
            assert_eq!(session.correct_count(), session.cursor);
        }
        assert_eq!(session.cursor, 3);
    }

    #[test]
    fn newline_matches_newline() {
        let mut session = running("a\n");
        apply_char(&mut session, TypingPolicy::Normal, 'a', 0.1);
        apply_char(&mut session, TypingPolicy::Normal, '\n', 0.2);
        assert_eq!(session.correct_count(), 2);
        assert!(session.is_complete());
    }
}
