//! Idempotency guards for one-shot triggers.
//!
//! The hosting environment may invoke the same logical effect more than once
//! per tick, so every one-shot trigger goes through a single atomic
//! check-unmarked-then-mark operation — never a separate read followed by a
//! write. Keys are scoped per round (per round+participant for resumption)
//! so rounds stay independent.

use std::collections::HashSet;
use std::sync::Mutex;

/// Key identifying one one-shot trigger
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum GuardKey {
    PreSearch { round: u32 },
    Moderation { round: u32 },
    Submit { round: u32 },
    Stop { round: u32 },
    Resume { round: u32, participant_index: u32 },
}

/// Atomic check-and-mark set.
///
/// `try_mark` returns true exactly once per key; every later call for the
/// same key returns false. The mutex makes check and mark one observable
/// step.
#[derive(Debug, Default)]
pub struct IdempotencyGuards {
    marked: Mutex<HashSet<GuardKey>>,
}

impl IdempotencyGuards {
    pub fn new() -> Self {
        Self::default()
    }

    /// First caller wins. Poisoning is unrecoverable state corruption, so a
    /// poisoned set falls back to the inner value.
    pub fn try_mark(&self, key: GuardKey) -> bool {
        let mut marked = self.marked.lock().unwrap_or_else(|e| e.into_inner());
        marked.insert(key)
    }

    /// Whether the key has been marked, without marking it.
    pub fn is_marked(&self, key: &GuardKey) -> bool {
        let marked = self.marked.lock().unwrap_or_else(|e| e.into_inner());
        marked.contains(key)
    }

    /// Re-arm a trigger, e.g. when a commit fails and the submission must be
    /// retryable, or when a round is regenerated.
    pub fn release(&self, key: &GuardKey) -> bool {
        let mut marked = self.marked.lock().unwrap_or_else(|e| e.into_inner());
        marked.remove(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn try_mark_returns_true_exactly_once() {
        let guards = IdempotencyGuards::new();
        assert!(guards.try_mark(GuardKey::Moderation { round: 0 }));
        for _ in 0..10 {
            assert!(!guards.try_mark(GuardKey::Moderation { round: 0 }));
        }
    }

    #[test]
    fn rounds_are_independent() {
        let guards = IdempotencyGuards::new();
        assert!(guards.try_mark(GuardKey::PreSearch { round: 0 }));
        assert!(guards.try_mark(GuardKey::PreSearch { round: 1 }));
        assert!(!guards.try_mark(GuardKey::PreSearch { round: 0 }));
    }

    #[test]
    fn key_kinds_do_not_collide() {
        let guards = IdempotencyGuards::new();
        assert!(guards.try_mark(GuardKey::Submit { round: 2 }));
        assert!(guards.try_mark(GuardKey::Stop { round: 2 }));
        assert!(guards.try_mark(GuardKey::Moderation { round: 2 }));
    }

    #[test]
    fn resume_keys_scope_per_participant() {
        let guards = IdempotencyGuards::new();
        assert!(guards.try_mark(GuardKey::Resume { round: 0, participant_index: 0 }));
        assert!(guards.try_mark(GuardKey::Resume { round: 0, participant_index: 1 }));
        assert!(!guards.try_mark(GuardKey::Resume { round: 0, participant_index: 0 }));
    }

    #[test]
    fn release_re_arms_the_trigger() {
        let guards = IdempotencyGuards::new();
        let key = GuardKey::Submit { round: 0 };
        assert!(guards.try_mark(key.clone()));
        assert!(guards.is_marked(&key));
        assert!(guards.release(&key));
        assert!(guards.try_mark(key));
    }

    #[test]
    fn concurrent_callers_see_one_winner() {
        use std::sync::Arc;

        let guards = Arc::new(IdempotencyGuards::new());
        let mut handles = Vec::new();
        for _ in 0..16 {
            let guards = Arc::clone(&guards);
            handles.push(std::thread::spawn(move || {
                guards.try_mark(GuardKey::Moderation { round: 5 })
            }));
        }
        let wins: usize = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();
        assert_eq!(wins, 1);
    }
}
