use std::{
    fmt,
    sync::atomic::{AtomicU8, Ordering},
};

use crate::Error;

/// One-way mutation phases of a [`crate::Definition`].
///
/// Each field of a definition belongs to exactly one phase. Reading a field locks its phase;
/// writing a field locks every earlier phase and fails once its own phase is locked.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum Phase {
    /// Local instances, expectations and import names.
    SourceRead = 1,
    /// Resolved dependency references.
    Merged = 2,
    /// Provided instances, computed expectations and dependency hashes.
    Analyzed = 3,
}

impl Phase {
    pub const ALL: [Phase; 3] = [Phase::SourceRead, Phase::Merged, Phase::Analyzed];

    pub fn previous(self) -> Option<Phase> {
        match self {
            Phase::SourceRead => None,
            Phase::Merged => Some(Phase::SourceRead),
            Phase::Analyzed => Some(Phase::Merged),
        }
    }

    fn from_raw(raw: u8) -> Option<Phase> {
        Phase::ALL.into_iter().find(|phase| *phase as u8 == raw)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Phase::SourceRead => "source read",
            Phase::Merged => "definition merge",
            Phase::Analyzed => "analyzed",
        })
    }
}

/// The highest locked [`Phase`] of one definition.
///
/// Reads take `&self` and still lock, so the state lives in an atomic.
#[derive(Debug, Default)]
pub struct PhaseLock(AtomicU8);

impl PhaseLock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn locked(&self) -> Option<Phase> {
        Phase::from_raw(self.0.load(Ordering::Acquire))
    }

    pub fn is_locked(&self, phase: Phase) -> bool {
        self.0.load(Ordering::Acquire) >= phase as u8
    }

    /// Lock `phase` and every phase before it.
    pub fn lock(&self, phase: Phase) {
        self.0.fetch_max(phase as u8, Ordering::AcqRel);
    }

    /// Guard a write to a field owned by `phase`.
    pub fn check_write(&self, phase: Phase, identity: &str) -> Result<(), Error> {
        if let Some(previous) = phase.previous() {
            self.lock(previous);
        }
        if self.is_locked(phase) {
            return Err(Error::LockViolation {
                identity: identity.to_string(),
                phase,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_is_monotonic() {
        let lock = PhaseLock::new();
        assert_eq!(lock.locked(), None);

        lock.lock(Phase::Merged);
        assert!(lock.is_locked(Phase::SourceRead));
        assert!(lock.is_locked(Phase::Merged));
        assert!(!lock.is_locked(Phase::Analyzed));

        lock.lock(Phase::SourceRead);
        assert_eq!(lock.locked(), Some(Phase::Merged));
    }

    #[test]
    fn write_locks_previous_phase() {
        let lock = PhaseLock::new();
        lock.check_write(Phase::Analyzed, "a").unwrap();
        assert_eq!(lock.locked(), Some(Phase::Merged));

        let err = lock.check_write(Phase::SourceRead, "a").unwrap_err();
        assert!(matches!(
            err,
            Error::LockViolation {
                phase: Phase::SourceRead,
                ..
            }
        ));
        assert!(lock.check_write(Phase::Merged, "a").is_err());
        lock.check_write(Phase::Analyzed, "a").unwrap();
    }

    #[test]
    fn lock_violation_message_names_phase() {
        let lock = PhaseLock::new();
        lock.lock(Phase::SourceRead);
        let err = lock.check_write(Phase::SourceRead, "com.example.A").unwrap_err();
        assert_eq!(
            err.to_string(),
            "attempting to modify source read content of `com.example.A` after source read is locked"
        );
    }
}
