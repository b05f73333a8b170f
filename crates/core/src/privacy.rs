//! Shared-secret visibility toggle for hospital stock detail.
//!
//! This is a display permission only. It does not encrypt anything and offers no protection
//! beyond deciding whether per-type counts are included in a response.

use std::sync::Arc;

#[derive(Clone, Debug)]
pub struct PrivacyGate {
    secret: Arc<str>,
    unlocked: bool,
}

impl PrivacyGate {
    /// Creates a locked gate for the configured secret.
    pub fn new(secret: impl Into<Arc<str>>) -> Self {
        Self {
            secret: secret.into(),
            unlocked: false,
        }
    }

    /// Returns `true` and unlocks the gate iff `candidate` equals the secret.
    ///
    /// A wrong candidate returns `false` and leaves an earlier successful unlock in place.
    pub fn unlock(&mut self, candidate: &str) -> bool {
        let matches = candidate == &*self.secret;
        if matches {
            self.unlocked = true;
        }
        matches
    }

    pub fn is_unlocked(&self) -> bool {
        self.unlocked
    }

    /// Withdraws access granted by an earlier unlock.
    pub fn lock(&mut self) {
        self.unlocked = false;
    }

    /// Passes `detail` through only while unlocked.
    pub fn reveal<T>(&self, detail: T) -> Option<T> {
        self.unlocked.then_some(detail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_locked() {
        let gate = PrivacyGate::new("HEMO2024");
        assert!(!gate.is_unlocked());
        assert_eq!(gate.reveal(5), None);
    }

    #[test]
    fn test_unlock_with_secret() {
        let mut gate = PrivacyGate::new("HEMO2024");
        assert!(gate.unlock("HEMO2024"));
        assert!(gate.is_unlocked());
        assert_eq!(gate.reveal(5), Some(5));
    }

    #[test]
    fn test_unlock_is_exact_match() {
        let mut gate = PrivacyGate::new("HEMO2024");
        assert!(!gate.unlock("hemo2024"));
        assert!(!gate.unlock(" HEMO2024"));
        assert!(!gate.is_unlocked());
    }

    #[test]
    fn test_failed_attempt_keeps_earlier_unlock() {
        let mut gate = PrivacyGate::new("HEMO2024");
        gate.unlock("HEMO2024");
        assert!(!gate.unlock("wrong"));
        assert!(gate.is_unlocked());
    }

    #[test]
    fn test_lock_withdraws_access() {
        let mut gate = PrivacyGate::new("HEMO2024");
        gate.unlock("HEMO2024");
        gate.lock();
        assert!(!gate.is_unlocked());
    }
}
