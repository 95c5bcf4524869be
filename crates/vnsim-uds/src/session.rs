//! Diagnostic session state shared by every tester

use serde::Serialize;

use crate::uds::session_type;

/// Active diagnostic session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionType {
    #[default]
    Default,
    Programming,
    Extended,
}

impl SessionType {
    pub fn from_byte(value: u8) -> Option<Self> {
        match value {
            session_type::DEFAULT => Some(SessionType::Default),
            session_type::PROGRAMMING => Some(SessionType::Programming),
            session_type::EXTENDED => Some(SessionType::Extended),
            _ => None,
        }
    }

    pub fn as_byte(self) -> u8 {
        match self {
            SessionType::Default => session_type::DEFAULT,
            SessionType::Programming => session_type::PROGRAMMING,
            SessionType::Extended => session_type::EXTENDED,
        }
    }
}

/// Security access state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SecurityLevel {
    #[default]
    Locked,
    Unlocked,
}

/// Seed/key state machine plus the active session
///
/// `pending_seed` is `Some` only between a successful seed request and the
/// key that resolves it. A zero seed is legal.
#[derive(Debug, Clone, Default)]
pub struct DiagnosticSession {
    pub session: SessionType,
    pub security_level: SecurityLevel,
    pub pending_seed: Option<u16>,
    pub expected_key: u16,
    /// Invalid keys sent against the current seed
    pub failed_attempts: u32,
}

impl DiagnosticSession {
    /// Switch session; entering Default relocks security access
    ///
    /// Returns true when security access was revoked by the switch.
    pub fn enter(&mut self, session: SessionType) -> bool {
        self.session = session;
        if session == SessionType::Default && self.security_level == SecurityLevel::Unlocked {
            self.security_level = SecurityLevel::Locked;
            return true;
        }
        false
    }

    /// Store a freshly issued seed and derive its key
    pub fn issue_seed(&mut self, seed: u16) {
        self.pending_seed = Some(seed);
        self.expected_key = seed.wrapping_add(1);
        self.failed_attempts = 0;
    }

    /// Unlock and forget the seed
    pub fn unlock(&mut self) {
        self.security_level = SecurityLevel::Unlocked;
        self.pending_seed = None;
        self.failed_attempts = 0;
    }

    /// Discard the pending seed without unlocking
    pub fn reset_seed(&mut self) {
        self.pending_seed = None;
        self.failed_attempts = 0;
    }

    pub fn is_unlocked(&self) -> bool {
        self.security_level == SecurityLevel::Unlocked
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_type_bytes() {
        for byte in 1..=3 {
            assert_eq!(SessionType::from_byte(byte).map(SessionType::as_byte), Some(byte));
        }
        assert_eq!(SessionType::from_byte(0x00), None);
        assert_eq!(SessionType::from_byte(0x04), None);
    }

    #[test]
    fn test_default_session_relocks() {
        let mut state = DiagnosticSession::default();
        state.enter(SessionType::Extended);
        state.unlock();
        assert!(!state.enter(SessionType::Programming));
        assert!(state.is_unlocked());
        assert!(state.enter(SessionType::Default));
        assert_eq!(state.security_level, SecurityLevel::Locked);
    }

    #[test]
    fn test_seed_key_wraps() {
        let mut state = DiagnosticSession::default();
        state.issue_seed(0xFFFF);
        assert_eq!(state.pending_seed, Some(0xFFFF));
        assert_eq!(state.expected_key, 0x0000);

        state.issue_seed(0);
        assert_eq!(state.pending_seed, Some(0));
        assert_eq!(state.expected_key, 1);
    }
}
