//! UDS Negative Response Codes (NRC)

use std::fmt;

/// Negative Response Codes understood by the simulated ECU
///
/// `IncorrectMessageLengthOrFormat` and `ExceededNumberOfAttempts` are only
/// raised for malformed payloads and configured lockouts respectively;
/// `ConditionsNotCorrect` is part of the vocabulary but no service raises it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NegativeResponseCode {
    ServiceNotSupported,
    SubFunctionNotSupported,
    IncorrectMessageLengthOrFormat,
    ConditionsNotCorrect,
    RequestSequenceError,
    RequestOutOfRange,
    InvalidKey,
    ExceededNumberOfAttempts,

    /// Unknown/reserved NRC
    Unknown(u8),
}

impl From<u8> for NegativeResponseCode {
    fn from(value: u8) -> Self {
        match value {
            0x11 => Self::ServiceNotSupported,
            0x12 => Self::SubFunctionNotSupported,
            0x13 => Self::IncorrectMessageLengthOrFormat,
            0x22 => Self::ConditionsNotCorrect,
            0x24 => Self::RequestSequenceError,
            0x31 => Self::RequestOutOfRange,
            0x35 => Self::InvalidKey,
            0x36 => Self::ExceededNumberOfAttempts,
            other => Self::Unknown(other),
        }
    }
}

impl From<NegativeResponseCode> for u8 {
    fn from(nrc: NegativeResponseCode) -> Self {
        match nrc {
            NegativeResponseCode::ServiceNotSupported => 0x11,
            NegativeResponseCode::SubFunctionNotSupported => 0x12,
            NegativeResponseCode::IncorrectMessageLengthOrFormat => 0x13,
            NegativeResponseCode::ConditionsNotCorrect => 0x22,
            NegativeResponseCode::RequestSequenceError => 0x24,
            NegativeResponseCode::RequestOutOfRange => 0x31,
            NegativeResponseCode::InvalidKey => 0x35,
            NegativeResponseCode::ExceededNumberOfAttempts => 0x36,
            NegativeResponseCode::Unknown(v) => v,
        }
    }
}

impl fmt::UpperHex for NegativeResponseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value: u8 = (*self).into();
        fmt::UpperHex::fmt(&value, f)
    }
}

impl fmt::Display for NegativeResponseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ServiceNotSupported => write!(f, "ServiceNotSupported"),
            Self::SubFunctionNotSupported => write!(f, "SubFunctionNotSupported"),
            Self::IncorrectMessageLengthOrFormat => write!(f, "IncorrectMessageLengthOrFormat"),
            Self::ConditionsNotCorrect => write!(f, "ConditionsNotCorrect"),
            Self::RequestSequenceError => write!(f, "RequestSequenceError"),
            Self::RequestOutOfRange => write!(f, "RequestOutOfRange"),
            Self::InvalidKey => write!(f, "InvalidKey"),
            Self::ExceededNumberOfAttempts => write!(f, "ExceededNumberOfAttempts"),
            Self::Unknown(v) => write!(f, "Unknown(0x{:02X})", v),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_codes_map_both_ways() {
        for byte in [0x11u8, 0x12, 0x13, 0x22, 0x24, 0x31, 0x35, 0x36] {
            let nrc = NegativeResponseCode::from(byte);
            assert!(!matches!(nrc, NegativeResponseCode::Unknown(_)));
            assert_eq!(u8::from(nrc), byte);
        }
    }

    #[test]
    fn test_unknown_code_is_preserved() {
        let nrc = NegativeResponseCode::from(0x78);
        assert_eq!(nrc, NegativeResponseCode::Unknown(0x78));
        assert_eq!(u8::from(nrc), 0x78);
        assert_eq!(nrc.to_string(), "Unknown(0x78)");
    }

    #[test]
    fn test_upper_hex_formatting() {
        assert_eq!(format!("{:02X}", NegativeResponseCode::InvalidKey), "35");
    }
}
