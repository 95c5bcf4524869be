//! UDS protocol errors

use thiserror::Error;

use super::NegativeResponseCode;

/// Failure raised by a diagnostic service handler
///
/// Carries the NRC that the transport layer turns into a `0x7F` response.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum UdsError {
    #[error("Negative response: {nrc} (0x{nrc:02X}) for service 0x{service_id:02X}")]
    NegativeResponse {
        service_id: u8,
        nrc: NegativeResponseCode,
    },
}

impl UdsError {
    pub fn negative(service_id: u8, nrc: NegativeResponseCode) -> Self {
        Self::NegativeResponse { service_id, nrc }
    }

    /// The service the failure belongs to
    pub fn service_id(&self) -> u8 {
        match self {
            Self::NegativeResponse { service_id, .. } => *service_id,
        }
    }

    /// The negative response code to report
    pub fn nrc(&self) -> NegativeResponseCode {
        match self {
            Self::NegativeResponse { nrc, .. } => *nrc,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negative_response_display() {
        let err = UdsError::negative(0x22, NegativeResponseCode::RequestOutOfRange);
        assert_eq!(
            err.to_string(),
            "Negative response: RequestOutOfRange (0x31) for service 0x22"
        );
        assert_eq!(err.service_id(), 0x22);
        assert_eq!(err.nrc(), NegativeResponseCode::RequestOutOfRange);
    }
}
