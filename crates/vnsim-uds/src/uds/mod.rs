//! UDS protocol constants
//!
//! Service identifiers, sub-functions and response framing for the services
//! the simulated ECU answers.

mod error;
mod nrc;

pub use error::UdsError;
pub use nrc::NegativeResponseCode;

/// Offset added to a service ID to form its positive response ID
pub const POSITIVE_RESPONSE_OFFSET: u8 = 0x40;

/// UDS Service IDs
pub mod service_id {
    pub const DIAGNOSTIC_SESSION_CONTROL: u8 = 0x10;
    pub const CLEAR_DIAGNOSTIC_INFO: u8 = 0x14;
    pub const READ_DTC_INFO: u8 = 0x19;
    pub const READ_DATA_BY_ID: u8 = 0x22;
    pub const SECURITY_ACCESS: u8 = 0x27;
    pub const NEGATIVE_RESPONSE: u8 = 0x7F;
}

/// DiagnosticSessionControl (0x10) session types
pub mod session_type {
    pub const DEFAULT: u8 = 0x01;
    pub const PROGRAMMING: u8 = 0x02;
    pub const EXTENDED: u8 = 0x03;
}

/// ReadDTCInformation (0x19) sub-functions
pub mod dtc_sub_function {
    /// Report DTCs matching a status mask
    pub const REPORT_DTC_BY_STATUS_MASK: u8 = 0x02;
    /// Report DTC snapshot (freeze frame) record
    pub const REPORT_DTC_SNAPSHOT_RECORD: u8 = 0x04;
    /// Report supported DTCs
    pub const REPORT_SUPPORTED_DTC: u8 = 0x0A;
}

/// SecurityAccess (0x27) sub-functions
pub mod security_sub_function {
    pub const REQUEST_SEED: u8 = 0x01;
    pub const SEND_KEY: u8 = 0x02;
}

/// Positive response ID for a service
pub fn positive_response_id(service_id: u8) -> u8 {
    service_id.wrapping_add(POSITIVE_RESPONSE_OFFSET)
}

/// Read a big-endian 16-bit value from the first two payload bytes
///
/// Returns `None` when fewer than two bytes are present.
pub fn read_u16_be(payload: &[u8]) -> Option<u16> {
    match payload {
        [hi, lo, ..] => Some(u16::from_be_bytes([*hi, *lo])),
        _ => None,
    }
}
