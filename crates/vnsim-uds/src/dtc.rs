//! DTC (Diagnostic Trouble Code) records for the simulated ECU
//!
//! Codes use the familiar five-character form (`P0301`, `U0100`). On the wire
//! the simulator reports only the four trailing hex digits as a 16-bit number,
//! so `P0301` is sent as `03 01` followed by its status byte.

use serde::Serialize;
use thiserror::Error;

/// DTC status byte bit definitions per ISO 14229-1
pub mod status_bit {
    /// Bit 0: Test Failed
    pub const TEST_FAILED: u8 = 0x01;
    /// Bit 1: Test Failed This Operation Cycle
    pub const TEST_FAILED_THIS_OPERATION_CYCLE: u8 = 0x02;
    /// Bit 2: Pending DTC
    pub const PENDING_DTC: u8 = 0x04;
    /// Bit 3: Confirmed DTC
    pub const CONFIRMED_DTC: u8 = 0x08;
    /// Bit 4: Test Not Completed Since Last Clear
    pub const TEST_NOT_COMPLETED_SINCE_LAST_CLEAR: u8 = 0x10;
    /// Bit 5: Test Failed Since Last Clear
    pub const TEST_FAILED_SINCE_LAST_CLEAR: u8 = 0x20;
    /// Bit 6: Test Not Completed This Operation Cycle
    pub const TEST_NOT_COMPLETED_THIS_OPERATION_CYCLE: u8 = 0x40;
    /// Bit 7: Warning Indicator Requested
    pub const WARNING_INDICATOR_REQUESTED: u8 = 0x80;

    /// Mask matching every status bit
    pub const ALL: u8 = 0xFF;
}

/// DTC category from the leading letter of the code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DtcCategory {
    /// P codes - Powertrain (engine, transmission)
    Powertrain,
    /// C codes - Chassis (ABS, suspension)
    Chassis,
    /// B codes - Body (airbags, climate control)
    Body,
    /// U codes - Network (communication)
    Network,
}

impl DtcCategory {
    pub fn from_prefix(prefix: char) -> Option<Self> {
        match prefix.to_ascii_uppercase() {
            'P' => Some(DtcCategory::Powertrain),
            'C' => Some(DtcCategory::Chassis),
            'B' => Some(DtcCategory::Body),
            'U' => Some(DtcCategory::Network),
            _ => None,
        }
    }

    pub fn prefix(&self) -> char {
        match self {
            DtcCategory::Powertrain => 'P',
            DtcCategory::Chassis => 'C',
            DtcCategory::Body => 'B',
            DtcCategory::Network => 'U',
        }
    }
}

/// Parsed DTC status byte
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DtcStatus {
    pub test_failed: bool,
    pub test_failed_this_operation_cycle: bool,
    pub pending_dtc: bool,
    pub confirmed_dtc: bool,
    pub test_not_completed_since_last_clear: bool,
    pub test_failed_since_last_clear: bool,
    pub test_not_completed_this_operation_cycle: bool,
    pub warning_indicator_requested: bool,
    /// Raw status byte value
    pub raw: u8,
}

impl DtcStatus {
    pub fn from_byte(status: u8) -> Self {
        let bit = |mask: u8| status & mask != 0;
        Self {
            test_failed: bit(status_bit::TEST_FAILED),
            test_failed_this_operation_cycle: bit(status_bit::TEST_FAILED_THIS_OPERATION_CYCLE),
            pending_dtc: bit(status_bit::PENDING_DTC),
            confirmed_dtc: bit(status_bit::CONFIRMED_DTC),
            test_not_completed_since_last_clear: bit(
                status_bit::TEST_NOT_COMPLETED_SINCE_LAST_CLEAR,
            ),
            test_failed_since_last_clear: bit(status_bit::TEST_FAILED_SINCE_LAST_CLEAR),
            test_not_completed_this_operation_cycle: bit(
                status_bit::TEST_NOT_COMPLETED_THIS_OPERATION_CYCLE,
            ),
            warning_indicator_requested: bit(status_bit::WARNING_INDICATOR_REQUESTED),
            raw: status,
        }
    }

    /// Test failed and confirmed
    pub fn is_active(&self) -> bool {
        self.test_failed && self.confirmed_dtc
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DtcCodeError {
    #[error("DTC code must be 5 characters, got {0:?}")]
    Length(String),
    #[error("DTC code {0:?} must start with P, C, B or U")]
    Category(String),
    #[error("DTC code {0:?} must end in four hex digits")]
    Digits(String),
}

/// A stored trouble code
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DtcRecord {
    code: String,
    number: u16,
    category: DtcCategory,
    pub status: u8,
    pub description: String,
    pub system: String,
}

impl DtcRecord {
    /// Build a record, validating the code format
    pub fn new(
        code: &str,
        status: u8,
        description: impl Into<String>,
        system: impl Into<String>,
    ) -> Result<Self, DtcCodeError> {
        let code = code.trim().to_ascii_uppercase();
        if code.len() != 5 || !code.is_ascii() {
            return Err(DtcCodeError::Length(code));
        }

        let category = code
            .chars()
            .next()
            .and_then(DtcCategory::from_prefix)
            .ok_or_else(|| DtcCodeError::Category(code.clone()))?;
        let digits = &code[1..];
        if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(DtcCodeError::Digits(code));
        }
        let number =
            u16::from_str_radix(digits, 16).map_err(|_| DtcCodeError::Digits(code.clone()))?;

        Ok(Self {
            code,
            number,
            category,
            status,
            description: description.into(),
            system: system.into(),
        })
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    /// 16-bit number reported on the wire
    pub fn number(&self) -> u16 {
        self.number
    }

    pub fn category(&self) -> DtcCategory {
        self.category
    }

    pub fn decoded_status(&self) -> DtcStatus {
        DtcStatus::from_byte(self.status)
    }

    pub fn matches_mask(&self, mask: u8) -> bool {
        (self.status & mask) != 0
    }

    /// `[number_hi, number_lo, status]`
    pub fn wire_record(&self) -> [u8; 3] {
        let [hi, lo] = self.number.to_be_bytes();
        [hi, lo, self.status]
    }
}
