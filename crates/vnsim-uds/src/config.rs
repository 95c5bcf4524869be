//! Simulated ECU configuration
//!
//! Everything is optional: an empty configuration yields the built-in DTC and
//! DID tables with unlimited security-access attempts.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::dtc::{DtcCodeError, DtcRecord};
use crate::tables::{default_dids, default_dtcs, DidRecord, DidTable, DtcTable};

/// ECU configuration section
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EcuConfig {
    /// Security access configuration
    #[serde(default)]
    pub security: SecurityConfig,

    /// DTC definitions (replace the built-in table when non-empty)
    #[serde(default)]
    pub dtcs: Vec<DtcDef>,

    /// DID definitions (replace the built-in table when non-empty)
    #[serde(default)]
    pub dids: Vec<DidDef>,
}

/// Security access configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// Invalid keys tolerated against one seed before answering
    /// ExceededNumberOfAttempts. Unlimited when unset.
    #[serde(default)]
    pub max_failed_attempts: Option<u32>,
}

/// DTC definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DtcDef {
    /// Five-character code, e.g. "P0301"
    pub code: String,
    /// Status byte ("0x8F" or 143)
    #[serde(deserialize_with = "hex_u8")]
    pub status: u8,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub system: String,
}

/// DID definition; exactly one of `text` or `hex` supplies the value
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DidDef {
    /// Identifier ("0xF190" or 61840)
    #[serde(deserialize_with = "hex_u16")]
    pub did: u16,
    #[serde(default)]
    pub name: String,
    /// ASCII value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Hex-encoded value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hex: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum HexOrInt {
    Int(u64),
    Hex(String),
}

fn parse_hex_or_int<E: serde::de::Error>(value: HexOrInt, max: u64) -> Result<u64, E> {
    let n = match value {
        HexOrInt::Int(n) => n,
        HexOrInt::Hex(s) => {
            let s = s.trim();
            let digits = s
                .strip_prefix("0x")
                .or_else(|| s.strip_prefix("0X"))
                .unwrap_or(s);
            u64::from_str_radix(digits, 16).map_err(|e| E::custom(format!("{s:?}: {e}")))?
        }
    };
    if n > max {
        return Err(E::custom(format!("value 0x{n:X} exceeds 0x{max:X}")));
    }
    Ok(n)
}

fn hex_u8<'de, D: serde::Deserializer<'de>>(deserializer: D) -> Result<u8, D::Error> {
    let n = parse_hex_or_int(HexOrInt::deserialize(deserializer)?, u8::MAX as u64)?;
    Ok(n as u8)
}

fn hex_u16<'de, D: serde::Deserializer<'de>>(deserializer: D) -> Result<u16, D::Error> {
    let n = parse_hex_or_int(HexOrInt::deserialize(deserializer)?, u16::MAX as u64)?;
    Ok(n as u16)
}

#[derive(Debug, Error)]
pub enum EcuConfigError {
    #[error("Invalid DTC: {0}")]
    Dtc(#[from] DtcCodeError),

    #[error("DID 0x{0:04X} must define exactly one of `text` or `hex`")]
    DidValue(u16),

    #[error("DID 0x{did:04X} has invalid hex value: {source}")]
    DidHex {
        did: u16,
        #[source]
        source: hex::FromHexError,
    },
}

impl DidDef {
    fn to_record(&self) -> Result<DidRecord, EcuConfigError> {
        let value = match (&self.text, &self.hex) {
            (Some(text), None) => text.as_bytes().to_vec(),
            (None, Some(hex_str)) => {
                let cleaned: String = hex_str.chars().filter(|c| !c.is_whitespace()).collect();
                hex::decode(cleaned).map_err(|source| EcuConfigError::DidHex {
                    did: self.did,
                    source,
                })?
            }
            _ => return Err(EcuConfigError::DidValue(self.did)),
        };
        Ok(DidRecord::new(self.did, self.name.clone(), value))
    }
}

impl EcuConfig {
    /// Build the DTC table, falling back to the built-in one
    pub fn dtc_table(&self) -> Result<DtcTable, EcuConfigError> {
        if self.dtcs.is_empty() {
            return Ok(default_dtcs());
        }
        let records = self
            .dtcs
            .iter()
            .map(|d| DtcRecord::new(&d.code, d.status, d.description.clone(), d.system.clone()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(DtcTable::new(records))
    }

    /// Build the DID table, falling back to the built-in one
    pub fn did_table(&self) -> Result<DidTable, EcuConfigError> {
        if self.dids.is_empty() {
            return Ok(default_dids());
        }
        let records = self
            .dids
            .iter()
            .map(DidDef::to_record)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(DidTable::new(records))
    }
}
