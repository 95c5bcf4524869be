//! Static DTC and DID tables of the simulated ECU

use std::collections::BTreeMap;

use serde::Serialize;

use crate::dtc::DtcRecord;

/// Standard identification DIDs (ISO 14229-1 Annex C)
pub mod standard_did {
    pub const ECU_PART_NUMBER: u16 = 0xF187;
    pub const VIN: u16 = 0xF190;
}

/// A readable data identifier with a fixed value
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DidRecord {
    pub did: u16,
    pub name: String,
    #[serde(serialize_with = "serialize_hex")]
    pub value: Vec<u8>,
}

fn serialize_hex<S: serde::Serializer>(value: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&hex::encode_upper(value))
}

impl DidRecord {
    pub fn new(did: u16, name: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            did,
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Ordered, immutable list of trouble codes
///
/// Order matters: the freeze-frame report always describes the first entry.
#[derive(Debug, Clone, Default)]
pub struct DtcTable {
    records: Vec<DtcRecord>,
}

impl DtcTable {
    pub fn new(records: Vec<DtcRecord>) -> Self {
        Self { records }
    }

    pub fn iter(&self) -> impl Iterator<Item = &DtcRecord> {
        self.records.iter()
    }

    pub fn first(&self) -> Option<&DtcRecord> {
        self.records.first()
    }

    pub fn matching(&self, mask: u8) -> impl Iterator<Item = &DtcRecord> {
        self.records.iter().filter(move |d| d.matches_mask(mask))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Data identifiers keyed by DID
#[derive(Debug, Clone, Default)]
pub struct DidTable {
    records: BTreeMap<u16, DidRecord>,
}

impl DidTable {
    pub fn new(records: impl IntoIterator<Item = DidRecord>) -> Self {
        Self {
            records: records.into_iter().map(|r| (r.did, r)).collect(),
        }
    }

    pub fn get(&self, did: u16) -> Option<&DidRecord> {
        self.records.get(&did)
    }

    pub fn iter(&self) -> impl Iterator<Item = &DidRecord> {
        self.records.values()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

const DEFAULT_DTCS: &[(&str, u8, &str, &str)] = &[
    // Active/confirmed
    ("P0301", 0x8F, "Cylinder 1 Misfire Detected", "Engine"),
    ("U0100", 0x8F, "Lost Communication With ECM/PCM A", "Network"),
    ("C0035", 0x89, "Left Front Wheel Speed Sensor Circuit", "ABS"),
    // Pending
    ("P0420", 0x06, "Catalyst System Efficiency Below Threshold", "Emissions"),
    ("P0171", 0x04, "System Too Lean (Bank 1)", "Fuel"),
    // Permanent (emissions related)
    ("P0442", 0x28, "EVAP System Leak Detected (Small Leak)", "Emissions"),
    // Historical
    (
        "P0128",
        0x20,
        "Coolant Thermostat (Coolant Temp Below Thermostat Regulating Temp)",
        "Cooling",
    ),
    ("B0001", 0x20, "Driver Airbag Circuit Short to Ground", "Airbag"),
];

/// The built-in fault memory
pub fn default_dtcs() -> DtcTable {
    DtcTable::new(
        DEFAULT_DTCS
            .iter()
            .filter_map(|(code, status, description, system)| {
                DtcRecord::new(code, *status, *description, *system).ok()
            })
            .collect(),
    )
}

/// The built-in identification DIDs
pub fn default_dids() -> DidTable {
    DidTable::new([
        DidRecord::new(standard_did::VIN, "VIN", b"WBA12345678901234".to_vec()),
        DidRecord::new(
            standard_did::ECU_PART_NUMBER,
            "ECU Part Number",
            b"123-456".to_vec(),
        ),
    ])
}

/// Systems reporting no faults
pub const HEALTHY_SYSTEMS: &[&str] = &[
    "Transmission Control Module",
    "Body Control Module",
    "Climate Control System",
    "Instrument Cluster",
    "Power Steering Control",
    "Tire Pressure Monitoring System",
    "Parking Assist System",
];
