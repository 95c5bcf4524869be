//! vnsim-uds - simulated ECU answering a subset of UDS (ISO 14229)
//!
//! One [`DiagnosticEngine`] holds the session/security state machine and the
//! static fault memory and identification tables. Testers submit
//! [`DiagnosticRequest`]s and receive [`DiagnosticResponse`]s.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────┐
//! │               DiagnosticEngine                │
//! │                                               │
//! │  ┌──────────────────┐  ┌───────────────────┐  │
//! │  │DiagnosticSession │  │ DtcTable/DidTable │  │
//! │  │ (mutex, shared)  │  │ (immutable)       │  │
//! │  └──────────────────┘  └───────────────────┘  │
//! │                                               │
//! │  0x10 session   0x14 clear   0x19 read DTC    │
//! │  0x22 read DID  0x27 security access          │
//! └───────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod dtc;
pub mod engine;
pub mod message;
pub mod session;
pub mod tables;
pub mod uds;

pub use config::{EcuConfig, EcuConfigError, SecurityConfig};
pub use dtc::{DtcCategory, DtcRecord, DtcStatus};
pub use engine::{DiagnosticEngine, EcuSnapshot};
pub use message::{DiagnosticRequest, DiagnosticResponse};
pub use session::{DiagnosticSession, SecurityLevel, SessionType};
pub use tables::{DidRecord, DidTable, DtcTable};
pub use uds::{NegativeResponseCode, UdsError};
