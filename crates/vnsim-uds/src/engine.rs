//! Diagnostic service engine
//!
//! Answers the five UDS services of the simulated ECU against one shared
//! session. Every tester talks to the same engine, so a seed requested by one
//! connection can be answered by another.

use parking_lot::Mutex;
use rand::Rng;
use serde::Serialize;
use tracing::{debug, info};

use crate::config::{EcuConfig, EcuConfigError};
use crate::dtc::{status_bit, DtcCategory, DtcStatus};
use crate::message::{DiagnosticRequest, DiagnosticResponse};
use crate::session::{DiagnosticSession, SecurityLevel, SessionType};
use crate::tables::{DidTable, DtcTable, HEALTHY_SYSTEMS};
use crate::uds::{
    dtc_sub_function, read_u16_be, security_sub_function, service_id, NegativeResponseCode,
    UdsError,
};

/// P2 server timing reported by session control (50 ms)
const P2_SERVER_MAX: u16 = 50;
/// P2* server timing in 10 ms units (5 s)
const P2_STAR_SERVER_MAX: u16 = 500;

/// Freeze frame attached to the first DTC:
/// RPM (0x0C) = 4096, vehicle speed (0x0D) = 60 km/h, coolant (0x05) = 80 °C
const FREEZE_FRAME: [u8; 10] = [0x01, 0x0C, 0x10, 0x00, 0x01, 0x0D, 0x3C, 0x01, 0x05, 0x50];

/// The simulated ECU
pub struct DiagnosticEngine {
    state: Mutex<DiagnosticSession>,
    dtcs: DtcTable,
    dids: DidTable,
    max_failed_attempts: Option<u32>,
}

impl DiagnosticEngine {
    pub fn new(dtcs: DtcTable, dids: DidTable) -> Self {
        Self {
            state: Mutex::new(DiagnosticSession::default()),
            dtcs,
            dids,
            max_failed_attempts: None,
        }
    }

    /// Build an engine from configuration
    pub fn from_config(config: &EcuConfig) -> Result<Self, EcuConfigError> {
        let engine = Self::new(config.dtc_table()?, config.did_table()?)
            .with_max_failed_attempts(config.security.max_failed_attempts);
        info!(
            dtcs = engine.dtcs.len(),
            dids = engine.dids.len(),
            max_failed_attempts = ?engine.max_failed_attempts,
            "Diagnostic engine ready"
        );
        Ok(engine)
    }

    /// Limit invalid keys per seed; `None` allows unlimited guesses
    pub fn with_max_failed_attempts(mut self, max: Option<u32>) -> Self {
        self.max_failed_attempts = max;
        self
    }

    /// Process a request, returning the positive response or the typed NRC
    pub fn process(&self, request: &DiagnosticRequest) -> Result<DiagnosticResponse, UdsError> {
        let sid = request.service_id;
        debug!(
            service = format!("0x{:02X}", sid),
            sub_function = ?request.sub_function.map(|s| format!("0x{:02X}", s)),
            payload_len = request.payload_bytes().len(),
            "Processing diagnostic request"
        );

        let data = match sid {
            service_id::DIAGNOSTIC_SESSION_CONTROL => self.handle_session_control(request)?,
            service_id::CLEAR_DIAGNOSTIC_INFO => self.handle_clear_dtc(),
            service_id::READ_DTC_INFO => self.handle_read_dtc_info(request)?,
            service_id::READ_DATA_BY_ID => self.handle_read_data_by_id(request)?,
            service_id::SECURITY_ACCESS => self.handle_security_access(request)?,
            _ => {
                debug!(service = format!("0x{:02X}", sid), "Service not supported");
                return Err(UdsError::negative(
                    sid,
                    NegativeResponseCode::ServiceNotSupported,
                ));
            }
        };

        Ok(DiagnosticResponse::positive(sid, data))
    }

    /// Process a request into the response sent on the wire
    ///
    /// Negative outcomes become `0x7F [sid, nrc]`; the request ID is echoed.
    pub fn respond(&self, request: &DiagnosticRequest) -> DiagnosticResponse {
        let response = match self.process(request) {
            Ok(response) => response,
            Err(err) => {
                debug!(error = %err, "Negative response");
                DiagnosticResponse::negative(&err)
            }
        };
        response.with_request_id(request.request_id)
    }

    /// Copy of the current session state
    pub fn session(&self) -> DiagnosticSession {
        self.state.lock().clone()
    }

    /// Inspection view of the ECU
    pub fn snapshot(&self) -> EcuSnapshot {
        let state = self.state.lock();
        EcuSnapshot {
            session: state.session,
            security_level: state.security_level,
            seed_pending: state.pending_seed.is_some(),
            dtcs: self
                .dtcs
                .iter()
                .map(|dtc| DtcSummary {
                    code: dtc.code().to_string(),
                    category: dtc.category(),
                    status: dtc.decoded_status(),
                    description: dtc.description.clone(),
                    system: dtc.system.clone(),
                })
                .collect(),
            dids: self
                .dids
                .iter()
                .map(|did| DidSummary {
                    did: format!("0x{:04X}", did.did),
                    name: did.name.clone(),
                })
                .collect(),
            healthy_systems: HEALTHY_SYSTEMS.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn handle_session_control(&self, request: &DiagnosticRequest) -> Result<Vec<u8>, UdsError> {
        let sid = service_id::DIAGNOSTIC_SESSION_CONTROL;
        let requested = request.sub_function.ok_or_else(|| {
            UdsError::negative(sid, NegativeResponseCode::SubFunctionNotSupported)
        })?;

        let Some(session) = SessionType::from_byte(requested) else {
            debug!(
                session = format!("0x{:02X}", requested),
                "Unsupported session type"
            );
            return Err(UdsError::negative(
                sid,
                NegativeResponseCode::SubFunctionNotSupported,
            ));
        };

        let relocked = self.state.lock().enter(session);
        if relocked {
            info!("Default session: security access reset to locked");
        }
        info!(session = format!("0x{:02X}", requested), "Session changed");

        let [p2_hi, p2_lo] = P2_SERVER_MAX.to_be_bytes();
        let [p2s_hi, p2s_lo] = P2_STAR_SERVER_MAX.to_be_bytes();
        Ok(vec![requested, p2_hi, p2_lo, p2s_hi, p2s_lo])
    }

    fn handle_clear_dtc(&self) -> Vec<u8> {
        // Acknowledged only; the fault memory is static
        info!(dtcs = self.dtcs.len(), "Clear diagnostic information acknowledged");
        vec![0x00]
    }

    fn handle_read_dtc_info(&self, request: &DiagnosticRequest) -> Result<Vec<u8>, UdsError> {
        let sid = service_id::READ_DTC_INFO;
        let sub_function = request.sub_function.ok_or_else(|| {
            UdsError::negative(sid, NegativeResponseCode::SubFunctionNotSupported)
        })?;

        let mut data = vec![sub_function];
        match sub_function {
            dtc_sub_function::REPORT_DTC_BY_STATUS_MASK => {
                let mask = request
                    .payload_bytes()
                    .first()
                    .copied()
                    .unwrap_or(status_bit::ALL);
                for dtc in self.dtcs.matching(mask) {
                    data.extend_from_slice(&dtc.wire_record());
                }
                debug!(
                    mask = format!("0x{:02X}", mask),
                    count = (data.len() - 1) / 3,
                    "Reporting DTCs by status mask"
                );
            }
            dtc_sub_function::REPORT_DTC_SNAPSHOT_RECORD => {
                if let Some(dtc) = self.dtcs.first() {
                    data.extend_from_slice(&dtc.number().to_be_bytes());
                    data.extend_from_slice(&FREEZE_FRAME);
                    debug!(dtc = dtc.code(), "Reporting freeze frame");
                }
            }
            dtc_sub_function::REPORT_SUPPORTED_DTC => {
                for dtc in self.dtcs.iter() {
                    data.extend_from_slice(&dtc.wire_record());
                }
                debug!(count = self.dtcs.len(), "Reporting supported DTCs");
            }
            _ => {
                debug!(
                    sub_function = format!("0x{:02X}", sub_function),
                    "Unsupported ReadDTCInformation sub-function"
                );
                return Err(UdsError::negative(
                    sid,
                    NegativeResponseCode::SubFunctionNotSupported,
                ));
            }
        }
        Ok(data)
    }

    fn handle_read_data_by_id(&self, request: &DiagnosticRequest) -> Result<Vec<u8>, UdsError> {
        let sid = service_id::READ_DATA_BY_ID;
        let did = read_u16_be(request.payload_bytes()).ok_or_else(|| {
            UdsError::negative(sid, NegativeResponseCode::IncorrectMessageLengthOrFormat)
        })?;

        let Some(record) = self.dids.get(did) else {
            debug!(did = format!("0x{:04X}", did), "DID not supported");
            return Err(UdsError::negative(
                sid,
                NegativeResponseCode::RequestOutOfRange,
            ));
        };

        debug!(did = format!("0x{:04X}", did), name = %record.name, "Reading DID");
        let mut data = did.to_be_bytes().to_vec();
        data.extend_from_slice(&record.value);
        Ok(data)
    }

    fn handle_security_access(&self, request: &DiagnosticRequest) -> Result<Vec<u8>, UdsError> {
        let sid = service_id::SECURITY_ACCESS;
        match request.sub_function {
            Some(security_sub_function::REQUEST_SEED) => {
                let seed: u16 = rand::thread_rng().gen();
                self.state.lock().issue_seed(seed);
                info!(seed = format!("0x{:04X}", seed), "Security access: providing seed");

                let [hi, lo] = seed.to_be_bytes();
                Ok(vec![security_sub_function::REQUEST_SEED, hi, lo])
            }
            Some(security_sub_function::SEND_KEY) => {
                let mut state = self.state.lock();
                if state.pending_seed.is_none() {
                    debug!("Security access: key sent without a seed");
                    return Err(UdsError::negative(
                        sid,
                        NegativeResponseCode::RequestSequenceError,
                    ));
                }

                let key = read_u16_be(request.payload_bytes()).ok_or_else(|| {
                    UdsError::negative(sid, NegativeResponseCode::IncorrectMessageLengthOrFormat)
                })?;

                if key == state.expected_key {
                    state.unlock();
                    info!("Security access: key accepted");
                    return Ok(vec![security_sub_function::SEND_KEY]);
                }

                state.failed_attempts += 1;
                if let Some(max) = self.max_failed_attempts {
                    if state.failed_attempts >= max {
                        state.reset_seed();
                        info!(
                            attempts = max,
                            "Security access: attempts exceeded, seed discarded"
                        );
                        return Err(UdsError::negative(
                            sid,
                            NegativeResponseCode::ExceededNumberOfAttempts,
                        ));
                    }
                }

                info!(
                    received = format!("0x{:04X}", key),
                    attempts = state.failed_attempts,
                    "Security access: invalid key (NRC 0x35)"
                );
                Err(UdsError::negative(sid, NegativeResponseCode::InvalidKey))
            }
            other => {
                debug!(sub_function = ?other, "Unsupported security access sub-function");
                Err(UdsError::negative(
                    sid,
                    NegativeResponseCode::SubFunctionNotSupported,
                ))
            }
        }
    }
}

/// JSON view of the ECU state for inspection
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EcuSnapshot {
    pub session: SessionType,
    pub security_level: SecurityLevel,
    pub seed_pending: bool,
    pub dtcs: Vec<DtcSummary>,
    pub dids: Vec<DidSummary>,
    pub healthy_systems: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DtcSummary {
    pub code: String,
    pub category: DtcCategory,
    pub status: DtcStatus,
    pub description: String,
    pub system: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DidSummary {
    pub did: String,
    pub name: String,
}
