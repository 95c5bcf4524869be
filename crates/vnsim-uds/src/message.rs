//! Diagnostic request/response messages exchanged with testers

use serde::{Deserialize, Serialize};

use crate::uds::{positive_response_id, service_id, UdsError};

/// A diagnostic request as sent by a tester
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticRequest {
    pub service_id: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_function: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Vec<u8>>,
    /// Tester-chosen correlation ID, echoed in the response
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<u64>,
}

impl DiagnosticRequest {
    pub fn new(service_id: u8) -> Self {
        Self {
            service_id,
            ..Default::default()
        }
    }

    pub fn with_sub_function(mut self, sub_function: u8) -> Self {
        self.sub_function = Some(sub_function);
        self
    }

    pub fn with_payload(mut self, payload: impl Into<Vec<u8>>) -> Self {
        self.payload = Some(payload.into());
        self
    }

    pub fn with_request_id(mut self, request_id: u64) -> Self {
        self.request_id = Some(request_id);
        self
    }

    /// Payload bytes, empty when none were sent
    pub fn payload_bytes(&self) -> &[u8] {
        self.payload.as_deref().unwrap_or(&[])
    }
}

/// A diagnostic response delivered back to the requesting tester
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticResponse {
    /// Request service ID + 0x40, or 0x7F for a negative response
    pub service_id: u8,
    pub data: Vec<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<u64>,
}

impl DiagnosticResponse {
    /// Create a positive response for a service
    pub fn positive(service_id: u8, data: Vec<u8>) -> Self {
        Self {
            service_id: positive_response_id(service_id),
            data,
            request_id: None,
        }
    }

    /// Create a negative response: `0x7F [service, nrc]`
    pub fn negative(err: &UdsError) -> Self {
        Self {
            service_id: service_id::NEGATIVE_RESPONSE,
            data: vec![err.service_id(), err.nrc().into()],
            request_id: None,
        }
    }

    pub fn with_request_id(mut self, request_id: Option<u64>) -> Self {
        self.request_id = request_id;
        self
    }

    pub fn is_negative(&self) -> bool {
        self.service_id == service_id::NEGATIVE_RESPONSE
    }
}
