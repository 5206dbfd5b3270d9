//! Response shapes returned by the Compute Engine and Cloud DNS REST APIs.
//!
//! Only the fields the orchestrator reads are modelled; everything else is
//! ignored during deserialisation.

use serde::Deserialize;

use crate::cloud::{Operation, OperationHandle, OperationStatus};
use crate::resources::ResourceRecordSet;

/// Error envelope used by every Google API.
#[derive(Debug, Deserialize)]
pub(super) struct ErrorEnvelope {
    pub(super) error: ErrorBody,
}

#[derive(Debug, Deserialize)]
pub(super) struct ErrorBody {
    #[serde(default)]
    pub(super) message: String,
}

/// Extracts the service's error message, falling back to the raw body.
pub(super) fn error_details(body: &[u8]) -> String {
    match serde_json::from_slice::<ErrorEnvelope>(body) {
        Ok(envelope) if !envelope.error.message.is_empty() => envelope.error.message,
        _ => String::from_utf8_lossy(body).trim().to_owned(),
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "UPPERCASE")]
pub(super) enum WireStatus {
    Pending,
    Running,
    Done,
}

impl From<WireStatus> for OperationStatus {
    fn from(status: WireStatus) -> Self {
        match status {
            WireStatus::Pending => Self::Pending,
            WireStatus::Running => Self::Running,
            WireStatus::Done => Self::Done,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct WireOperation {
    pub(super) name: String,
    pub(super) status: WireStatus,
    #[serde(default)]
    pub(super) error: Option<WireOperationError>,
}

#[derive(Debug, Deserialize)]
pub(super) struct WireOperationError {
    #[serde(default)]
    errors: Vec<WireOperationErrorItem>,
}

#[derive(Debug, Deserialize)]
struct WireOperationErrorItem {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

impl WireOperationError {
    fn details(&self) -> String {
        let messages: Vec<String> = self
            .errors
            .iter()
            .map(|item| match (item.code.is_empty(), item.message.is_empty()) {
                (false, false) => format!("{}: {}", item.code, item.message),
                (true, false) => item.message.clone(),
                _ => item.code.clone(),
            })
            .filter(|message| !message.is_empty())
            .collect();
        if messages.is_empty() {
            String::from("operation reported an unspecified error")
        } else {
            messages.join("; ")
        }
    }
}

impl WireOperation {
    pub(super) fn into_operation(self, zone: &str) -> Operation {
        Operation {
            status: self.status.into(),
            error: self.error.as_ref().map(WireOperationError::details),
            handle: OperationHandle {
                name: self.name,
                zone: zone.to_owned(),
            },
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct NamedItem {
    pub(super) name: String,
}

/// One page of a Compute Engine list call.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct ListPage {
    #[serde(default)]
    pub(super) items: Vec<NamedItem>,
    #[serde(default)]
    pub(super) next_page_token: Option<String>,
}

/// One page of a Cloud DNS `rrsets.list` call.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct RecordSetPage {
    #[serde(default)]
    pub(super) rrsets: Vec<ResourceRecordSet>,
    #[serde(default)]
    pub(super) next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct WireForwardingRule {
    pub(super) name: String,
    #[serde(rename = "IPAddress", default)]
    pub(super) ip_address: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct WireImage {
    pub(super) self_link: String,
}
