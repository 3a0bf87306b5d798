//! Response envelope returned for an executed intent.

use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::error::{OvsdbBridgeError, OvsdbResult};
use crate::intents::OperationKind;
use crate::registry::BridgeRecord;
use crate::service::NotImplemented;

/// Code reported for declared but unimplemented operations.
pub const NOT_IMPLEMENTED_CODE: &str = "NOT_IMPLEMENTED";

/// Error part of a response.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
}

/// What happened to an intent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Completed,
    Created(BridgeRecord),
    Failed { status: u16, error: ErrorBody },
    NotImplemented,
}

/// Result of one intent, ready to be rendered by a front end.
///
/// Serializes as `{"<success-key>": bool, ...}` where the success key
/// depends on the operation (`bridge-created`, `port-added`, ...).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationResponse {
    pub operation: OperationKind,
    pub outcome: Outcome,
}

impl OperationResponse {
    pub fn completed(operation: OperationKind) -> Self {
        Self {
            operation,
            outcome: Outcome::Completed,
        }
    }

    pub fn created(record: BridgeRecord) -> Self {
        Self {
            operation: OperationKind::CreateBridge,
            outcome: Outcome::Created(record),
        }
    }

    pub fn failed(operation: OperationKind, err: &OvsdbBridgeError) -> Self {
        let kind = err.kind();
        Self {
            operation,
            outcome: Outcome::Failed {
                status: kind.http_status(),
                error: ErrorBody {
                    code: kind.code(),
                    message: err.to_string(),
                },
            },
        }
    }

    pub fn not_implemented(marker: NotImplemented) -> Self {
        Self {
            operation: marker.operation,
            outcome: Outcome::NotImplemented,
        }
    }

    /// Maps a unit result of `operation`.
    pub fn from_result(operation: OperationKind, result: OvsdbResult<()>) -> Self {
        match result {
            Ok(()) => Self::completed(operation),
            Err(e) => Self::failed(operation, &e),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, Outcome::Completed | Outcome::Created(_))
    }

    pub fn http_status(&self) -> u16 {
        match &self.outcome {
            Outcome::Completed | Outcome::Created(_) => 200,
            Outcome::Failed { status, .. } => *status,
            Outcome::NotImplemented => 501,
        }
    }

    pub fn error(&self) -> Option<&ErrorBody> {
        match &self.outcome {
            Outcome::Failed { error, .. } => Some(error),
            _ => None,
        }
    }
}

impl Serialize for OperationResponse {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry(self.operation.success_key(), &self.is_success())?;

        match &self.outcome {
            Outcome::Completed => {}
            Outcome::Created(record) => {
                map.serialize_entry("bridge", record)?;
                if let Some(dpid) = record.datapath_id() {
                    map.serialize_entry("datapath-id", &dpid)?;
                }
            }
            Outcome::Failed { error, .. } => {
                map.serialize_entry("error", error)?;
            }
            Outcome::NotImplemented => {
                let error = ErrorBody {
                    code: NOT_IMPLEMENTED_CODE,
                    message: format!("{} is not implemented", self.operation),
                };
                map.serialize_entry("error", &error)?;
            }
        }

        map.end()
    }
}
