//! Error types for the provision workflow.

use std::time::Duration;

use thiserror::Error;

use crate::cloud::ApiError;
use crate::wait::WaitError;

use super::ProvisionStage;

/// Errors raised while provisioning. Each names the stage that was being
/// advanced to when the workflow halted.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum ProvisionError {
    /// A remote call returned an error other than "already exists".
    #[error("provisioning failed before {stage}: {source}")]
    RemoteCall {
        /// Stage that was not reached.
        stage: ProvisionStage,
        /// Error returned by the control plane.
        #[source]
        source: ApiError,
    },
    /// An asynchronous operation finished with an error payload.
    #[error("provisioning failed before {stage}: operation {operation} reported {details}")]
    RemoteOperationFailed {
        /// Stage that was not reached.
        stage: ProvisionStage,
        /// Operation name.
        operation: String,
        /// Error payload reported by the service.
        details: String,
    },
    /// A wait exceeded its deadline.
    #[error("provisioning failed before {stage}: timed out after {waited:?} waiting for {what}")]
    Timeout {
        /// Stage that was not reached.
        stage: ProvisionStage,
        /// Description of the awaited condition.
        what: String,
        /// Configured deadline.
        waited: Duration,
    },
}

impl ProvisionError {
    /// Returns the stage the workflow failed to reach.
    #[must_use]
    pub const fn stage(&self) -> ProvisionStage {
        match self {
            Self::RemoteCall { stage, .. }
            | Self::RemoteOperationFailed { stage, .. }
            | Self::Timeout { stage, .. } => *stage,
        }
    }

    pub(super) fn remote(stage: ProvisionStage) -> impl FnOnce(ApiError) -> Self {
        move |source| Self::RemoteCall { stage, source }
    }

    pub(super) fn waiting(stage: ProvisionStage) -> impl FnOnce(WaitError) -> Self {
        move |err| match err {
            WaitError::OperationFailed { operation, details } => Self::RemoteOperationFailed {
                stage,
                operation,
                details,
            },
            WaitError::Timeout { what, waited } => Self::Timeout {
                stage,
                what,
                waited,
            },
            WaitError::Remote(source) => Self::RemoteCall { stage, source },
        }
    }
}
