use crate::workflows::{WorkflowId, WorkflowStatus};
use std::time::Duration;
use thiserror::Error;

pub type Result<T, E = MsgenError> = std::result::Result<T, E>;

/// Errors raised by the msgenctl core.
///
/// Configuration variants are produced before any network call is made;
/// transport and decoding variants come from talking to the service;
/// `WorkflowUnsuccessful` is the only one that describes a remote outcome
/// rather than a client-side failure.
#[derive(Debug, Error)]
pub enum MsgenError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Missing required setting: {0}")]
    MissingSetting(String),

    #[error("Invalid setting {key}: {reason}")]
    InvalidSetting { key: String, reason: String },

    #[error("Invalid account key for storage account {account}: {source}")]
    InvalidAccountKey {
        account: String,
        #[source]
        source: base64::DecodeError,
    },

    #[error("Invalid connection string: {0}")]
    InvalidConnectionString(String),

    #[error("Invalid reference confidence mode: {0:?}")]
    InvalidReferenceConfidenceMode(String),

    #[error("Invalid workflow ID: {0:?}")]
    InvalidWorkflowId(String),

    #[error("Failed to sign shared access signature: {0}")]
    Signing(String),

    #[error("Failed to encode request payload: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest_middleware::Error),

    #[error("Unexpected response ({status}):\n{response}")]
    UnexpectedResponse {
        status: reqwest::StatusCode,
        response: String,
    },

    #[error("Failed to decode response from {endpoint}: {source}")]
    Decode {
        endpoint: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Unknown workflow status code: {0}")]
    UnknownStatus(u32),

    #[error("Workflow {id} unsuccessful: {}: {message}", .status.code())]
    WorkflowUnsuccessful {
        id: WorkflowId,
        status: WorkflowStatus,
        message: String,
    },

    #[error("Gave up waiting on workflow {id} after {attempts} attempts ({elapsed:?})")]
    WaitLimitExceeded {
        id: WorkflowId,
        attempts: u32,
        elapsed: Duration,
    },

    #[error("Wait on workflow {0} was cancelled")]
    WaitCancelled(WorkflowId),
}

impl From<reqwest::Error> for MsgenError {
    fn from(err: reqwest::Error) -> Self {
        MsgenError::Http(reqwest_middleware::Error::Reqwest(err))
    }
}

impl MsgenError {
    /// Whether the error was raised before reaching the service
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            MsgenError::Config(_)
                | MsgenError::MissingSetting(_)
                | MsgenError::InvalidSetting { .. }
                | MsgenError::InvalidAccountKey { .. }
                | MsgenError::InvalidConnectionString(_)
                | MsgenError::InvalidReferenceConfidenceMode(_)
                | MsgenError::InvalidWorkflowId(_)
        )
    }
}
