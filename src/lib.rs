// msgenctl - Microsoft Genomics workflow client
// Exposes the core components for the binary and for integration tests

pub mod cli;
pub mod config;
pub mod errors;
pub mod http;
pub mod storage;
pub mod telemetry;
pub mod workflows;

// Re-export key types for easy access
pub use config::{MsgenctlSettings, ServiceConfig, SettingsOverrides, SubmitConfig};
pub use errors::{MsgenError, Result};
pub use http::{RetryConfig, ServiceClient};
pub use storage::{ConnectionString, SasPermissions, SasSigner, StorageCredential};
pub use telemetry::{create_operation_span, generate_correlation_id, init_telemetry, LogFormat};
pub use workflows::{
    build_payload, Poller, WaitOptions, Workflow, WorkflowId, WorkflowRepository, WorkflowStatus,
    WorkflowsClient,
};
