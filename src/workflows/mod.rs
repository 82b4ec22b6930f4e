// Workflow model, submission and polling

pub mod payload;
pub mod poller;
pub mod repository;
pub mod status;
pub mod types;

pub use payload::build_payload;
pub use poller::{Poller, WaitOptions};
#[cfg(any(test, feature = "testing"))]
pub use repository::MockWorkflowRepository;
pub use repository::{WorkflowRepository, WorkflowsClient};
pub use status::WorkflowStatus;
pub use types::{
    NewWorkflow, NewWorkflowInputArgs, NewWorkflowOptionalArgs, NewWorkflowOutputArgs,
    ReferenceConfidenceMode, StorageKind, Workflow, WorkflowId,
};
