use crate::errors::MsgenError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Status of a Microsoft Genomics workflow.
///
/// ```text
/// Queued -> Working -> Success | Failed
/// Queued | Working -> Cancelling -> Cancelled
/// ```
///
/// The numeric codes are defined by the service. Any code outside this set
/// fails decoding rather than being mapped to a catch-all variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum WorkflowStatus {
    Queued,
    Working,
    Success,
    Failed,
    Cancelling,
    Cancelled,
}

impl WorkflowStatus {
    pub const ALL: [WorkflowStatus; 6] = [
        WorkflowStatus::Queued,
        WorkflowStatus::Working,
        WorkflowStatus::Success,
        WorkflowStatus::Failed,
        WorkflowStatus::Cancelling,
        WorkflowStatus::Cancelled,
    ];

    pub fn code(self) -> u32 {
        match self {
            WorkflowStatus::Queued => 1000,
            WorkflowStatus::Working => 10000,
            WorkflowStatus::Success => 20000,
            WorkflowStatus::Failed => 50000,
            WorkflowStatus::Cancelling => 58000,
            WorkflowStatus::Cancelled => 60000,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            WorkflowStatus::Queued => "queued",
            WorkflowStatus::Working => "working",
            WorkflowStatus::Success => "success",
            WorkflowStatus::Failed => "failed",
            WorkflowStatus::Cancelling => "cancelling",
            WorkflowStatus::Cancelled => "cancelled",
        }
    }

    /// No further transition happens from a terminal status
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            WorkflowStatus::Success | WorkflowStatus::Failed | WorkflowStatus::Cancelled
        )
    }

    /// Terminal, but not a success
    pub fn is_unsuccessful(self) -> bool {
        matches!(self, WorkflowStatus::Failed | WorkflowStatus::Cancelled)
    }

    /// Whether the service may move a workflow from `self` to `next`.
    ///
    /// Observing the same status twice is always allowed.
    pub fn can_transition_to(self, next: WorkflowStatus) -> bool {
        use WorkflowStatus::*;

        if self == next {
            return true;
        }

        match self {
            Queued => matches!(next, Working | Success | Failed | Cancelling | Cancelled),
            Working => matches!(next, Success | Failed | Cancelling | Cancelled),
            Cancelling => matches!(next, Cancelled),
            Success | Failed | Cancelled => false,
        }
    }
}

impl TryFrom<u32> for WorkflowStatus {
    type Error = MsgenError;

    fn try_from(code: u32) -> Result<Self, Self::Error> {
        WorkflowStatus::ALL
            .into_iter()
            .find(|status| status.code() == code)
            .ok_or(MsgenError::UnknownStatus(code))
    }
}

impl From<WorkflowStatus> for u32 {
    fn from(status: WorkflowStatus) -> Self {
        status.code()
    }
}

impl fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
