use crate::errors::MsgenError;
use crate::workflows::WorkflowStatus;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// Server-assigned workflow identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkflowId(pub u64);

impl fmt::Display for WorkflowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for WorkflowId {
    type Err = MsgenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().parse::<u64>() {
            Ok(id) if id > 0 => Ok(WorkflowId(id)),
            _ => Err(MsgenError::InvalidWorkflowId(s.to_string())),
        }
    }
}

/// A workflow as reported by the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Workflow {
    pub id: WorkflowId,
    pub tenant_id: i64,
    pub status: WorkflowStatus,
    pub created_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub failure_code: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub message: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub process: String,
    #[serde(default)]
    pub bases_processed: u64,
}

impl Workflow {
    /// Wall-clock time, measured up to now while the workflow is still running
    pub fn duration(&self) -> Duration {
        self.duration_at(Utc::now())
    }

    pub fn duration_at(&self, now: DateTime<Utc>) -> Duration {
        self.end_date.unwrap_or(now) - self.created_date
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// Storage backend for workflow inputs and outputs.
///
/// Only block blobs exist today, but the field is part of the request shape.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum StorageKind {
    #[default]
    #[serde(rename = "AZURE_BLOCK_BLOB")]
    AzureBlockBlob,
}

/// GATK HaplotypeCaller `--emit-ref-confidence` mode
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReferenceConfidenceMode {
    #[default]
    None,
    BpResolution,
    Gvcf,
}

impl ReferenceConfidenceMode {
    pub fn as_str(self) -> &'static str {
        match self {
            ReferenceConfidenceMode::None => "NONE",
            ReferenceConfidenceMode::BpResolution => "BP_RESOLUTION",
            ReferenceConfidenceMode::Gvcf => "GVCF",
        }
    }
}

impl FromStr for ReferenceConfidenceMode {
    type Err = MsgenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NONE" => Ok(ReferenceConfidenceMode::None),
            "BP_RESOLUTION" => Ok(ReferenceConfidenceMode::BpResolution),
            "GVCF" => Ok(ReferenceConfidenceMode::Gvcf),
            _ => Err(MsgenError::InvalidReferenceConfidenceMode(s.to_string())),
        }
    }
}

impl fmt::Display for ReferenceConfidenceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewWorkflowInputArgs {
    #[serde(rename = "ACCOUNT")]
    pub account_name: String,
    #[serde(rename = "CONTAINER")]
    pub container_name: String,
    #[serde(rename = "BLOBNAMES")]
    pub blob_names: String,
    #[serde(rename = "BLOBNAMES_WITH_SAS")]
    pub blob_names_with_sas: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewWorkflowOutputArgs {
    #[serde(rename = "ACCOUNT")]
    pub account_name: String,
    #[serde(rename = "CONTAINER")]
    pub container_name: String,
    #[serde(rename = "CONTAINER_SAS")]
    pub container_sas: String,
    #[serde(rename = "OUTPUT_FILENAME_BASE")]
    pub basename: String,
    #[serde(rename = "OVERWRITE")]
    pub overwrite: bool,
    #[serde(rename = "OUTPUT_INCLUDE_LOGFILES")]
    pub include_logfiles: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NewWorkflowOptionalArgs {
    pub gatk_emit_ref_confidence: ReferenceConfidenceMode,
    pub bgzip_output: bool,
}

/// Request body for `POST /api/workflows`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NewWorkflow {
    pub workflow_class: String,
    pub process: String,
    pub process_args: String,
    pub description: String,
    pub input_storage_type: StorageKind,
    pub input_args: NewWorkflowInputArgs,
    pub output_storage_type: StorageKind,
    pub output_args: NewWorkflowOutputArgs,
    pub optional_args: NewWorkflowOptionalArgs,
    pub ignore_azure_region: bool,
}
