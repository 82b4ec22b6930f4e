use crate::config::SettingsOverrides;
use crate::telemetry::LogFormat;
use crate::workflows::{ReferenceConfidenceMode, WorkflowId};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

pub mod commands;
pub mod output;

#[derive(Parser, Debug)]
#[command(name = "msgenctl", version)]
#[command(about = "Query and send commands to Microsoft Genomics")]
#[command(long_about = "msgenctl submits, queries, cancels and waits on Microsoft Genomics \
                       workflows. Settings can also come from msgenctl.toml, a .env file or \
                       MSGENCTL_* environment variables (e.g. MSGENCTL_SERVICE__BASE_URL).")]
pub struct Cli {
    /// Microsoft Genomics API base URL
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    /// Microsoft Genomics API access key
    #[arg(long, global = true)]
    pub access_key: Option<String>,

    /// Settings file (defaults to msgenctl.toml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log line format on stderr
    #[arg(long, global = true, value_enum)]
    pub log_format: Option<LogFormat>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Submit a new workflow and print its ID
    Submit(SubmitArgs),
    /// Show one workflow, or every workflow oldest first
    Status {
        workflow_id: Option<WorkflowId>,
    },
    /// Request cancellation of a workflow
    Cancel {
        workflow_id: WorkflowId,
    },
    /// Poll until a workflow completes; exits zero only on success
    Wait(WaitArgs),
}

#[derive(Args, Debug, Default)]
pub struct SubmitArgs {
    /// Process name, e.g. snapgatk-20190409_1
    #[arg(long)]
    pub process_name: Option<String>,

    /// Process arguments, e.g. R=hg38m1x
    #[arg(long)]
    pub process_args: Option<String>,

    #[arg(long)]
    pub description: Option<String>,

    /// Azure Storage connection string for the input account
    #[arg(long, conflicts_with_all = ["input_storage_account_name", "input_storage_account_key"])]
    pub input_storage_connection_string: Option<String>,

    #[arg(long)]
    pub input_storage_account_name: Option<String>,

    /// Base64 account key
    #[arg(long)]
    pub input_storage_account_key: Option<String>,

    #[arg(long)]
    pub input_storage_container_name: Option<String>,

    #[arg(long)]
    pub input_blob_name: Option<String>,

    /// Azure Storage connection string for the output account
    #[arg(long, conflicts_with_all = ["output_storage_account_name", "output_storage_account_key"])]
    pub output_storage_connection_string: Option<String>,

    #[arg(long)]
    pub output_storage_account_name: Option<String>,

    /// Base64 account key
    #[arg(long)]
    pub output_storage_account_key: Option<String>,

    #[arg(long)]
    pub output_storage_container_name: Option<String>,

    /// Base name for output files
    #[arg(long)]
    pub output_basename: Option<String>,

    /// Overwrite existing output files
    #[arg(long)]
    pub output_overwrite: bool,

    /// Include log files in the output container (default true)
    #[arg(long, num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    pub output_include_log: Option<bool>,

    /// NONE, BP_RESOLUTION or GVCF
    #[arg(long)]
    pub emit_ref_confidence: Option<ReferenceConfidenceMode>,

    /// Compress VCF/gVCF output with bgzip
    #[arg(long)]
    pub bgzip_output: bool,

    /// Allow processing in a region other than the storage account's
    #[arg(long)]
    pub ignore_azure_region: bool,
}

#[derive(Args, Debug)]
pub struct WaitArgs {
    pub workflow_id: WorkflowId,

    /// Poll interval in seconds (default 60)
    #[arg(long)]
    pub interval: Option<u64>,

    /// Give up after this many polls
    #[arg(long)]
    pub max_attempts: Option<u32>,

    /// Give up after this many seconds
    #[arg(long)]
    pub timeout: Option<u64>,
}

impl Cli {
    /// Flag values that take precedence over every other settings source
    pub fn overrides(&self) -> SettingsOverrides {
        let mut overrides = SettingsOverrides::new();

        overrides
            .set("service.base_url", self.base_url.clone())
            .set("service.access_key", self.access_key.clone())
            .set(
                "logging.format",
                self.log_format.map(|format| format.to_string()),
            );

        match &self.command {
            Commands::Submit(args) => args.apply(&mut overrides),
            Commands::Wait(args) => args.apply(&mut overrides),
            Commands::Status { .. } | Commands::Cancel { .. } => {}
        }

        overrides
    }
}

impl Commands {
    /// Operation name used for the logging span
    pub fn name(&self) -> &'static str {
        match self {
            Commands::Submit(_) => "submit",
            Commands::Status { .. } => "status",
            Commands::Cancel { .. } => "cancel",
            Commands::Wait(_) => "wait",
        }
    }

    pub fn workflow_id(&self) -> Option<WorkflowId> {
        match self {
            Commands::Submit(_) => None,
            Commands::Status { workflow_id } => *workflow_id,
            Commands::Cancel { workflow_id } => Some(*workflow_id),
            Commands::Wait(args) => Some(args.workflow_id),
        }
    }
}

impl SubmitArgs {
    fn apply(&self, overrides: &mut SettingsOverrides) {
        overrides
            .set("process.name", self.process_name.clone())
            .set("process.args", self.process_args.clone())
            .set("description", self.description.clone())
            .set(
                "input.storage.connection_string",
                self.input_storage_connection_string.clone(),
            )
            .set(
                "input.storage.account_name",
                self.input_storage_account_name.clone(),
            )
            .set(
                "input.storage.account_key",
                self.input_storage_account_key.clone(),
            )
            .set(
                "input.storage.container_name",
                self.input_storage_container_name.clone(),
            )
            .set("input.blob_name", self.input_blob_name.clone())
            .set(
                "output.storage.connection_string",
                self.output_storage_connection_string.clone(),
            )
            .set(
                "output.storage.account_name",
                self.output_storage_account_name.clone(),
            )
            .set(
                "output.storage.account_key",
                self.output_storage_account_key.clone(),
            )
            .set(
                "output.storage.container_name",
                self.output_storage_container_name.clone(),
            )
            .set("output.basename", self.output_basename.clone())
            .set("output.overwrite", self.output_overwrite.then_some(true))
            .set("output.include_log", self.output_include_log)
            .set(
                "optional_args.emit_ref_confidence",
                self.emit_ref_confidence.map(|mode| mode.as_str()),
            )
            .set("optional_args.bgzip_output", self.bgzip_output.then_some(true))
            .set("ignore_azure_region", self.ignore_azure_region.then_some(true));
    }
}

impl WaitArgs {
    fn apply(&self, overrides: &mut SettingsOverrides) {
        overrides
            .set("wait.interval_seconds", self.interval)
            .set("wait.max_attempts", self.max_attempts.map(u64::from))
            .set("wait.timeout_seconds", self.timeout);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MsgenctlSettings;
    use clap::CommandFactory;

    fn load(args: &[&str]) -> MsgenctlSettings {
        let cli = Cli::try_parse_from(args).unwrap();
        MsgenctlSettings::load(None, &cli.overrides()).unwrap()
    }

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let settings = load(&[
            "msgenctl",
            "status",
            "--base-url",
            "https://genomics.example.com",
            "--access-key",
            "secret",
            "--log-format",
            "json",
        ]);

        assert_eq!(
            settings.service.base_url.as_deref(),
            Some("https://genomics.example.com")
        );
        assert_eq!(settings.service.access_key.as_deref(), Some("secret"));
        assert_eq!(settings.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_status_workflow_id_is_optional() {
        let cli = Cli::try_parse_from(["msgenctl", "status"]).unwrap();
        assert_eq!(cli.command.workflow_id(), None);

        let cli = Cli::try_parse_from(["msgenctl", "status", "1597"]).unwrap();
        assert_eq!(cli.command.workflow_id(), Some(WorkflowId(1597)));
        assert_eq!(cli.command.name(), "status");
    }

    #[test]
    fn test_invalid_workflow_id_is_rejected() {
        assert!(Cli::try_parse_from(["msgenctl", "cancel", "abc"]).is_err());
        assert!(Cli::try_parse_from(["msgenctl", "wait", "0"]).is_err());
    }

    #[test]
    fn test_submit_flags_become_settings() {
        let settings = load(&[
            "msgenctl",
            "submit",
            "--process-name",
            "snapgatk-20190409_1",
            "--input-storage-connection-string",
            "AccountName=input;AccountKey=aW5wdXQ=",
            "--output-storage-account-name",
            "output",
            "--output-overwrite",
            "--output-include-log=false",
            "--emit-ref-confidence",
            "GVCF",
            "--bgzip-output",
        ]);

        assert_eq!(settings.process.name, "snapgatk-20190409_1");
        assert_eq!(
            settings.input.storage.connection_string.as_deref(),
            Some("AccountName=input;AccountKey=aW5wdXQ=")
        );
        assert_eq!(settings.output.storage.account_name.as_deref(), Some("output"));
        assert!(settings.output.overwrite);
        assert!(!settings.output.include_log);
        assert_eq!(settings.optional_args.emit_ref_confidence, "GVCF");
        assert!(settings.optional_args.bgzip_output);
        assert!(!settings.ignore_azure_region);
    }

    #[test]
    fn test_unset_submit_flags_keep_defaults() {
        let settings = load(&["msgenctl", "submit"]);

        assert!(!settings.output.overwrite);
        assert!(settings.output.include_log);
        assert_eq!(settings.optional_args.emit_ref_confidence, "NONE");
    }

    #[test]
    fn test_connection_string_conflicts_with_account_flags() {
        let result = Cli::try_parse_from([
            "msgenctl",
            "submit",
            "--input-storage-connection-string",
            "AccountName=input;AccountKey=aW5wdXQ=",
            "--input-storage-account-name",
            "input",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_unknown_ref_confidence_is_rejected() {
        let result = Cli::try_parse_from(["msgenctl", "submit", "--emit-ref-confidence", "gvcf"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_wait_flags() {
        let settings = load(&[
            "msgenctl",
            "wait",
            "1597",
            "--interval",
            "5",
            "--max-attempts",
            "10",
            "--timeout",
            "600",
        ]);

        let options = settings.wait_options().unwrap();
        assert_eq!(options.interval.as_secs(), 5);
        assert_eq!(options.max_attempts, Some(10));
        assert_eq!(options.max_duration.map(|d| d.as_secs()), Some(600));
    }
}
