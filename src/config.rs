use crate::errors::{MsgenError, Result};
use crate::http::{RetryConfig, HTTP_CLIENT_TIMEOUT};
use crate::storage::{ConnectionString, StorageCredential};
use crate::telemetry::LogFormat;
use crate::workflows::{ReferenceConfidenceMode, WaitOptions};
use config::{Config, Environment, File, Value};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

const DEFAULT_CONFIG_FILE: &str = "msgenctl";
const ENV_PREFIX: &str = "MSGENCTL";

/// Raw settings as read from defaults, files, environment and flags.
///
/// Nothing in here is validated; use [`ServiceConfig::from_settings`] and
/// [`SubmitConfig::from_settings`] to get the checked configuration the rest
/// of the crate consumes.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct MsgenctlSettings {
    pub service: ServiceSettings,
    pub http: HttpSettings,
    pub wait: WaitSettings,
    pub logging: LoggingSettings,
    pub process: ProcessSettings,
    pub description: String,
    pub input: InputSettings,
    pub output: OutputSettings,
    pub optional_args: OptionalArgsSettings,
    pub ignore_azure_region: bool,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ServiceSettings {
    /// Microsoft Genomics API base URL
    pub base_url: Option<String>,
    /// Microsoft Genomics API access key
    pub access_key: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HttpSettings {
    pub timeout_seconds: u64,
    pub max_retries: u32,
    pub min_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for HttpSettings {
    fn default() -> Self {
        let retry = RetryConfig::default();

        Self {
            timeout_seconds: HTTP_CLIENT_TIMEOUT.as_secs(),
            max_retries: retry.max_retries,
            min_backoff_ms: retry.min_backoff.as_millis() as u64,
            max_backoff_ms: retry.max_backoff.as_millis() as u64,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WaitSettings {
    /// Poll interval
    pub interval_seconds: u64,
    /// Give up after this many fetches (unbounded when unset)
    pub max_attempts: Option<u32>,
    /// Give up after this long (unbounded when unset)
    pub timeout_seconds: Option<u64>,
}

impl Default for WaitSettings {
    fn default() -> Self {
        Self {
            interval_seconds: 60,
            max_attempts: None,
            timeout_seconds: None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub format: LogFormat,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ProcessSettings {
    pub name: String,
    pub args: String,
}

/// Either a connection string or an account name/key pair
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageSettings {
    pub connection_string: Option<String>,
    pub account_name: Option<String>,
    pub account_key: Option<String>,
    pub container_name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct InputSettings {
    pub storage: StorageSettings,
    pub blob_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OutputSettings {
    pub storage: StorageSettings,
    pub basename: Option<String>,
    pub overwrite: bool,
    pub include_log: bool,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            storage: StorageSettings::default(),
            basename: None,
            overwrite: false,
            include_log: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OptionalArgsSettings {
    pub emit_ref_confidence: String,
    pub bgzip_output: bool,
}

impl Default for OptionalArgsSettings {
    fn default() -> Self {
        Self {
            emit_ref_confidence: ReferenceConfidenceMode::None.to_string(),
            bgzip_output: false,
        }
    }
}

/// Highest-precedence values, typically from command-line flags
#[derive(Debug, Clone, Default)]
pub struct SettingsOverrides {
    values: Vec<(String, Value)>,
}

impl SettingsOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `value` under the dotted `key` when present
    pub fn set<V: Into<Value>>(&mut self, key: &str, value: Option<V>) -> &mut Self {
        if let Some(value) = value {
            self.values.push((key.to_string(), value.into()));
        }
        self
    }
}

impl MsgenctlSettings {
    /// Load settings with precedence (lowest first):
    /// 1. Built-in defaults
    /// 2. `msgenctl.toml` in the working directory, or `config_file` when given
    /// 3. Environment variables prefixed with `MSGENCTL_` (`__` separates sections).
    ///    Values stay strings until deserialized into the typed field, so
    ///    `0123` remains `0123` for a blob name.
    /// 4. `overrides`
    pub fn load(config_file: Option<&Path>, overrides: &SettingsOverrides) -> Result<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);

        builder = match config_file {
            Some(path) => builder.add_source(File::from(path).required(true)),
            None => builder.add_source(File::with_name(DEFAULT_CONFIG_FILE).required(false)),
        };

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__"),
        );

        for (key, value) in &overrides.values {
            builder = builder.set_override(key.as_str(), value.clone())?;
        }

        let settings = builder.build()?.try_deserialize()?;

        Ok(settings)
    }

    /// Load `.env` into the process environment if it exists
    pub fn load_env_file() -> Result<()> {
        if Path::new(".env").exists() {
            dotenvy::dotenv().map_err(|e| MsgenError::InvalidSetting {
                key: ".env".to_string(),
                reason: e.to_string(),
            })?;
            tracing::info!("Loaded environment variables from .env file");
        }
        Ok(())
    }

    pub fn wait_options(&self) -> Result<WaitOptions> {
        if self.wait.interval_seconds == 0 {
            return Err(MsgenError::InvalidSetting {
                key: "wait.interval_seconds".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }

        Ok(WaitOptions {
            interval: Duration::from_secs(self.wait.interval_seconds),
            max_attempts: self.wait.max_attempts,
            max_duration: self.wait.timeout_seconds.map(Duration::from_secs),
        })
    }
}

/// Validated connection settings for the genomics service
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub base_url: String,
    pub access_key: String,
    pub timeout: Duration,
    pub retry: RetryConfig,
}

impl ServiceConfig {
    pub fn new(base_url: impl Into<String>, access_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            access_key: access_key.into(),
            timeout: HTTP_CLIENT_TIMEOUT,
            retry: RetryConfig::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn from_settings(settings: &MsgenctlSettings) -> Result<Self> {
        let base_url = required(&settings.service.base_url, "service.base_url")?;
        let access_key = required(&settings.service.access_key, "service.access_key")?;

        reqwest::Url::parse(&base_url).map_err(|e| MsgenError::InvalidSetting {
            key: "service.base_url".to_string(),
            reason: e.to_string(),
        })?;

        let http = &settings.http;

        if http.timeout_seconds == 0 {
            return Err(MsgenError::InvalidSetting {
                key: "http.timeout_seconds".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }

        Ok(Self {
            base_url,
            access_key,
            timeout: Duration::from_secs(http.timeout_seconds),
            retry: RetryConfig {
                max_retries: http.max_retries,
                min_backoff: Duration::from_millis(http.min_backoff_ms),
                max_backoff: Duration::from_millis(http.max_backoff_ms),
            },
        })
    }
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub credential: StorageCredential,
    pub container_name: String,
}

impl StorageConfig {
    pub fn account_name(&self) -> &str {
        self.credential.account_name()
    }

    /// `prefix` is the settings section (`input.storage` or `output.storage`)
    fn from_settings(settings: &StorageSettings, prefix: &str) -> Result<Self> {
        let credential = match &settings.connection_string {
            Some(connection_string) if !connection_string.is_empty() => {
                let connection_string: ConnectionString = connection_string.parse()?;
                StorageCredential::try_from(&connection_string)?
            }
            _ => {
                let account_name =
                    required(&settings.account_name, &format!("{prefix}.account_name"))?;
                let account_key = required(&settings.account_key, &format!("{prefix}.account_key"))?;
                StorageCredential::new(account_name, &account_key)?
            }
        };

        let container_name = required(&settings.container_name, &format!("{prefix}.container_name"))?;

        Ok(Self {
            credential,
            container_name,
        })
    }
}

#[derive(Debug, Clone)]
pub struct InputConfig {
    pub storage: StorageConfig,
    pub blob_name: String,
}

#[derive(Debug, Clone)]
pub struct OutputConfig {
    pub storage: StorageConfig,
    pub basename: String,
    pub overwrite: bool,
    pub include_log: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ProcessConfig {
    pub name: String,
    pub args: String,
}

#[derive(Debug, Clone, Default)]
pub struct OptionalArgsConfig {
    pub emit_ref_confidence: ReferenceConfidenceMode,
    pub bgzip_output: bool,
}

/// Everything needed to build a workflow submission.
///
/// Input and output are signed with their own credentials.
#[derive(Debug, Clone)]
pub struct SubmitConfig {
    pub input: InputConfig,
    pub process: ProcessConfig,
    pub description: String,
    pub output: OutputConfig,
    pub optional_args: OptionalArgsConfig,
    pub ignore_azure_region: bool,
}

impl SubmitConfig {
    pub fn from_settings(settings: &MsgenctlSettings) -> Result<Self> {
        let input = InputConfig {
            storage: StorageConfig::from_settings(&settings.input.storage, "input.storage")?,
            blob_name: required(&settings.input.blob_name, "input.blob_name")?,
        };

        let output = OutputConfig {
            storage: StorageConfig::from_settings(&settings.output.storage, "output.storage")?,
            basename: required(&settings.output.basename, "output.basename")?,
            overwrite: settings.output.overwrite,
            include_log: settings.output.include_log,
        };

        let optional_args = OptionalArgsConfig {
            emit_ref_confidence: settings.optional_args.emit_ref_confidence.parse()?,
            bgzip_output: settings.optional_args.bgzip_output,
        };

        Ok(Self {
            input,
            process: ProcessConfig {
                name: settings.process.name.clone(),
                args: settings.process.args.clone(),
            },
            description: settings.description.clone(),
            output,
            optional_args,
            ignore_azure_region: settings.ignore_azure_region,
        })
    }
}

fn required(value: &Option<String>, key: &str) -> Result<String> {
    match value {
        Some(value) if !value.trim().is_empty() => Ok(value.clone()),
        _ => Err(MsgenError::MissingSetting(key.to_string())),
    }
}
