//! Configuration loading via `ortho-config`.

use std::ffi::OsString;
use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;
use thiserror::Error;

use crate::wait::PollSettings;

/// Longest accepted delay between polls, in milliseconds.
pub const MAX_POLL_INTERVAL_MS: u64 = 60 * 60 * 1000;
/// Longest accepted wait, in seconds.
pub const MAX_WAIT_TIMEOUT_SECS: u64 = 24 * 60 * 60;

/// Environment description shared read-only by the provision and teardown
/// workflows. Values merge defaults, configuration files, and `BUILDBOX_*`
/// environment variables. Keys that match no field are rejected, so a
/// misspelt key fails the load instead of falling back to a default.
#[derive(Clone, Debug, Deserialize, OrthoConfig, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
#[ortho_config(
    prefix = "BUILDBOX",
    discovery(
        app_name = "buildbox",
        env_var = "BUILDBOX_CONFIG_PATH",
        config_file_name = "buildbox.toml",
        dotfile_name = ".buildbox.toml",
        project_file_name = "buildbox.toml"
    )
)]
pub struct EnvironmentConfig {
    /// Google Cloud project that owns every resource.
    pub project: String,
    /// Zone hosting the instance, its data disk, and the instance group.
    pub zone: String,
    /// Region containing `zone`.
    pub region: String,
    /// Name of the pre-existing persistent data disk.
    pub disk_name: String,
    /// Cloud DNS managed zone holding the frontend record.
    pub managed_zone: String,
    /// Frontend record name, matched exactly (usually with a trailing dot).
    pub frontend_dns_name: String,
    /// Unmanaged instance group backing the load balancer.
    pub instance_group_name: String,
    /// Name given to the instance.
    pub instance_name: String,
    /// Name of the target HTTPS proxy.
    #[ortho_config(default = "dev-target-proxy".to_owned())]
    pub proxy_name: String,
    /// Name of the global forwarding rule.
    #[ortho_config(default = "dev".to_owned())]
    pub forwarding_rule_name: String,
    /// Pre-existing SSL certificate served by the proxy.
    #[ortho_config(default = "dev".to_owned())]
    pub ssl_certificate: String,
    /// Pre-existing URL map the proxy routes to.
    #[ortho_config(default = "dev".to_owned())]
    pub url_map: String,
    /// Project publishing the boot image family.
    #[ortho_config(default = "cos-cloud".to_owned())]
    pub image_project: String,
    /// Boot image family; the newest image is used.
    #[ortho_config(default = "cos-stable".to_owned())]
    pub image_family: String,
    /// Machine series; the CPU count is appended (`n1-standard-4`).
    #[ortho_config(default = "n1-standard".to_owned())]
    pub machine_series: String,
    /// File holding the cloud-init user-data.
    #[ortho_config(default = "yamls/cloud_init.yml".to_owned())]
    pub cloud_init_file: String,
    /// File holding the container declaration.
    #[ortho_config(default = "yamls/containers.yml".to_owned())]
    pub container_spec_file: String,
    /// Delay between polls, in milliseconds.
    #[ortho_config(default = 1000)]
    pub poll_interval_ms: u64,
    /// Upper bound on any single wait, in seconds.
    #[ortho_config(default = 900)]
    pub wait_timeout_secs: u64,
    /// Pause between proxy and forwarding rule creation, in milliseconds.
    #[ortho_config(default = 2000)]
    pub propagation_delay_ms: u64,
    /// OAuth bearer token for the Google APIs.
    pub access_token: Option<String>,
    /// Explicit configuration file, normally supplied as `BUILDBOX_CONFIG_PATH`.
    #[ortho_config(skip_cli)]
    pub config_path: Option<String>,
}

/// Metadata for a configuration field, used to generate actionable error messages.
struct FieldMetadata {
    description: &'static str,
    env_var: &'static str,
    toml_key: &'static str,
}

impl FieldMetadata {
    const fn new(description: &'static str, env_var: &'static str, toml_key: &'static str) -> Self {
        Self {
            description,
            env_var,
            toml_key,
        }
    }
}

const REQUIRED_FIELDS: [FieldMetadata; 8] = [
    FieldMetadata::new("Google Cloud project", "BUILDBOX_PROJECT", "project"),
    FieldMetadata::new("compute zone", "BUILDBOX_ZONE", "zone"),
    FieldMetadata::new("compute region", "BUILDBOX_REGION", "region"),
    FieldMetadata::new("data disk name", "BUILDBOX_DISK_NAME", "disk_name"),
    FieldMetadata::new(
        "Cloud DNS managed zone",
        "BUILDBOX_MANAGED_ZONE",
        "managed_zone",
    ),
    FieldMetadata::new(
        "frontend DNS name",
        "BUILDBOX_FRONTEND_DNS_NAME",
        "frontend_dns_name",
    ),
    FieldMetadata::new(
        "instance group name",
        "BUILDBOX_INSTANCE_GROUP_NAME",
        "instance_group_name",
    ),
    FieldMetadata::new("instance name", "BUILDBOX_INSTANCE_NAME", "instance_name"),
];

impl EnvironmentConfig {
    fn require_field(value: &str, metadata: &FieldMetadata) -> Result<(), ConfigError> {
        if value.trim().is_empty() {
            return Err(ConfigError::MissingField(format!(
                "missing {}: set {} or add {} to buildbox.toml",
                metadata.description, metadata.env_var, metadata.toml_key
            )));
        }
        Ok(())
    }

    /// Loads configuration without attempting to parse CLI arguments. Values
    /// still merge defaults, configuration files, and environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when the merge fails, for example when a
    /// required key is absent from every source.
    pub fn load_without_cli_args() -> Result<Self, ConfigError> {
        Self::load_from_iter([OsString::from("buildbox")])
            .map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Performs semantic validation. Error messages name the environment
    /// variable and configuration key that supply the missing value.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingField`] when a required field is blank,
    /// [`ConfigError::InvalidTiming`] when a poll setting is zero and
    /// [`ConfigError::TimingOutOfRange`] when one exceeds its ceiling.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let values = [
            &self.project,
            &self.zone,
            &self.region,
            &self.disk_name,
            &self.managed_zone,
            &self.frontend_dns_name,
            &self.instance_group_name,
            &self.instance_name,
        ];
        for (value, metadata) in values.into_iter().zip(REQUIRED_FIELDS.iter()) {
            Self::require_field(value, metadata)?;
        }
        Self::require_timing("poll_interval_ms", self.poll_interval_ms, MAX_POLL_INTERVAL_MS)?;
        Self::require_timing("wait_timeout_secs", self.wait_timeout_secs, MAX_WAIT_TIMEOUT_SECS)
    }

    const fn require_timing(field: &'static str, value: u64, max: u64) -> Result<(), ConfigError> {
        if value == 0 {
            return Err(ConfigError::InvalidTiming(field));
        }
        if value > max {
            return Err(ConfigError::TimingOutOfRange { field, max });
        }
        Ok(())
    }

    /// Returns the configured access token.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingField`] when no non-blank token is set.
    pub fn require_access_token(&self) -> Result<&str, ConfigError> {
        match self.access_token.as_deref().map(str::trim) {
            Some(token) if !token.is_empty() => Ok(token),
            _ => Err(ConfigError::MissingField(String::from(
                "missing Google API access token: set BUILDBOX_ACCESS_TOKEN \
                 (for example from `gcloud auth print-access-token`)",
            ))),
        }
    }

    /// Poll interval and deadline applied to every wait.
    #[must_use]
    pub const fn poll_settings(&self) -> PollSettings {
        PollSettings {
            interval: Duration::from_millis(self.poll_interval_ms),
            timeout: Duration::from_secs(self.wait_timeout_secs),
        }
    }

    /// Pause between proxy and forwarding rule creation.
    #[must_use]
    pub const fn propagation_delay(&self) -> Duration {
        Duration::from_millis(self.propagation_delay_ms)
    }
}

/// Errors raised during configuration loading and validation.
#[derive(Debug, Error, Eq, PartialEq)]
pub enum ConfigError {
    /// Indicates a required configuration field is empty or missing.
    #[error("missing configuration field: {0}")]
    MissingField(String),
    /// Indicates a timing value that would make polling meaningless.
    #[error("{0} must be greater than zero")]
    InvalidTiming(&'static str),
    /// Indicates a timing value too large to schedule.
    #[error("{field} must not exceed {max}")]
    TimingOutOfRange {
        /// Configuration key holding the value.
        field: &'static str,
        /// Largest accepted value.
        max: u64,
    },
    /// Surfaces errors from the `ortho-config` loader.
    #[error("configuration parsing failed: {0}")]
    Parse(String),
}

impl From<ortho_config::OrthoError> for ConfigError {
    fn from(value: ortho_config::OrthoError) -> Self {
        Self::Parse(value.to_string())
    }
}
