//! Settings for the walkthrough and the ARM client
//!
//! Stored in TOML. Every field has a default, so a missing file and an empty
//! file both yield [`Settings::default`].
//!
//! ```toml
//! [workflow]
//! region = "westus2"
//! restore_margin_secs = 600
//!
//! [workflow.restore_point_poll]
//! max_attempts = 10
//! interval_secs = 60
//!
//! [client]
//! lro_timeout_secs = 7200
//! ```

use directories::ProjectDirs;
use serde::{Deserialize, Deserializer, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::error::{ConfigError, Result};
use crate::poll::PollPolicy;

/// Top-level settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Workflow timing and placement
    #[serde(default)]
    pub workflow: WorkflowSettings,

    /// Control-plane endpoints and long-running operation polling
    #[serde(default)]
    pub client: ClientSettings,
}

/// Workflow settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowSettings {
    /// Region every resource is created in
    #[serde(default = "default_region")]
    pub region: String,

    /// Pause after provisioning so the backup service notices the new databases
    #[serde(default = "default_settle_delay")]
    pub settle_delay_secs: u64,

    /// Padding added on top of the earliest restorable time before restoring
    #[serde(default = "default_restore_margin")]
    pub restore_margin_secs: u64,

    /// Budget for waiting on the first restore point
    #[serde(
        default = "PollPolicy::restore_point",
        deserialize_with = "restore_point_poll"
    )]
    pub restore_point_poll: PollPolicy,

    /// Budget for waiting on the dropped-database backup record
    #[serde(
        default = "PollPolicy::dropped_database",
        deserialize_with = "dropped_database_poll"
    )]
    pub dropped_database_poll: PollPolicy,
}

impl Default for WorkflowSettings {
    fn default() -> Self {
        Self {
            region: default_region(),
            settle_delay_secs: default_settle_delay(),
            restore_margin_secs: default_restore_margin(),
            restore_point_poll: PollPolicy::restore_point(),
            dropped_database_poll: PollPolicy::dropped_database(),
        }
    }
}

impl WorkflowSettings {
    pub fn settle_delay(&self) -> Duration {
        Duration::from_secs(self.settle_delay_secs)
    }

    pub fn restore_margin(&self) -> Duration {
        Duration::from_secs(self.restore_margin_secs)
    }
}

/// ARM client settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientSettings {
    /// Resource manager endpoint
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Identity provider used for the client-credentials grant
    #[serde(default = "default_authority")]
    pub authority: String,

    /// Delay between long-running operation status checks, in milliseconds
    #[serde(default = "default_lro_interval_ms")]
    pub lro_interval_ms: u64,

    /// Give up on a single long-running operation after this many seconds
    #[serde(default = "default_lro_timeout")]
    pub lro_timeout_secs: u64,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            authority: default_authority(),
            lro_interval_ms: default_lro_interval_ms(),
            lro_timeout_secs: default_lro_timeout(),
        }
    }
}

impl ClientSettings {
    pub fn lro_interval(&self) -> Duration {
        Duration::from_millis(self.lro_interval_ms)
    }

    pub fn lro_timeout(&self) -> Duration {
        Duration::from_secs(self.lro_timeout_secs)
    }
}

impl Settings {
    /// Load settings from the default location
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        Self::load_from_path(&path)
    }

    /// Load settings from a specific path; a missing file yields defaults
    pub fn load_from_path(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            return Ok(Settings::default());
        }

        let content = fs::read_to_string(config_path).map_err(|e| ConfigError::LoadError {
            path: config_path.display().to_string(),
            source: e,
        })?;

        let settings: Settings = toml::from_str(&content)?;
        settings.validate()?;

        Ok(settings)
    }

    /// Render the effective settings as TOML
    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Reject settings the workflow cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.workflow.region.trim().is_empty() {
            return Err(ConfigError::InvalidSetting {
                key: "workflow.region".to_string(),
                reason: "must not be empty".to_string(),
            });
        }
        for (key, value) in [
            ("client.endpoint", &self.client.endpoint),
            ("client.authority", &self.client.authority),
        ] {
            if let Err(e) = url::Url::parse(value) {
                return Err(ConfigError::InvalidSetting {
                    key: key.to_string(),
                    reason: e.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Get the default config file path
    pub fn config_path() -> Result<PathBuf> {
        let proj_dirs =
            ProjectDirs::from("com", "sqlrestore", "sqlrestore").ok_or(ConfigError::ConfigDirError)?;

        Ok(proj_dirs.config_dir().join("config.toml"))
    }
}

/// A poll table where every field is optional
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct PollOverrides {
    max_attempts: Option<u32>,
    interval_secs: Option<u64>,
}

impl PollOverrides {
    fn apply(self, base: PollPolicy) -> PollPolicy {
        PollPolicy {
            max_attempts: self.max_attempts.unwrap_or(base.max_attempts),
            interval_secs: self.interval_secs.unwrap_or(base.interval_secs),
        }
    }
}

fn restore_point_poll<'de, D>(deserializer: D) -> std::result::Result<PollPolicy, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(PollOverrides::deserialize(deserializer)?.apply(PollPolicy::restore_point()))
}

fn dropped_database_poll<'de, D>(deserializer: D) -> std::result::Result<PollPolicy, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(PollOverrides::deserialize(deserializer)?.apply(PollPolicy::dropped_database()))
}

// Default value functions for serde
fn default_region() -> String {
    "eastus".to_string()
}

fn default_settle_delay() -> u64 {
    300
}

fn default_restore_margin() -> u64 {
    300
}

fn default_endpoint() -> String {
    "https://management.azure.com".to_string()
}

fn default_authority() -> String {
    "https://login.microsoftonline.com".to_string()
}

fn default_lro_interval_ms() -> u64 {
    10_000
}

fn default_lro_timeout() -> u64 {
    3600
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.workflow.region, "eastus");
        assert_eq!(settings.workflow.settle_delay(), Duration::from_secs(300));
        assert_eq!(settings.workflow.restore_margin(), Duration::from_secs(300));
        assert_eq!(settings.workflow.restore_point_poll.max_attempts, 50);
        assert_eq!(settings.workflow.restore_point_poll.interval_secs, 180);
        assert_eq!(settings.workflow.dropped_database_poll.max_attempts, 24);
        assert_eq!(settings.workflow.dropped_database_poll.interval_secs, 300);
        assert_eq!(settings.client.endpoint, "https://management.azure.com");
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let settings = Settings::load_from_path(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
[workflow]
region = "westus2"

[workflow.dropped_database_poll]
max_attempts = 3
"#,
        )
        .unwrap();

        let settings = Settings::load_from_path(&path).unwrap();
        assert_eq!(settings.workflow.region, "westus2");
        assert_eq!(settings.workflow.dropped_database_poll.max_attempts, 3);
        assert_eq!(settings.workflow.dropped_database_poll.interval_secs, 300);
        assert_eq!(settings.workflow.restore_point_poll, PollPolicy::restore_point());
        assert_eq!(settings.client, ClientSettings::default());
    }

    #[test]
    fn test_interval_only_override_keeps_attempts() {
        let settings: Settings = toml::from_str(
            r#"
[workflow.restore_point_poll]
interval_secs = 60

[workflow.dropped_database_poll]
interval_secs = 120
"#,
        )
        .unwrap();

        assert_eq!(
            settings.workflow.restore_point_poll,
            PollPolicy::new(50, Duration::from_secs(60))
        );
        assert_eq!(
            settings.workflow.dropped_database_poll,
            PollPolicy::new(24, Duration::from_secs(120))
        );
    }

    #[test]
    fn test_unknown_poll_field_rejected() {
        let result = toml::from_str::<Settings>("[workflow.restore_point_poll]
attempts = 3
");
        assert!(result.is_err());
    }

    #[test]
    fn test_corrupt_file_is_parse_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[[[broken").unwrap();

        let err = Settings::load_from_path(&path).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn test_empty_region_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[workflow]\nregion = \"\"\n").unwrap();

        let err = Settings::load_from_path(&path).unwrap_err();
        assert!(err.to_string().contains("workflow.region"));
    }

    #[test]
    fn test_bad_endpoint_rejected() {
        let mut settings = Settings::default();
        settings.client.endpoint = "not a url".to_string();
        let err = settings.validate().unwrap_err();
        assert!(err.to_string().contains("client.endpoint"));
    }

    #[test]
    fn test_toml_output_reloads() {
        let mut settings = Settings::default();
        settings.workflow.region = "northeurope".to_string();

        let rendered = settings.to_toml_string().unwrap();
        let reparsed: Settings = toml::from_str(&rendered).unwrap();
        assert_eq!(reparsed, settings);
    }
}
