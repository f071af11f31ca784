use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::engine::CaptureScheduler;
use crate::hal::{SensorSource, WakeLock};
use crate::persistence::{CollisionPolicy, PersistenceWriter};
use crate::receiver::ListenerService;
use crate::transport::{Channel, TransferClient};

/// Configuration for both sides of the pipeline
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WearlogConfig {
    pub capture: CaptureConfig,
    pub transport: TransportConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    pub settle_delay_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    pub connect_timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Root under which `<username>/<activity>/` directories are created
    pub root: PathBuf,
    pub collision_policy: CollisionPolicy,
    pub default_username: String,
    pub default_activity: String,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self { settle_delay_secs: 5 }
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 30,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("sensor_logs"),
            collision_policy: CollisionPolicy::Overwrite,
            default_username: "unknown".to_string(),
            default_activity: "unknown".to_string(),
        }
    }
}

impl WearlogConfig {
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {:?}", path))?;
        let config: WearlogConfig = serde_json::from_str(&content)
            .context("Failed to parse config JSON")?;
        config.validate()?;
        Ok(config)
    }

    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }
        let json = serde_json::to_string_pretty(self)?;

        // Write to temporary file first
        let temp_path = path.with_extension("tmp");
        fs::write(&temp_path, json).context("Failed to write temporary config file")?;
        fs::rename(&temp_path, path).context("Failed to atomically update config file")?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.transport.connect_timeout_secs == 0 {
            bail!("Connect timeout must be positive");
        }
        if self.storage.root.as_os_str().is_empty() {
            bail!("Storage root must not be empty");
        }
        if self.storage.default_username.is_empty() || self.storage.default_activity.is_empty() {
            bail!("Default username and activity must not be empty");
        }
        Ok(())
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_secs(self.capture.settle_delay_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.transport.connect_timeout_secs)
    }

    pub fn transfer_client(&self, channel: Arc<dyn Channel>) -> TransferClient {
        TransferClient::new(channel).with_connect_timeout(self.connect_timeout())
    }

    /// Wearable side
    pub fn scheduler(
        &self,
        sensors: Arc<dyn SensorSource>,
        wake_lock: Arc<dyn WakeLock>,
        channel: Arc<dyn Channel>,
    ) -> CaptureScheduler {
        CaptureScheduler::new(sensors, wake_lock, self.transfer_client(channel))
            .with_settle_delay(self.settle_delay())
    }

    /// Companion side
    pub fn listener(&self) -> ListenerService {
        let writer = PersistenceWriter::new(&self.storage.root)
            .with_collision_policy(self.storage.collision_policy);
        ListenerService::new(writer)
            .with_default_labels(&self.storage.default_username, &self.storage.default_activity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let config = WearlogConfig::default();
        assert_eq!(config.settle_delay(), Duration::from_secs(5));
        assert_eq!(config.connect_timeout(), Duration::from_secs(30));
        assert_eq!(config.storage.collision_policy, CollisionPolicy::Overwrite);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("conf").join("wearlog.json");

        let mut config = WearlogConfig::default();
        config.capture.settle_delay_secs = 1;
        config.storage.collision_policy = CollisionPolicy::Suffix;
        config.save_to_file(&path).unwrap();

        let loaded = WearlogConfig::load_from_file(&path).unwrap();
        assert_eq!(loaded, config);
        assert!(!path.with_extension("tmp").exists());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("partial.json");
        fs::write(&path, r#"{ "transport": { "connect_timeout_secs": 3 } }"#).unwrap();

        let loaded = WearlogConfig::load_from_file(&path).unwrap();
        assert_eq!(loaded.connect_timeout(), Duration::from_secs(3));
        assert_eq!(loaded.capture, CaptureConfig::default());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, r#"{ "transport": { "connect_timeout_secs": 0 } }"#).unwrap();

        let err = WearlogConfig::load_from_file(&path).unwrap_err();
        assert!(err.to_string().contains("Connect timeout"));
    }
}
