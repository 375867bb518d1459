use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{ensure, Context, Result};
use opsdash_contract::{Backup, Carrier, LandingPage, SmsMessage};
use opsdash_lifecycle::{BackupSettings, MessageSettings, SimulatedCompletion};
use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub http: HttpSection,
    pub backup: BackupSection,
    pub sms: SmsSection,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpSection {
    pub bind: String,
}

impl Default for HttpSection {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8080".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BackupSection {
    pub completion_delay_ms: u64,
    pub bucket: String,
    pub min_size_mb: f64,
    pub max_size_mb: f64,
}

impl Default for BackupSection {
    fn default() -> Self {
        let simulated = SimulatedCompletion::default();
        Self {
            completion_delay_ms: 5_000,
            bucket: "ocellaris-backups".to_string(),
            min_size_mb: simulated.min_size_mb,
            max_size_mb: simulated.max_size_mb,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SmsSection {
    pub sent_after_ms: u64,
    pub delivered_after_ms: u64,
    pub default_sender: String,
    pub default_carrier: Carrier,
}

impl Default for SmsSection {
    fn default() -> Self {
        let defaults = MessageSettings::default();
        Self {
            sent_after_ms: defaults.sent_after.as_millis() as u64,
            delivered_after_ms: defaults.delivered_after.as_millis() as u64,
            default_sender: defaults.default_sender,
            default_carrier: defaults.default_carrier,
        }
    }
}

/// Resources loaded into the engines at start-up.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SeedFile {
    pub backups: Vec<Backup>,
    pub messages: Vec<SmsMessage>,
    pub landing_pages: Vec<LandingPage>,
}

impl RuntimeConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let source = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::parse(&source).with_context(|| format!("invalid config at {}", path.display()))
    }

    pub fn parse(source: &str) -> Result<Self> {
        let config: RuntimeConfig = toml::from_str(source).context("invalid config TOML")?;
        config.backup_settings()?;
        config.message_settings()?;
        Ok(config)
    }

    pub fn backup_settings(&self) -> Result<BackupSettings> {
        let section = &self.backup;
        ensure!(!section.bucket.trim().is_empty(), "backup.bucket must not be empty");
        ensure!(
            section.min_size_mb.is_finite()
                && section.max_size_mb.is_finite()
                && section.min_size_mb > 0.0
                && section.min_size_mb <= section.max_size_mb,
            "backup size range {}..{} MB is invalid",
            section.min_size_mb,
            section.max_size_mb
        );

        Ok(BackupSettings {
            completion_delay: Duration::from_millis(section.completion_delay_ms),
            bucket: section.bucket.clone(),
            completion: Arc::new(SimulatedCompletion::new(
                section.min_size_mb,
                section.max_size_mb,
            )),
        })
    }

    /// Both delays count from creation, so delivery has to come strictly later.
    pub fn message_settings(&self) -> Result<MessageSettings> {
        let section = &self.sms;
        ensure!(
            section.delivered_after_ms > section.sent_after_ms,
            "sms.delivered_after_ms ({}) must be greater than sms.sent_after_ms ({})",
            section.delivered_after_ms,
            section.sent_after_ms
        );

        Ok(MessageSettings {
            sent_after: Duration::from_millis(section.sent_after_ms),
            delivered_after: Duration::from_millis(section.delivered_after_ms),
            default_sender: section.default_sender.clone(),
            default_carrier: section.default_carrier,
        })
    }
}

impl SeedFile {
    pub fn load(path: &Path) -> Result<Self> {
        let source = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read seed file {}", path.display()))?;
        serde_json::from_str(&source)
            .with_context(|| format!("invalid seed JSON at {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let config = RuntimeConfig::parse("").expect("defaults");
        assert_eq!(config.http.bind, "127.0.0.1:8080");

        let sms = config.message_settings().expect("sms");
        assert_eq!(sms.sent_after, Duration::from_secs(2));
        assert_eq!(sms.delivered_after, Duration::from_secs(4));

        let backup = config.backup_settings().expect("backup");
        assert_eq!(backup.completion_delay, Duration::from_secs(5));
    }

    #[test]
    fn delivery_must_follow_sending() {
        let error = RuntimeConfig::parse(
            "[sms]\nsent_after_ms = 4000\ndelivered_after_ms = 4000\n",
        )
        .unwrap_err();
        assert!(error.to_string().contains("delivered_after_ms"));
    }

    #[test]
    fn carrier_and_bucket_are_read() {
        let config = RuntimeConfig::parse(
            "[backup]\nbucket = \"archive\"\n\n[sms]\ndefault_carrier = \"TIM\"\n",
        )
        .expect("config");
        assert_eq!(config.backup.bucket, "archive");
        assert_eq!(config.sms.default_carrier, Carrier::Tim);
    }

    #[test]
    fn inverted_size_range_is_rejected() {
        let error = RuntimeConfig::parse("[backup]\nmin_size_mb = 10.0\nmax_size_mb = 5.0\n")
            .unwrap_err();
        assert!(error.to_string().contains("size range"));
    }

    #[test]
    fn non_finite_sizes_are_rejected() {
        for source in [
            "[backup]\nmax_size_mb = inf\n",
            "[backup]\nmax_size_mb = nan\n",
            "[backup]\nmin_size_mb = -inf\n",
        ] {
            let error = RuntimeConfig::parse(source).unwrap_err();
            assert!(error.to_string().contains("size range"), "{source}");
        }
    }
}
