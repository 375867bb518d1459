use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use opsdash_contract::{Backup, BackupStatus, CreateBackupRequest, NewBackup, ValidationError};
use rand::Rng;
use sha2::{Digest, Sha256};

use crate::engine::{LifecycleResource, Placement};
use crate::identity::{backup_prefix, sequence_suffix};

/// Supplies the values a backup only has once it has completed.
pub trait CompletionSource: Send + Sync {
    fn data_size_mb(&self) -> f64;

    fn checksum(&self, backup: &Backup, data_size_mb: f64) -> String;
}

/// Random archive size in `[min_size_mb, max_size_mb)` and a SHA-256 hex
/// placeholder derived from the backup's identity. Nothing is read or hashed
/// from real data.
#[derive(Debug, Clone, Copy)]
pub struct SimulatedCompletion {
    pub min_size_mb: f64,
    pub max_size_mb: f64,
}

impl SimulatedCompletion {
    pub fn new(min_size_mb: f64, max_size_mb: f64) -> Self {
        Self {
            min_size_mb,
            max_size_mb,
        }
    }
}

impl Default for SimulatedCompletion {
    fn default() -> Self {
        Self::new(1_000.0, 11_000.0)
    }
}

impl CompletionSource for SimulatedCompletion {
    fn data_size_mb(&self) -> f64 {
        // Also rejects NaN, infinite bounds and spans that overflow.
        let span = self.max_size_mb - self.min_size_mb;
        if !(span.is_finite() && span > 0.0) {
            return if self.min_size_mb.is_finite() { self.min_size_mb } else { 0.0 };
        }
        rand::thread_rng().gen_range(self.min_size_mb..self.max_size_mb)
    }

    fn checksum(&self, backup: &Backup, data_size_mb: f64) -> String {
        let seed = format!(
            "{}:{}:{:.2}",
            backup.backup_id, backup.storage_location, data_size_mb
        );
        format!("{:x}", Sha256::digest(seed.as_bytes()))
    }
}

#[derive(Clone)]
pub struct BackupSettings {
    pub completion_delay: Duration,
    pub bucket: String,
    pub completion: Arc<dyn CompletionSource>,
}

impl Default for BackupSettings {
    fn default() -> Self {
        Self {
            completion_delay: Duration::from_secs(5),
            bucket: "ocellaris-backups".to_string(),
            completion: Arc::new(SimulatedCompletion::default()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackupStage {
    Complete,
}

impl LifecycleResource for Backup {
    type Request = CreateBackupRequest;
    type Draft = NewBackup;
    type Settings = BackupSettings;
    type Stage = BackupStage;
    type Status = BackupStatus;

    const KIND: &'static str = "backup";
    const PLACEMENT: Placement = Placement::NewestFirst;

    fn id(&self) -> &str {
        &self.backup_id
    }

    fn status(&self) -> BackupStatus {
        self.status
    }

    fn validate(request: CreateBackupRequest) -> Result<NewBackup, ValidationError> {
        request.validate()
    }

    fn sequence_id(sequence: usize, now: DateTime<Utc>) -> String {
        format!("{}{}", backup_prefix(now), sequence_suffix(sequence))
    }

    fn build(sequence: usize, draft: NewBackup, settings: &BackupSettings, now: DateTime<Utc>) -> Self {
        let suffix = sequence_suffix(sequence);
        Backup {
            backup_id: Self::sequence_id(sequence, now),
            backup_type: draft.kind,
            storage_location: draft.provider.archive_location(
                &settings.bucket,
                draft.kind,
                draft.compression,
                now.date_naive(),
                &suffix,
            ),
            data_size_mb: 0.0,
            compression_type: draft.compression,
            encryption_enabled: true,
            status: BackupStatus::InProgress,
            retention_days: draft.retention_days,
            checksum: None,
            created_at: now,
            completed_at: None,
        }
    }

    // Failed and Restoring are never scheduled; they only arrive with seed data.
    fn schedule(settings: &BackupSettings) -> Vec<(Duration, BackupStage)> {
        vec![(settings.completion_delay, BackupStage::Complete)]
    }

    fn advance(&self, stage: BackupStage, settings: &BackupSettings, now: DateTime<Utc>) -> Option<Self> {
        match stage {
            BackupStage::Complete => {
                if self.status != BackupStatus::InProgress {
                    return None;
                }
                let data_size_mb = settings.completion.data_size_mb();
                let checksum = settings.completion.checksum(self, data_size_mb);
                Some(Backup {
                    status: BackupStatus::Completed,
                    data_size_mb,
                    checksum: Some(checksum),
                    completed_at: Some(now),
                    ..self.clone()
                })
            }
        }
    }
}
