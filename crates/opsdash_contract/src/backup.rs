use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::status::{StatusBadge, StatusDisplay, Tone};

pub const DEFAULT_RETENTION_DAYS: u32 = 90;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum BackupKind {
    Full,
    Incremental,
    Differential,
}

impl BackupKind {
    pub const ALL: [BackupKind; 3] = [
        BackupKind::Full,
        BackupKind::Incremental,
        BackupKind::Differential,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            BackupKind::Full => "Full",
            BackupKind::Incremental => "Incremental",
            BackupKind::Differential => "Differential",
        }
    }

    /// Path segment used inside the bucket.
    pub fn path_segment(self) -> &'static str {
        match self {
            BackupKind::Full => "full",
            BackupKind::Incremental => "incremental",
            BackupKind::Differential => "differential",
        }
    }

    /// Type chip shown next to the status badge.
    pub fn badge(self) -> StatusBadge {
        let tone = match self {
            BackupKind::Full => Tone::Primary,
            BackupKind::Incremental => Tone::Accent,
            BackupKind::Differential => Tone::Warning,
        };
        StatusBadge::new(self.as_str(), tone)
    }
}

impl fmt::Display for BackupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum CompressionType {
    Gzip,
    Bzip2,
    Xz,
    None,
}

impl CompressionType {
    pub fn archive_extension(self) -> &'static str {
        match self {
            CompressionType::Gzip => "tar.gz",
            CompressionType::Bzip2 => "tar.bz2",
            CompressionType::Xz => "tar.xz",
            CompressionType::None => "tar",
        }
    }
}

/// Cloud a new backup is written to. Requests name it by its short key.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum StorageProvider {
    Aws,
    Azure,
    Gcp,
}

impl StorageProvider {
    pub const ALL: [StorageProvider; 3] = [
        StorageProvider::Aws,
        StorageProvider::Azure,
        StorageProvider::Gcp,
    ];

    pub fn scheme(self) -> &'static str {
        match self {
            StorageProvider::Aws => "s3",
            StorageProvider::Azure => "azure",
            StorageProvider::Gcp => "gcp",
        }
    }

    /// `<scheme>://<bucket>/<kind>/<date>-<sequence>.<ext>`
    pub fn archive_location(
        self,
        bucket: &str,
        kind: BackupKind,
        compression: CompressionType,
        date: NaiveDate,
        sequence: &str,
    ) -> String {
        format!(
            "{}://{}/{}/{}-{}.{}",
            self.scheme(),
            bucket,
            kind.path_segment(),
            date.format("%Y-%m-%d"),
            sequence,
            compression.archive_extension()
        )
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum BackupStatus {
    InProgress,
    Completed,
    Failed,
    Restoring,
}

impl BackupStatus {
    pub const ALL: [BackupStatus; 4] = [
        BackupStatus::InProgress,
        BackupStatus::Completed,
        BackupStatus::Failed,
        BackupStatus::Restoring,
    ];

    pub fn is_terminal(self) -> bool {
        matches!(self, BackupStatus::Completed | BackupStatus::Failed)
    }

    pub fn is_success(self) -> bool {
        self == BackupStatus::Completed
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BackupStatus::InProgress => "InProgress",
            BackupStatus::Completed => "Completed",
            BackupStatus::Failed => "Failed",
            BackupStatus::Restoring => "Restoring",
        }
    }
}

impl fmt::Display for BackupStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl StatusDisplay for BackupStatus {
    fn badge(&self) -> StatusBadge {
        match self {
            BackupStatus::InProgress => StatusBadge::animated("In progress", Tone::Primary),
            BackupStatus::Completed => StatusBadge::new("Completed", Tone::Success),
            BackupStatus::Failed => StatusBadge::new("Failed", Tone::Destructive),
            BackupStatus::Restoring => StatusBadge::animated("Restoring", Tone::Warning),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Backup {
    pub backup_id: String,
    pub backup_type: BackupKind,
    pub storage_location: String,
    pub data_size_mb: f64,
    pub compression_type: CompressionType,
    pub encryption_enabled: bool,
    pub status: BackupStatus,
    pub retention_days: u32,
    pub checksum: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Backup {
    /// Restore and download are only offered for finished backups.
    pub fn is_restorable(&self) -> bool {
        self.status.is_success()
    }
}

/// Operator form for a new backup. Every field is optional on the wire so a
/// half-filled form reaches validation instead of failing deserialization.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateBackupRequest {
    pub backup_type: Option<BackupKind>,
    pub storage_provider: Option<StorageProvider>,
    pub compression_type: Option<CompressionType>,
    pub retention_days: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewBackup {
    pub kind: BackupKind,
    pub provider: StorageProvider,
    pub compression: CompressionType,
    pub retention_days: u32,
}

impl CreateBackupRequest {
    pub fn validate(self) -> Result<NewBackup, ValidationError> {
        let kind = self
            .backup_type
            .ok_or(ValidationError::MissingField("backup_type"))?;
        let provider = self
            .storage_provider
            .ok_or(ValidationError::MissingField("storage_provider"))?;
        let compression = self
            .compression_type
            .ok_or(ValidationError::MissingField("compression_type"))?;
        let retention_days = self.retention_days.unwrap_or(DEFAULT_RETENTION_DAYS);
        if retention_days == 0 {
            return Err(ValidationError::Invalid {
                field: "retention_days",
                reason: "must be at least one day".to_string(),
            });
        }

        Ok(NewBackup {
            kind,
            provider,
            compression,
            retention_days,
        })
    }
}
