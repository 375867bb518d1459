use opsdash_contract::{Backup, BackupKind, BackupStatus};
use serde::Serialize;

use crate::format::{format_percentage, format_size};
use crate::provider::{classify_provider, ProviderClass};
use crate::tally::{count_by, percentage, CategoryShare};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BackupStats {
    pub total: usize,
    pub completed: usize,
    pub in_progress: usize,
    pub failed: usize,
    /// Sum over every backup; running backups contribute 0.
    pub total_size_mb: f64,
    pub total_size: String,
    pub success_rate: f64,
    pub success_rate_label: String,
    pub by_provider: Vec<CategoryShare<ProviderClass>>,
    pub by_type: Vec<CategoryShare<BackupKind>>,
    pub by_status: Vec<CategoryShare<BackupStatus>>,
    pub in_progress_ids: Vec<String>,
}

pub fn backup_stats<B: AsRef<Backup>>(backups: &[B]) -> BackupStats {
    let count_status = |status: BackupStatus| {
        backups
            .iter()
            .filter(|backup| backup.as_ref().status == status)
            .count()
    };

    let total = backups.len();
    let completed = count_status(BackupStatus::Completed);
    // Seeded with +0.0: an empty f64 `sum()` yields -0.0.
    let total_size_mb = backups
        .iter()
        .fold(0.0, |acc, backup| acc + backup.as_ref().data_size_mb);
    let success_rate = percentage(completed, total);

    BackupStats {
        total,
        completed,
        in_progress: count_status(BackupStatus::InProgress),
        failed: count_status(BackupStatus::Failed),
        total_size_mb,
        total_size: format_size(total_size_mb),
        success_rate,
        success_rate_label: format_percentage(success_rate),
        by_provider: count_by(backups, &ProviderClass::ALL, |backup| {
            classify_provider(&backup.as_ref().storage_location)
        }),
        by_type: count_by(backups, &BackupKind::ALL, |backup| backup.as_ref().backup_type),
        by_status: count_by(backups, &BackupStatus::ALL, |backup| backup.as_ref().status),
        in_progress_ids: backups
            .iter()
            .map(|backup| backup.as_ref())
            .filter(|backup| backup.status == BackupStatus::InProgress)
            .map(|backup| backup.backup_id.clone())
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use opsdash_contract::CompressionType;
    use std::sync::Arc;

    fn backup(id: &str, location: &str, kind: BackupKind, status: BackupStatus, size: f64) -> Arc<Backup> {
        Arc::new(Backup {
            backup_id: id.to_string(),
            backup_type: kind,
            storage_location: location.to_string(),
            data_size_mb: size,
            compression_type: CompressionType::Gzip,
            encryption_enabled: true,
            status,
            retention_days: 90,
            checksum: None,
            created_at: Utc::now(),
            completed_at: None,
        })
    }

    fn dashboard() -> Vec<Arc<Backup>> {
        vec![
            backup("BKP-2025-001", "s3://b/full/1.tar.gz", BackupKind::Full, BackupStatus::Completed, 24_567.89),
            backup("BKP-2025-002", "s3://b/incremental/2.tar.gz", BackupKind::Incremental, BackupStatus::Completed, 1_234.56),
            backup("BKP-2025-003", "azure://b/differential/3.tar.xz", BackupKind::Differential, BackupStatus::InProgress, 0.0),
            backup("BKP-2025-004", "gcp://b/full/4.tar.gz", BackupKind::Full, BackupStatus::Completed, 23_456.78),
            backup("BKP-2025-005", "s3://b/incremental/5.tar.gz", BackupKind::Incremental, BackupStatus::Failed, 987.65),
        ]
    }

    #[test]
    fn dashboard_totals() {
        let stats = backup_stats(&dashboard());
        assert_eq!(stats.total, 5);
        assert_eq!(stats.completed, 3);
        assert_eq!(stats.in_progress, 1);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.success_rate, 60.0);
        assert_eq!(stats.success_rate_label, "60.0%");
        assert_eq!(stats.total_size, "49.07 GB");
        assert_eq!(stats.in_progress_ids, vec!["BKP-2025-003"]);

        let aws = &stats.by_provider[0];
        assert_eq!((aws.category, aws.count, aws.percentage), (ProviderClass::AwsS3, 3, 60.0));
    }

    #[test]
    fn status_shares_sum_to_one_hundred() {
        let stats = backup_stats(&dashboard());
        let sum: f64 = stats.by_status.iter().map(|share| share.percentage).sum();
        assert!((sum - 100.0).abs() < 0.25);
    }

    #[test]
    fn empty_collection_is_all_zero() {
        let stats = backup_stats::<Arc<Backup>>(&[]);
        assert_eq!(stats.total_size_mb, 0.0);
        assert!(stats.total_size_mb.is_sign_positive());
        assert_eq!(stats.total_size, "0.00 MB");
        assert_eq!(stats.success_rate, 0.0);
        assert_eq!(stats.success_rate_label, "0.0%");
        assert!(stats.by_provider.iter().all(|share| share.percentage == 0.0));
    }

    #[test]
    fn repeated_queries_agree() {
        let backups = dashboard();
        assert_eq!(backup_stats(&backups), backup_stats(&backups));
    }
}
