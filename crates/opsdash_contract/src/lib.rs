pub mod backup;
pub mod error;
pub mod landing;
pub mod message;
pub mod status;

pub use backup::{
    Backup, BackupKind, BackupStatus, CompressionType, CreateBackupRequest, NewBackup,
    StorageProvider, DEFAULT_RETENTION_DAYS,
};
pub use error::ValidationError;
pub use landing::{CreatePageRequest, LandingPage, NewPage, PageStatus};
pub use message::{
    Carrier, MessageStatus, NewMessage, SendMessageRequest, SmsMessage, MAX_SMS_BODY_CHARS,
};
pub use status::{StatusBadge, StatusDisplay, Tone};
