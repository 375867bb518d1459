//! Dashboard statistics. Every function here is a pure function of the
//! collection it is handed; nothing is cached between calls.

pub mod backup;
pub mod format;
pub mod landing;
pub mod message;
pub mod provider;
pub mod tally;

pub use backup::{backup_stats, BackupStats};
pub use format::{format_percentage, format_size};
pub use landing::{landing_stats, LandingStats};
pub use message::{message_stats, MessageStats};
pub use provider::{classify_provider, ProviderClass};
pub use tally::{count_by, percentage, CategoryShare};
