pub mod backup;
pub mod engine;
pub mod error;
pub mod identity;
pub mod landing;
pub mod message;

pub use backup::{BackupSettings, BackupStage, CompletionSource, SimulatedCompletion};
pub use engine::{
    replace_by_id, ChangeKind, LifecycleEngine, LifecycleEvent, LifecycleResource, Placement,
    Snapshot, Subscription,
};
pub use error::LifecycleError;
pub use message::{MessageSettings, MessageStage};

pub type BackupEngine = LifecycleEngine<opsdash_contract::Backup>;
pub type MessageEngine = LifecycleEngine<opsdash_contract::SmsMessage>;
pub type LandingEngine = LifecycleEngine<opsdash_contract::LandingPage>;
