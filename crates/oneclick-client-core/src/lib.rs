pub mod auth;
pub mod buildhost;
pub mod chat;
pub mod directory;
pub mod generation;
pub mod media;
pub mod project;
pub mod realtime;
pub mod types;

pub use auth::{
    AuthApi, AuthError, AuthInputError, AuthSession, normalize_email, normalize_name,
    normalize_password,
};
pub use buildhost::{
    BuildArtifact, BuildDestination, BuildHostApi, BuildHostError, DestinationInputError,
    DestinationStore,
};
pub use chat::{ChatMessage, ChatRole};
pub use directory::{DirectoryApi, DirectoryError};
pub use generation::{GenerationApi, GenerationError, GenerationReply};
pub use media::screenshot_data_uri;
pub use project::{PREVIEW_DOCUMENT, ProjectFileSet, default_project_files, merge_files};
pub use realtime::{
    ChangeOp, RealtimeApi, RealtimeError, RealtimeSubscription, RecordChange, RecordPayload,
    SubscriptionScope,
};
pub use types::{
    ActivityLog, ActivityLogDraft, AdminStats, Identity, NewTransaction, Package, PackageDraft,
    PaymentMethod, Transaction, TransactionStatus,
};
