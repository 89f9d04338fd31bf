//! Concrete collaborators for the OneClick Studio client: the hosted
//! auth/record backend, the generation service, the CI build host, a
//! polling record-change feed, and local destination persistence.

pub mod config;
pub mod destination;
pub mod feed;
pub mod gemini;
pub mod github;
pub mod supabase;

pub use config::{BackendConfig, ConfigError};
pub use destination::{DestinationStoreError, FileDestinationStore};
pub use feed::PollingFeed;
pub use gemini::GeminiGenerator;
pub use github::GithubBuildHost;
pub use supabase::{SupabaseAuth, SupabaseContext, SupabaseDirectory};
