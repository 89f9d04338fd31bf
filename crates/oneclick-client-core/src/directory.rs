//! Contract with the hosted record store (users, packages, transactions,
//! activity logs).

use async_trait::async_trait;
use thiserror::Error;

use crate::types::{
    ActivityLog, ActivityLogDraft, AdminStats, Identity, NewTransaction, Package, PackageDraft,
    Transaction,
};

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("record not found")]
    NotFound,
    #[error("directory rejected request: {0}")]
    Rejected(String),
    #[error("directory transport failure: {0}")]
    Transport(String),
}

/// All reads and writes against backend rows. Mutations return the fresh
/// snapshot only where the caller needs it immediately (`use_credit`,
/// `submit_payment`); everything else is re-fetched.
#[async_trait]
pub trait DirectoryApi: Send + Sync {
    async fn get_user(&self, user_id: &str) -> Result<Option<Identity>, DirectoryError>;
    async fn update_bio(&self, user_id: &str, bio: &str) -> Result<(), DirectoryError>;
    async fn update_avatar(&self, user_id: &str, data_uri: &str) -> Result<(), DirectoryError>;

    /// Debits one token server-side and returns the updated row. The debit is
    /// atomic on the backend; the client never computes a balance.
    async fn use_credit(&self, user_id: &str) -> Result<Identity, DirectoryError>;

    async fn packages(&self) -> Result<Vec<Package>, DirectoryError>;
    async fn create_package(&self, draft: &PackageDraft) -> Result<Package, DirectoryError>;
    async fn update_package(
        &self,
        package_id: &str,
        draft: &PackageDraft,
    ) -> Result<(), DirectoryError>;
    async fn delete_package(&self, package_id: &str) -> Result<(), DirectoryError>;

    async fn submit_payment(&self, draft: &NewTransaction)
    -> Result<Transaction, DirectoryError>;
    async fn transactions(&self) -> Result<Vec<Transaction>, DirectoryError>;
    /// Approves a pending transaction: credits the buyer and marks the row
    /// completed, atomically on the backend.
    async fn approve_transaction(&self, transaction_id: &str) -> Result<(), DirectoryError>;
    async fn reject_transaction(&self, transaction_id: &str) -> Result<(), DirectoryError>;

    async fn users(&self) -> Result<Vec<Identity>, DirectoryError>;
    async fn set_banned(&self, user_id: &str, banned: bool) -> Result<(), DirectoryError>;
    async fn adjust_tokens(&self, user_id: &str, delta: i64) -> Result<(), DirectoryError>;

    async fn append_log(&self, draft: &ActivityLogDraft) -> Result<(), DirectoryError>;
    async fn activity_logs(&self) -> Result<Vec<ActivityLog>, DirectoryError>;
    async fn admin_stats(&self) -> Result<AdminStats, DirectoryError>;
}
