//! Admin console: tabbed views over backend rows, plus the mutation/audit
//! pairing. Every mutating action is built as an [`AdminAction`] carrying
//! both the mutation and its activity-log draft, so the driver cannot apply
//! one without the other.

use oneclick_client_core::{
    ActivityLog, ActivityLogDraft, AdminStats, Identity, Package, PackageDraft, PaymentMethod,
    Transaction, TransactionStatus,
};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminTab {
    Analytics,
    Transactions,
    Packages,
    Users,
    Logs,
}

/// Data a tab needs loaded on entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminFetch {
    Stats,
    Transactions,
    Packages,
    Users,
    Logs,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminMutation {
    ApproveTransaction { transaction_id: String },
    RejectTransaction { transaction_id: String },
    SetBanned { user_id: String, banned: bool },
    AdjustTokens { user_id: String, delta: i64 },
    CreatePackage { draft: PackageDraft },
    UpdatePackage { package_id: String, draft: PackageDraft },
    DeletePackage { package_id: String },
}

/// A mutation and the one audit entry that must land with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminAction {
    pub mutation: AdminMutation,
    pub log: ActivityLogDraft,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AdminActionError {
    #[error("transaction not found")]
    UnknownTransaction,
    #[error("transaction is not pending")]
    NotPending,
    #[error("user not found")]
    UnknownUser,
    #[error("package not found")]
    UnknownPackage,
}

#[derive(Debug)]
pub struct AdminConsoleState {
    tab: AdminTab,
    transactions: Vec<Transaction>,
    packages: Vec<Package>,
    users: Vec<Identity>,
    logs: Vec<ActivityLog>,
    stats: AdminStats,
    users_loaded: bool,
    logs_loaded: bool,
    has_new_notification: bool,
    transaction_query: String,
    method_filter: Option<PaymentMethod>,
    user_query: String,
}

impl Default for AdminConsoleState {
    fn default() -> Self {
        Self::new()
    }
}

impl AdminConsoleState {
    pub fn new() -> Self {
        Self {
            tab: AdminTab::Analytics,
            transactions: Vec::new(),
            packages: Vec::new(),
            users: Vec::new(),
            logs: Vec::new(),
            stats: AdminStats::default(),
            users_loaded: false,
            logs_loaded: false,
            has_new_notification: false,
            transaction_query: String::new(),
            method_filter: None,
            user_query: String::new(),
        }
    }

    pub fn tab(&self) -> AdminTab {
        self.tab
    }

    pub fn stats(&self) -> &AdminStats {
        &self.stats
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn packages(&self) -> &[Package] {
        &self.packages
    }

    pub fn users(&self) -> &[Identity] {
        &self.users
    }

    pub fn logs(&self) -> &[ActivityLog] {
        &self.logs
    }

    pub fn has_new_notification(&self) -> bool {
        self.has_new_notification
    }

    pub fn users_loaded(&self) -> bool {
        self.users_loaded
    }

    pub fn logs_loaded(&self) -> bool {
        self.logs_loaded
    }

    /// Switches tab and returns what to fetch. Users and logs load lazily on
    /// first entry; the other tabs refresh every time. Entering the
    /// transactions tab clears the notification badge.
    pub fn enter_tab(&mut self, tab: AdminTab) -> Vec<AdminFetch> {
        self.tab = tab;
        match tab {
            AdminTab::Analytics => vec![AdminFetch::Stats],
            AdminTab::Transactions => {
                self.has_new_notification = false;
                vec![AdminFetch::Transactions]
            }
            AdminTab::Packages => vec![AdminFetch::Packages],
            AdminTab::Users => {
                if self.users_loaded {
                    Vec::new()
                } else {
                    vec![AdminFetch::Users]
                }
            }
            AdminTab::Logs => {
                if self.logs_loaded {
                    Vec::new()
                } else {
                    vec![AdminFetch::Logs]
                }
            }
        }
    }

    pub fn set_stats(&mut self, stats: AdminStats) {
        self.stats = stats;
    }

    pub fn set_transactions(&mut self, transactions: Vec<Transaction>) {
        self.transactions = transactions;
    }

    pub fn set_packages(&mut self, packages: Vec<Package>) {
        self.packages = packages;
    }

    pub fn set_users(&mut self, users: Vec<Identity>) {
        self.users = users;
        self.users_loaded = true;
    }

    pub fn set_logs(&mut self, logs: Vec<ActivityLog>) {
        self.logs = logs;
        self.logs_loaded = true;
    }

    /// A transaction row arrived over the live feed. Pending inserts raise
    /// the badge unless the admin is already looking at the list. The row is
    /// shown immediately and a fresh fetch is requested so the list matches
    /// the backend.
    pub fn observe_transaction_insert(&mut self, transaction: Transaction) -> Vec<AdminFetch> {
        if transaction.status == TransactionStatus::Pending && self.tab != AdminTab::Transactions {
            self.has_new_notification = true;
        }
        self.transactions.insert(0, transaction);
        vec![AdminFetch::Transactions]
    }

    pub fn approve_transaction(
        &self,
        transaction_id: &str,
        admin_email: &str,
    ) -> Result<AdminAction, AdminActionError> {
        let transaction = self.pending_transaction(transaction_id)?;
        Ok(AdminAction {
            mutation: AdminMutation::ApproveTransaction {
                transaction_id: transaction_id.to_string(),
            },
            log: ActivityLogDraft {
                admin_email: admin_email.to_string(),
                action: "approve_transaction".to_string(),
                detail: format!(
                    "Approved {} BDT ({}) for {}",
                    transaction.amount, transaction.trx_id, transaction.user_email
                ),
            },
        })
    }

    pub fn reject_transaction(
        &self,
        transaction_id: &str,
        admin_email: &str,
    ) -> Result<AdminAction, AdminActionError> {
        let transaction = self.pending_transaction(transaction_id)?;
        Ok(AdminAction {
            mutation: AdminMutation::RejectTransaction {
                transaction_id: transaction_id.to_string(),
            },
            log: ActivityLogDraft {
                admin_email: admin_email.to_string(),
                action: "reject_transaction".to_string(),
                detail: format!(
                    "Rejected {} BDT ({}) for {}",
                    transaction.amount, transaction.trx_id, transaction.user_email
                ),
            },
        })
    }

    pub fn set_banned(
        &self,
        user_id: &str,
        banned: bool,
        admin_email: &str,
    ) -> Result<AdminAction, AdminActionError> {
        let user = self
            .users
            .iter()
            .find(|u| u.id == user_id)
            .ok_or(AdminActionError::UnknownUser)?;
        let verb = if banned { "Banned" } else { "Unbanned" };
        Ok(AdminAction {
            mutation: AdminMutation::SetBanned {
                user_id: user_id.to_string(),
                banned,
            },
            log: ActivityLogDraft {
                admin_email: admin_email.to_string(),
                action: "set_banned".to_string(),
                detail: format!("{verb} {}", user.email),
            },
        })
    }

    pub fn adjust_tokens(
        &self,
        user_id: &str,
        delta: i64,
        admin_email: &str,
    ) -> Result<AdminAction, AdminActionError> {
        let user = self
            .users
            .iter()
            .find(|u| u.id == user_id)
            .ok_or(AdminActionError::UnknownUser)?;
        Ok(AdminAction {
            mutation: AdminMutation::AdjustTokens {
                user_id: user_id.to_string(),
                delta,
            },
            log: ActivityLogDraft {
                admin_email: admin_email.to_string(),
                action: "adjust_tokens".to_string(),
                detail: format!("Adjusted tokens for {} by {delta}", user.email),
            },
        })
    }

    pub fn create_package(&self, draft: PackageDraft, admin_email: &str) -> AdminAction {
        let log = ActivityLogDraft {
            admin_email: admin_email.to_string(),
            action: "create_package".to_string(),
            detail: format!(
                "Created package {} ({} tokens, {} BDT)",
                draft.name, draft.tokens, draft.price
            ),
        };
        AdminAction {
            mutation: AdminMutation::CreatePackage { draft },
            log,
        }
    }

    pub fn update_package(
        &self,
        package_id: &str,
        draft: PackageDraft,
        admin_email: &str,
    ) -> Result<AdminAction, AdminActionError> {
        if !self.packages.iter().any(|p| p.id == package_id) {
            return Err(AdminActionError::UnknownPackage);
        }
        let log = ActivityLogDraft {
            admin_email: admin_email.to_string(),
            action: "update_package".to_string(),
            detail: format!(
                "Updated package {} ({} tokens, {} BDT)",
                draft.name, draft.tokens, draft.price
            ),
        };
        Ok(AdminAction {
            mutation: AdminMutation::UpdatePackage {
                package_id: package_id.to_string(),
                draft,
            },
            log,
        })
    }

    pub fn delete_package(
        &self,
        package_id: &str,
        admin_email: &str,
    ) -> Result<AdminAction, AdminActionError> {
        let package = self
            .packages
            .iter()
            .find(|p| p.id == package_id)
            .ok_or(AdminActionError::UnknownPackage)?;
        Ok(AdminAction {
            mutation: AdminMutation::DeletePackage {
                package_id: package_id.to_string(),
            },
            log: ActivityLogDraft {
                admin_email: admin_email.to_string(),
                action: "delete_package".to_string(),
                detail: format!("Deleted package {}", package.name),
            },
        })
    }

    pub fn set_transaction_query(&mut self, query: impl Into<String>) {
        self.transaction_query = query.into();
    }

    pub fn set_method_filter(&mut self, method: Option<PaymentMethod>) {
        self.method_filter = method;
    }

    pub fn set_user_query(&mut self, query: impl Into<String>) {
        self.user_query = query.into();
    }

    /// Substring match on buyer email and reference id, exact match on
    /// provider. Filtering is client-side only.
    pub fn filtered_transactions(&self) -> Vec<&Transaction> {
        let query = self.transaction_query.trim().to_lowercase();
        self.transactions
            .iter()
            .filter(|t| {
                if let Some(method) = self.method_filter
                    && t.payment_method != method
                {
                    return false;
                }
                query.is_empty()
                    || t.user_email.to_lowercase().contains(&query)
                    || t.trx_id.to_lowercase().contains(&query)
            })
            .collect()
    }

    pub fn filtered_users(&self) -> Vec<&Identity> {
        let query = self.user_query.trim().to_lowercase();
        self.users
            .iter()
            .filter(|u| {
                query.is_empty()
                    || u.email.to_lowercase().contains(&query)
                    || u.name.to_lowercase().contains(&query)
            })
            .collect()
    }

    fn pending_transaction(
        &self,
        transaction_id: &str,
    ) -> Result<&Transaction, AdminActionError> {
        let transaction = self
            .transactions
            .iter()
            .find(|t| t.id == transaction_id)
            .ok_or(AdminActionError::UnknownTransaction)?;
        if transaction.status != TransactionStatus::Pending {
            return Err(AdminActionError::NotPending);
        }
        Ok(transaction)
    }
}
