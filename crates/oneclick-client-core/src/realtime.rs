//! Record-change feed contract.
//!
//! Scopes name exactly the three live views the client keeps: the admin's
//! pending-transaction badge, the logged-in user's own row, and the user's
//! own transactions.

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

use crate::types::{Identity, Transaction};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SubscriptionScope {
    /// New transaction rows, any user. Admin console only.
    AdminTransactionInserts,
    /// Updates to the caller's own user row.
    OwnIdentity { user_id: String },
    /// Changes to the caller's own transactions.
    OwnTransactions { user_id: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeOp {
    Insert,
    Update,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RecordPayload {
    User(Identity),
    Transaction(Transaction),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordChange {
    pub op: ChangeOp,
    pub payload: RecordPayload,
}

/// Live handle to one scope. Dropping it (or calling [`close`]) tears down
/// whatever backend work feeds it.
///
/// [`close`]: RealtimeSubscription::close
pub struct RealtimeSubscription {
    scope: SubscriptionScope,
    changes: mpsc::UnboundedReceiver<RecordChange>,
    stop: Option<oneshot::Sender<()>>,
}

impl RealtimeSubscription {
    pub fn new(
        scope: SubscriptionScope,
        changes: mpsc::UnboundedReceiver<RecordChange>,
        stop: Option<oneshot::Sender<()>>,
    ) -> Self {
        Self {
            scope,
            changes,
            stop,
        }
    }

    pub fn scope(&self) -> &SubscriptionScope {
        &self.scope
    }

    /// Next change, if one is already buffered.
    pub fn try_next(&mut self) -> Option<RecordChange> {
        self.changes.try_recv().ok()
    }

    /// Waits for the next change. `None` once the feed has shut down.
    pub async fn next_change(&mut self) -> Option<RecordChange> {
        self.changes.recv().await
    }

    pub fn close(mut self) {
        self.signal_stop();
    }

    fn signal_stop(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
    }
}

impl Drop for RealtimeSubscription {
    fn drop(&mut self) {
        self.signal_stop();
    }
}

#[derive(Debug, Error)]
pub enum RealtimeError {
    #[error("realtime transport failure: {0}")]
    Transport(String),
}

#[async_trait]
pub trait RealtimeApi: Send + Sync {
    async fn subscribe(
        &self,
        scope: SubscriptionScope,
    ) -> Result<RealtimeSubscription, RealtimeError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn drop_signals_the_stop_channel() {
        let (_tx, rx) = mpsc::unbounded_channel();
        let (stop_tx, stop_rx) = oneshot::channel();
        let sub =
            RealtimeSubscription::new(SubscriptionScope::AdminTransactionInserts, rx, Some(stop_tx));
        drop(sub);
        assert!(stop_rx.await.is_ok());
    }

    #[tokio::test]
    async fn buffered_changes_drain_with_try_next() {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut sub = RealtimeSubscription::new(
            SubscriptionScope::OwnIdentity {
                user_id: "u1".to_string(),
            },
            rx,
            None,
        );
        assert!(sub.try_next().is_none());

        let change = RecordChange {
            op: ChangeOp::Update,
            payload: RecordPayload::User(crate::types::Identity {
                id: "u1".to_string(),
                email: "a@b.c".to_string(),
                name: "Ana".to_string(),
                is_admin: false,
                tokens: 3,
                is_verified: true,
                is_banned: false,
                avatar_url: None,
                bio: None,
                created_at: chrono::Utc::now(),
            }),
        };
        tx.send(change.clone()).expect("send");
        assert_eq!(sub.try_next(), Some(change));
    }
}
