//! Polling record-change feed.
//!
//! The backend is polled on a fixed interval and the results are diffed
//! against what the loop has already seen; only genuine changes reach the
//! subscriber. A push transport can replace this behind the same trait.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use oneclick_client_core::{
    ChangeOp, DirectoryApi, Identity, RealtimeApi, RealtimeError, RealtimeSubscription,
    RecordChange, RecordPayload, SubscriptionScope, Transaction, TransactionStatus,
};
use tokio::sync::{mpsc, oneshot};
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

pub struct PollingFeed<D> {
    directory: Arc<D>,
    interval: Duration,
}

impl<D> PollingFeed<D> {
    pub fn new(directory: Arc<D>, interval: Duration) -> Self {
        Self {
            directory,
            interval,
        }
    }
}

#[async_trait]
impl<D> RealtimeApi for PollingFeed<D>
where
    D: DirectoryApi + 'static,
{
    async fn subscribe(
        &self,
        scope: SubscriptionScope,
    ) -> Result<RealtimeSubscription, RealtimeError> {
        let (tx, rx) = mpsc::unbounded_channel();
        let (stop_tx, stop_rx) = oneshot::channel();
        let directory = Arc::clone(&self.directory);
        let interval = self.interval;
        let loop_scope = scope.clone();
        tokio::spawn(async move {
            run_poll_loop(directory, loop_scope, interval, tx, stop_rx).await;
        });
        Ok(RealtimeSubscription::new(scope, rx, Some(stop_tx)))
    }
}

async fn run_poll_loop<D: DirectoryApi>(
    directory: Arc<D>,
    scope: SubscriptionScope,
    interval: Duration,
    tx: mpsc::UnboundedSender<RecordChange>,
    mut stop_rx: oneshot::Receiver<()>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut ledger = TransactionLedger::new();
    let mut watch = IdentityWatch::new();
    loop {
        tokio::select! {
            _ = &mut stop_rx => {
                debug!(?scope, "poll loop stopped");
                break;
            }
            _ = ticker.tick() => {
                let changes = poll_once(directory.as_ref(), &scope, &mut ledger, &mut watch).await;
                let mut closed = false;
                for change in changes {
                    if tx.send(change).is_err() {
                        closed = true;
                        break;
                    }
                }
                if closed {
                    break;
                }
            }
        }
    }
}

async fn poll_once<D: DirectoryApi>(
    directory: &D,
    scope: &SubscriptionScope,
    ledger: &mut TransactionLedger,
    watch: &mut IdentityWatch,
) -> Vec<RecordChange> {
    match scope {
        SubscriptionScope::AdminTransactionInserts => match directory.transactions().await {
            Ok(rows) => ledger
                .diff(&rows)
                .into_iter()
                .filter(|change| change.op == ChangeOp::Insert)
                .collect(),
            Err(err) => {
                warn!(error = %err, "transaction poll failed");
                Vec::new()
            }
        },
        SubscriptionScope::OwnTransactions { user_id } => match directory.transactions().await {
            Ok(rows) => {
                let own: Vec<Transaction> = rows
                    .into_iter()
                    .filter(|t| &t.user_id == user_id)
                    .collect();
                ledger.diff(&own)
            }
            Err(err) => {
                warn!(error = %err, "transaction poll failed");
                Vec::new()
            }
        },
        SubscriptionScope::OwnIdentity { user_id } => match directory.get_user(user_id).await {
            Ok(row) => watch.diff(row).into_iter().collect(),
            Err(err) => {
                warn!(error = %err, "identity poll failed");
                Vec::new()
            }
        },
    }
}

/// Tracks which transaction rows a loop has seen. The first poll primes the
/// ledger without emitting anything; rows that existed before the
/// subscription are not news.
struct TransactionLedger {
    known: HashMap<String, TransactionStatus>,
    primed: bool,
}

impl TransactionLedger {
    fn new() -> Self {
        Self {
            known: HashMap::new(),
            primed: false,
        }
    }

    fn diff(&mut self, rows: &[Transaction]) -> Vec<RecordChange> {
        let mut changes = Vec::new();
        for row in rows {
            match self.known.get(&row.id) {
                None => {
                    if self.primed {
                        changes.push(RecordChange {
                            op: ChangeOp::Insert,
                            payload: RecordPayload::Transaction(row.clone()),
                        });
                    }
                    self.known.insert(row.id.clone(), row.status);
                }
                Some(status) if *status != row.status => {
                    self.known.insert(row.id.clone(), row.status);
                    changes.push(RecordChange {
                        op: ChangeOp::Update,
                        payload: RecordPayload::Transaction(row.clone()),
                    });
                }
                Some(_) => {}
            }
        }
        self.primed = true;
        changes
    }
}

/// Tracks one user row and reports it when it changes.
struct IdentityWatch {
    last: Option<Identity>,
    primed: bool,
}

impl IdentityWatch {
    fn new() -> Self {
        Self {
            last: None,
            primed: false,
        }
    }

    fn diff(&mut self, row: Option<Identity>) -> Option<RecordChange> {
        let primed = std::mem::replace(&mut self.primed, true);
        let changed = row.is_some() && row != self.last;
        if row.is_some() {
            self.last = row;
        }
        if !primed || !changed {
            return None;
        }
        self.last.as_ref().map(|identity| RecordChange {
            op: ChangeOp::Update,
            payload: RecordPayload::User(identity.clone()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use oneclick_client_core::PaymentMethod;

    fn transaction(id: &str, user_id: &str, status: TransactionStatus) -> Transaction {
        Transaction {
            id: id.to_string(),
            user_id: user_id.to_string(),
            user_email: format!("{user_id}@example.com"),
            package_id: "p1".to_string(),
            package_name: "Starter".to_string(),
            amount: 500,
            tokens: 50,
            payment_method: PaymentMethod::Bkash,
            trx_id: format!("TX-{id}"),
            screenshot: None,
            note: None,
            status,
            created_at: Utc::now(),
        }
    }

    fn identity(id: &str, tokens: u64) -> Identity {
        Identity {
            id: id.to_string(),
            email: format!("{id}@example.com"),
            name: id.to_string(),
            is_admin: false,
            tokens,
            is_verified: true,
            is_banned: false,
            avatar_url: None,
            bio: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn first_poll_primes_without_emitting() {
        let mut ledger = TransactionLedger::new();
        let rows = vec![transaction("t1", "u1", TransactionStatus::Pending)];
        assert!(ledger.diff(&rows).is_empty());

        // Same rows again: still nothing.
        assert!(ledger.diff(&rows).is_empty());
    }

    #[test]
    fn new_rows_after_priming_emit_inserts() {
        let mut ledger = TransactionLedger::new();
        ledger.diff(&[transaction("t1", "u1", TransactionStatus::Pending)]);

        let rows = vec![
            transaction("t1", "u1", TransactionStatus::Pending),
            transaction("t2", "u2", TransactionStatus::Pending),
        ];
        let changes = ledger.diff(&rows);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].op, ChangeOp::Insert);
        match &changes[0].payload {
            RecordPayload::Transaction(t) => assert_eq!(t.id, "t2"),
            other => panic!("unexpected payload: {other:?}"),
        }
    }

    #[test]
    fn status_changes_emit_updates() {
        let mut ledger = TransactionLedger::new();
        ledger.diff(&[transaction("t1", "u1", TransactionStatus::Pending)]);

        let changes = ledger.diff(&[transaction("t1", "u1", TransactionStatus::Completed)]);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].op, ChangeOp::Update);
    }

    #[test]
    fn identity_watch_reports_only_real_changes() {
        let mut watch = IdentityWatch::new();
        assert!(watch.diff(Some(identity("u1", 5))).is_none());
        assert!(watch.diff(Some(identity("u1", 5))).is_none());

        let change = watch.diff(Some(identity("u1", 4))).expect("change");
        assert_eq!(change.op, ChangeOp::Update);
        match change.payload {
            RecordPayload::User(user) => assert_eq!(user.tokens, 4),
            other => panic!("unexpected payload: {other:?}"),
        }

        // A transient missing row is not an update.
        assert!(watch.diff(None).is_none());
    }

    #[test]
    fn identity_watch_reports_a_row_that_appears_after_priming() {
        let mut watch = IdentityWatch::new();
        assert!(watch.diff(None).is_none());
        assert!(watch.diff(Some(identity("u1", 5))).is_some());
    }
}
