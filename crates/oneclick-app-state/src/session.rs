//! Session gate: who is logged in and which top-level surface to show.

use oneclick_client_core::{Identity, SubscriptionScope, Transaction, TransactionStatus};
use thiserror::Error;

/// Top-level surface. Derived, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Bootstrap still running; nothing else renders yet.
    Loading,
    AdminLogin,
    Splash,
    Login,
    Shell,
    AdminConsole,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LoginRejection {
    #[error("account is suspended")]
    AccountSuspended,
    #[error("admin access required")]
    AccessDenied,
}

/// Registration never yields a session; the account must be verified first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationOutcome {
    CheckEmail,
}

/// One-shot celebration shown when a pending purchase completes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreditOverlay {
    pub tokens: u64,
    pub amount: u64,
}

#[derive(Debug)]
pub struct SessionStore {
    loading: bool,
    /// True when the client was opened on the admin entry path.
    admin_entry: bool,
    splash_done: bool,
    identity: Option<Identity>,
    overlay: Option<CreditOverlay>,
}

impl SessionStore {
    pub fn new(admin_entry: bool) -> Self {
        Self {
            loading: true,
            admin_entry,
            splash_done: false,
            identity: None,
            overlay: None,
        }
    }

    pub fn route(&self) -> Route {
        if self.loading {
            return Route::Loading;
        }
        if self.admin_entry {
            return match &self.identity {
                Some(identity) if identity.is_admin => Route::AdminConsole,
                _ => Route::AdminLogin,
            };
        }
        match &self.identity {
            Some(_) => Route::Shell,
            None if self.splash_done => Route::Login,
            None => Route::Splash,
        }
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    pub fn is_admin(&self) -> bool {
        self.identity.as_ref().is_some_and(|i| i.is_admin)
    }

    pub fn overlay(&self) -> Option<&CreditOverlay> {
        self.overlay.as_ref()
    }

    /// Ends the auth-restore gate. A restored identity is accepted as-is.
    pub fn finish_bootstrap(&mut self, identity: Option<Identity>) {
        self.identity = identity;
        self.loading = false;
    }

    pub fn complete_splash(&mut self) {
        self.splash_done = true;
    }

    /// Accepts a fresh login. Suspended accounts are rejected and the store
    /// stays logged out.
    pub fn apply_login(&mut self, identity: Identity) -> Result<(), LoginRejection> {
        if identity.is_banned {
            return Err(LoginRejection::AccountSuspended);
        }
        self.identity = Some(identity);
        Ok(())
    }

    /// Login on the admin entry path additionally requires the admin role.
    pub fn apply_admin_login(&mut self, identity: Identity) -> Result<(), LoginRejection> {
        if identity.is_banned {
            return Err(LoginRejection::AccountSuspended);
        }
        if !identity.is_admin {
            return Err(LoginRejection::AccessDenied);
        }
        self.identity = Some(identity);
        Ok(())
    }

    pub fn clear(&mut self) {
        self.identity = None;
        self.overlay = None;
    }

    /// Wholesale snapshot replace. Updates for another user are ignored.
    pub fn apply_identity_update(&mut self, identity: Identity) {
        match &self.identity {
            Some(current) if current.id == identity.id => self.identity = Some(identity),
            _ => {}
        }
    }

    /// Raises the credit overlay when one of the caller's own transactions
    /// completes.
    pub fn observe_own_transaction(&mut self, transaction: &Transaction) {
        let Some(identity) = &self.identity else {
            return;
        };
        if transaction.user_id != identity.id {
            return;
        }
        if transaction.status == TransactionStatus::Completed {
            self.overlay = Some(CreditOverlay {
                tokens: transaction.tokens,
                amount: transaction.amount,
            });
        }
    }

    pub fn dismiss_overlay(&mut self) {
        self.overlay = None;
    }

    /// The feeds that should be live right now. The admin feed follows the
    /// role alone: an admin signed in through the standard shell gets it
    /// too, and it goes away when the identity is cleared or loses the
    /// role.
    pub fn desired_subscriptions(&self) -> Vec<SubscriptionScope> {
        let Some(identity) = &self.identity else {
            return Vec::new();
        };
        let mut scopes = vec![
            SubscriptionScope::OwnIdentity {
                user_id: identity.id.clone(),
            },
            SubscriptionScope::OwnTransactions {
                user_id: identity.id.clone(),
            },
        ];
        if identity.is_admin {
            scopes.push(SubscriptionScope::AdminTransactionInserts);
        }
        scopes
    }
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct SubscriptionDiff {
    pub open: Vec<SubscriptionScope>,
    pub close: Vec<SubscriptionScope>,
}

/// What to open and what to tear down to move from `active` to `desired`.
pub fn diff_subscriptions(
    active: &[SubscriptionScope],
    desired: &[SubscriptionScope],
) -> SubscriptionDiff {
    SubscriptionDiff {
        open: desired
            .iter()
            .filter(|scope| !active.contains(scope))
            .cloned()
            .collect(),
        close: active
            .iter()
            .filter(|scope| !desired.contains(scope))
            .cloned()
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use oneclick_client_core::PaymentMethod;

    fn identity(id: &str, is_admin: bool, is_banned: bool) -> Identity {
        Identity {
            id: id.to_string(),
            email: format!("{id}@example.com"),
            name: id.to_string(),
            is_admin,
            tokens: 5,
            is_verified: true,
            is_banned,
            avatar_url: None,
            bio: None,
            created_at: Utc::now(),
        }
    }

    fn completed_transaction(user_id: &str) -> Transaction {
        Transaction {
            id: "t1".to_string(),
            user_id: user_id.to_string(),
            user_email: format!("{user_id}@example.com"),
            package_id: "p1".to_string(),
            package_name: "Starter".to_string(),
            amount: 500,
            tokens: 50,
            payment_method: PaymentMethod::Bkash,
            trx_id: "TX123".to_string(),
            screenshot: None,
            note: None,
            status: TransactionStatus::Completed,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn routes_follow_the_user_journey() {
        let mut store = SessionStore::new(false);
        assert_eq!(store.route(), Route::Loading);

        store.finish_bootstrap(None);
        assert_eq!(store.route(), Route::Splash);

        store.complete_splash();
        assert_eq!(store.route(), Route::Login);

        store.apply_login(identity("u1", false, false)).expect("login");
        assert_eq!(store.route(), Route::Shell);

        store.clear();
        assert_eq!(store.route(), Route::Login);
    }

    #[test]
    fn admin_entry_routes_to_admin_surfaces() {
        let mut store = SessionStore::new(true);
        store.finish_bootstrap(None);
        assert_eq!(store.route(), Route::AdminLogin);

        store.apply_admin_login(identity("a1", true, false)).expect("login");
        assert_eq!(store.route(), Route::AdminConsole);
    }

    #[test]
    fn suspended_accounts_stay_logged_out() {
        let mut store = SessionStore::new(false);
        store.finish_bootstrap(None);
        assert_eq!(
            store.apply_login(identity("u1", false, true)),
            Err(LoginRejection::AccountSuspended)
        );
        assert!(store.identity().is_none());
    }

    #[test]
    fn admin_login_rejects_non_admins() {
        let mut store = SessionStore::new(true);
        store.finish_bootstrap(None);
        assert_eq!(
            store.apply_admin_login(identity("u1", false, false)),
            Err(LoginRejection::AccessDenied)
        );
        assert_eq!(store.route(), Route::AdminLogin);
    }

    #[test]
    fn identity_updates_replace_the_whole_snapshot() {
        let mut store = SessionStore::new(false);
        store.finish_bootstrap(Some(identity("u1", false, false)));

        let mut updated = identity("u1", false, false);
        updated.tokens = 42;
        updated.bio = Some("hi".to_string());
        store.apply_identity_update(updated.clone());
        assert_eq!(store.identity(), Some(&updated));

        // A row belonging to someone else never lands here.
        store.apply_identity_update(identity("u2", false, false));
        assert_eq!(store.identity().map(|i| i.id.as_str()), Some("u1"));
    }

    #[test]
    fn completed_own_transaction_raises_the_overlay() {
        let mut store = SessionStore::new(false);
        store.finish_bootstrap(Some(identity("u1", false, false)));

        store.observe_own_transaction(&completed_transaction("u2"));
        assert!(store.overlay().is_none());

        store.observe_own_transaction(&completed_transaction("u1"));
        assert_eq!(
            store.overlay(),
            Some(&CreditOverlay {
                tokens: 50,
                amount: 500
            })
        );

        store.dismiss_overlay();
        assert!(store.overlay().is_none());
    }

    #[test]
    fn pending_transaction_does_not_raise_the_overlay() {
        let mut store = SessionStore::new(false);
        store.finish_bootstrap(Some(identity("u1", false, false)));

        let mut txn = completed_transaction("u1");
        txn.status = TransactionStatus::Pending;
        store.observe_own_transaction(&txn);
        assert!(store.overlay().is_none());
    }

    #[test]
    fn admin_feed_follows_the_role_not_the_entry_path() {
        // An admin in the standard shell still watches for new transactions.
        let mut shell = SessionStore::new(false);
        shell.finish_bootstrap(Some(identity("a1", true, false)));
        assert!(
            shell
                .desired_subscriptions()
                .contains(&SubscriptionScope::AdminTransactionInserts)
        );

        let mut member = SessionStore::new(false);
        member.finish_bootstrap(Some(identity("u1", false, false)));
        assert!(
            !member
                .desired_subscriptions()
                .contains(&SubscriptionScope::AdminTransactionInserts)
        );

        member.clear();
        assert!(member.desired_subscriptions().is_empty());
    }

    #[test]
    fn diff_opens_missing_and_closes_stale_scopes() {
        let own = SubscriptionScope::OwnIdentity {
            user_id: "u1".to_string(),
        };
        let admin = SubscriptionScope::AdminTransactionInserts;

        let diff = diff_subscriptions(&[admin.clone()], std::slice::from_ref(&own));
        assert_eq!(diff.open, vec![own.clone()]);
        assert_eq!(diff.close, vec![admin]);

        let steady = diff_subscriptions(std::slice::from_ref(&own), std::slice::from_ref(&own));
        assert_eq!(steady, SubscriptionDiff::default());
    }
}
