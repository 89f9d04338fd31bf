//! The orchestrator: composes the controllers and drives the async
//! collaborators, enforcing the cross-cutting rules the individual state
//! machines cannot see (one debit per successful generation, one audit entry
//! per admin mutation, subscription lifecycle).

use std::collections::HashMap;

use oneclick_client_core::{
    AuthApi, AuthError, AuthInputError, BuildDestination, BuildHostApi, BuildHostError, ChangeOp,
    DirectoryApi, DirectoryError, GenerationApi, Package, RealtimeApi, RealtimeSubscription,
    RecordChange, RecordPayload, SubscriptionScope, normalize_email, normalize_name,
    normalize_password,
};
use thiserror::Error;
use tracing::{info, warn};

use crate::admin::{AdminAction, AdminActionError, AdminConsoleState, AdminFetch, AdminMutation, AdminTab};
use crate::build::{BuildState, BuildWorkflow, NotConfigured};
use crate::chat::GenerationWorkflow;
use crate::modes::{AppMode, FetchToken, ModeController, ModeFetch};
use crate::payment::{PaymentInputError, PaymentWorkflow};
use crate::session::{LoginRejection, RegistrationOutcome, SessionStore, diff_subscriptions};

#[derive(Debug, Error)]
pub enum StudioError {
    #[error("account is suspended")]
    AccountSuspended,
    #[error("admin access required")]
    AccessDenied,
    #[error("no profile record for this account")]
    MissingProfile,
    #[error("no finished build to download")]
    NoFinishedBuild,
    #[error(transparent)]
    Input(#[from] AuthInputError),
    #[error(transparent)]
    Payment(#[from] PaymentInputError),
    #[error(transparent)]
    BuildNotConfigured(#[from] NotConfigured),
    #[error(transparent)]
    Admin(#[from] AdminActionError),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Directory(#[from] DirectoryError),
    #[error(transparent)]
    BuildHost(#[from] BuildHostError),
}

/// Result of one prompt submission, for the caller's UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Empty draft or a turn already in flight; nothing changed.
    Ignored,
    Completed,
    /// The turn failed; the transcript is unchanged and the failure was
    /// logged.
    Failed,
}

pub struct Studio<A, D, R, G, B> {
    auth: A,
    directory: D,
    realtime: R,
    generation: G,
    build_host: B,
    pub session: SessionStore,
    pub modes: ModeController,
    pub chat: GenerationWorkflow,
    pub build: BuildWorkflow,
    pub payment: PaymentWorkflow,
    pub admin: AdminConsoleState,
    destination: Option<BuildDestination>,
    shop_packages: Vec<Package>,
    subscriptions: HashMap<SubscriptionScope, RealtimeSubscription>,
}

impl<A, D, R, G, B> Studio<A, D, R, G, B>
where
    A: AuthApi,
    D: DirectoryApi,
    R: RealtimeApi,
    G: GenerationApi,
    B: BuildHostApi,
{
    pub fn new(
        auth: A,
        directory: D,
        realtime: R,
        generation: G,
        build_host: B,
        admin_entry: bool,
    ) -> Self {
        Self {
            auth,
            directory,
            realtime,
            generation,
            build_host,
            session: SessionStore::new(admin_entry),
            modes: ModeController::new(),
            chat: GenerationWorkflow::new(),
            build: BuildWorkflow::new(),
            payment: PaymentWorkflow::new(),
            admin: AdminConsoleState::new(),
            destination: None,
            shop_packages: Vec::new(),
            subscriptions: HashMap::new(),
        }
    }

    pub fn shop_packages(&self) -> &[Package] {
        &self.shop_packages
    }

    pub fn destination(&self) -> Option<&BuildDestination> {
        self.destination.as_ref()
    }

    pub fn set_destination(&mut self, destination: Option<BuildDestination>) {
        self.destination = destination;
    }

    /// Restores a persisted session, if any, then ends the loading gate. A
    /// restore failure means starting logged out, not failing the app.
    pub async fn bootstrap(&mut self) {
        let identity = match self.auth.current_session().await {
            Ok(Some(session)) => match self.directory.get_user(&session.user_id).await {
                Ok(identity) => identity,
                Err(err) => {
                    warn!(error = %err, "profile lookup during restore failed");
                    None
                }
            },
            Ok(None) => None,
            Err(err) => {
                warn!(error = %err, "session restore failed");
                None
            }
        };
        self.session.finish_bootstrap(identity);
        self.sync_subscriptions().await;
    }

    pub async fn sign_in(&mut self, email: &str, password: &str) -> Result<(), StudioError> {
        let identity = self.authenticate(email, password).await?;
        match self.session.apply_login(identity) {
            Ok(()) => {
                info!("signed in");
                self.sync_subscriptions().await;
                Ok(())
            }
            Err(rejection) => {
                // Suspended accounts do not get to keep the backend session.
                if let Err(err) = self.auth.sign_out().await {
                    warn!(error = %err, "sign-out after rejected login failed");
                }
                Err(rejection_error(rejection))
            }
        }
    }

    /// Login on the admin entry path. A failed role check clears only client
    /// state; the backend session is left as-is.
    pub async fn sign_in_admin(&mut self, email: &str, password: &str) -> Result<(), StudioError> {
        let identity = self.authenticate(email, password).await?;
        match self.session.apply_admin_login(identity) {
            Ok(()) => {
                info!("admin signed in");
                self.sync_subscriptions().await;
                Ok(())
            }
            Err(rejection) => Err(rejection_error(rejection)),
        }
    }

    /// Creates the account and stops there. The caller shows the
    /// check-your-email screen; nobody is logged in until verification.
    pub async fn register(
        &mut self,
        email: &str,
        password: &str,
        name: &str,
    ) -> Result<RegistrationOutcome, StudioError> {
        let email = normalize_email(email)?;
        let password = normalize_password(password)?;
        let name = normalize_name(name)?;
        self.auth.sign_up(&email, &password, &name).await?;
        Ok(RegistrationOutcome::CheckEmail)
    }

    pub async fn sign_out(&mut self) {
        if let Err(err) = self.auth.sign_out().await {
            warn!(error = %err, "sign-out failed");
        }
        self.session.clear();
        self.sync_subscriptions().await;
    }

    pub async fn request_password_reset(&self, email: &str) -> Result<(), StudioError> {
        let email = normalize_email(email)?;
        self.auth.reset_password(&email).await?;
        Ok(())
    }

    pub async fn resend_verification(&self, email: &str) -> Result<(), StudioError> {
        let email = normalize_email(email)?;
        self.auth.resend_verification(&email).await?;
        Ok(())
    }

    pub async fn change_password(&self, new_password: &str) -> Result<(), StudioError> {
        let password = normalize_password(new_password)?;
        self.auth.update_password(&password).await?;
        Ok(())
    }

    pub async fn save_bio(&mut self, bio: &str) -> Result<(), StudioError> {
        let user_id = self.current_user_id()?;
        self.directory.update_bio(&user_id, bio.trim()).await?;
        self.refresh_identity(&user_id).await;
        Ok(())
    }

    pub async fn save_avatar(&mut self, data_uri: &str) -> Result<(), StudioError> {
        let user_id = self.current_user_id()?;
        self.directory.update_avatar(&user_id, data_uri).await?;
        self.refresh_identity(&user_id).await;
        Ok(())
    }

    /// Switches workspace mode and runs the mode's entry fetches. Results
    /// landing after another switch are dropped.
    pub async fn enter_mode(&mut self, mode: AppMode) -> Result<(), StudioError> {
        let is_admin = self.session.is_admin();
        let (fetches, token) = self
            .modes
            .select(mode, is_admin)
            .map_err(|_| StudioError::AccessDenied)?;
        for fetch in fetches {
            self.run_mode_fetch(fetch, token).await;
        }
        Ok(())
    }

    pub fn tap_logo(&mut self) -> bool {
        self.modes.tap_logo()
    }

    /// One full generation turn. On success the backend debits exactly one
    /// token and its snapshot replaces the session identity; on failure
    /// nothing is debited and the transcript is untouched. The lock is
    /// released on every path.
    pub async fn submit_prompt(&mut self, now_ms: i64) -> SubmitOutcome {
        let Some(request) = self.chat.begin_submit(now_ms) else {
            return SubmitOutcome::Ignored;
        };
        match self
            .generation
            .generate(&request.prompt, &request.files, &request.history)
            .await
        {
            Ok(reply) => {
                self.chat.complete(now_ms, reply);
                if let Ok(user_id) = self.current_user_id() {
                    match self.directory.use_credit(&user_id).await {
                        Ok(identity) => self.session.apply_identity_update(identity),
                        Err(err) => warn!(error = %err, "credit debit failed"),
                    }
                }
                SubmitOutcome::Completed
            }
            Err(err) => {
                self.chat.fail(&err);
                SubmitOutcome::Failed
            }
        }
    }

    /// Pushes the current files to the configured destination. Refused while
    /// unconfigured so the caller can redirect to settings.
    pub async fn start_build(&mut self, now_ms: i64) -> Result<(), StudioError> {
        let configured = self
            .destination
            .as_ref()
            .is_some_and(BuildDestination::is_configured);
        self.build.start(configured)?;
        let Some(destination) = self.destination.clone() else {
            return Err(NotConfigured.into());
        };
        match self.build_host.push_files(&destination, self.chat.files()).await {
            Ok(()) => self.build.push_completed(now_ms),
            Err(err) => self.build.push_failed(err.to_string()),
        }
        Ok(())
    }

    /// One artifact poll. A result arriving after a reset or a newer build
    /// is dropped by the ticket check.
    pub async fn poll_build_once(&mut self) {
        let Some(ticket) = self.build.poll_ticket() else {
            return;
        };
        let Some(destination) = self.destination.clone() else {
            return;
        };
        match self
            .build_host
            .latest_artifact(&destination, self.build.pushed_at_ms())
            .await
        {
            Ok(found) => self.build.observe_poll(ticket, found),
            Err(err) => self.build.observe_poll_failure(ticket, err.to_string()),
        }
    }

    /// Fetches the finished artifact archive. Free action; the build state
    /// machine is not involved.
    pub async fn download_artifact(&self) -> Result<Vec<u8>, StudioError> {
        let BuildState::Success(artifact) = self.build.state() else {
            return Err(StudioError::NoFinishedBuild);
        };
        let destination = self
            .destination
            .as_ref()
            .ok_or(StudioError::BuildNotConfigured(NotConfigured))?;
        Ok(self.build_host.download_artifact(destination, artifact).await?)
    }

    /// Submits the payment wizard's form as a pending transaction.
    pub async fn submit_payment(&mut self) -> Result<(), StudioError> {
        let buyer = self
            .session
            .identity()
            .cloned()
            .ok_or(StudioError::MissingProfile)?;
        let draft = self.payment.begin_submit(&buyer)?;
        match self.directory.submit_payment(&draft).await {
            Ok(_) => {
                self.payment.submit_succeeded();
                Ok(())
            }
            Err(err) => {
                self.payment.submit_failed(err.to_string());
                Err(err.into())
            }
        }
    }

    pub async fn enter_admin_tab(&mut self, tab: AdminTab) {
        for fetch in self.admin.enter_tab(tab) {
            self.run_admin_fetch(fetch).await;
        }
    }

    /// Applies an admin action: the mutation, then exactly one audit entry,
    /// then a refresh of the affected lists. A failed mutation logs nothing.
    pub async fn apply_admin_action(&mut self, action: AdminAction) -> Result<(), StudioError> {
        match &action.mutation {
            AdminMutation::ApproveTransaction { transaction_id } => {
                self.directory.approve_transaction(transaction_id).await?;
            }
            AdminMutation::RejectTransaction { transaction_id } => {
                self.directory.reject_transaction(transaction_id).await?;
            }
            AdminMutation::SetBanned { user_id, banned } => {
                self.directory.set_banned(user_id, *banned).await?;
            }
            AdminMutation::AdjustTokens { user_id, delta } => {
                self.directory.adjust_tokens(user_id, *delta).await?;
            }
            AdminMutation::CreatePackage { draft } => {
                self.directory.create_package(draft).await?;
            }
            AdminMutation::UpdatePackage { package_id, draft } => {
                self.directory.update_package(package_id, draft).await?;
            }
            AdminMutation::DeletePackage { package_id } => {
                self.directory.delete_package(package_id).await?;
            }
        }
        self.directory.append_log(&action.log).await?;
        self.refresh_after(&action.mutation).await;
        Ok(())
    }

    /// Opens and tears down feeds so the active set matches what the session
    /// currently calls for.
    pub async fn sync_subscriptions(&mut self) {
        let desired = self.session.desired_subscriptions();
        let active: Vec<SubscriptionScope> = self.subscriptions.keys().cloned().collect();
        let diff = diff_subscriptions(&active, &desired);
        for scope in diff.close {
            if let Some(subscription) = self.subscriptions.remove(&scope) {
                subscription.close();
            }
        }
        for scope in diff.open {
            match self.realtime.subscribe(scope.clone()).await {
                Ok(subscription) => {
                    self.subscriptions.insert(scope, subscription);
                }
                Err(err) => warn!(error = %err, "realtime subscribe failed"),
            }
        }
    }

    /// Drains buffered feed changes and applies them.
    pub async fn pump_realtime(&mut self) {
        let mut changes = Vec::new();
        for subscription in self.subscriptions.values_mut() {
            while let Some(change) = subscription.try_next() {
                changes.push(change);
            }
        }
        for change in changes {
            self.apply_record_change(change).await;
        }
    }

    /// Inserts reach the admin console for any admin identity, whichever
    /// entry path they signed in on, and trigger the follow-up fetches the
    /// console asks for.
    pub async fn apply_record_change(&mut self, change: RecordChange) {
        match change.payload {
            RecordPayload::User(identity) => self.session.apply_identity_update(identity),
            RecordPayload::Transaction(transaction) => {
                self.session.observe_own_transaction(&transaction);
                if change.op == ChangeOp::Insert && self.session.is_admin() {
                    for fetch in self.admin.observe_transaction_insert(transaction) {
                        self.run_admin_fetch(fetch).await;
                    }
                }
            }
        }
    }

    async fn authenticate(&mut self, email: &str, password: &str) -> Result<
        oneclick_client_core::Identity,
        StudioError,
    > {
        let email = normalize_email(email)?;
        let password = normalize_password(password)?;
        let session = self.auth.sign_in(&email, &password).await?;
        self.directory
            .get_user(&session.user_id)
            .await?
            .ok_or(StudioError::MissingProfile)
    }

    fn current_user_id(&self) -> Result<String, StudioError> {
        self.session
            .identity()
            .map(|identity| identity.id.clone())
            .ok_or(StudioError::MissingProfile)
    }

    async fn refresh_identity(&mut self, user_id: &str) {
        match self.directory.get_user(user_id).await {
            Ok(Some(identity)) => self.session.apply_identity_update(identity),
            Ok(None) => warn!("profile row disappeared during refresh"),
            Err(err) => warn!(error = %err, "identity refresh failed"),
        }
    }

    async fn run_mode_fetch(&mut self, fetch: ModeFetch, token: FetchToken) {
        match fetch {
            ModeFetch::Packages => match self.directory.packages().await {
                Ok(packages) => {
                    if self.modes.accept(token) {
                        self.shop_packages = packages;
                    }
                }
                Err(err) => warn!(error = %err, "package fetch failed"),
            },
            ModeFetch::AdminTransactions => match self.directory.transactions().await {
                Ok(transactions) => {
                    if self.modes.accept(token) {
                        self.admin.set_transactions(transactions);
                    }
                }
                Err(err) => warn!(error = %err, "transaction fetch failed"),
            },
            ModeFetch::AdminStats => match self.directory.admin_stats().await {
                Ok(stats) => {
                    if self.modes.accept(token) {
                        self.admin.set_stats(stats);
                    }
                }
                Err(err) => warn!(error = %err, "stats fetch failed"),
            },
        }
    }

    async fn run_admin_fetch(&mut self, fetch: AdminFetch) {
        match fetch {
            AdminFetch::Stats => match self.directory.admin_stats().await {
                Ok(stats) => self.admin.set_stats(stats),
                Err(err) => warn!(error = %err, "stats fetch failed"),
            },
            AdminFetch::Transactions => match self.directory.transactions().await {
                Ok(transactions) => self.admin.set_transactions(transactions),
                Err(err) => warn!(error = %err, "transaction fetch failed"),
            },
            AdminFetch::Packages => match self.directory.packages().await {
                Ok(packages) => self.admin.set_packages(packages),
                Err(err) => warn!(error = %err, "package fetch failed"),
            },
            AdminFetch::Users => match self.directory.users().await {
                Ok(users) => self.admin.set_users(users),
                Err(err) => warn!(error = %err, "user fetch failed"),
            },
            AdminFetch::Logs => match self.directory.activity_logs().await {
                Ok(logs) => self.admin.set_logs(logs),
                Err(err) => warn!(error = %err, "log fetch failed"),
            },
        }
    }

    async fn refresh_after(&mut self, mutation: &AdminMutation) {
        match mutation {
            AdminMutation::ApproveTransaction { .. } | AdminMutation::RejectTransaction { .. } => {
                self.run_admin_fetch(AdminFetch::Transactions).await;
                self.run_admin_fetch(AdminFetch::Stats).await;
                if self.admin.users_loaded() {
                    self.run_admin_fetch(AdminFetch::Users).await;
                }
            }
            AdminMutation::SetBanned { .. } | AdminMutation::AdjustTokens { .. } => {
                self.run_admin_fetch(AdminFetch::Users).await;
            }
            AdminMutation::CreatePackage { .. }
            | AdminMutation::UpdatePackage { .. }
            | AdminMutation::DeletePackage { .. } => {
                self.run_admin_fetch(AdminFetch::Packages).await;
            }
        }
        if self.admin.logs_loaded() {
            self.run_admin_fetch(AdminFetch::Logs).await;
        }
    }
}

fn rejection_error(rejection: LoginRejection) -> StudioError {
    match rejection {
        LoginRejection::AccountSuspended => StudioError::AccountSuspended,
        LoginRejection::AccessDenied => StudioError::AccessDenied,
    }
}
