//! Hosted backend transport: auth endpoints and row access, plus the RPCs
//! that must run atomically server-side (credit debit, approval).

use std::sync::Arc;

use async_trait::async_trait;
use oneclick_client_core::{
    ActivityLog, ActivityLogDraft, AdminStats, AuthApi, AuthError, AuthSession, DirectoryApi,
    DirectoryError, Identity, NewTransaction, Package, PackageDraft, Transaction,
};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tokio::sync::RwLock;

use crate::config::BackendConfig;

/// Shared connection state: one HTTP client, the project keys, and the
/// access token of the signed-in user (the anon key is used until then).
#[derive(Clone)]
pub struct SupabaseContext {
    http: Client,
    base_url: String,
    anon_key: String,
    access_token: Arc<RwLock<Option<String>>>,
}

impl SupabaseContext {
    pub fn new(base_url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            anon_key: anon_key.into(),
            access_token: Arc::new(RwLock::new(None)),
        }
    }

    pub fn from_config(config: &BackendConfig) -> Self {
        Self::new(&config.supabase_url, &config.supabase_anon_key)
    }

    fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{path}", self.base_url)
    }

    fn rest_url(&self, resource: &str) -> String {
        format!("{}/rest/v1/{resource}", self.base_url)
    }

    fn rpc_url(&self, function: &str) -> String {
        format!("{}/rest/v1/rpc/{function}", self.base_url)
    }

    async fn authed(&self, builder: RequestBuilder) -> RequestBuilder {
        let token = self.access_token.read().await.clone();
        let bearer = token.unwrap_or_else(|| self.anon_key.clone());
        builder.header("apikey", &self.anon_key).bearer_auth(bearer)
    }

    async fn set_token(&self, token: Option<String>) {
        *self.access_token.write().await = token;
    }

    async fn has_token(&self) -> bool {
        self.access_token.read().await.is_some()
    }
}

fn password_grant_body(email: &str, password: &str) -> Value {
    json!({ "email": email, "password": password })
}

fn signup_body(email: &str, password: &str, name: &str) -> Value {
    json!({
        "email": email,
        "password": password,
        "data": { "name": name }
    })
}

/// Pulls the access token and the session identity out of a token-endpoint
/// payload.
fn parse_session(value: &Value) -> Option<(String, AuthSession)> {
    let access_token = value.get("access_token")?.as_str()?.to_string();
    let user = value.get("user")?;
    Some((access_token, parse_user(user)?))
}

fn parse_user(user: &Value) -> Option<AuthSession> {
    Some(AuthSession {
        user_id: user.get("id")?.as_str()?.to_string(),
        email: user.get("email")?.as_str()?.to_string(),
    })
}

async fn error_detail(response: Response) -> String {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    format!("{status}: {body}")
}

#[derive(Clone)]
pub struct SupabaseAuth {
    ctx: SupabaseContext,
}

impl SupabaseAuth {
    pub fn new(ctx: SupabaseContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl AuthApi for SupabaseAuth {
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, AuthError> {
        let response = self
            .ctx
            .http
            .post(self.ctx.auth_url("token?grant_type=password"))
            .header("apikey", &self.ctx.anon_key)
            .json(&password_grant_body(email, password))
            .send()
            .await
            .map_err(|err| AuthError::Transport(err.to_string()))?;
        if matches!(
            response.status(),
            StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED
        ) {
            return Err(AuthError::InvalidCredentials);
        }
        if !response.status().is_success() {
            return Err(AuthError::Rejected(error_detail(response).await));
        }
        let value: Value = response
            .json()
            .await
            .map_err(|err| AuthError::Transport(err.to_string()))?;
        let (token, session) = parse_session(&value)
            .ok_or_else(|| AuthError::Rejected("malformed session payload".to_string()))?;
        self.ctx.set_token(Some(token)).await;
        Ok(session)
    }

    async fn sign_up(&self, email: &str, password: &str, name: &str) -> Result<(), AuthError> {
        let response = self
            .ctx
            .http
            .post(self.ctx.auth_url("signup"))
            .header("apikey", &self.ctx.anon_key)
            .json(&signup_body(email, password, name))
            .send()
            .await
            .map_err(|err| AuthError::Transport(err.to_string()))?;
        if !response.status().is_success() {
            return Err(AuthError::Rejected(error_detail(response).await));
        }
        Ok(())
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        if !self.ctx.has_token().await {
            return Ok(());
        }
        let request = self.ctx.authed(self.ctx.http.post(self.ctx.auth_url("logout"))).await;
        let result = request.send().await;
        // The local token is dropped even when the backend call fails.
        self.ctx.set_token(None).await;
        let response = result.map_err(|err| AuthError::Transport(err.to_string()))?;
        if !response.status().is_success() {
            return Err(AuthError::Rejected(error_detail(response).await));
        }
        Ok(())
    }

    async fn current_session(&self) -> Result<Option<AuthSession>, AuthError> {
        if !self.ctx.has_token().await {
            return Ok(None);
        }
        let request = self.ctx.authed(self.ctx.http.get(self.ctx.auth_url("user"))).await;
        let response = request
            .send()
            .await
            .map_err(|err| AuthError::Transport(err.to_string()))?;
        if response.status() == StatusCode::UNAUTHORIZED {
            self.ctx.set_token(None).await;
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(AuthError::Rejected(error_detail(response).await));
        }
        let value: Value = response
            .json()
            .await
            .map_err(|err| AuthError::Transport(err.to_string()))?;
        Ok(parse_user(&value))
    }

    async fn reset_password(&self, email: &str) -> Result<(), AuthError> {
        let response = self
            .ctx
            .http
            .post(self.ctx.auth_url("recover"))
            .header("apikey", &self.ctx.anon_key)
            .json(&json!({ "email": email }))
            .send()
            .await
            .map_err(|err| AuthError::Transport(err.to_string()))?;
        if !response.status().is_success() {
            return Err(AuthError::Rejected(error_detail(response).await));
        }
        Ok(())
    }

    async fn resend_verification(&self, email: &str) -> Result<(), AuthError> {
        let response = self
            .ctx
            .http
            .post(self.ctx.auth_url("resend"))
            .header("apikey", &self.ctx.anon_key)
            .json(&json!({ "type": "signup", "email": email }))
            .send()
            .await
            .map_err(|err| AuthError::Transport(err.to_string()))?;
        if !response.status().is_success() {
            return Err(AuthError::Rejected(error_detail(response).await));
        }
        Ok(())
    }

    async fn update_password(&self, new_password: &str) -> Result<(), AuthError> {
        if !self.ctx.has_token().await {
            return Err(AuthError::Rejected("not signed in".to_string()));
        }
        let request = self.ctx.authed(self.ctx.http.put(self.ctx.auth_url("user"))).await;
        let response = request
            .json(&json!({ "password": new_password }))
            .send()
            .await
            .map_err(|err| AuthError::Transport(err.to_string()))?;
        if !response.status().is_success() {
            return Err(AuthError::Rejected(error_detail(response).await));
        }
        Ok(())
    }
}

#[derive(Clone)]
pub struct SupabaseDirectory {
    ctx: SupabaseContext,
}

impl SupabaseDirectory {
    pub fn new(ctx: SupabaseContext) -> Self {
        Self { ctx }
    }

    async fn get_rows<T: DeserializeOwned>(&self, resource: &str) -> Result<Vec<T>, DirectoryError> {
        let request = self
            .ctx
            .authed(self.ctx.http.get(self.ctx.rest_url(resource)))
            .await;
        let response = send(request).await?;
        decode(response).await
    }

    async fn insert_row<T: DeserializeOwned>(
        &self,
        resource: &str,
        body: &Value,
    ) -> Result<T, DirectoryError> {
        let request = self
            .ctx
            .authed(self.ctx.http.post(self.ctx.rest_url(resource)))
            .await
            .header("prefer", "return=representation")
            .json(body);
        let response = send(request).await?;
        let mut rows: Vec<T> = decode(response).await?;
        if rows.is_empty() {
            return Err(DirectoryError::Rejected(
                "insert returned no representation".to_string(),
            ));
        }
        Ok(rows.remove(0))
    }

    async fn insert_row_silent(&self, resource: &str, body: &Value) -> Result<(), DirectoryError> {
        let request = self
            .ctx
            .authed(self.ctx.http.post(self.ctx.rest_url(resource)))
            .await
            .json(body);
        send(request).await?;
        Ok(())
    }

    async fn patch_rows(&self, resource: &str, body: &Value) -> Result<(), DirectoryError> {
        let request = self
            .ctx
            .authed(self.ctx.http.patch(self.ctx.rest_url(resource)))
            .await
            .json(body);
        send(request).await?;
        Ok(())
    }

    async fn delete_rows(&self, resource: &str) -> Result<(), DirectoryError> {
        let request = self
            .ctx
            .authed(self.ctx.http.delete(self.ctx.rest_url(resource)))
            .await;
        send(request).await?;
        Ok(())
    }

    async fn rpc<T: DeserializeOwned>(
        &self,
        function: &str,
        body: &Value,
    ) -> Result<T, DirectoryError> {
        let request = self
            .ctx
            .authed(self.ctx.http.post(self.ctx.rpc_url(function)))
            .await
            .json(body);
        let response = send(request).await?;
        decode(response).await
    }

    async fn rpc_unit(&self, function: &str, body: &Value) -> Result<(), DirectoryError> {
        let request = self
            .ctx
            .authed(self.ctx.http.post(self.ctx.rpc_url(function)))
            .await
            .json(body);
        send(request).await?;
        Ok(())
    }
}

async fn send(request: RequestBuilder) -> Result<Response, DirectoryError> {
    let response = request
        .send()
        .await
        .map_err(|err| DirectoryError::Transport(err.to_string()))?;
    if response.status() == StatusCode::NOT_FOUND {
        return Err(DirectoryError::NotFound);
    }
    if !response.status().is_success() {
        return Err(DirectoryError::Rejected(error_detail(response).await));
    }
    Ok(response)
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, DirectoryError> {
    response
        .json()
        .await
        .map_err(|err| DirectoryError::Transport(err.to_string()))
}

#[async_trait]
impl DirectoryApi for SupabaseDirectory {
    async fn get_user(&self, user_id: &str) -> Result<Option<Identity>, DirectoryError> {
        let mut rows: Vec<Identity> = self
            .get_rows(&format!("users?id=eq.{user_id}&select=*"))
            .await?;
        Ok(if rows.is_empty() {
            None
        } else {
            Some(rows.remove(0))
        })
    }

    async fn update_bio(&self, user_id: &str, bio: &str) -> Result<(), DirectoryError> {
        self.patch_rows(&format!("users?id=eq.{user_id}"), &json!({ "bio": bio }))
            .await
    }

    async fn update_avatar(&self, user_id: &str, data_uri: &str) -> Result<(), DirectoryError> {
        self.patch_rows(
            &format!("users?id=eq.{user_id}"),
            &json!({ "avatar_url": data_uri }),
        )
        .await
    }

    async fn use_credit(&self, user_id: &str) -> Result<Identity, DirectoryError> {
        self.rpc("use_credit", &json!({ "p_user_id": user_id })).await
    }

    async fn packages(&self) -> Result<Vec<Package>, DirectoryError> {
        self.get_rows("packages?select=*&order=price.asc").await
    }

    async fn create_package(&self, draft: &PackageDraft) -> Result<Package, DirectoryError> {
        let body = serde_json::to_value(draft)
            .map_err(|err| DirectoryError::Rejected(err.to_string()))?;
        self.insert_row("packages", &body).await
    }

    async fn update_package(
        &self,
        package_id: &str,
        draft: &PackageDraft,
    ) -> Result<(), DirectoryError> {
        let body = serde_json::to_value(draft)
            .map_err(|err| DirectoryError::Rejected(err.to_string()))?;
        self.patch_rows(&format!("packages?id=eq.{package_id}"), &body)
            .await
    }

    async fn delete_package(&self, package_id: &str) -> Result<(), DirectoryError> {
        self.delete_rows(&format!("packages?id=eq.{package_id}")).await
    }

    async fn submit_payment(
        &self,
        draft: &NewTransaction,
    ) -> Result<Transaction, DirectoryError> {
        let body = serde_json::to_value(draft)
            .map_err(|err| DirectoryError::Rejected(err.to_string()))?;
        self.insert_row("transactions", &body).await
    }

    async fn transactions(&self) -> Result<Vec<Transaction>, DirectoryError> {
        self.get_rows("transactions?select=*&order=created_at.desc")
            .await
    }

    async fn approve_transaction(&self, transaction_id: &str) -> Result<(), DirectoryError> {
        self.rpc_unit(
            "approve_transaction",
            &json!({ "p_transaction_id": transaction_id }),
        )
        .await
    }

    async fn reject_transaction(&self, transaction_id: &str) -> Result<(), DirectoryError> {
        self.rpc_unit(
            "reject_transaction",
            &json!({ "p_transaction_id": transaction_id }),
        )
        .await
    }

    async fn users(&self) -> Result<Vec<Identity>, DirectoryError> {
        self.get_rows("users?select=*&order=created_at.desc").await
    }

    async fn set_banned(&self, user_id: &str, banned: bool) -> Result<(), DirectoryError> {
        self.patch_rows(
            &format!("users?id=eq.{user_id}"),
            &json!({ "is_banned": banned }),
        )
        .await
    }

    async fn adjust_tokens(&self, user_id: &str, delta: i64) -> Result<(), DirectoryError> {
        self.rpc_unit(
            "adjust_tokens",
            &json!({ "p_user_id": user_id, "p_delta": delta }),
        )
        .await
    }

    async fn append_log(&self, draft: &ActivityLogDraft) -> Result<(), DirectoryError> {
        let body = serde_json::to_value(draft)
            .map_err(|err| DirectoryError::Rejected(err.to_string()))?;
        self.insert_row_silent("activity_logs", &body).await
    }

    async fn activity_logs(&self) -> Result<Vec<ActivityLog>, DirectoryError> {
        self.get_rows("activity_logs?select=*&order=created_at.desc")
            .await
    }

    async fn admin_stats(&self) -> Result<AdminStats, DirectoryError> {
        self.rpc("admin_stats", &json!({})).await
    }
}
