//! Authentication contract and input normalization.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Validation failures raised before anything leaves the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AuthInputError {
    #[error("email must not be empty")]
    EmptyEmail,
    #[error("email is not a valid address")]
    InvalidEmail,
    #[error("password must not be empty")]
    EmptyPassword,
    #[error("display name must not be empty")]
    EmptyName,
}

/// Lowercases and trims an email address, rejecting obviously bad input.
pub fn normalize_email(raw: &str) -> Result<String, AuthInputError> {
    let email = raw.trim().to_ascii_lowercase();
    if email.is_empty() {
        return Err(AuthInputError::EmptyEmail);
    }
    let (local, domain) = email.split_once('@').ok_or(AuthInputError::InvalidEmail)?;
    if local.is_empty() || domain.is_empty() || !domain.contains('.') {
        return Err(AuthInputError::InvalidEmail);
    }
    Ok(email)
}

pub fn normalize_password(raw: &str) -> Result<String, AuthInputError> {
    if raw.is_empty() {
        return Err(AuthInputError::EmptyPassword);
    }
    Ok(raw.to_string())
}

pub fn normalize_name(raw: &str) -> Result<String, AuthInputError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(AuthInputError::EmptyName);
    }
    Ok(name.to_string())
}

/// What the auth backend knows about the caller. The directory row keyed by
/// this id carries everything else.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSession {
    pub user_id: String,
    pub email: String,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("auth backend rejected request: {0}")]
    Rejected(String),
    #[error("auth transport failure: {0}")]
    Transport(String),
}

/// Backend auth operations. Sign-up never yields a session; the account must
/// be verified by email first.
#[async_trait]
pub trait AuthApi: Send + Sync {
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, AuthError>;
    async fn sign_up(&self, email: &str, password: &str, name: &str) -> Result<(), AuthError>;
    async fn sign_out(&self) -> Result<(), AuthError>;
    /// Session restored from persisted auth state, if any.
    async fn current_session(&self) -> Result<Option<AuthSession>, AuthError>;
    async fn reset_password(&self, email: &str) -> Result<(), AuthError>;
    async fn resend_verification(&self, email: &str) -> Result<(), AuthError>;
    async fn update_password(&self, new_password: &str) -> Result<(), AuthError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_email_lowercases_and_trims() {
        assert_eq!(
            normalize_email("  User@Example.COM "),
            Ok("user@example.com".to_string())
        );
    }

    #[test]
    fn normalize_email_rejects_bad_shapes() {
        assert_eq!(normalize_email("   "), Err(AuthInputError::EmptyEmail));
        assert_eq!(normalize_email("nobody"), Err(AuthInputError::InvalidEmail));
        assert_eq!(normalize_email("a@"), Err(AuthInputError::InvalidEmail));
        assert_eq!(normalize_email("@b.c"), Err(AuthInputError::InvalidEmail));
        assert_eq!(normalize_email("a@nodot"), Err(AuthInputError::InvalidEmail));
    }

    #[test]
    fn normalize_name_trims_whitespace() {
        assert_eq!(normalize_name(" Ana "), Ok("Ana".to_string()));
        assert_eq!(normalize_name("  "), Err(AuthInputError::EmptyName));
    }
}
