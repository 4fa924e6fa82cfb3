//! Password-reset tokens.
//!
//! A user has at most one pending reset, stored inline on the user row as
//! `reset_token` + `reset_token_expire`. Requesting a reset overwrites any
//! previous one. Consuming it is a single conditional update in the store,
//! so a token can be redeemed at most once even under concurrent requests.
//! Expired tokens are never swept; they simply stop matching.

use rand::{rngs::OsRng, RngCore};
use time::{Duration, OffsetDateTime};
use tracing::{info, warn};

use crate::auth::repo_types::{StoreError, User};
use crate::auth::services::hash_password;
use crate::error::ApiError;
use crate::mail::{templates, MailOutcome, MailPolicy};
use crate::state::AppState;

pub const RESET_TOKEN_BYTES: usize = 20;
pub const RESET_TOKEN_TTL: Duration = Duration::minutes(10);
pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, thiserror::Error)]
pub enum ResetError {
    #[error("Email not found")]
    NotFound,
    #[error("Invalid or expired token")]
    InvalidOrExpiredToken,
    #[error("Password must be at least 6 characters")]
    WeakPassword,
    /// The token was stored but the email could not be delivered.
    #[error("Failed to send email")]
    MailFailed(anyhow::Error),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<ResetError> for ApiError {
    fn from(e: ResetError) -> Self {
        match e {
            ResetError::NotFound => ApiError::NotFound(e.to_string()),
            ResetError::InvalidOrExpiredToken => ApiError::InvalidOrExpiredToken,
            ResetError::WeakPassword => ApiError::Validation(e.to_string()),
            ResetError::MailFailed(e) => ApiError::MailDelivery(e),
            ResetError::Store(e) => e.into(),
            ResetError::Internal(e) => ApiError::Dependency(e),
        }
    }
}

/// Result of a successful reset request.
#[derive(Debug)]
pub struct PendingReset {
    pub token: String,
    pub mail: MailOutcome,
}

/// Random opaque token, hex encoded.
pub fn generate_reset_token() -> String {
    let mut bytes = [0u8; RESET_TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

pub fn reset_url(base_url: &str, token: &str) -> String {
    format!("{}/reset/{}", base_url.trim_end_matches('/'), token)
}

/// Start a reset for `email` (already normalised) and mail the link.
///
/// The token is persisted before the mail goes out. A delivery failure is
/// reported as [`ResetError::MailFailed`], but the stored token stays valid
/// until it is consumed, replaced or expires.
pub async fn request_reset(state: &AppState, email: &str) -> Result<PendingReset, ResetError> {
    let user = state
        .users
        .find_by_email(email)
        .await?
        .ok_or(ResetError::NotFound)?;
    if user.has_pending_reset() {
        info!(user_id = %user.id, "replacing pending reset token");
    }

    let token = generate_reset_token();
    let expires_at = OffsetDateTime::now_utc() + RESET_TOKEN_TTL;
    state.users.set_reset_token(user.id, &token, expires_at).await?;
    info!(user_id = %user.id, %expires_at, "reset token issued");

    let url = reset_url(&state.config.website_url, &token);
    let mail = templates::password_reset(&state.config.mail.from, &user.email, &url);
    let outcome = state
        .mailer
        .dispatch(&mail, MailPolicy::Required)
        .await
        .map_err(|e| {
            warn!(user_id = %user.id, "reset email failed; token remains pending");
            ResetError::MailFailed(e)
        })?;

    Ok(PendingReset {
        token,
        mail: outcome,
    })
}

/// Redeem `token` and set a new password. Validation happens before any write.
pub async fn consume_reset(
    state: &AppState,
    token: &str,
    new_password: &str,
) -> Result<User, ResetError> {
    // Length is counted in chars, not UTF-16 code units.
    if new_password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ResetError::WeakPassword);
    }
    if token.is_empty() {
        return Err(ResetError::InvalidOrExpiredToken);
    }

    let hash = hash_password(new_password)?;
    let user = state
        .users
        .consume_reset_token(token, &hash, OffsetDateTime::now_utc())
        .await?
        .ok_or(ResetError::InvalidOrExpiredToken)?;
    info!(user_id = %user.id, "password reset completed");
    Ok(user)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::auth::services::verify_password;
    use crate::mail::testing::FakeTransport;

    async fn seeded(state: &AppState) -> User {
        let hash = hash_password("secret1").unwrap();
        state.users.create("Asha", "asha@example.com", &hash).await.unwrap()
    }

    #[test]
    fn tokens_are_random_hex() {
        let a = generate_reset_token();
        let b = generate_reset_token();
        assert_eq!(a.len(), RESET_TOKEN_BYTES * 2);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[test]
    fn url_embeds_raw_token() {
        assert_eq!(reset_url("http://localhost:3000/", "ab12"), "http://localhost:3000/reset/ab12");
    }

    #[tokio::test]
    async fn request_sets_token_with_ten_minute_expiry() {
        let state = AppState::fake();
        let user = seeded(&state).await;
        let before = OffsetDateTime::now_utc();
        let pending = request_reset(&state, "asha@example.com").await.unwrap();
        assert_eq!(pending.mail, MailOutcome::Skipped);

        let stored = state.users.find_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(stored.reset_token.as_deref(), Some(pending.token.as_str()));
        let expire = stored.reset_token_expire.unwrap();
        let delta = expire - before;
        assert!(delta >= Duration::minutes(10) - Duration::seconds(1));
        assert!(delta <= Duration::minutes(10) + Duration::seconds(5));
    }

    #[tokio::test]
    async fn unknown_email_is_not_found() {
        let state = AppState::fake();
        let err = request_reset(&state, "ghost@example.com").await.unwrap_err();
        assert!(matches!(err, ResetError::NotFound));
    }

    #[tokio::test]
    async fn new_request_replaces_prior_token() {
        let state = AppState::fake();
        let user = seeded(&state).await;
        let first = request_reset(&state, "asha@example.com").await.unwrap();
        let stored = state.users.find_by_id(user.id).await.unwrap().unwrap();
        assert!(stored.has_pending_reset());
        let second = request_reset(&state, "asha@example.com").await.unwrap();
        assert_ne!(first.token, second.token);

        let err = consume_reset(&state, &first.token, "newpass1").await.unwrap_err();
        assert!(matches!(err, ResetError::InvalidOrExpiredToken));
        consume_reset(&state, &second.token, "newpass1").await.unwrap();
    }

    #[tokio::test]
    async fn reset_link_is_mailed() {
        let transport = Arc::new(FakeTransport::default());
        let state = AppState::fake().with_mail(transport.clone());
        seeded(&state).await;
        let pending = request_reset(&state, "asha@example.com").await.unwrap();
        assert_eq!(pending.mail, MailOutcome::Sent);

        let sent = transport.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "asha@example.com");
        assert!(sent[0]
            .html
            .contains(&format!("http://localhost:3000/reset/{}", pending.token)));
    }

    #[tokio::test]
    async fn mail_failure_is_reported_but_token_stays_pending() {
        let state = AppState::fake().with_mail(Arc::new(FakeTransport::failing()));
        let user = seeded(&state).await;
        let err = request_reset(&state, "asha@example.com").await.unwrap_err();
        assert!(matches!(err, ResetError::MailFailed(_)));

        let stored = state.users.find_by_id(user.id).await.unwrap().unwrap();
        assert!(stored.has_pending_reset());
        let token = stored.reset_token.unwrap();
        consume_reset(&state, &token, "newpass1").await.unwrap();
    }

    #[tokio::test]
    async fn consume_replaces_password_and_is_single_use() {
        let state = AppState::fake();
        let user = seeded(&state).await;
        let pending = request_reset(&state, "asha@example.com").await.unwrap();

        let updated = consume_reset(&state, &pending.token, "brandnew").await.unwrap();
        assert!(!updated.has_pending_reset());
        assert!(verify_password("brandnew", &updated.password_hash).unwrap());
        assert!(!verify_password("secret1", &updated.password_hash).unwrap());

        let stored = state.users.find_by_id(user.id).await.unwrap().unwrap();
        assert!(stored.reset_token.is_none() && stored.reset_token_expire.is_none());

        let again = consume_reset(&state, &pending.token, "brandnew2").await.unwrap_err();
        assert!(matches!(again, ResetError::InvalidOrExpiredToken));
    }

    #[tokio::test]
    async fn expired_token_is_rejected() {
        let state = AppState::fake();
        let user = seeded(&state).await;
        let past = OffsetDateTime::now_utc() - Duration::seconds(1);
        state.users.set_reset_token(user.id, "cafebabe", past).await.unwrap();

        let err = consume_reset(&state, "cafebabe", "newpass1").await.unwrap_err();
        assert!(matches!(err, ResetError::InvalidOrExpiredToken));
        let stored = state.users.find_by_id(user.id).await.unwrap().unwrap();
        assert!(verify_password("secret1", &stored.password_hash).unwrap());
    }

    #[tokio::test]
    async fn weak_password_is_rejected_before_any_write() {
        let state = AppState::fake();
        let user = seeded(&state).await;
        let pending = request_reset(&state, "asha@example.com").await.unwrap();

        let err = consume_reset(&state, &pending.token, "12345").await.unwrap_err();
        assert!(matches!(err, ResetError::WeakPassword));
        let stored = state.users.find_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(stored.reset_token.as_deref(), Some(pending.token.as_str()));
    }

    #[tokio::test]
    async fn password_length_counts_chars() {
        let state = AppState::fake();
        seeded(&state).await;
        let pending = request_reset(&state, "asha@example.com").await.unwrap();

        // Five two-byte chars: ten bytes, still too short.
        let err = consume_reset(&state, &pending.token, "ééééé").await.unwrap_err();
        assert!(matches!(err, ResetError::WeakPassword));
        consume_reset(&state, &pending.token, "éééééé").await.unwrap();
    }

    #[tokio::test]
    async fn concurrent_consumes_succeed_at_most_once() {
        let state = AppState::fake();
        seeded(&state).await;
        let pending = request_reset(&state, "asha@example.com").await.unwrap();

        let (a, b) = tokio::join!(
            consume_reset(&state, &pending.token, "first-pass"),
            consume_reset(&state, &pending.token, "second-pass"),
        );
        assert_eq!(a.is_ok() as u8 + b.is_ok() as u8, 1);
    }
}
