//! Credential lookup and verification.
//!
//! Passwords are stored as Argon2 PHC strings. Unknown usernames still pay for
//! one hash verification so response timing does not reveal which accounts
//! exist.

use anyhow::{Context, Result, anyhow};
use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString,
};
use async_trait::async_trait;
use rand::rngs::OsRng;
use sqlx::{PgPool, Row};
use std::sync::OnceLock;
use tracing::{Instrument, error, info_span};

use super::error::LoginError;

/// A user whose password has been verified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub username: String,
    pub email: String,
    pub email_validated: bool,
}

#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// `Ok(None)` when the user is unknown or the password does not match.
    async fn check_credentials(&self, username: &str, password: &str)
    -> Result<Option<Credential>>;

    /// Mark the account email as confirmed. Returns `false` for unknown users.
    async fn confirm_email(&self, username: &str) -> Result<bool>;

    async fn ping(&self) -> Result<()>;
}

/// Check `username`/`password`, collapsing every failure into `InvalidCredentials`.
pub(super) async fn verify(
    store: &dyn CredentialStore,
    username: &str,
    password: &str,
) -> Result<Credential, LoginError> {
    match store.check_credentials(username, password).await {
        Ok(Some(credential)) => Ok(credential),
        Ok(None) => Err(LoginError::InvalidCredentials),
        Err(err) => {
            error!("Credential lookup failed: {err:#}");
            Err(LoginError::InvalidCredentials)
        }
    }
}

/// Hash a password into a PHC string suitable for `user_credentials.password_hash`.
///
/// # Errors
/// Returns an error if Argon2 fails to hash.
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| anyhow!("failed to hash password: {err}"))
}

fn dummy_hash() -> Option<&'static str> {
    static DUMMY: OnceLock<Option<String>> = OnceLock::new();
    DUMMY
        .get_or_init(|| hash_password("whisper-timing-equalizer").ok())
        .as_deref()
}

/// Verify off the async runtime. A missing hash verifies against a dummy and fails.
pub(super) async fn verify_password(stored: Option<String>, password: String) -> Result<bool> {
    tokio::task::spawn_blocking(move || {
        let known = stored.is_some();
        let Some(hash) = stored.or_else(|| dummy_hash().map(str::to_string)) else {
            return false;
        };
        let Ok(parsed) = PasswordHash::new(&hash) else {
            return false;
        };
        let matches = Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok();
        known && matches
    })
    .await
    .context("password verification task failed")
}

/// Postgres-backed store over the `user_credentials` table.
#[derive(Clone, Debug)]
pub struct PgCredentialStore {
    pool: PgPool,
}

impl PgCredentialStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn check_credentials(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<Credential>> {
        let query = "SELECT username, email, password_hash, email_validated FROM user_credentials WHERE username = $1";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(username)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to lookup credentials")?;

        let (stored, credential) = match row {
            Some(row) => (
                Some(row.try_get::<String, _>("password_hash")?),
                Some(Credential {
                    username: row.try_get("username")?,
                    email: row.try_get("email")?,
                    email_validated: row.try_get("email_validated")?,
                }),
            ),
            None => (None, None),
        };

        if verify_password(stored, password.to_string()).await? {
            Ok(credential)
        } else {
            Ok(None)
        }
    }

    async fn confirm_email(&self, username: &str) -> Result<bool> {
        let query = "UPDATE user_credentials SET email_validated = TRUE WHERE username = $1";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "UPDATE",
            db.statement = query
        );
        let result = sqlx::query(query)
            .bind(username)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to confirm email")?;
        Ok(result.rows_affected() > 0)
    }

    async fn ping(&self) -> Result<()> {
        use sqlx::Connection;

        let mut conn = self
            .pool
            .acquire()
            .await
            .context("failed to acquire database connection")?;
        conn.ping().await.context("failed to ping database")
    }
}
