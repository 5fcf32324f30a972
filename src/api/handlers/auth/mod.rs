//! Login, consent and email confirmation handlers.
//!
//! These handlers mediate between the browser, the credential store and the
//! authorization server. Challenge state lives only in the authorization
//! server; every request re-reads it and makes at most one decision call.
//!
//! ## Login States
//!
//! - `GET {base_ui_path}/login`: `ChallengeReceived -> SkipCheck -> {AutoAccepted | PromptRequired}`.
//!   A skipped challenge is accepted without touching the credential store.
//! - `POST /api/login`: `CredentialsSubmitted -> {EmailUnconfirmed | Accepted}`.
//!   An unconfirmed account gets a confirmation email queued *and* a `401`.
//!
//! ## Consent
//!
//! Consent challenges follow the same skip/prompt split. Only scopes the
//! authorization server actually requested can be granted.

pub(crate) mod challenge;
pub(crate) mod confirmation;
pub(crate) mod consent;
pub(crate) mod credentials;
mod error;
pub(crate) mod login;
mod pages;
mod state;
pub(crate) mod types;

pub use credentials::{Credential, CredentialStore, PgCredentialStore, hash_password};
pub use error::LoginError;
pub use state::{LoginConfig, LoginState, REMEMBER_FOR_SECONDS};

/// Form endpoint for login submissions.
pub const LOGIN_API_PATH: &str = "/api/login";
/// Form endpoint for consent decisions.
pub const CONSENT_API_PATH: &str = "/api/consent";

#[cfg(test)]
pub(crate) mod test_support;
