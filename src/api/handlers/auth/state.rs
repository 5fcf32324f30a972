//! Login configuration and shared handler state.

use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;
use url::form_urlencoded;

use super::credentials::CredentialStore;
use crate::api::email::Outbox;
use crate::hydra::HydraClient;

/// How long the authorization server remembers a login or consent when the user opts in.
pub const REMEMBER_FOR_SECONDS: u64 = 3600;

const DEFAULT_BASE_UI_PATH: &str = "/ui";
const DEFAULT_CONFIRMATION_TTL_SECONDS: u64 = 24 * 60 * 60;
const DEFAULT_MAIL_SENDER: &str = "whisper@localhost";

#[derive(Clone)]
pub struct LoginConfig {
    public_url: String,
    base_ui_path: String,
    secret_key: SecretString,
    confirmation_ttl_seconds: u64,
    mail_sender: String,
}

impl LoginConfig {
    #[must_use]
    pub fn new(public_url: String, secret_key: SecretString) -> Self {
        Self {
            public_url: public_url.trim_end_matches('/').to_string(),
            base_ui_path: DEFAULT_BASE_UI_PATH.to_string(),
            secret_key,
            confirmation_ttl_seconds: DEFAULT_CONFIRMATION_TTL_SECONDS,
            mail_sender: DEFAULT_MAIL_SENDER.to_string(),
        }
    }

    /// URL prefix of the browser-facing pages; normalized to `/prefix` or empty.
    #[must_use]
    pub fn with_base_ui_path(mut self, path: &str) -> Self {
        let trimmed = path.trim().trim_matches('/');
        self.base_ui_path = if trimmed.is_empty() {
            String::new()
        } else {
            format!("/{trimmed}")
        };
        self
    }

    #[must_use]
    pub fn with_confirmation_ttl_seconds(mut self, seconds: u64) -> Self {
        self.confirmation_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_mail_sender(mut self, sender: String) -> Self {
        self.mail_sender = sender;
        self
    }

    #[must_use]
    pub fn public_url(&self) -> &str {
        &self.public_url
    }

    #[must_use]
    pub fn base_ui_path(&self) -> &str {
        &self.base_ui_path
    }

    #[must_use]
    pub fn login_path(&self) -> String {
        format!("{}/login", self.base_ui_path)
    }

    #[must_use]
    pub fn consent_path(&self) -> String {
        format!("{}/consent", self.base_ui_path)
    }

    #[must_use]
    pub fn confirmation_path(&self) -> String {
        format!("{}/email-confirmation", self.base_ui_path)
    }

    /// Relative link that resumes a login for `challenge`.
    #[must_use]
    pub fn login_url_for(&self, challenge: &str) -> String {
        let encoded: String = form_urlencoded::byte_serialize(challenge.as_bytes()).collect();
        format!("{}?login_challenge={encoded}", self.login_path())
    }

    /// Absolute link placed in confirmation emails.
    #[must_use]
    pub fn confirmation_url(&self, token: &str) -> String {
        format!(
            "{}{}?token={token}",
            self.public_url,
            self.confirmation_path()
        )
    }

    pub(super) fn secret_key(&self) -> &[u8] {
        self.secret_key.expose_secret().as_bytes()
    }

    pub(super) fn confirmation_ttl_seconds(&self) -> u64 {
        self.confirmation_ttl_seconds
    }

    pub(super) fn mail_sender(&self) -> &str {
        &self.mail_sender
    }
}

impl std::fmt::Debug for LoginConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginConfig")
            .field("public_url", &self.public_url)
            .field("base_ui_path", &self.base_ui_path)
            .field("secret_key", &"***")
            .field("confirmation_ttl_seconds", &self.confirmation_ttl_seconds)
            .field("mail_sender", &self.mail_sender)
            .finish()
    }
}

/// Everything a login/consent handler needs, shared behind an `Arc`.
pub struct LoginState {
    config: LoginConfig,
    hydra: HydraClient,
    credentials: Arc<dyn CredentialStore>,
    outbox: Outbox,
}

impl LoginState {
    pub fn new(
        config: LoginConfig,
        hydra: HydraClient,
        credentials: Arc<dyn CredentialStore>,
        outbox: Outbox,
    ) -> Self {
        Self {
            config,
            hydra,
            credentials,
            outbox,
        }
    }

    #[must_use]
    pub fn config(&self) -> &LoginConfig {
        &self.config
    }

    #[must_use]
    pub fn hydra(&self) -> &HydraClient {
        &self.hydra
    }

    #[must_use]
    pub fn credentials(&self) -> &dyn CredentialStore {
        self.credentials.as_ref()
    }

    #[must_use]
    pub fn outbox(&self) -> &Outbox {
        &self.outbox
    }
}
