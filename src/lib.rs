//! # Whisper (Login & Consent Front End)
//!
//! `whisper` is the browser-facing half of an OAuth2/OIDC deployment. The
//! authorization server (Ory Hydra or a compatible admin API) owns tokens,
//! sessions and challenge state; `whisper` owns the end-user credentials and
//! decides, for every login or consent challenge, whether to accept it
//! silently, prompt the user, or deny it.
//!
//! ## Login Challenge Lifecycle
//!
//! 1. The authorization server redirects the browser to
//!    `{base_ui_path}/login?login_challenge=<token>`.
//! 2. `whisper` asks the server about the challenge. When the server reports
//!    `skip`, the subject already has a session and the challenge is accepted
//!    without touching the credential store.
//! 3. Otherwise the login form is rendered and submitted to `POST /api/login`.
//!    Valid credentials accept the challenge and the browser follows the
//!    returned `redirect_to`.
//!
//! Challenges are never cached locally; the authorization server is the only
//! source of truth and every call is made at most once per request.
//!
//! ## Credentials
//!
//! Accounts live in Postgres with Argon2 password hashes. Unknown usernames
//! and wrong passwords produce the same response and cost the same amount of
//! work to avoid account enumeration.
//!
//! ## Email Dispatch
//!
//! Outbound mail goes through a single in-process queue drained by one
//! background task, so request handlers never wait on SMTP. Delivery is
//! attempted once per message; failures are logged and dropped.

pub mod api;
pub mod cli;
pub mod hydra;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
