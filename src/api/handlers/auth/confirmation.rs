//! Signed email confirmation links.
//!
//! A token is `base64url(claims) "." base64url(HMAC-SHA256(secret_key, claims))`.
//! Nothing is stored server side: the link carries the username, the email it
//! was sent to and the login challenge to resume afterwards.

use anyhow::{Context, anyhow};
use axum::{
    extract::{Extension, RawQuery},
    http::StatusCode,
    response::Response,
};
use base64ct::{Base64UrlUnpadded, Encoding};
use hmac::{Hmac, Mac};
use lettre::{
    Message,
    message::{Mailbox, header::ContentType},
};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tracing::{info, warn};

use super::{
    challenge::query_value,
    credentials::Credential,
    error::LoginError,
    pages::{message_page, redirect_found},
    state::{LoginConfig, LoginState},
};
use crate::api::email::OutboundMessage;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmationClaims {
    pub sub: String,
    pub email: String,
    #[serde(default)]
    pub challenge: String,
    pub exp: u64,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("malformed confirmation token")]
    Malformed,
    #[error("confirmation token signature mismatch")]
    InvalidSignature,
    #[error("confirmation token expired")]
    Expired,
}

fn now_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or_default()
}

fn mac(key: &[u8]) -> anyhow::Result<HmacSha256> {
    HmacSha256::new_from_slice(key).map_err(|_| anyhow!("invalid confirmation key"))
}

/// # Errors
/// Returns an error if the claims cannot be serialized.
pub fn sign_token(key: &[u8], claims: &ConfirmationClaims) -> anyhow::Result<String> {
    let payload = serde_json::to_vec(claims).context("failed to serialize confirmation claims")?;
    let mut mac = mac(key)?;
    mac.update(&payload);
    let signature = mac.finalize().into_bytes();

    Ok(format!(
        "{}.{}",
        Base64UrlUnpadded::encode_string(&payload),
        Base64UrlUnpadded::encode_string(&signature)
    ))
}

/// Check signature first, then expiry against `now` (unix seconds).
///
/// # Errors
/// Returns a [`TokenError`] describing why the token is unusable.
pub fn verify_token(key: &[u8], token: &str, now: u64) -> Result<ConfirmationClaims, TokenError> {
    let (payload, signature) = token.split_once('.').ok_or(TokenError::Malformed)?;
    let payload = Base64UrlUnpadded::decode_vec(payload).map_err(|_| TokenError::Malformed)?;
    let signature = Base64UrlUnpadded::decode_vec(signature).map_err(|_| TokenError::Malformed)?;

    let mut mac = mac(key).map_err(|_| TokenError::InvalidSignature)?;
    mac.update(&payload);
    mac.verify_slice(&signature)
        .map_err(|_| TokenError::InvalidSignature)?;

    let claims: ConfirmationClaims =
        serde_json::from_slice(&payload).map_err(|_| TokenError::Malformed)?;
    if claims.exp <= now {
        return Err(TokenError::Expired);
    }
    Ok(claims)
}

/// Render the confirmation email for `credential`, resuming `challenge` afterwards.
///
/// # Errors
/// Returns an error if an address does not parse or the message cannot be built.
pub fn confirmation_mail(
    config: &LoginConfig,
    credential: &Credential,
    challenge: &str,
) -> anyhow::Result<OutboundMessage> {
    let claims = ConfirmationClaims {
        sub: credential.username.clone(),
        email: credential.email.clone(),
        challenge: challenge.to_string(),
        exp: now_seconds() + config.confirmation_ttl_seconds(),
    };
    let link = config.confirmation_url(&sign_token(config.secret_key(), &claims)?);

    let from: Mailbox = config
        .mail_sender()
        .parse()
        .with_context(|| format!("invalid mail sender: {}", config.mail_sender()))?;
    let to: Mailbox = credential
        .email
        .parse()
        .with_context(|| format!("invalid recipient address for {}", credential.username))?;

    let body = format!(
        "Hello {username},\n\n\
         Please confirm your email address by opening the link below:\n\n\
         {link}\n\n\
         The link expires in {hours} hours. If you did not try to sign in, ignore this message.\n",
        username = credential.username,
        hours = config.confirmation_ttl_seconds() / 3600,
    );

    let message = Message::builder()
        .from(from)
        .to(to)
        .subject("Confirm your email address")
        .header(ContentType::TEXT_PLAIN)
        .body(body)
        .context("failed to build confirmation email")?;

    let recipients = message
        .envelope()
        .to()
        .iter()
        .map(ToString::to_string)
        .collect();
    Ok(OutboundMessage {
        to: recipients,
        content: message.formatted(),
    })
}

/// `GET {base_ui_path}/email-confirmation?token=..`
pub async fn confirm_email(
    RawQuery(query): RawQuery,
    state: Extension<Arc<LoginState>>,
) -> Result<Response, LoginError> {
    let token = query_value(query.as_deref(), "token")?.unwrap_or_default();

    let claims = match verify_token(state.config().secret_key(), &token, now_seconds()) {
        Ok(claims) => claims,
        Err(err) => {
            warn!("Rejected confirmation link: {err}");
            return Ok(message_page(
                StatusCode::BAD_REQUEST,
                "Confirmation failed",
                "This confirmation link is invalid or has expired. Sign in again to receive a new one.",
            ));
        }
    };

    if !state.credentials().confirm_email(&claims.sub).await? {
        warn!(username = %claims.sub, "Confirmation link for unknown account");
        return Ok(message_page(
            StatusCode::BAD_REQUEST,
            "Confirmation failed",
            "This account no longer exists.",
        ));
    }
    info!(username = %claims.sub, "Email confirmed");

    if claims.challenge.is_empty() {
        return Ok(message_page(
            StatusCode::OK,
            "Email confirmed",
            "Your email address is confirmed. You can now sign in.",
        ));
    }
    Ok(redirect_found(&state.config().login_url_for(&claims.challenge)))
}
