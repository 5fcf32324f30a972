//! Typed failures for the login/consent flow and their HTTP mapping.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::{debug, error};

use super::types::ErrorResponse;
use crate::hydra::HydraError;

const EMAIL_UNCONFIRMED_MESSAGE: &str =
    "This account email is not confirmed, an email was sent to you to confirm your email";

#[derive(Debug, Error)]
pub enum LoginError {
    /// Malformed input, e.g. an undecodable challenge.
    #[error("{0}")]
    BadRequest(String),
    /// Unknown user or wrong password; the two are indistinguishable to callers.
    #[error("invalid username or password")]
    InvalidCredentials,
    /// Valid credentials, but the account email has not been confirmed yet.
    #[error("email address not confirmed")]
    EmailUnconfirmed,
    #[error(transparent)]
    Upstream(#[from] HydraError),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl LoginError {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::InvalidCredentials | Self::EmailUnconfirmed => StatusCode::UNAUTHORIZED,
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn public_message(&self) -> String {
        match self {
            Self::BadRequest(message) => message.clone(),
            Self::InvalidCredentials => "Invalid username or password".to_string(),
            Self::EmailUnconfirmed => EMAIL_UNCONFIRMED_MESSAGE.to_string(),
            Self::Upstream(_) => "Unable to reach the authorization server".to_string(),
            Self::Internal(_) => "Unable to process the request".to_string(),
        }
    }
}

impl IntoResponse for LoginError {
    fn into_response(self) -> Response {
        match &self {
            Self::Upstream(err) => error!("Authorization server call failed: {err}"),
            Self::Internal(err) => error!("Login flow failed: {err:#}"),
            other => debug!("Login flow rejected: {other}"),
        }

        let body = ErrorResponse {
            message: self.public_message(),
        };
        (self.status(), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{Result, anyhow};
    use axum::body::to_bytes;

    async fn body_of(err: LoginError) -> Result<(StatusCode, ErrorResponse)> {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await?;
        Ok((status, serde_json::from_slice(&bytes)?))
    }

    #[tokio::test]
    async fn maps_kinds_to_status_codes() -> Result<()> {
        let (status, body) = body_of(LoginError::BadRequest("Missing login_challenge".into())).await?;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.message, "Missing login_challenge");

        let (status, _) = body_of(LoginError::InvalidCredentials).await?;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, body) = body_of(LoginError::EmailUnconfirmed).await?;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body.message, EMAIL_UNCONFIRMED_MESSAGE);

        let (status, body) = body_of(LoginError::Internal(anyhow!("db exploded"))).await?;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!body.message.contains("db exploded"));
        Ok(())
    }

    #[tokio::test]
    async fn upstream_failures_are_bad_gateway() -> Result<()> {
        let decode = serde_json::from_str::<serde_json::Value>("{").map_err(HydraError::Decode);
        let Err(err) = decode else {
            return Err(anyhow!("expected decode error"));
        };
        let (status, body) = body_of(LoginError::from(err)).await?;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body.message, "Unable to reach the authorization server");
        Ok(())
    }
}
