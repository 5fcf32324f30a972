//! Consent prompt and decision handlers.

use axum::{
    Form, Json,
    extract::{Extension, RawQuery},
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::{debug, info};

use super::{
    CONSENT_API_PATH,
    challenge::challenge_from_query,
    error::LoginError,
    pages::{consent_page, redirect_found},
    state::{LoginState, REMEMBER_FOR_SECONDS},
    types::{ConsentRequestPayload, ErrorResponse, RedirectResponse},
};
use crate::hydra::{AcceptConsentRequest, ConsentRequestInfo, Flow, RejectRequest};

/// `GET {base_ui_path}/consent?consent_challenge=..`
pub async fn consent_prompt(
    RawQuery(query): RawQuery,
    state: Extension<Arc<LoginState>>,
) -> Result<Response, LoginError> {
    let challenge = challenge_from_query(query.as_deref(), Flow::Consent)?;
    let info = state.hydra().get_consent_request(&challenge).await?;
    debug!(skip = info.skip, "Consent request info received");

    if info.skip {
        let accept = AcceptConsentRequest {
            grant_scope: info.requested_scope.clone(),
            grant_access_token_audience: info.requested_access_token_audience.clone(),
            remember: false,
            remember_for: 0,
        };
        let completed = state
            .hydra()
            .accept_consent_request(&challenge, &accept)
            .await?;
        info!(subject = %info.subject, "Consent request skipped");
        return Ok(redirect_found(&completed.redirect_to));
    }

    let client_name = info
        .client
        .as_ref()
        .map(|client| client.display_name().to_string())
        .unwrap_or_default();
    Ok(consent_page(&challenge, CONSENT_API_PATH, &client_name, &info.requested_scope).into_response())
}

/// Grant or deny a consent challenge.
#[utoipa::path(
    post,
    path = "/api/consent",
    request_body(
        content = ConsentRequestPayload,
        content_type = "application/x-www-form-urlencoded"
    ),
    responses(
        (status = 200, description = "Decision recorded; navigate to redirect_to.", body = RedirectResponse),
        (status = 400, description = "Malformed form or challenge.", body = ErrorResponse),
        (status = 502, description = "Authorization server failure.", body = ErrorResponse),
    ),
    tag = "consent"
)]
pub async fn consent_submit(
    state: Extension<Arc<LoginState>>,
    payload: Option<Form<ConsentRequestPayload>>,
) -> Result<Json<RedirectResponse>, LoginError> {
    let Some(Form(request)) = payload else {
        return Err(LoginError::BadRequest("Invalid consent request".to_string()));
    };
    debug!("Consent request payload {request:?}");

    decide_consent(&state, request).await.map(Json)
}

/// # Errors
/// `BadRequest` for an empty challenge; `Upstream` if any authorization server call fails.
pub async fn decide_consent(
    state: &LoginState,
    request: ConsentRequestPayload,
) -> Result<RedirectResponse, LoginError> {
    if request.challenge.is_empty() {
        return Err(LoginError::BadRequest(format!(
            "Missing {}",
            Flow::Consent.challenge_param()
        )));
    }

    let completed = if request.accept {
        let info = state.hydra().get_consent_request(&request.challenge).await?;
        let accept = granted(&info, &request.grant_scope, request.remember);
        state
            .hydra()
            .accept_consent_request(&request.challenge, &accept)
            .await?
    } else {
        state
            .hydra()
            .reject_consent_request(
                &request.challenge,
                &RejectRequest::access_denied("The resource owner denied the request"),
            )
            .await?
    };

    Ok(RedirectResponse {
        redirect_to: completed.redirect_to,
    })
}

/// Keep only scopes the server asked for, in the server's order.
fn granted(info: &ConsentRequestInfo, grant_scope: &str, remember: bool) -> AcceptConsentRequest {
    let chosen: Vec<&str> = grant_scope.split_whitespace().collect();
    AcceptConsentRequest {
        grant_scope: info
            .requested_scope
            .iter()
            .filter(|scope| chosen.contains(&scope.as_str()))
            .cloned()
            .collect(),
        grant_access_token_audience: info.requested_access_token_audience.clone(),
        remember,
        remember_for: if remember { REMEMBER_FOR_SECONDS } else { 0 },
    }
}
