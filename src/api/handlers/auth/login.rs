//! Login prompt and submission handlers.

use axum::{
    Form, Json,
    extract::{Extension, RawQuery},
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::{debug, error, info};

use super::{
    LOGIN_API_PATH,
    challenge::challenge_from_query,
    confirmation::confirmation_mail,
    credentials::verify,
    error::LoginError,
    pages::{login_page, redirect_found},
    state::{LoginState, REMEMBER_FOR_SECONDS},
    types::{ErrorResponse, LoginRequestPayload, RedirectResponse},
};
use crate::hydra::{AcceptLoginRequest, Flow};

/// Terminal states of the prompt path.
#[derive(Debug, PartialEq, Eq)]
pub enum PromptOutcome {
    /// The authorization server already knows the subject; no form is shown.
    AutoAccepted { redirect_to: String },
    PromptRequired { challenge: String, client_name: String },
}

/// `GET {base_ui_path}/login?login_challenge=..`
pub async fn login_prompt(
    RawQuery(query): RawQuery,
    state: Extension<Arc<LoginState>>,
) -> Result<Response, LoginError> {
    let challenge = challenge_from_query(query.as_deref(), Flow::Login)?;

    match prompt(&state, challenge).await? {
        PromptOutcome::AutoAccepted { redirect_to } => Ok(redirect_found(&redirect_to)),
        PromptOutcome::PromptRequired {
            challenge,
            client_name,
        } => Ok(login_page(&challenge, LOGIN_API_PATH, &client_name).into_response()),
    }
}

/// Skip check: a skipped challenge is accepted for the known subject without
/// consulting the credential store.
///
/// # Errors
/// Returns `Upstream` if the authorization server call fails.
pub async fn prompt(state: &LoginState, challenge: String) -> Result<PromptOutcome, LoginError> {
    let info = state.hydra().get_login_request(&challenge).await?;
    debug!(skip = info.skip, "Login request info received");

    if !info.skip {
        let client_name = info
            .client
            .as_ref()
            .map(|client| client.display_name().to_string())
            .unwrap_or_default();
        return Ok(PromptOutcome::PromptRequired {
            challenge,
            client_name,
        });
    }

    let completed = state
        .hydra()
        .accept_login_request(&challenge, &AcceptLoginRequest::for_session(info.subject.clone()))
        .await?;
    info!(subject = %info.subject, "Login request skipped");
    Ok(PromptOutcome::AutoAccepted {
        redirect_to: completed.redirect_to,
    })
}

/// Verify submitted credentials and accept the login challenge.
#[utoipa::path(
    post,
    path = "/api/login",
    request_body(
        content = LoginRequestPayload,
        content_type = "application/x-www-form-urlencoded"
    ),
    responses(
        (status = 200, description = "Login accepted; navigate to redirect_to.", body = RedirectResponse),
        (status = 400, description = "Malformed form or challenge.", body = ErrorResponse),
        (status = 401, description = "Invalid credentials or unconfirmed email.", body = ErrorResponse),
        (status = 502, description = "Authorization server failure.", body = ErrorResponse),
    ),
    tag = "login"
)]
pub async fn login_submit(
    state: Extension<Arc<LoginState>>,
    payload: Option<Form<LoginRequestPayload>>,
) -> Result<Json<RedirectResponse>, LoginError> {
    let Some(Form(request)) = payload else {
        return Err(LoginError::BadRequest("Invalid login request".to_string()));
    };
    debug!("Login request payload {request:?}");

    submit(&state, request).await.map(Json)
}

/// The submit path: `CredentialsSubmitted -> {EmailUnconfirmed | Accepted}`.
///
/// # Errors
/// `InvalidCredentials` on a failed check; `EmailUnconfirmed` after queueing a
/// confirmation email; `Upstream` if the accept call fails.
pub async fn submit(
    state: &LoginState,
    request: LoginRequestPayload,
) -> Result<RedirectResponse, LoginError> {
    if request.challenge.is_empty() {
        return Err(LoginError::BadRequest(format!(
            "Missing {}",
            Flow::Login.challenge_param()
        )));
    }

    let credential = verify(state.credentials(), &request.username, &request.password).await?;

    if !credential.email_validated {
        match confirmation_mail(state.config(), &credential, &request.challenge) {
            Ok(message) => {
                state.outbox().enqueue(message);
                info!(username = %credential.username, "Confirmation email queued");
            }
            Err(err) => {
                error!(username = %credential.username, "Failed to build confirmation email: {err:#}");
            }
        }
        return Err(LoginError::EmailUnconfirmed);
    }

    let remember_for = if request.remember {
        REMEMBER_FOR_SECONDS
    } else {
        0
    };
    let accept = AcceptLoginRequest {
        subject: credential.username,
        acr: "0".to_string(),
        remember: request.remember,
        remember_for,
    };
    let completed = state
        .hydra()
        .accept_login_request(&request.challenge, &accept)
        .await?;

    Ok(RedirectResponse {
        redirect_to: completed.redirect_to,
    })
}
