use crate::GIT_COMMIT_HASH;
use crate::api::handlers::auth::LoginState;
use axum::{
    body::Body,
    extract::Extension,
    http::{HeaderMap, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{Instrument, debug, error, info_span};
use utoipa::ToSchema;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct Health {
    commit: String,
    name: String,
    version: String,
    database: String,
    authorization_server: String,
}

fn status_label(ok: bool) -> String {
    if ok { "ok" } else { "error" }.to_string()
}

#[utoipa::path(
    get,
    path = "/health",
    responses (
        (status = 200, description = "Credential store and authorization server are healthy", body = Health),
        (status = 503, description = "Credential store or authorization server is unhealthy", body = Health)
    ),
    tag = "health"
)]
// axum handler for health
pub async fn health(method: Method, state: Extension<Arc<LoginState>>) -> impl IntoResponse {
    let ping_span = info_span!("db.ping", db.system = "postgresql", db.operation = "PING");
    let database = match state.credentials().ping().instrument(ping_span).await {
        Ok(()) => true,
        Err(err) => {
            error!("Failed to ping database: {err:#}");
            false
        }
    };

    let authorization_server = match state.hydra().health().await {
        Ok(()) => true,
        Err(err) => {
            error!("Authorization server is not ready: {err}");
            false
        }
    };

    let health = Health {
        commit: GIT_COMMIT_HASH.to_string(),
        name: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database: status_label(database),
        authorization_server: status_label(authorization_server),
    };

    let body = if method == Method::GET {
        Json(&health).into_response()
    } else {
        Body::empty().into_response()
    };

    let short_hash = health.commit.get(..7).unwrap_or_default();

    let headers = format!("{}:{}:{}", health.name, health.version, short_hash)
        .parse::<HeaderValue>()
        .map(|x_app_header_value| {
            debug!("X-App header: {:?}", x_app_header_value);

            let mut headers = HeaderMap::new();
            headers.insert("X-App", x_app_header_value);
            headers
        })
        .unwrap_or_else(|err| {
            error!("Failed to parse X-App header: {}", err);
            HeaderMap::new()
        });

    debug!(database, authorization_server, "Health checked");

    if database && authorization_server {
        (StatusCode::OK, headers, body)
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, headers, body)
    }
}
