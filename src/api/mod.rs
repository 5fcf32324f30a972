use crate::api::handlers::{
    auth::{self, CONSENT_API_PATH, LOGIN_API_PATH, LoginConfig, LoginState, PgCredentialStore},
    health, root,
};
use crate::hydra::HydraClient;
use anyhow::{Context, Result};
use axum::{
    Extension, Router,
    body::Body,
    extract::MatchedPath,
    http::{HeaderName, HeaderValue, Request},
    routing::{get, post},
};
use sqlx::postgres::PgPoolOptions;
use std::{sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    request_id::PropagateRequestIdLayer, set_header::SetRequestHeaderLayer, trace::TraceLayer,
};
use tracing::{Span, info, info_span};
use ulid::Ulid;
use utoipa_swagger_ui::SwaggerUi;

pub mod email;
pub mod handlers;
mod openapi;

pub use openapi::openapi;

/// Build the application router around shared login state.
#[must_use]
pub fn router(state: Arc<LoginState>) -> Router {
    let login_path = state.config().login_path();
    let consent_path = state.config().consent_path();
    let confirmation_path = state.config().confirmation_path();

    Router::new()
        .route("/", get(root::root))
        .route("/health", get(health::health).options(health::health))
        .route(&login_path, get(auth::login::login_prompt))
        .route(LOGIN_API_PATH, post(auth::login::login_submit))
        .route(&consent_path, get(auth::consent::consent_prompt))
        .route(CONSENT_API_PATH, post(auth::consent::consent_submit))
        .route(&confirmation_path, get(auth::confirmation::confirm_email))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", openapi()))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static("x-request-id"),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    "x-request-id",
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(Extension(state)),
        )
}

/// Start the server
///
/// Connects the credential store, starts the mail dispatcher, serves until
/// Ctrl-C or SIGTERM, then drains queued mail.
///
/// # Errors
/// Return error if failed to start the server
pub async fn new(
    port: u16,
    dsn: String,
    hydra: HydraClient,
    login_config: LoginConfig,
    sender: Arc<dyn email::EmailSender>,
) -> Result<()> {
    // Connect to database
    let pool = PgPoolOptions::new()
        .min_connections(1)
        .max_connections(5)
        .max_lifetime(Duration::from_secs(60 * 2))
        .test_before_acquire(true)
        .connect(&dsn)
        .await
        .context("Failed to connect to database")?;

    let (outbox, inbox) = email::channel();
    let dispatcher = email::spawn_dispatcher(inbox, sender);

    let state = Arc::new(LoginState::new(
        login_config,
        hydra,
        Arc::new(PgCredentialStore::new(pool)),
        outbox,
    ));
    let app = router(state);

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // The router (and every Outbox it held) is gone; drain what is left.
    let attempted = dispatcher.shutdown().await?;
    info!(attempted, "Mail dispatcher drained");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {err}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!("Failed to listen for SIGTERM: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Gracefully shutdown");
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}
