//! Client for the authorization server admin API (Ory Hydra compatible).
//!
//! Every call is made exactly once: there is no retry, and challenge state is
//! never cached. A non-2xx status, a transport failure, or a body that does
//! not match the typed response is reported as a [`HydraError`].

pub mod types;

use reqwest::{Client, Response, StatusCode};
use serde::{Serialize, de::DeserializeOwned};
use std::time::Duration;
use thiserror::Error;
use tracing::{Instrument, debug, info_span, instrument};
use url::Url;

pub use types::{
    AcceptConsentRequest, AcceptLoginRequest, CompletedRequest, ConsentRequestInfo,
    LoginRequestInfo, OAuth2Client, RejectRequest,
};

#[derive(Debug, Error)]
pub enum HydraError {
    #[error("invalid authorization server URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("authorization server unreachable: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("authorization server returned {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("unexpected authorization server response: {0}")]
    Decode(#[source] serde_json::Error),
}

/// Which half of the login/consent handshake a challenge belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Login,
    Consent,
}

impl Flow {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Login => "login",
            Self::Consent => "consent",
        }
    }

    /// Query parameter carrying the challenge, both inbound and towards the server.
    #[must_use]
    pub const fn challenge_param(self) -> &'static str {
        match self {
            Self::Login => "login_challenge",
            Self::Consent => "consent_challenge",
        }
    }
}

#[derive(Debug, Clone)]
pub struct HydraClient {
    client: Client,
    admin_url: Url,
}

impl HydraClient {
    /// Build a client for the admin API rooted at `admin_url`.
    ///
    /// # Errors
    /// Returns an error if the URL is not an absolute http(s) URL or the HTTP client cannot be built.
    pub fn new(admin_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let mut admin_url = Url::parse(admin_url)
            .map_err(|err| anyhow::anyhow!("Invalid authorization server URL {admin_url}: {err}"))?;
        if !matches!(admin_url.scheme(), "http" | "https") {
            anyhow::bail!("Authorization server URL must use http or https: {admin_url}");
        }

        // Keep any path prefix (e.g. `/admin`) when joining relative endpoints.
        if !admin_url.path().ends_with('/') {
            let path = format!("{}/", admin_url.path());
            admin_url.set_path(&path);
        }

        let client = Client::builder()
            .user_agent(crate::APP_USER_AGENT)
            .timeout(timeout)
            .build()?;

        Ok(Self { client, admin_url })
    }

    /// `GetLoginRequestInfo`.
    ///
    /// # Errors
    /// Returns an error if the server is unreachable or the response is malformed.
    #[instrument(skip(self, challenge))]
    pub async fn get_login_request(&self, challenge: &str) -> Result<LoginRequestInfo, HydraError> {
        self.get_request(Flow::Login, challenge).await
    }

    /// `AcceptLoginRequest`.
    ///
    /// # Errors
    /// Returns an error if the server is unreachable, rejects the decision, or the response is malformed.
    #[instrument(skip(self, challenge, body), fields(subject = %body.subject))]
    pub async fn accept_login_request(
        &self,
        challenge: &str,
        body: &AcceptLoginRequest,
    ) -> Result<CompletedRequest, HydraError> {
        self.put_decision(Flow::Login, "accept", challenge, body)
            .await
    }

    /// # Errors
    /// Returns an error if the server is unreachable or the response is malformed.
    #[instrument(skip(self, challenge))]
    pub async fn get_consent_request(
        &self,
        challenge: &str,
    ) -> Result<ConsentRequestInfo, HydraError> {
        self.get_request(Flow::Consent, challenge).await
    }

    /// # Errors
    /// Returns an error if the server is unreachable, rejects the decision, or the response is malformed.
    #[instrument(skip(self, challenge, body))]
    pub async fn accept_consent_request(
        &self,
        challenge: &str,
        body: &AcceptConsentRequest,
    ) -> Result<CompletedRequest, HydraError> {
        self.put_decision(Flow::Consent, "accept", challenge, body)
            .await
    }

    /// # Errors
    /// Returns an error if the server is unreachable, rejects the decision, or the response is malformed.
    #[instrument(skip(self, challenge, body))]
    pub async fn reject_consent_request(
        &self,
        challenge: &str,
        body: &RejectRequest,
    ) -> Result<CompletedRequest, HydraError> {
        self.put_decision(Flow::Consent, "reject", challenge, body)
            .await
    }

    /// Readiness probe used by `/health`.
    ///
    /// # Errors
    /// Returns an error if the server is unreachable or not ready.
    pub async fn health(&self) -> Result<(), HydraError> {
        let url = self.admin_url.join("health/ready")?;
        let span = info_span!("hydra.health", http.method = "GET", url = %url);
        let response = self
            .client
            .get(url)
            .send()
            .instrument(span)
            .await
            .map_err(HydraError::Transport)?;
        ensure_success(response).await.map(|_| ())
    }

    fn endpoint(&self, path: &str, flow: Flow, challenge: &str) -> Result<Url, HydraError> {
        let mut url = self.admin_url.join(path)?;
        url.query_pairs_mut()
            .append_pair(flow.challenge_param(), challenge);
        Ok(url)
    }

    async fn get_request<T: DeserializeOwned>(
        &self,
        flow: Flow,
        challenge: &str,
    ) -> Result<T, HydraError> {
        let url = self.endpoint(
            &format!("oauth2/auth/requests/{}", flow.as_str()),
            flow,
            challenge,
        )?;

        let span = info_span!(
            "hydra.get_request",
            http.method = "GET",
            flow = flow.as_str(),
            url.path = url.path()
        );
        let response = self
            .client
            .get(url)
            .send()
            .instrument(span)
            .await
            .map_err(HydraError::Transport)?;

        read_json(response).await
    }

    async fn put_decision<B: Serialize + Sync>(
        &self,
        flow: Flow,
        decision: &str,
        challenge: &str,
        body: &B,
    ) -> Result<CompletedRequest, HydraError> {
        let url = self.endpoint(
            &format!("oauth2/auth/requests/{}/{decision}", flow.as_str()),
            flow,
            challenge,
        )?;

        let span = info_span!(
            "hydra.put_decision",
            http.method = "PUT",
            flow = flow.as_str(),
            decision,
            url.path = url.path()
        );
        let response = self
            .client
            .put(url)
            .json(body)
            .send()
            .instrument(span)
            .await
            .map_err(HydraError::Transport)?;

        let completed: CompletedRequest = read_json(response).await?;
        debug!("{} {decision} redirects to {}", flow.as_str(), completed.redirect_to);
        Ok(completed)
    }
}

async fn ensure_success(response: Response) -> Result<Response, HydraError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(HydraError::Status { status, body })
}

async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, HydraError> {
    let response = ensure_success(response).await?;
    let bytes = response.bytes().await.map_err(HydraError::Transport)?;
    serde_json::from_slice(&bytes).map_err(HydraError::Decode)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use serde_json::json;
    use std::net::TcpListener;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn can_bind_localhost() -> bool {
        TcpListener::bind("127.0.0.1:0").is_ok()
    }

    fn client(server: &MockServer) -> Result<HydraClient> {
        HydraClient::new(&server.uri(), Duration::from_secs(5))
    }

    #[test]
    fn rejects_non_http_urls() {
        assert!(HydraClient::new("ftp://hydra.tld", Duration::from_secs(1)).is_err());
        assert!(HydraClient::new("not a url", Duration::from_secs(1)).is_err());
    }

    #[test]
    fn keeps_admin_path_prefix() -> Result<()> {
        let client = HydraClient::new("http://hydra.tld:4445/admin", Duration::from_secs(1))?;
        let url = client.endpoint("oauth2/auth/requests/login", Flow::Login, "a b")?;
        assert_eq!(
            url.as_str(),
            "http://hydra.tld:4445/admin/oauth2/auth/requests/login?login_challenge=a+b"
        );
        Ok(())
    }

    #[tokio::test]
    async fn get_login_request_decodes_info() -> Result<()> {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return Ok(());
        }
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/oauth2/auth/requests/login"))
            .and(query_param("login_challenge", "abc123"))
            .and(header("user-agent", crate::APP_USER_AGENT))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "challenge": "abc123",
                "skip": true,
                "subject": "alice",
                "request_url": "https://hydra.tld/oauth2/auth?client_id=app"
            })))
            .mount(&server)
            .await;

        let client = client(&server)?;
        let first = client.get_login_request("abc123").await?;
        let second = client.get_login_request("abc123").await?;
        assert!(first.skip);
        assert_eq!(first.subject, "alice");
        assert_eq!(first, second);
        Ok(())
    }

    #[tokio::test]
    async fn malformed_info_is_a_decode_error() -> Result<()> {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return Ok(());
        }
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/oauth2/auth/requests/login"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"subject": "alice"})))
            .mount(&server)
            .await;

        let result = client(&server)?.get_login_request("abc123").await;
        assert!(matches!(result, Err(HydraError::Decode(_))));
        Ok(())
    }

    #[tokio::test]
    async fn accept_login_request_sends_decision() -> Result<()> {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return Ok(());
        }
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/oauth2/auth/requests/login/accept"))
            .and(query_param("login_challenge", "abc123"))
            .and(body_json(json!({
                "subject": "alice",
                "acr": "0",
                "remember": true,
                "remember_for": 3600
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"redirect_to": "https://hydra.tld/next"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let completed = client(&server)?
            .accept_login_request(
                "abc123",
                &AcceptLoginRequest {
                    subject: "alice".to_string(),
                    acr: "0".to_string(),
                    remember: true,
                    remember_for: 3600,
                },
            )
            .await?;
        assert_eq!(completed.redirect_to, "https://hydra.tld/next");
        Ok(())
    }

    #[tokio::test]
    async fn error_status_is_reported() -> Result<()> {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return Ok(());
        }
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/oauth2/auth/requests/consent/reject"))
            .respond_with(ResponseTemplate::new(404).set_body_string("challenge not found"))
            .mount(&server)
            .await;

        let result = client(&server)?
            .reject_consent_request("gone", &RejectRequest::access_denied("no"))
            .await;
        match result {
            Err(HydraError::Status { status, body }) => {
                assert_eq!(status, StatusCode::NOT_FOUND);
                assert_eq!(body, "challenge not found");
            }
            other => panic!("unexpected result: {other:?}"),
        }
        Ok(())
    }

    #[tokio::test]
    async fn unreachable_server_is_a_transport_error() -> Result<()> {
        let client = HydraClient::new("http://127.0.0.1:9", Duration::from_secs(2))?;
        let result = client.get_consent_request("abc").await;
        assert!(matches!(result, Err(HydraError::Transport(_))));
        Ok(())
    }
}
