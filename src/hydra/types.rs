//! Typed request/response bodies for the authorization server admin API.
//!
//! Only the fields this service reads are modelled. Required fields
//! (`skip`, `subject`, `redirect_to`) have no serde default, so a response
//! without them fails to decode instead of being silently interpreted.

use serde::{Deserialize, Deserializer, Serialize};

/// Relying party that started the flow.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuth2Client {
    #[serde(default, deserialize_with = "null_as_default")]
    pub client_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub client_name: String,
}

impl OAuth2Client {
    /// Human readable name, falling back to the client id.
    #[must_use]
    pub fn display_name(&self) -> &str {
        if self.client_name.is_empty() {
            &self.client_id
        } else {
            &self.client_name
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoginRequestInfo {
    #[serde(default, deserialize_with = "null_as_default")]
    pub challenge: String,
    pub skip: bool,
    pub subject: String,
    #[serde(default)]
    pub client: Option<OAuth2Client>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AcceptLoginRequest {
    pub subject: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub acr: String,
    pub remember: bool,
    pub remember_for: u64,
}

impl AcceptLoginRequest {
    /// Accept for a subject that already holds a session: nothing is remembered again.
    #[must_use]
    pub fn for_session(subject: String) -> Self {
        Self {
            subject,
            acr: String::new(),
            remember: false,
            remember_for: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ConsentRequestInfo {
    #[serde(default, deserialize_with = "null_as_default")]
    pub challenge: String,
    pub skip: bool,
    pub subject: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub requested_scope: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub requested_access_token_audience: Vec<String>,
    #[serde(default)]
    pub client: Option<OAuth2Client>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AcceptConsentRequest {
    pub grant_scope: Vec<String>,
    pub grant_access_token_audience: Vec<String>,
    pub remember: bool,
    pub remember_for: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RejectRequest {
    pub error: String,
    pub error_description: String,
}

impl RejectRequest {
    #[must_use]
    pub fn access_denied(description: &str) -> Self {
        Self {
            error: "access_denied".to_string(),
            error_description: description.to_string(),
        }
    }
}

/// Decision acknowledgement: where the browser must go next.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CompletedRequest {
    pub redirect_to: String,
}

// The admin API emits `null` for empty lists and strings.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use serde_json::json;

    #[test]
    fn login_request_tolerates_null_client_name() -> Result<()> {
        let info: LoginRequestInfo = serde_json::from_value(json!({
            "challenge": "abc123",
            "skip": false,
            "subject": "",
            "requested_scope": null,
            "client": {"client_id": "app", "client_name": null}
        }))?;
        assert!(!info.skip);
        assert_eq!(info.client.map(|c| c.display_name().to_string()).as_deref(), Some("app"));
        Ok(())
    }

    #[test]
    fn login_request_requires_skip_and_subject() {
        let missing_skip = serde_json::from_value::<LoginRequestInfo>(json!({"subject": "alice"}));
        assert!(missing_skip.is_err());

        let wrong_type =
            serde_json::from_value::<LoginRequestInfo>(json!({"skip": "yes", "subject": "alice"}));
        assert!(wrong_type.is_err());
    }

    #[test]
    fn session_accept_omits_acr() -> Result<()> {
        let body = serde_json::to_value(AcceptLoginRequest::for_session("alice".to_string()))?;
        assert_eq!(
            body,
            json!({"subject": "alice", "remember": false, "remember_for": 0})
        );
        Ok(())
    }
}
