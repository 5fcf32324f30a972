//! Request/response types for login and consent endpoints.

use serde::{Deserialize, Deserializer, Serialize, de::Error as _};
use utoipa::ToSchema;

/// Login form submission (`application/x-www-form-urlencoded`).
#[derive(ToSchema, Deserialize)]
pub struct LoginRequestPayload {
    pub username: String,
    pub password: String,
    pub challenge: String,
    /// Checkbox semantics: `on`, `true`, `1` and `yes` mean checked; absent means unchecked.
    #[serde(default, deserialize_with = "form_bool")]
    pub remember: bool,
}

impl std::fmt::Debug for LoginRequestPayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginRequestPayload")
            .field("username", &self.username)
            .field("password", &"***")
            .field("challenge", &self.challenge)
            .field("remember", &self.remember)
            .finish()
    }
}

/// Consent form submission.
#[derive(ToSchema, Deserialize, Debug)]
pub struct ConsentRequestPayload {
    pub challenge: String,
    #[serde(default, deserialize_with = "form_bool")]
    pub accept: bool,
    #[serde(default, deserialize_with = "form_bool")]
    pub remember: bool,
    /// Space separated scopes the user agreed to.
    #[serde(default)]
    pub grant_scope: String,
}

/// Where the browser must navigate next; the page script follows it.
#[derive(ToSchema, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct RedirectResponse {
    pub redirect_to: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct ErrorResponse {
    pub message: String,
}

fn form_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = String::deserialize(deserializer)?;
    match value.trim().to_ascii_lowercase().as_str() {
        "on" | "true" | "1" | "yes" => Ok(true),
        "" | "off" | "false" | "0" | "no" => Ok(false),
        other => Err(D::Error::custom(format!("invalid boolean value: {other}"))),
    }
}
