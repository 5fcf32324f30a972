use super::handlers::{
    auth::{
        consent, login,
        types::{ConsentRequestPayload, ErrorResponse, LoginRequestPayload, RedirectResponse},
    },
    health,
};
use utoipa::OpenApi;
use utoipa::openapi::{Contact, InfoBuilder, License};

#[derive(OpenApi)]
#[openapi(
    paths(health::health, login::login_submit, consent::consent_submit),
    components(schemas(
        health::Health,
        LoginRequestPayload,
        ConsentRequestPayload,
        RedirectResponse,
        ErrorResponse
    )),
    tags(
        (name = "health", description = "Dependency health"),
        (name = "login", description = "Credential submission for login challenges"),
        (name = "consent", description = "Scope decisions for consent challenges")
    )
)]
struct ApiDoc;

/// The `OpenAPI` document, with info taken from Cargo metadata.
#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    let mut doc = ApiDoc::openapi();

    let mut info = InfoBuilder::new()
        .title(env!("CARGO_PKG_NAME"))
        .version(env!("CARGO_PKG_VERSION"))
        .description(optional_str(env!("CARGO_PKG_DESCRIPTION")))
        .build();
    info.contact = cargo_contact();
    info.license = optional_str(env!("CARGO_PKG_LICENSE")).map(|id| {
        let mut license = License::new(id);
        license.identifier = Some(id.to_string());
        license
    });
    doc.info = info;

    doc
}

fn cargo_contact() -> Option<Contact> {
    // Cargo authors are `:` separated and may include "Name <email>".
    let primary = env!("CARGO_PKG_AUTHORS").split(':').next().map(str::trim)?;
    let (name, email) = match primary.split_once('<') {
        Some((name, email)) => (name.trim(), email.trim_end_matches('>').trim()),
        None => (primary, ""),
    };
    if name.is_empty() && email.is_empty() {
        return None;
    }

    let mut contact = Contact::new();
    contact.name = optional_str(name).map(str::to_string);
    contact.email = optional_str(email).map(str::to_string);
    Some(contact)
}

fn optional_str(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_info_from_cargo() {
        let spec = openapi();
        assert_eq!(spec.info.title, env!("CARGO_PKG_NAME"));
        assert_eq!(spec.info.version, env!("CARGO_PKG_VERSION"));

        let contact = spec.info.contact;
        assert!(contact.is_some());
        if let Some(contact) = contact {
            assert_eq!(contact.name.as_deref(), Some("Team Whisper"));
            assert_eq!(contact.email.as_deref(), Some("team@whisper.dev"));
        }
        assert_eq!(
            spec.info.license.map(|license| license.name),
            Some(env!("CARGO_PKG_LICENSE").to_string())
        );
    }

    #[test]
    fn documents_form_endpoints() {
        let spec = openapi();
        for path in ["/health", "/api/login", "/api/consent"] {
            assert!(spec.paths.paths.contains_key(path), "{path} missing");
        }
    }
}
