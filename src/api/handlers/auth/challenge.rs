//! Strict extraction of challenge identifiers from raw query strings.
//!
//! Axum's `Query` extractor decodes leniently; a broken `%` escape would be
//! passed through verbatim and forwarded to the authorization server. Here
//! any malformed escape or non UTF-8 result is a `400`.

use percent_encoding::percent_decode_str;

use super::error::LoginError;
use crate::hydra::Flow;

/// Decode the first `name` parameter of `query`.
///
/// # Errors
/// Returns `BadRequest` if the matched value contains an invalid percent escape
/// or is not UTF-8. Pairs whose key cannot be decoded are ignored.
pub fn query_value(query: Option<&str>, name: &str) -> Result<Option<String>, LoginError> {
    let Some(query) = query else {
        return Ok(None);
    };

    for pair in query.split('&') {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        // Undecodable keys cannot name the parameter; skip them.
        if decode(key, name).ok().as_deref() != Some(name) {
            continue;
        }
        return decode(value, name).map(Some);
    }

    Ok(None)
}

/// The challenge for `flow`, required and non-empty.
///
/// # Errors
/// Returns `BadRequest` when the parameter is missing, empty or cannot be decoded.
pub fn challenge_from_query(query: Option<&str>, flow: Flow) -> Result<String, LoginError> {
    let param = flow.challenge_param();
    match query_value(query, param)? {
        Some(challenge) if !challenge.is_empty() => Ok(challenge),
        _ => Err(LoginError::BadRequest(format!("Missing {param}"))),
    }
}

fn decode(raw: &str, name: &str) -> Result<String, LoginError> {
    let unparsable = || LoginError::BadRequest(format!("Unable to parse the {name}"));

    let bytes = raw.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let valid = bytes
                .get(i + 1..i + 3)
                .is_some_and(|hex| hex.iter().all(u8::is_ascii_hexdigit));
            if !valid {
                return Err(unparsable());
            }
            i += 3;
        } else {
            i += 1;
        }
    }

    let spaced = raw.replace('+', " ");
    percent_decode_str(&spaced)
        .decode_utf8()
        .map(|value| value.into_owned())
        .map_err(|_| unparsable())
}
