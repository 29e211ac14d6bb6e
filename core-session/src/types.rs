//! Gateway wire types.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

/// Error key the gateway uses to signal an expired or revoked API token.
pub const TOKEN_INVALID_KEY: &str = "VALID_TOKEN_REQUIRED";

/// Envelope every gateway method answers with.
///
/// On success `error` is an empty array and `results` carries the payload;
/// on failure `error` is an object keyed by error code.
#[derive(Debug, Deserialize)]
pub struct GwEnvelope<T> {
    #[serde(default)]
    pub error: Value,
    #[serde(default = "none")]
    pub results: Option<T>,
}

fn none<T>() -> Option<T> {
    None
}

impl<T: DeserializeOwned> GwEnvelope<T> {
    /// Whether the envelope carries any error entry.
    pub fn has_error(&self) -> bool {
        match &self.error {
            Value::Array(entries) => !entries.is_empty(),
            Value::Object(map) => !map.is_empty(),
            Value::Null => false,
            _ => true,
        }
    }

    /// Whether the error set contains the token-invalidation marker.
    pub fn token_invalidated(&self) -> bool {
        match &self.error {
            Value::Object(map) => map.contains_key(TOKEN_INVALID_KEY),
            Value::Array(entries) => entries
                .iter()
                .any(|e| e.as_str() == Some(TOKEN_INVALID_KEY)),
            _ => false,
        }
    }

    /// Flatten the error set into a single display string.
    pub fn error_message(&self) -> String {
        match &self.error {
            Value::Object(map) => map
                .iter()
                .map(|(code, detail)| match detail.as_str() {
                    Some(text) => format!("{code}: {text}"),
                    None => format!("{code}: {detail}"),
                })
                .collect::<Vec<_>>()
                .join("; "),
            other => other.to_string(),
        }
    }
}

/// Payload of the `deezer.getUserData` bootstrap call.
#[derive(Debug, Deserialize)]
pub struct UserData {
    #[serde(rename = "USER")]
    pub user: UserProfile,
    #[serde(rename = "checkForm", default)]
    pub check_form: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UserProfile {
    /// Zero for an anonymous (unauthenticated) profile.
    #[serde(rename = "USER_ID", default)]
    pub user_id: u64,
}
