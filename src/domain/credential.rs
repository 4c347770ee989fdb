use base64::prelude::{BASE64_URL_SAFE_NO_PAD, Engine as _};
use blake3::Hasher;
use chrono::{DateTime, Utc};
use serde::Deserialize;

pub const TOKEN_KEY: &str = "token";
pub const TENANT_ID_KEY: &str = "tenantId";
pub const USER_ID_KEY: &str = "userId";
pub const NAME_KEY: &str = "name";
pub const ROLE_KEY: &str = "role";
pub const USER_KEY: &str = "user";

/// Every key that makes up a signed-in identity. Cleared together.
pub const IDENTITY_KEYS: [&str; 6] = [
    TOKEN_KEY,
    TENANT_ID_KEY,
    USER_ID_KEY,
    NAME_KEY,
    ROLE_KEY,
    USER_KEY,
];

/// Identity written at sign-in time.
#[derive(Debug, Clone, Default)]
pub struct Identity {
    pub token: String,
    pub tenant_id: Option<String>,
    pub user_id: Option<String>,
    pub name: Option<String>,
    pub role: Option<String>,
}

impl Identity {
    /// Key/value pairs to persist, skipping fields that were not given.
    pub fn entries(&self) -> Vec<(&'static str, String)> {
        let mut entries = vec![(TOKEN_KEY, self.token.clone())];
        let optional = [
            (TENANT_ID_KEY, &self.tenant_id),
            (USER_ID_KEY, &self.user_id),
            (NAME_KEY, &self.name),
            (ROLE_KEY, &self.role),
        ];
        for (key, value) in optional {
            if let Some(value) = value {
                entries.push((key, value.clone()));
            }
        }
        entries
    }
}

/// Trims the stored token and drops every non-ASCII character so it is
/// always a valid header value. Returns `None` when nothing usable is left.
pub fn sanitize_token(raw: &str) -> Option<String> {
    let cleaned = raw
        .trim()
        .chars()
        .filter(char::is_ascii)
        .collect::<String>();
    if cleaned.is_empty() { None } else { Some(cleaned) }
}

/// Short, non-reversible tag for a token, safe to put in logs.
pub fn fingerprint(token: &str) -> String {
    let mut hasher = Hasher::new();
    hasher.update(token.as_bytes());
    let hex = hasher.finalize().to_hex();
    hex.as_str()[..12].to_string()
}

#[derive(Deserialize)]
struct JwtClaims {
    exp: Option<i64>,
}

/// Expiry of a JWT-shaped token, if it carries one.
pub fn token_expiry(token: &str) -> Option<DateTime<Utc>> {
    let mut parts = token.split('.');
    let (_header, payload, _signature) = (parts.next()?, parts.next()?, parts.next()?);
    if parts.next().is_some() {
        return None;
    }
    let decoded = BASE64_URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .ok()?;
    let claims: JwtClaims = serde_json::from_slice(&decoded).ok()?;
    DateTime::from_timestamp(claims.exp?, 0)
}

/// A token is usable when it is non-blank and not past its `exp` claim.
/// Opaque tokens are left for the server to judge.
pub fn token_is_usable(raw: &str, now: DateTime<Utc>) -> bool {
    match sanitize_token(raw) {
        None => false,
        Some(token) => token_expiry(&token).is_none_or(|expiry| expiry > now),
    }
}
