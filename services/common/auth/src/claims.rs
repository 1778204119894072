use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AuthError, AuthResult};

/// Application-focused representation of verified JWT claims.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Claims {
    pub subject: String,
    pub issuer: String,
    pub audience: Vec<String>,
    pub expires_at: DateTime<Utc>,
    pub issued_at: Option<DateTime<Utc>>,
    /// `None` when the token carries no usable `permissions` array.
    pub permissions: Option<Vec<String>>,
    pub raw: serde_json::Value,
}

impl Claims {
    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions
            .as_deref()
            .is_some_and(|granted| granted.iter().any(|value| value == permission))
    }
}

#[derive(Debug, Deserialize)]
struct ClaimsRepr {
    sub: String,
    exp: i64,
    #[serde(default)]
    iat: Option<i64>,
    iss: String,
    #[serde(default)]
    aud: Option<AudienceRepr>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum AudienceRepr {
    Single(String),
    Many(Vec<String>),
}

fn timestamp(claim: &'static str, value: i64) -> AuthResult<DateTime<Utc>> {
    Utc.timestamp_opt(value, 0)
        .single()
        .ok_or_else(|| AuthError::InvalidHeader(format!("claim '{claim}' out of range: {value}")))
}

// Anything that is not an array of strings counts as "no permission array".
fn permissions_from(raw: &serde_json::Value) -> Option<Vec<String>> {
    match raw.get("permissions") {
        Some(value @ serde_json::Value::Array(_)) => {
            serde_json::from_value::<Vec<String>>(value.clone()).ok()
        }
        _ => None,
    }
}

impl TryFrom<serde_json::Value> for Claims {
    type Error = AuthError;

    fn try_from(value: serde_json::Value) -> AuthResult<Self> {
        let repr: ClaimsRepr = serde_json::from_value(value.clone())
            .map_err(|err| AuthError::InvalidHeader(err.to_string()))?;

        let expires_at = timestamp("exp", repr.exp)?;
        let issued_at = repr.iat.map(|iat| timestamp("iat", iat)).transpose()?;

        let audience = match repr.aud {
            Some(AudienceRepr::Single(item)) => vec![item],
            Some(AudienceRepr::Many(items)) => items,
            None => Vec::new(),
        };

        Ok(Self {
            subject: repr.sub,
            issuer: repr.iss,
            audience,
            expires_at,
            issued_at,
            permissions: permissions_from(&value),
            raw: value,
        })
    }
}
