//! Token claims

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Decoded payload of an authentication token
///
/// The only claim interpreted by the client is `exp`, everything else is issued by the server and
/// passed through untouched as the user data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Expiration time in seconds since epoch
    pub exp: i64,
    /// All the remaining claims
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Claims {
    /// Creates claims expiring at given timestamp (in seconds)
    pub fn new(exp: i64) -> Self {
        Self {
            exp,
            extra: Map::new(),
        }
    }

    /// Adds a claim
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(name.into(), value.into());
        self
    }

    /// Returns claim by its name
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.extra.get(name)
    }

    /// The `sub` claim if it is a string
    pub fn subject(&self) -> Option<&str> {
        self.get("sub").and_then(Value::as_str)
    }

    /// Expiration time, `None` if `exp` is out of the representable range
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.exp, 0)
    }

    /// Checks if claims are expired at the given point of time.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at().is_none_or(|expires_at| expires_at <= now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use assert_json_diff::assert_json_eq;
    use chrono::Duration;
    use serde_json::json;

    #[test]
    fn extra_claims_are_flattened() {
        let claims: Claims = serde_json::from_value(json!({
            "sub": "u1",
            "email": "u1@example.com",
            "exp": 1_700_000_000,
        }))
        .unwrap();

        assert_eq!(claims.exp, 1_700_000_000);
        assert_eq!(claims.subject(), Some("u1"));
        assert_eq!(claims.get("email"), Some(&json!("u1@example.com")));

        assert_json_eq!(
            serde_json::to_value(&claims).unwrap(),
            json!({ "sub": "u1", "email": "u1@example.com", "exp": 1_700_000_000 })
        );
    }

    #[test]
    fn missing_exp_is_rejected() {
        serde_json::from_value::<Claims>(json!({ "sub": "u1" })).unwrap_err();
        serde_json::from_value::<Claims>(json!({ "sub": "u1", "exp": "soon" })).unwrap_err();
    }

    #[test]
    fn expiry() {
        let now = Utc::now();
        let exp = now.timestamp();

        assert!(Claims::new(exp - 1).is_expired_at(now));
        assert!(Claims::new(exp + 3600).is_expired_at(now + Duration::hours(2)));
        assert!(!Claims::new(exp + 3600).is_expired_at(now));

        // Expiring exactly now is already expired
        let at = DateTime::from_timestamp(exp, 0).unwrap();
        assert!(Claims::new(exp).is_expired_at(at));

        assert!(Claims::new(i64::MAX).is_expired_at(now));
    }
}
