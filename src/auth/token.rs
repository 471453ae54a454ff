//! Session token value objects.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Opaque bag of ID-token claims supplied by the identity provider
/// (name, email, picture, ...). Never interpreted by the session core.
pub type UserProfile = serde_json::Value;

/// Access token plus its computed expiry instant.
///
/// Always held as `Option<TokenData>`: the token and its expiry are absent
/// together or present together, never one without the other. An expired
/// value is not actively cleared; it lapses in place until the scheduled
/// renewal replaces it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenData {
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
}

impl TokenData {
    /// Build token data from a provider result, anchoring the expiry at
    /// `now + expires_in` seconds.
    pub fn from_expires_in(access_token: String, expires_in: i64, now: DateTime<Utc>) -> Self {
        Self {
            access_token,
            expires_at: now + Duration::seconds(expires_in),
        }
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at
    }

    pub fn time_until_expiry(&self) -> Duration {
        self.expires_at - Utc::now()
    }
}

/// What the identity provider hands back on a successful login callback
/// or silent session check.
#[derive(Debug, Clone)]
pub struct AuthResult {
    pub access_token: String,
    /// Token lifetime in seconds, as reported by the provider.
    pub expires_in: i64,
    pub id_token_payload: UserProfile,
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_expires_in_anchors_at_now() {
        let now = Utc::now();
        let token = TokenData::from_expires_in("abc".to_string(), 7200, now);
        assert_eq!(token.access_token, "abc");
        assert_eq!(token.expires_at, now + Duration::seconds(7200));
    }

    #[test]
    fn test_is_expired() {
        let now = Utc::now();
        let live = TokenData::from_expires_in("abc".to_string(), 60, now);
        assert!(!live.is_expired());

        let lapsed = TokenData::from_expires_in("abc".to_string(), -60, now);
        assert!(lapsed.is_expired());
    }

    #[test]
    fn test_time_until_expiry_sign() {
        let now = Utc::now();
        let live = TokenData::from_expires_in("abc".to_string(), 3600, now);
        assert!(live.time_until_expiry() > Duration::zero());

        let lapsed = TokenData::from_expires_in("abc".to_string(), -3600, now);
        assert!(lapsed.time_until_expiry() < Duration::zero());
    }
}
