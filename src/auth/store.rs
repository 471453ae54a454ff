//! Session store: broadcast register for token data and the user profile.

use tokio::sync::watch;

use crate::auth::token::{TokenData, UserProfile};

/// Latest-value broadcast register for session state.
///
/// Subscribers immediately observe the most recent value, then every
/// subsequent update. The store performs no validation and holds no logic;
/// it is written only by the session manager and read by everyone else
/// (the request authenticator, the app shell).
pub struct SessionStore {
    token_tx: watch::Sender<Option<TokenData>>,
    profile_tx: watch::Sender<Option<UserProfile>>,
}

impl SessionStore {
    /// Create a store with empty token data and no profile.
    pub fn new() -> Self {
        let (token_tx, _) = watch::channel(None);
        let (profile_tx, _) = watch::channel(None);
        Self {
            token_tx,
            profile_tx,
        }
    }

    /// Current token data, if any has been published.
    pub fn token_data(&self) -> Option<TokenData> {
        self.token_tx.borrow().clone()
    }

    /// Subscribe to token updates. The receiver replays the latest value.
    pub fn subscribe_token(&self) -> watch::Receiver<Option<TokenData>> {
        self.token_tx.subscribe()
    }

    /// Subscribe to profile updates. The receiver replays the latest value.
    pub fn subscribe_profile(&self) -> watch::Receiver<Option<UserProfile>> {
        self.profile_tx.subscribe()
    }

    /// Publish a fresh token + profile pair. Session-manager use only.
    pub(crate) fn publish(&self, token: TokenData, profile: UserProfile) {
        let _ = self.token_tx.send(Some(token));
        let _ = self.profile_tx.send(Some(profile));
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_initial_values_are_empty() {
        let store = SessionStore::new();
        assert_eq!(store.token_data(), None);
        assert!(store.subscribe_profile().borrow().is_none());
    }

    #[test]
    fn test_late_subscriber_sees_latest_value() {
        let store = SessionStore::new();
        let token = TokenData::from_expires_in("abc".to_string(), 7200, Utc::now());
        store.publish(token.clone(), serde_json::json!({"name": "Kai"}));

        let token_rx = store.subscribe_token();
        assert_eq!(*token_rx.borrow(), Some(token));

        let profile_rx = store.subscribe_profile();
        assert_eq!(
            profile_rx.borrow().as_ref().and_then(|p| p["name"].as_str()),
            Some("Kai")
        );
    }

    #[tokio::test]
    async fn test_subscriber_observes_subsequent_updates() {
        let store = SessionStore::new();
        let mut rx = store.subscribe_token();

        // Consume the replayed initial value.
        assert_eq!(*rx.borrow_and_update(), None);

        let token = TokenData::from_expires_in("xyz".to_string(), 60, Utc::now());
        store.publish(token.clone(), serde_json::Value::Null);

        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow_and_update(), Some(token));
    }
}
