//! Session manager: drives hosted login, silent renewal, and logout.
//!
//! The lifecycle walks Unauthenticated → PendingCallback (fragment in
//! hand) → Authenticated (renewal scheduled) → Expiring (renewal in
//! flight), then back to Authenticated on success or Unauthenticated on
//! failure or explicit logout. All session state is written here and
//! nowhere else; everything downstream observes it through the
//! [`SessionStore`].

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error};

use crate::auth::error::AuthError;
use crate::auth::provider::IdentityProvider;
use crate::auth::store::SessionStore;
use crate::auth::token::{AuthResult, TokenData};
use crate::nav::Navigator;
use crate::storage::KeyValueStore;

/// Storage key for the persisted authenticated flag.
const LOGGED_IN_KEY: &str = "is_logged_in";

/// Storage key for the one-shot post-login redirect.
const AUTH_REDIRECT_KEY: &str = "auth_redirect";

pub struct SessionManager {
    provider: Arc<dyn IdentityProvider>,
    navigator: Arc<dyn Navigator>,
    storage: Arc<dyn KeyValueStore>,
    store: SessionStore,
    /// In-app route after a successful login with no stored redirect.
    success_path: String,
    /// In-app route after a failed login or renewal.
    failure_path: String,
    /// Single-slot renewal timer. Arming a new timer aborts the old one,
    /// so at most one renewal is ever outstanding.
    renewal_timer: Mutex<Option<JoinHandle<()>>>,
}

impl SessionManager {
    pub fn new(
        provider: Arc<dyn IdentityProvider>,
        navigator: Arc<dyn Navigator>,
        storage: Arc<dyn KeyValueStore>,
        success_path: String,
        failure_path: String,
    ) -> Arc<Self> {
        Arc::new(Self {
            provider,
            navigator,
            storage,
            store: SessionStore::new(),
            success_path,
            failure_path,
            renewal_timer: Mutex::new(None),
        })
    }

    /// Read access to the session store, for subscriptions.
    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// Last-persisted authenticated flag. May still read true after the
    /// in-memory token has lapsed, until the scheduled renewal fires.
    pub fn authenticated(&self) -> bool {
        self.storage.get(LOGGED_IN_KEY).as_deref() == Some("true")
    }

    /// Send the user to the provider's hosted login page. Control leaves
    /// the app here; it returns via the redirect callback.
    pub fn login(&self) {
        self.navigator.navigate_external(&self.provider.authorize_url());
    }

    /// Consume a login-callback fragment. A no-op when the fragment is
    /// empty or a session is already established.
    pub async fn handle_login_callback(self: &Arc<Self>, fragment: &str) {
        if fragment.is_empty() || self.authenticated() {
            return;
        }
        match self.provider.parse_callback(fragment) {
            Ok(result) => {
                self.stream_session(result).await;
                // Consume the stored redirect exactly once.
                let target = match self.storage.get(AUTH_REDIRECT_KEY) {
                    Some(url) => {
                        self.storage.remove(AUTH_REDIRECT_KEY);
                        url
                    }
                    None => self.success_path.clone(),
                };
                self.navigator.navigate(&target);
            }
            Err(e) => {
                log_auth_error(&e);
                self.navigator.navigate(&self.failure_path);
            }
        }
    }

    /// Silently renew the session against the provider. A no-op unless
    /// the persisted flag says we are authenticated. On failure this is a
    /// forced logout: flag cleared, timer cancelled, failure route shown.
    pub async fn renew_auth(self: &Arc<Self>) {
        if !self.authenticated() {
            return;
        }
        match self.provider.check_session().await {
            Ok(result) => {
                self.stream_session(result).await;
            }
            Err(e) => {
                log_auth_error(&e);
                self.storage.remove(LOGGED_IN_KEY);
                self.unschedule_renewal().await;
                // No awaits may follow the abort above: when the renewal
                // timer itself is the caller, its task is now cancelled at
                // the next yield point.
                self.navigator.navigate(&self.failure_path);
            }
        }
    }

    /// Publish fresh tokens and re-arm the renewal timer.
    ///
    /// Returns a boxed future to break the auto-trait inference cycle on
    /// the recursive renewal path (`schedule_renewal` spawns a task that
    /// drives `renew_auth` → `stream_session` → `schedule_renewal`); the
    /// `dyn Future + Send` boundary lets `tokio::spawn` prove `Send`.
    fn stream_session<'a>(
        self: &'a Arc<Self>,
        result: AuthResult,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = ()> + Send + 'a>> {
        Box::pin(async move {
            let token =
                TokenData::from_expires_in(result.access_token, result.expires_in, Utc::now());
            debug!(expires_at = %token.expires_at, "Session tokens updated");
            self.store.publish(token, result.id_token_payload);
            self.storage.set(LOGGED_IN_KEY, "true");
            self.schedule_renewal().await;
        })
    }

    /// Arm the renewal timer for the current token's expiry, cancelling
    /// any previously armed timer first. The delay is floored at 1 ms so
    /// an already-expired token renews on the next tick instead of
    /// reentering the scheduler synchronously.
    pub async fn schedule_renewal(self: &Arc<Self>) {
        if !self.authenticated() {
            return;
        }
        let Some(token) = self.store.token_data() else {
            return;
        };
        let delay_ms = renewal_delay_ms(token.expires_at, Utc::now());

        let mut slot = self.renewal_timer.lock().await;
        if let Some(previous) = slot.take() {
            previous.abort();
        }
        debug!(delay_ms, "Renewal timer armed");
        let manager = Arc::clone(self);
        *slot = Some(tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(delay_ms)).await;
            manager.renew_auth().await;
        }));
    }

    /// Cancel the outstanding renewal timer, if any. Idempotent.
    pub async fn unschedule_renewal(&self) {
        if let Some(timer) = self.renewal_timer.lock().await.take() {
            timer.abort();
        }
    }

    /// Flip the persisted flag off, then leave for the provider's logout
    /// page. Nothing in-app runs after the external navigation; a timer
    /// still armed at this point fires into the `renew_auth` precondition
    /// and does nothing.
    pub fn logout(&self) {
        self.storage.set(LOGGED_IN_KEY, "false");
        self.navigator.navigate_external(&self.provider.logout_url());
    }

    /// Remember where an unauthenticated user was headed, to return there
    /// after the next successful login.
    pub fn store_auth_redirect(&self, url: &str) {
        self.storage.set(AUTH_REDIRECT_KEY, url);
    }
}

/// Milliseconds until the renewal should fire: time to expiry, floored at
/// one millisecond for tokens already past their expiry.
fn renewal_delay_ms(expires_at: DateTime<Utc>, now: DateTime<Utc>) -> u64 {
    (expires_at - now).num_milliseconds().max(1) as u64
}

fn log_auth_error(e: &AuthError) {
    error!(error = %e, "Authentication error");
}

// ============================================================================
// Tests
// ============================================================================
