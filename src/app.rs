//! Application state management for dragondeck.
//!
//! This module contains the `App` struct that wires the session manager,
//! its collaborators, and the API client together, and holds the data the
//! terminal front-end renders: the current route, the signed-in user, and
//! the fetched dragon roster.

use std::sync::Arc;

use anyhow::Result;
use tokio::sync::watch;
use tracing::warn;

use crate::api::ApiClient;
use crate::auth::provider::HostedAuth;
use crate::auth::token::{TokenData, UserProfile};
use crate::auth::SessionManager;
use crate::config::Config;
use crate::models::Dragon;
use crate::nav::{AppNavigator, Navigator};
use crate::storage::{FileStore, KeyValueStore, MemoryStore};

pub struct App {
    pub session: Arc<SessionManager>,
    pub api: ApiClient,
    pub dragons: Vec<Dragon>,
    pub last_fetch_error: Option<String>,
    navigator: Arc<AppNavigator>,
    route_rx: watch::Receiver<String>,
    external_rx: watch::Receiver<Option<String>>,
    profile_rx: watch::Receiver<Option<UserProfile>>,
    token_rx: watch::Receiver<Option<TokenData>>,
}

impl App {
    pub fn new(config: &Config) -> Result<Self> {
        let navigator = Arc::new(AppNavigator::new());
        let route_rx = navigator.routes();
        let external_rx = navigator.external();

        // Session flags degrade to process-lifetime storage when the
        // platform config dir is unavailable.
        let storage: Arc<dyn KeyValueStore> = match Config::data_dir().and_then(FileStore::open) {
            Ok(store) => Arc::new(store),
            Err(e) => {
                warn!(error = %e, "Falling back to in-memory session storage");
                Arc::new(MemoryStore::new())
            }
        };

        let provider = Arc::new(HostedAuth::new(config.provider_settings())?);
        let session = SessionManager::new(
            provider,
            navigator.clone(),
            storage,
            config.success_path.clone(),
            config.failure_path.clone(),
        );
        let profile_rx = session.store().subscribe_profile();
        let token_rx = session.store().subscribe_token();
        let api = ApiClient::new(&config.api_base_url, token_rx.clone())?;

        Ok(Self {
            session,
            api,
            dragons: Vec::new(),
            last_fetch_error: None,
            navigator,
            route_rx,
            external_rx,
            profile_rx,
            token_rx,
        })
    }

    /// Startup sequence: consume a login callback if one was handed to
    /// the process, then silently restore a persisted session.
    pub async fn start(&self, callback_fragment: Option<&str>) {
        if let Some(fragment) = callback_fragment {
            self.session.handle_login_callback(fragment).await;
        }
        self.session.renew_auth().await;
    }

    pub fn current_route(&self) -> String {
        self.route_rx.borrow().clone()
    }

    /// Route guard: authenticated users go straight through; anyone else
    /// is remembered and must sign in, returning here afterwards.
    pub fn guard_navigate(&self, path: &str) -> bool {
        if self.session.authenticated() {
            self.navigator.navigate(path);
            true
        } else {
            self.session.store_auth_redirect(path);
            false
        }
    }

    /// The external URL the session manager asked to leave for, if any.
    pub fn pending_external(&self) -> Option<String> {
        self.external_rx.borrow().clone()
    }

    /// Display name from the profile stream.
    pub fn user_name(&self) -> Option<String> {
        self.profile_rx
            .borrow()
            .as_ref()
            .and_then(profile_display_name)
    }

    pub fn has_token(&self) -> bool {
        self.token_rx.borrow().is_some()
    }

    /// Minutes until the in-memory token lapses, when one is present.
    pub fn token_minutes_left(&self) -> Option<i64> {
        self.token_rx
            .borrow()
            .as_ref()
            .map(|token| token.time_until_expiry().num_minutes().max(0))
    }

    pub fn dragons_exist(&self) -> bool {
        !self.dragons.is_empty()
    }

    /// Fetch the roster, keeping the last error around for display.
    pub async fn load_dragons(&mut self) {
        match self.api.get_dragons().await {
            Ok(dragons) => {
                self.dragons = dragons;
                self.last_fetch_error = None;
            }
            Err(e) => {
                warn!(error = %e, "Failed to load dragons");
                self.last_fetch_error = Some(e.to_string());
            }
        }
    }
}

/// Name to greet the user with: the `name` claim, falling back to `email`.
fn profile_display_name(profile: &UserProfile) -> Option<String> {
    profile["name"]
        .as_str()
        .or_else(|| profile["email"].as_str())
        .map(str::to_string)
}

/// Extract the non-empty fragment from a pasted redirect URL.
pub fn fragment_of(url: &str) -> Option<&str> {
    match url.split_once('#') {
        Some((_, fragment)) if !fragment.is_empty() => Some(fragment),
        _ => None,
    }
}

// ============================================================================
// Tests
// ============================================================================
