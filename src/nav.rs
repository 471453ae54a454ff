//! Route/navigation collaborator.
//!
//! The session core never renders anything; it asks a `Navigator` to move.
//! In-app routes go through `navigate`, while hosted login and logout are
//! full-page redirects out of the application via `navigate_external` —
//! once one of those is issued, control is not expected to return.

use tokio::sync::watch;
use tracing::info;

pub trait Navigator: Send + Sync {
    /// Move to an in-app route, e.g. `/` or `/dragons/42`.
    fn navigate(&self, path: &str);

    /// Full-page redirect to an external URL (hosted login/logout).
    fn navigate_external(&self, url: &str);
}

/// Navigator backed by watch channels the app loop observes.
///
/// Route changes replace the current route; an external navigation is a
/// terminal event the loop surfaces to the user (the URL must be opened in
/// a browser) before leaving the session screen.
pub struct AppNavigator {
    route_tx: watch::Sender<String>,
    external_tx: watch::Sender<Option<String>>,
}

impl AppNavigator {
    pub fn new() -> Self {
        let (route_tx, _) = watch::channel("/".to_string());
        let (external_tx, _) = watch::channel(None);
        Self {
            route_tx,
            external_tx,
        }
    }

    /// Subscribe to in-app route changes (current route replayed first).
    pub fn routes(&self) -> watch::Receiver<String> {
        self.route_tx.subscribe()
    }

    /// Subscribe to external navigations; `Some(url)` once one is issued.
    pub fn external(&self) -> watch::Receiver<Option<String>> {
        self.external_tx.subscribe()
    }
}

impl Default for AppNavigator {
    fn default() -> Self {
        Self::new()
    }
}

impl Navigator for AppNavigator {
    fn navigate(&self, path: &str) {
        let _ = self.route_tx.send(path.to_string());
    }

    fn navigate_external(&self, url: &str) {
        info!(url = %url, "Leaving the app for an external page");
        let _ = self.external_tx.send(Some(url.to_string()));
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_routes_replay_current_value() {
        let nav = AppNavigator::new();
        nav.navigate("/dragons/42");

        // A subscriber that arrives late still sees the latest route.
        let rx = nav.routes();
        assert_eq!(*rx.borrow(), "/dragons/42");
    }

    #[test]
    fn test_external_navigation_is_observable() {
        let nav = AppNavigator::new();
        let rx = nav.external();
        assert_eq!(*rx.borrow(), None);

        nav.navigate_external("https://idp.example.com/v2/logout");
        assert_eq!(
            rx.borrow().as_deref(),
            Some("https://idp.example.com/v2/logout")
        );
    }
}
