//! Request authenticator: bearer decoration for outgoing API requests.

use reqwest::RequestBuilder;

use crate::auth::token::TokenData;

/// Attach the current access token as a bearer credential.
///
/// A request with no token available is forwarded unmodified - the
/// backend decides what an unauthenticated caller may see. Decoration is
/// pure and synchronous; expiry is not checked here, the session manager
/// keeps the published token fresh.
pub fn authenticate_request(request: RequestBuilder, token: Option<&TokenData>) -> RequestBuilder {
    match token {
        Some(token) => request.bearer_auth(&token.access_token),
        None => request,
    }
}

// ============================================================================
// Tests
// ============================================================================
