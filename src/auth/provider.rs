//! Identity-provider collaborator.
//!
//! The session manager consumes the provider as a black box that either
//! returns tokens or an error. `HostedAuth` implements the hosted-login
//! contract at the HTTP level: authorize and logout are full-page
//! navigations to the provider's pages, the login callback arrives as a
//! URL fragment, and silent renewal replays the authorize endpoint with
//! `prompt=none` against the provider's own session cookie.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;

use crate::auth::error::AuthError;
use crate::auth::token::{AuthResult, UserProfile};

/// Scopes requested from the identity provider.
const SCOPES: &str = "openid profile email";

/// Response type for hosted login: tokens delivered in the URL fragment.
const RESPONSE_TYPE: &str = "token id_token";

/// HTTP timeout for the silent session check in seconds.
const CHECK_SESSION_TIMEOUT_SECS: u64 = 30;

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// URL of the provider's hosted login page, for a full-page redirect.
    fn authorize_url(&self) -> String;

    /// Parse a redirect-callback fragment into an auth result.
    fn parse_callback(&self, fragment: &str) -> Result<AuthResult, AuthError>;

    /// Silent, non-interactive renewal against the provider's own session.
    async fn check_session(&self) -> Result<AuthResult, AuthError>;

    /// URL of the provider's logout endpoint, for a full-page redirect.
    fn logout_url(&self) -> String;
}

/// Connection settings for a hosted identity-provider tenant.
#[derive(Debug, Clone)]
pub struct ProviderSettings {
    pub client_id: String,
    /// Tenant domain, e.g. `tenant.idp.example.com` (scheme optional).
    pub domain: String,
    pub redirect_uri: String,
    pub audience: String,
    /// Where the provider sends the browser back to after logout.
    pub logout_return_url: String,
}

/// Production identity-provider client.
pub struct HostedAuth {
    settings: ProviderSettings,
    http: reqwest::Client,
}

impl HostedAuth {
    pub fn new(settings: ProviderSettings) -> Result<Self, AuthError> {
        // Redirects stay unfollowed: the silent check reads tokens out of
        // the provider's redirect Location rather than following it.
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(CHECK_SESSION_TIMEOUT_SECS))
            .cookie_store(true)
            .redirect(reqwest::redirect::Policy::none())
            .build()?;
        Ok(Self { settings, http })
    }

    fn base_url(&self) -> String {
        if self.settings.domain.starts_with("http://") || self.settings.domain.starts_with("https://")
        {
            self.settings.domain.trim_end_matches('/').to_string()
        } else {
            format!("https://{}", self.settings.domain)
        }
    }
}

#[async_trait]
impl IdentityProvider for HostedAuth {
    fn authorize_url(&self) -> String {
        let query = encode_query(&[
            ("client_id", self.settings.client_id.as_str()),
            ("response_type", RESPONSE_TYPE),
            ("redirect_uri", self.settings.redirect_uri.as_str()),
            ("audience", self.settings.audience.as_str()),
            ("scope", SCOPES),
        ]);
        format!("{}/authorize?{}", self.base_url(), query)
    }

    fn parse_callback(&self, fragment: &str) -> Result<AuthResult, AuthError> {
        let params = parse_fragment(fragment);

        if let Some(error) = params.get("error") {
            return Err(AuthError::denied(
                error,
                params.get("error_description").map(String::as_str),
            ));
        }

        let access_token = params
            .get("access_token")
            .ok_or(AuthError::MissingToken)?
            .clone();
        let expires_in = params
            .get("expires_in")
            .and_then(|v| v.parse::<i64>().ok())
            .ok_or_else(|| {
                AuthError::InvalidFragment("missing or non-numeric expires_in".to_string())
            })?;
        let id_token_payload = match params.get("id_token") {
            Some(jwt) => decode_jwt_payload(jwt)?,
            None => serde_json::json!({}),
        };

        Ok(AuthResult {
            access_token,
            expires_in,
            id_token_payload,
        })
    }

    async fn check_session(&self) -> Result<AuthResult, AuthError> {
        let url = format!("{}&prompt=none", self.authorize_url());
        let response = self.http.get(&url).send().await?;

        // A silent request is answered with a redirect back to the
        // registered redirect URI, tokens or error in the fragment.
        if !response.status().is_redirection() {
            return Err(AuthError::SessionCheck(format!(
                "unexpected status {}",
                response.status()
            )));
        }
        let location = response
            .headers()
            .get(reqwest::header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AuthError::SessionCheck("redirect without Location header".to_string()))?;
        let fragment = location
            .split_once('#')
            .map(|(_, fragment)| fragment)
            .ok_or_else(|| {
                AuthError::SessionCheck("redirect carried no token fragment".to_string())
            })?;

        self.parse_callback(fragment)
    }

    fn logout_url(&self) -> String {
        let query = encode_query(&[
            ("returnTo", self.settings.logout_return_url.as_str()),
            ("client_id", self.settings.client_id.as_str()),
        ]);
        format!("{}/v2/logout?{}", self.base_url(), query)
    }
}

/// Decode the claims payload of a JWT without verifying its signature —
/// the token is only displayed, never trusted for authorization here.
fn decode_jwt_payload(jwt: &str) -> Result<UserProfile, AuthError> {
    let payload = jwt
        .split('.')
        .nth(1)
        .ok_or_else(|| AuthError::InvalidIdToken("not a three-part JWT".to_string()))?;
    let bytes = URL_SAFE_NO_PAD
        .decode(payload)
        .map_err(|e| AuthError::InvalidIdToken(e.to_string()))?;
    serde_json::from_slice(&bytes).map_err(|e| AuthError::InvalidIdToken(e.to_string()))
}

/// Split a `#key=value&...` fragment into decoded pairs.
fn parse_fragment(fragment: &str) -> HashMap<String, String> {
    fragment
        .trim_start_matches('#')
        .split('&')
        .filter(|pair| !pair.is_empty())
        .filter_map(|pair| {
            let (key, value) = pair.split_once('=')?;
            Some((percent_decode(key), percent_decode(value)))
        })
        .collect()
}

/// Build a URL-encoded query string.
fn encode_query(params: &[(&str, &str)]) -> String {
    params
        .iter()
        .map(|(k, v)| format!("{}={}", percent_encode(k), percent_encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

fn percent_encode(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            'A'..='Z' | 'a'..='z' | '0'..='9' | '-' | '_' | '.' | '~' => c.to_string(),
            _ => c
                .to_string()
                .bytes()
                .map(|b| format!("%{:02X}", b))
                .collect(),
        })
        .collect()
}

fn percent_decode(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'%' => {
                let pair = (
                    bytes.get(i + 1).copied().and_then(hex_val),
                    bytes.get(i + 2).copied().and_then(hex_val),
                );
                match pair {
                    (Some(hi), Some(lo)) => {
                        out.push(hi * 16 + lo);
                        i += 3;
                    }
                    _ => {
                        out.push(b'%');
                        i += 1;
                    }
                }
            }
            b'+' => {
                out.push(b' ');
                i += 1;
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn hex_val(b: u8) -> Option<u8> {
    (b as char).to_digit(16).map(|v| v as u8)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> ProviderSettings {
        ProviderSettings {
            client_id: "client-123".to_string(),
            domain: "tenant.idp.example.com".to_string(),
            redirect_uri: "http://localhost:4200/callback".to_string(),
            audience: "https://api.example.com".to_string(),
            logout_return_url: "http://localhost:4200".to_string(),
        }
    }

    fn provider() -> HostedAuth {
        HostedAuth::new(settings()).unwrap()
    }

    /// A syntactically valid JWT whose payload is the given claims JSON.
    fn fake_jwt(claims: &serde_json::Value) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"RS256","typ":"JWT"}"#);
        let payload = URL_SAFE_NO_PAD.encode(claims.to_string().as_bytes());
        format!("{}.{}.signature", header, payload)
    }

    // -------------------------------------------------------------------------
    // URL construction
    // -------------------------------------------------------------------------

    #[test]
    fn test_authorize_url() {
        let url = provider().authorize_url();
        assert!(url.starts_with("https://tenant.idp.example.com/authorize?"));
        assert!(url.contains("client_id=client-123"));
        assert!(url.contains("response_type=token%20id_token"));
        assert!(url.contains("redirect_uri=http%3A%2F%2Flocalhost%3A4200%2Fcallback"));
        assert!(url.contains("scope=openid%20profile%20email"));
    }

    #[test]
    fn test_authorize_url_domain_with_scheme() {
        let mut s = settings();
        s.domain = "http://localhost:3333/".to_string();
        let url = HostedAuth::new(s).unwrap().authorize_url();
        assert!(url.starts_with("http://localhost:3333/authorize?"));
    }

    #[test]
    fn test_logout_url() {
        let url = provider().logout_url();
        assert!(url.starts_with("https://tenant.idp.example.com/v2/logout?"));
        assert!(url.contains("returnTo=http%3A%2F%2Flocalhost%3A4200"));
        assert!(url.contains("client_id=client-123"));
    }

    // -------------------------------------------------------------------------
    // Callback parsing
    // -------------------------------------------------------------------------

    #[test]
    fn test_parse_callback_success() {
        let jwt = fake_jwt(&serde_json::json!({"name": "Kai", "email": "kai@example.com"}));
        let fragment = format!(
            "#access_token=abc123&expires_in=7200&token_type=Bearer&id_token={}",
            jwt
        );

        let result = provider().parse_callback(&fragment).unwrap();
        assert_eq!(result.access_token, "abc123");
        assert_eq!(result.expires_in, 7200);
        assert_eq!(result.id_token_payload["name"], "Kai");
        assert_eq!(result.id_token_payload["email"], "kai@example.com");
    }

    #[test]
    fn test_parse_callback_without_id_token() {
        let result = provider()
            .parse_callback("access_token=abc&expires_in=60")
            .unwrap();
        assert_eq!(result.id_token_payload, serde_json::json!({}));
    }

    #[test]
    fn test_parse_callback_provider_error() {
        let err = provider()
            .parse_callback("#error=access_denied&error_description=Consent%20required")
            .unwrap_err();
        match err {
            AuthError::Denied { error, description } => {
                assert_eq!(error, "access_denied");
                assert_eq!(description, "Consent required");
            }
            other => panic!("expected Denied, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_callback_missing_token() {
        let err = provider().parse_callback("#state=xyz").unwrap_err();
        assert!(matches!(err, AuthError::MissingToken));
    }

    #[test]
    fn test_parse_callback_bad_expires_in() {
        let err = provider()
            .parse_callback("#access_token=abc&expires_in=soon")
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidFragment(_)));
    }

    #[test]
    fn test_decode_jwt_payload_rejects_garbage() {
        assert!(matches!(
            decode_jwt_payload("notajwt"),
            Err(AuthError::InvalidIdToken(_))
        ));
        assert!(matches!(
            decode_jwt_payload("a.!!!.c"),
            Err(AuthError::InvalidIdToken(_))
        ));
    }

    // -------------------------------------------------------------------------
    // Encoding helpers
    // -------------------------------------------------------------------------

    #[test]
    fn test_percent_roundtrip() {
        let original = "hello world/percent%signs+and spaces";
        assert_eq!(percent_decode(&percent_encode(original)), original);
    }

    #[test]
    fn test_percent_decode_plus_and_truncated_escape() {
        assert_eq!(percent_decode("a+b"), "a b");
        assert_eq!(percent_decode("100%"), "100%");
        assert_eq!(percent_decode("%2"), "%2");
    }

    #[test]
    fn test_parse_fragment_skips_malformed_pairs() {
        let params = parse_fragment("#access_token=abc&&junk&expires_in=60");
        assert_eq!(params.get("access_token").map(String::as_str), Some("abc"));
        assert_eq!(params.get("expires_in").map(String::as_str), Some("60"));
        assert_eq!(params.len(), 2);
    }
}
