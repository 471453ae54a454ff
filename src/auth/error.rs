use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Authentication denied: {error}: {description}")]
    Denied { error: String, description: String },

    #[error("Callback fragment has no access token")]
    MissingToken,

    #[error("Malformed callback fragment: {0}")]
    InvalidFragment(String),

    #[error("Could not decode id_token payload: {0}")]
    InvalidIdToken(String),

    #[error("Silent session check failed: {0}")]
    SessionCheck(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl AuthError {
    /// Build a `Denied` error from the provider's `error` and
    /// `error_description` redirect parameters.
    pub fn denied(error: &str, description: Option<&str>) -> Self {
        AuthError::Denied {
            error: error.to_string(),
            description: description.unwrap_or("no description provided").to_string(),
        }
    }
}
