//! REST API client module for the dragon roster backend.
//!
//! This module provides the `ApiClient` for fetching dragon records.
//! Every outgoing request passes through the request authenticator,
//! which attaches the session's bearer token when one is present.

pub mod client;
pub mod error;
pub mod interceptor;

pub use client::ApiClient;
pub use error::ApiError;
