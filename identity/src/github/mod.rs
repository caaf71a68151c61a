//! GitHub OAuth implementation of the identity service.
//!
//! Runs the authorization-code flow with PKCE on the caller's interaction
//! context, exchanges the code for an access token, and loads the user's
//! profile from the GitHub REST API.

mod api;
mod pkce;
mod service;

pub use pkce::Pkce;
pub use service::{GitHubIdentityService, GitHubUrls};
