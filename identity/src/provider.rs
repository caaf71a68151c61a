//! Identity provider configuration.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// Known OAuth identity providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    GitHub,
}

impl ProviderKind {
    /// Get the provider identifier string.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::GitHub => "github.com",
        }
    }
}

/// Scope granting read access to the user's public profile.
pub const GITHUB_SCOPE_READ_USER: &str = "read:user";
/// Scope granting read access to the user's email addresses.
pub const GITHUB_SCOPE_USER_EMAIL: &str = "user:email";
/// Custom parameter letting the consent flow create a new GitHub account.
pub const GITHUB_PARAM_ALLOW_SIGNUP: &str = "allow_signup";

/// Provider configuration sent with every interactive sign-in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    /// Provider identifier.
    pub provider: ProviderKind,
    /// OAuth scopes to request.
    pub scopes: BTreeSet<String>,
    /// Extra query parameters for the authorization request.
    pub custom_parameters: BTreeMap<String, String>,
}

impl ProviderConfig {
    /// GitHub with basic profile and email scopes, allowing new account creation.
    pub fn github() -> Self {
        let scopes = [GITHUB_SCOPE_READ_USER, GITHUB_SCOPE_USER_EMAIL]
            .into_iter()
            .map(str::to_string)
            .collect();
        let custom_parameters =
            BTreeMap::from([(GITHUB_PARAM_ALLOW_SIGNUP.to_string(), "true".to_string())]);

        Self {
            provider: ProviderKind::GitHub,
            scopes,
            custom_parameters,
        }
    }

    /// Build the request for one sign-in attempt.
    pub fn sign_in_request(&self) -> SignInRequest {
        SignInRequest {
            provider: self.provider,
            scopes: self.scopes.clone(),
            custom_parameters: self.custom_parameters.clone(),
        }
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self::github()
    }
}

/// What the coordinator asks the identity service for on each sign-in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignInRequest {
    pub provider: ProviderKind,
    pub scopes: BTreeSet<String>,
    pub custom_parameters: BTreeMap<String, String>,
}

impl SignInRequest {
    /// Scopes joined the way OAuth authorization URLs expect them.
    pub fn scope_string(&self) -> String {
        self.scopes
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(" ")
    }
}
