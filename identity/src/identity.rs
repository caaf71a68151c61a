//! Identity types returned by an identity service.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::display_name;

/// A signed-in user as reported by the identity service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    /// Provider's unique user identifier.
    pub uid: String,
    /// User's preferred display name.
    pub display_name: Option<String>,
    /// User's email address.
    pub email: Option<String>,
    /// Username on the identity provider (the GitHub login).
    pub provider_username: Option<String>,
    /// User's profile picture URL.
    pub photo_url: Option<String>,
    /// Identifier of the provider that authenticated this user, e.g. "github.com".
    pub provider_id: String,
}

impl Identity {
    /// Name to show for this identity using the fallback chain.
    pub fn resolved_display_name(&self) -> String {
        display_name::resolve(self, None)
    }
}

/// Additional information the provider returned alongside the identity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderMetadata {
    pub provider_id: String,
    /// Username on the provider, when it reported one.
    pub username: Option<String>,
    /// True when this sign-in created the account.
    pub is_new_user: bool,
    /// Raw profile fields as returned by the provider.
    pub profile: Map<String, Value>,
}

/// Result of a completed interactive sign-in.
#[derive(Debug, Clone, PartialEq)]
pub struct SignInResult {
    /// The signed-in user. `None` means the service reported success without a user.
    pub identity: Option<Identity>,
    pub provider_metadata: ProviderMetadata,
}
