//! Display-name fallback chain.

use crate::identity::Identity;

/// Shown when the provider gives us nothing better.
pub const DEFAULT_DISPLAY_NAME: &str = "GitHub User";

/// Resolve the name to show for `identity`.
///
/// Order: display name, email, provider username, then `DEFAULT_DISPLAY_NAME`.
/// `provider_username` takes precedence over the username cached on the identity.
/// Blank values are skipped, so the result is never empty.
pub fn resolve(identity: &Identity, provider_username: Option<&str>) -> String {
    let username = provider_username
        .filter(|name| !name.trim().is_empty())
        .or(identity.provider_username.as_deref());

    [identity.display_name.as_deref(), identity.email.as_deref(), username]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|candidate| !candidate.is_empty())
        .unwrap_or(DEFAULT_DISPLAY_NAME)
        .to_string()
}
