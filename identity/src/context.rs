//! Interaction context: the foreground surface that hosts the provider's consent screen.

use async_trait::async_trait;
use url::Url;

use crate::error::Error;

/// A handle to a UI surface able to show the provider's consent page.
#[async_trait]
pub trait InteractionContext: Send + Sync {
    /// Whether the surface is currently able to host a consent flow.
    fn is_available(&self) -> bool {
        true
    }

    /// Show the consent page at `authorize_url` and wait for the provider's redirect.
    ///
    /// # Returns
    ///
    /// The full redirect URL, including its query string. Closing the surface
    /// before the redirect arrives must surface as a cancelled error.
    async fn present(&self, authorize_url: &Url) -> Result<Url, Error>;
}
