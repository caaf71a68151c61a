//! Identity service trait.

use async_trait::async_trait;

use crate::context::InteractionContext;
use crate::error::Error;
use crate::identity::{Identity, SignInResult};
use crate::provider::SignInRequest;

/// Trait for the external identity service the sign-in coordinator delegates to.
///
/// Implementations own OAuth negotiation and session persistence:
/// - Reporting the currently signed-in identity, if any
/// - Running the interactive consent flow on a provided surface
/// - Signing the user out
#[async_trait]
pub trait IdentityService: Send + Sync {
    /// Get the currently signed-in identity, if one exists.
    fn current_identity(&self) -> Option<Identity>;

    /// Run the provider's interactive sign-in flow.
    ///
    /// # Arguments
    ///
    /// * `context` - Surface that hosts the consent screen
    /// * `request` - Scopes and custom parameters for the provider
    ///
    /// # Returns
    ///
    /// The signed-in identity with provider metadata, or the provider's error.
    async fn sign_in_interactively(
        &self,
        context: &dyn InteractionContext,
        request: &SignInRequest,
    ) -> Result<SignInResult, Error>;

    /// Sign the current user out.
    async fn sign_out(&self);
}
