//! Ways a sign-in attempt can end without a signed-in user.

use std::error::Error as StdError;
use std::fmt;

pub const MISSING_CONTEXT_MESSAGE: &str =
    "Unable to start sign-in: there is no active screen to show the GitHub login page.";
pub const NO_IDENTITY_MESSAGE: &str = "Sign-in succeeded but no user was returned";

/// Every variant ends the current attempt; the user may retry with a new sign-in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignInError {
    /// No foreground surface was available to host the consent screen.
    MissingInteractionContext,
    /// The identity service reported success without a user.
    NoIdentityReturned,
    /// The identity service raised an error, already reduced to a user-facing message.
    Provider { message: String },
}

impl SignInError {
    /// The text shown on the error screen.
    pub fn user_message(&self) -> String {
        match self {
            SignInError::MissingInteractionContext => MISSING_CONTEXT_MESSAGE.to_string(),
            SignInError::NoIdentityReturned => NO_IDENTITY_MESSAGE.to_string(),
            SignInError::Provider { message } => message.clone(),
        }
    }
}

impl fmt::Display for SignInError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SignInError::MissingInteractionContext => write!(f, "missing interaction context"),
            SignInError::NoIdentityReturned => write!(f, "no identity returned"),
            SignInError::Provider { message } => write!(f, "identity provider error: {message}"),
        }
    }
}

impl StdError for SignInError {}
