use serde::Serialize;
use std::fmt;

/// The sign-in screen's state. Exactly one variant is active at any time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum AuthState {
    #[default]
    Idle,
    Loading,
    Authenticated {
        display_name: String,
    },
    Failed {
        message: String,
    },
}

/// Everything that can move the state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Startup found a signed-in identity.
    SessionRestored { display_name: String },
    /// Startup found no signed-in identity.
    NoSession,
    SignInStarted,
    SignInSucceeded { display_name: String },
    SignInFailed { message: String },
    /// Sign-in was requested without a surface to host the consent screen.
    SignInUnavailable { message: String },
    SignedOut,
    ErrorDismissed,
}

impl AuthState {
    /// Name of the variant, used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            AuthState::Idle => "idle",
            AuthState::Loading => "loading",
            AuthState::Authenticated { .. } => "authenticated",
            AuthState::Failed { .. } => "failed",
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, AuthState::Loading)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, AuthState::Failed { .. })
    }

    /// The state reached from `self` on `event`. Defined for every pair.
    pub fn next(&self, event: &Event) -> AuthState {
        match (self, event) {
            (_, Event::SessionRestored { display_name }) => AuthState::Authenticated {
                display_name: display_name.clone(),
            },
            (_, Event::NoSession) => AuthState::Idle,

            (AuthState::Idle | AuthState::Failed { .. }, Event::SignInStarted) => AuthState::Loading,
            (current, Event::SignInStarted) => current.clone(),

            // Results only land on the attempt that is in flight.
            (AuthState::Loading, Event::SignInSucceeded { display_name }) => {
                AuthState::Authenticated {
                    display_name: display_name.clone(),
                }
            }
            (AuthState::Loading, Event::SignInFailed { message }) => AuthState::Failed {
                message: message.clone(),
            },
            (current, Event::SignInSucceeded { .. } | Event::SignInFailed { .. }) => {
                current.clone()
            }

            (
                AuthState::Idle | AuthState::Failed { .. },
                Event::SignInUnavailable { message },
            ) => AuthState::Failed {
                message: message.clone(),
            },
            (current, Event::SignInUnavailable { .. }) => current.clone(),

            (_, Event::SignedOut) => AuthState::Idle,
            (AuthState::Failed { .. }, Event::ErrorDismissed) => AuthState::Idle,
            (current, Event::ErrorDismissed) => current.clone(),
        }
    }
}

impl fmt::Display for AuthState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AuthState::Authenticated { display_name } => {
                write!(f, "authenticated ({display_name})")
            }
            AuthState::Failed { message } => write!(f, "failed ({message})"),
            other => write!(f, "{}", other.name()),
        }
    }
}
