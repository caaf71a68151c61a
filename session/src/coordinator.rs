//! Sign-in coordinator: the only writer of the session store.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use identity::display_name;
use identity::{classify, IdentityService, InteractionContext, ProviderConfig, SignInResult};
use log::*;

use crate::error::SignInError;
use crate::state::{AuthState, Event};
use crate::store::Store;

/// How a call to `Coordinator::sign_in` ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignInOutcome {
    SignedIn { display_name: String },
    Failed { error: SignInError },
    /// A sign-in was already in flight; nothing was issued.
    Ignored,
}

/// Runs sign-in and sign-out against the identity service and records the result in the store.
///
/// The identity service is injected at construction so tests can substitute a fake.
pub struct Coordinator<I: IdentityService> {
    identity: Arc<I>,
    store: Arc<Store>,
    provider: ProviderConfig,
    session_checked: AtomicBool,
    // Bumped on sign-out so results from an earlier attempt are discarded.
    epoch: AtomicU64,
}

impl<I: IdentityService> Coordinator<I> {
    /// Create a coordinator for GitHub with the default scopes and parameters.
    pub fn new(identity: Arc<I>, store: Arc<Store>) -> Self {
        Self {
            identity,
            store,
            provider: ProviderConfig::github(),
            session_checked: AtomicBool::new(false),
            epoch: AtomicU64::new(0),
        }
    }

    /// Override the provider configuration sent with each sign-in.
    pub fn with_provider(mut self, provider: ProviderConfig) -> Self {
        self.provider = provider;
        self
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    pub fn state(&self) -> AuthState {
        self.store.current()
    }

    /// Restore a previously signed-in user at startup.
    ///
    /// Only the first call queries the identity service; later calls return the
    /// current state unchanged.
    pub fn check_existing_session(&self) -> AuthState {
        if self.session_checked.swap(true, Ordering::SeqCst) {
            debug!("Existing session already checked");
            return self.store.current();
        }

        let event = match self.identity.current_identity() {
            Some(identity) => {
                let display_name = identity.resolved_display_name();
                info!("Restored session for {}", identity.uid);
                Event::SessionRestored { display_name }
            }
            None => {
                debug!("No existing session");
                Event::NoSession
            }
        };

        self.store.apply(&event).current
    }

    /// Run the interactive sign-in flow on `context`.
    ///
    /// Issues at most one call to the identity service. A call made while
    /// another sign-in is in flight, or while a user is signed in, is ignored.
    /// A missing or unavailable context fails immediately without entering
    /// `Loading`.
    pub async fn sign_in(&self, context: Option<&dyn InteractionContext>) -> SignInOutcome {
        match self.store.current() {
            AuthState::Loading => {
                info!("Sign-in already in progress, ignoring request");
                return SignInOutcome::Ignored;
            }
            AuthState::Authenticated { .. } => {
                info!("Already signed in, ignoring sign-in request");
                return SignInOutcome::Ignored;
            }
            AuthState::Idle | AuthState::Failed { .. } => {}
        }

        let Some(context) = context.filter(|context| context.is_available()) else {
            let error = SignInError::MissingInteractionContext;
            warn!("Cannot sign in: {error}");
            self.store.apply(&Event::SignInUnavailable {
                message: error.user_message(),
            });
            return SignInOutcome::Failed { error };
        };

        let epoch = self.epoch.load(Ordering::SeqCst);
        let transition = self.store.apply(&Event::SignInStarted);
        if transition.previous.is_loading() || !transition.current.is_loading() {
            return SignInOutcome::Ignored;
        }

        let request = self.provider.sign_in_request();
        info!("Starting {} sign-in", self.provider.provider.as_str());

        let outcome = match self.identity.sign_in_interactively(context, &request).await {
            Ok(SignInResult {
                identity: Some(identity),
                provider_metadata,
            }) => SignInOutcome::SignedIn {
                display_name: display_name::resolve(
                    &identity,
                    provider_metadata.username.as_deref(),
                ),
            },
            Ok(SignInResult { identity: None, .. }) => {
                error!("Identity service reported success without a user");
                SignInOutcome::Failed {
                    error: SignInError::NoIdentityReturned,
                }
            }
            Err(e) => {
                warn!("Sign-in failed: {e}");
                SignInOutcome::Failed {
                    error: SignInError::Provider {
                        message: classify(&e),
                    },
                }
            }
        };

        let event = match &outcome {
            SignInOutcome::SignedIn { display_name } => Event::SignInSucceeded {
                display_name: display_name.clone(),
            },
            SignInOutcome::Failed { error } => Event::SignInFailed {
                message: error.user_message(),
            },
            SignInOutcome::Ignored => return outcome,
        };

        // The epoch is compared while holding the store, so a sign-out can't
        // slip in between the check and the write.
        let applied = self
            .store
            .apply_if(&event, || self.epoch.load(Ordering::SeqCst) == epoch);

        match (&outcome, applied) {
            (SignInOutcome::SignedIn { .. }, None) => {
                warn!("Signed out while sign-in was in flight, discarding result");
                self.identity.sign_out().await;
            }
            (_, None) => warn!("Signed out while sign-in was in flight, discarding result"),
            (SignInOutcome::SignedIn { display_name }, Some(_)) => {
                info!("Signed in as {display_name}")
            }
            (_, Some(_)) => {}
        }

        outcome
    }

    /// Sign out. Always ends in `Idle`.
    pub async fn sign_out(&self) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        self.identity.sign_out().await;
        info!("Signed out");
        self.store.apply(&Event::SignedOut);
    }

    /// Dismiss an error. Does nothing unless the state is `Failed`.
    pub fn clear_error(&self) -> AuthState {
        self.store.apply(&Event::ErrorDismissed).current
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MISSING_CONTEXT_MESSAGE;
    use identity::error::provider_error;
    use std::sync::Mutex;
    use testing_tools::{identity_with, ScriptedIdentityService, StaticContext};

    fn coordinator(service: ScriptedIdentityService) -> Coordinator<ScriptedIdentityService> {
        Coordinator::new(Arc::new(service), Arc::new(Store::new()))
    }

    fn record_states(coordinator: &Coordinator<ScriptedIdentityService>) -> Arc<Mutex<Vec<AuthState>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        coordinator
            .store()
            .subscribe(Arc::new(move |state: &AuthState| {
                sink.lock().unwrap().push(state.clone())
            }));
        seen
    }

    #[test]
    fn test_check_existing_session_with_identity() {
        let service = ScriptedIdentityService::new()
            .with_current_identity(identity_with(Some("Ada"), None, None));
        let coordinator = coordinator(service);

        assert_eq!(
            coordinator.check_existing_session(),
            AuthState::Authenticated {
                display_name: "Ada".to_string()
            }
        );
    }

    #[test]
    fn test_check_existing_session_without_identity() {
        let coordinator = coordinator(ScriptedIdentityService::new());
        assert_eq!(coordinator.check_existing_session(), AuthState::Idle);
    }

    #[test]
    fn test_check_existing_session_runs_once() {
        let service = ScriptedIdentityService::new();
        let coordinator = coordinator(service);
        coordinator.check_existing_session();
        coordinator.check_existing_session();
        assert_eq!(coordinator.identity.current_identity_calls(), 1);
    }

    #[tokio::test]
    async fn test_sign_in_success_uses_fallback_chain() {
        let service = ScriptedIdentityService::new()
            .push_success(identity_with(None, Some("ada@example.com"), None));
        let coordinator = coordinator(service);
        let seen = record_states(&coordinator);

        let outcome = coordinator.sign_in(Some(&StaticContext::available())).await;

        assert_eq!(
            outcome,
            SignInOutcome::SignedIn {
                display_name: "ada@example.com".to_string()
            }
        );
        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                AuthState::Loading,
                AuthState::Authenticated {
                    display_name: "ada@example.com".to_string()
                }
            ]
        );
    }

    #[tokio::test]
    async fn test_sign_in_sends_github_scopes_and_params() {
        let service = ScriptedIdentityService::new()
            .push_success(identity_with(Some("Ada"), None, None));
        let coordinator = coordinator(service);

        coordinator.sign_in(Some(&StaticContext::available())).await;

        let requests = coordinator.identity.requests();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].scopes.contains("read:user"));
        assert!(requests[0].scopes.contains("user:email"));
        assert_eq!(
            requests[0].custom_parameters.get("allow_signup"),
            Some(&"true".to_string())
        );
    }

    #[tokio::test]
    async fn test_sign_in_without_context_fails_without_loading() {
        let coordinator = coordinator(ScriptedIdentityService::new());
        let seen = record_states(&coordinator);

        let outcome = coordinator.sign_in(None).await;

        assert_eq!(
            outcome,
            SignInOutcome::Failed {
                error: SignInError::MissingInteractionContext
            }
        );
        assert_eq!(
            *seen.lock().unwrap(),
            vec![AuthState::Failed {
                message: MISSING_CONTEXT_MESSAGE.to_string()
            }]
        );
        assert!(coordinator.identity.requests().is_empty());
    }

    #[tokio::test]
    async fn test_sign_in_with_unavailable_context_fails() {
        let coordinator = coordinator(ScriptedIdentityService::new());

        let outcome = coordinator
            .sign_in(Some(&StaticContext::unavailable()))
            .await;

        assert_eq!(
            outcome,
            SignInOutcome::Failed {
                error: SignInError::MissingInteractionContext
            }
        );
        assert!(coordinator.identity.requests().is_empty());
    }

    #[tokio::test]
    async fn test_sign_in_cancelled_is_classified() {
        let service = ScriptedIdentityService::new()
            .push_error(provider_error(None, "The user cancelled the sign-in flow"));
        let coordinator = coordinator(service);

        coordinator.sign_in(Some(&StaticContext::available())).await;

        assert_eq!(
            coordinator.state(),
            AuthState::Failed {
                message: "Sign-in was cancelled".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_sign_in_without_identity_fails() {
        let service = ScriptedIdentityService::new().push_empty_success();
        let coordinator = coordinator(service);

        let outcome = coordinator.sign_in(Some(&StaticContext::available())).await;

        assert_eq!(
            outcome,
            SignInOutcome::Failed {
                error: SignInError::NoIdentityReturned
            }
        );
        assert!(coordinator.state().is_failed());
    }

    #[tokio::test]
    async fn test_retry_after_failure() {
        let service = ScriptedIdentityService::new()
            .push_error(provider_error(Some("network-request-failed"), "offline"))
            .push_success(identity_with(Some("Ada"), None, None));
        let coordinator = coordinator(service);
        let context = StaticContext::available();

        coordinator.sign_in(Some(&context)).await;
        assert!(coordinator.state().is_failed());

        coordinator.sign_in(Some(&context)).await;
        assert_eq!(
            coordinator.state(),
            AuthState::Authenticated {
                display_name: "Ada".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_sign_out_from_authenticated() {
        let service = ScriptedIdentityService::new()
            .with_current_identity(identity_with(Some("Ada"), None, None));
        let coordinator = coordinator(service);
        coordinator.check_existing_session();

        coordinator.sign_out().await;

        assert_eq!(coordinator.state(), AuthState::Idle);
        assert_eq!(coordinator.identity.sign_out_calls(), 1);
        assert!(coordinator.identity.current_identity().is_none());
    }

    #[tokio::test]
    async fn test_sign_in_while_authenticated_is_ignored() {
        let service = ScriptedIdentityService::new()
            .with_current_identity(identity_with(Some("Ada"), None, None))
            .push_success(identity_with(Some("Bob"), None, None));
        let coordinator = coordinator(service);
        coordinator.check_existing_session();
        let seen = record_states(&coordinator);

        let with_context = coordinator.sign_in(Some(&StaticContext::available())).await;
        let without_context = coordinator.sign_in(None).await;

        assert_eq!(with_context, SignInOutcome::Ignored);
        assert_eq!(without_context, SignInOutcome::Ignored);
        assert!(coordinator.identity.requests().is_empty());
        assert!(seen.lock().unwrap().is_empty());
        assert_eq!(
            coordinator.state(),
            AuthState::Authenticated {
                display_name: "Ada".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_missing_context_after_failure_replaces_message() {
        let service = ScriptedIdentityService::new()
            .push_error(provider_error(None, "The user cancelled the sign-in flow"));
        let coordinator = coordinator(service);
        coordinator.sign_in(Some(&StaticContext::available())).await;

        coordinator.sign_in(None).await;

        assert_eq!(
            coordinator.state(),
            AuthState::Failed {
                message: MISSING_CONTEXT_MESSAGE.to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_clear_error() {
        let coordinator = coordinator(ScriptedIdentityService::new());
        coordinator.sign_in(None).await;
        assert!(coordinator.state().is_failed());

        assert_eq!(coordinator.clear_error(), AuthState::Idle);
        assert_eq!(coordinator.clear_error(), AuthState::Idle);
    }

    #[test]
    fn test_clear_error_from_idle_is_noop() {
        let coordinator = coordinator(ScriptedIdentityService::new());
        let seen = record_states(&coordinator);

        assert_eq!(coordinator.clear_error(), AuthState::Idle);
        assert!(seen.lock().unwrap().is_empty());
    }
}
