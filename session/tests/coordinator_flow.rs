use std::sync::{Arc, Mutex};
use std::time::Duration;

use identity::error::{cancelled_error, provider_error};
use identity::IdentityService;
use session::{AuthState, Coordinator, SignInOutcome, Store};
use testing_tools::{identity_with, ScriptedIdentityService, StaticContext};
use tokio::sync::Notify;

fn authenticated(name: &str) -> AuthState {
    AuthState::Authenticated {
        display_name: name.to_string(),
    }
}

fn setup(
    service: ScriptedIdentityService,
) -> (
    Arc<Coordinator<ScriptedIdentityService>>,
    Arc<Mutex<Vec<AuthState>>>,
) {
    let store = Arc::new(Store::new());
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    store.subscribe(Arc::new(move |state: &AuthState| {
        sink.lock().unwrap().push(state.clone())
    }));
    let coordinator = Arc::new(Coordinator::new(Arc::new(service), store));
    (coordinator, seen)
}

/// Waits until the store reports `Loading`.
async fn wait_for_loading(coordinator: &Coordinator<ScriptedIdentityService>) {
    let mut rx = coordinator.store().watch();
    tokio::time::timeout(Duration::from_secs(5), rx.wait_for(|state| state.is_loading()))
        .await
        .expect("sign-in never reached Loading")
        .unwrap();
}

#[tokio::test]
async fn full_session_lifecycle() {
    let service = ScriptedIdentityService::new()
        .push_error(cancelled_error("consent surface closed"))
        .push_success_with_username(identity_with(None, None, None), "ada123");
    let (coordinator, seen) = setup(service);
    let context = StaticContext::available();

    assert_eq!(coordinator.check_existing_session(), AuthState::Idle);

    coordinator.sign_in(Some(&context)).await;
    assert_eq!(
        coordinator.state(),
        AuthState::Failed {
            message: "Sign-in was cancelled".to_string()
        }
    );

    coordinator.clear_error();
    coordinator.sign_in(Some(&context)).await;
    assert_eq!(coordinator.state(), authenticated("ada123"));

    coordinator.sign_out().await;
    assert_eq!(coordinator.state(), AuthState::Idle);

    assert_eq!(
        *seen.lock().unwrap(),
        vec![
            AuthState::Loading,
            AuthState::Failed {
                message: "Sign-in was cancelled".to_string()
            },
            AuthState::Idle,
            AuthState::Loading,
            authenticated("ada123"),
            AuthState::Idle,
        ]
    );
}

#[tokio::test]
async fn default_display_name_when_profile_is_empty() {
    let service = ScriptedIdentityService::new().push_success(identity_with(None, None, None));
    let (coordinator, _) = setup(service);

    let outcome = coordinator.sign_in(Some(&StaticContext::available())).await;

    assert_eq!(
        outcome,
        SignInOutcome::SignedIn {
            display_name: "GitHub User".to_string()
        }
    );
}

#[tokio::test]
async fn second_sign_in_while_loading_is_ignored() {
    let gate = Arc::new(Notify::new());
    let service = ScriptedIdentityService::new()
        .with_gate(Arc::clone(&gate))
        .push_success(identity_with(Some("Ada"), None, None));
    let (coordinator, _) = setup(service);

    let first = {
        let coordinator = Arc::clone(&coordinator);
        tokio::spawn(async move {
            let context = StaticContext::available();
            let outcome = coordinator.sign_in(Some(&context)).await;
            outcome
        })
    };
    wait_for_loading(&coordinator).await;

    let second = coordinator.sign_in(Some(&StaticContext::available())).await;
    assert_eq!(second, SignInOutcome::Ignored);

    gate.notify_one();
    let first = first.await.unwrap();

    assert_eq!(
        first,
        SignInOutcome::SignedIn {
            display_name: "Ada".to_string()
        }
    );
    assert_eq!(coordinator.state(), authenticated("Ada"));
}

/// Starts a sign-in held by `gate`, signs out while it is in flight, then
/// releases it.
async fn sign_out_mid_flight(
    service: Arc<ScriptedIdentityService>,
    gate: Arc<Notify>,
) -> AuthState {
    let coordinator = Arc::new(Coordinator::new(service, Arc::new(Store::new())));

    let attempt = {
        let coordinator = Arc::clone(&coordinator);
        tokio::spawn(async move {
            let context = StaticContext::available();
            let outcome = coordinator.sign_in(Some(&context)).await;
            outcome
        })
    };
    wait_for_loading(&coordinator).await;

    coordinator.sign_out().await;
    gate.notify_one();
    attempt.await.unwrap();

    coordinator.state()
}

#[tokio::test]
async fn sign_out_during_sign_in_discards_late_result() {
    let gate = Arc::new(Notify::new());
    let service = Arc::new(
        ScriptedIdentityService::new()
            .with_gate(Arc::clone(&gate))
            .push_success(identity_with(Some("Ada"), None, None)),
    );

    let state = sign_out_mid_flight(Arc::clone(&service), gate).await;

    assert_eq!(state, AuthState::Idle);
    assert!(service.current_identity().is_none());
    assert_eq!(service.sign_out_calls(), 2);
}

#[tokio::test]
async fn sign_out_during_failing_sign_in_stays_idle() {
    let gate = Arc::new(Notify::new());
    let service = Arc::new(
        ScriptedIdentityService::new()
            .with_gate(Arc::clone(&gate))
            .push_error(provider_error(Some("network-request-failed"), "offline")),
    );

    let state = sign_out_mid_flight(Arc::clone(&service), gate).await;

    assert_eq!(state, AuthState::Idle);
    assert_eq!(service.sign_out_calls(), 1);
}

#[tokio::test]
async fn clear_error_twice_matches_once() {
    let service = ScriptedIdentityService::new()
        .push_error(provider_error(Some("ERROR_INVALID_CREDENTIAL"), "bad credential"));
    let (coordinator, seen) = setup(service);

    coordinator.sign_in(Some(&StaticContext::available())).await;
    assert_eq!(
        coordinator.state(),
        AuthState::Failed {
            message: "Invalid credentials. Please try again.".to_string()
        }
    );

    coordinator.clear_error();
    let after_once = seen.lock().unwrap().clone();
    coordinator.clear_error();

    assert_eq!(*seen.lock().unwrap(), after_once);
    assert_eq!(coordinator.state(), AuthState::Idle);
}

#[tokio::test]
async fn every_recorded_state_is_one_of_four() {
    let service = ScriptedIdentityService::new()
        .with_current_identity(identity_with(Some("Ada"), None, None))
        .push_empty_success()
        .push_error(provider_error(None, "unexpected failure"));
    let (coordinator, seen) = setup(service);
    let context = StaticContext::available();

    coordinator.check_existing_session();
    coordinator.sign_out().await;
    coordinator.sign_in(Some(&context)).await;
    coordinator.sign_in(Some(&context)).await;
    coordinator.sign_in(None).await;
    coordinator.clear_error();

    for state in seen.lock().unwrap().iter() {
        assert!(matches!(
            state,
            AuthState::Idle
                | AuthState::Loading
                | AuthState::Authenticated { .. }
                | AuthState::Failed { .. }
        ));
    }
    assert_eq!(coordinator.state(), AuthState::Idle);
}
