use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use identity::error::provider_error;
use identity::{
    Error, Identity, IdentityService, InteractionContext, ProviderKind, ProviderMetadata,
    SignInRequest, SignInResult,
};
use tokio::sync::Notify;

/// Build a GitHub identity with the given optional profile fields.
pub fn identity_with(
    display_name: Option<&str>,
    email: Option<&str>,
    username: Option<&str>,
) -> Identity {
    Identity {
        uid: "uid-1".to_string(),
        display_name: display_name.map(str::to_string),
        email: email.map(str::to_string),
        provider_username: username.map(str::to_string),
        photo_url: None,
        provider_id: ProviderKind::GitHub.as_str().to_string(),
    }
}

/// Identity service that answers sign-ins from a queue of scripted responses.
///
/// A successful scripted sign-in becomes the current identity; sign-out clears it.
/// With no responses left, sign-in fails with a provider error.
#[derive(Default)]
pub struct ScriptedIdentityService {
    current: Mutex<Option<Identity>>,
    responses: Mutex<VecDeque<Result<SignInResult, Error>>>,
    requests: Mutex<Vec<SignInRequest>>,
    current_identity_calls: AtomicUsize,
    sign_out_calls: AtomicUsize,
    gate: Option<Arc<Notify>>,
}

impl ScriptedIdentityService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with a signed-in identity.
    pub fn with_current_identity(self, identity: Identity) -> Self {
        *self.current.lock().unwrap() = Some(identity);
        self
    }

    /// Hold every sign-in until `gate` is notified.
    pub fn with_gate(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Queue a successful sign-in for `identity`.
    pub fn push_success(self, identity: Identity) -> Self {
        let metadata = ProviderMetadata {
            provider_id: identity.provider_id.clone(),
            username: identity.provider_username.clone(),
            ..ProviderMetadata::default()
        };
        self.push_result(Ok(SignInResult {
            identity: Some(identity),
            provider_metadata: metadata,
        }))
    }

    /// Queue a successful sign-in whose provider metadata carries `username`.
    pub fn push_success_with_username(self, identity: Identity, username: &str) -> Self {
        let metadata = ProviderMetadata {
            provider_id: identity.provider_id.clone(),
            username: Some(username.to_string()),
            profile: serde_json::Map::from_iter([(
                "login".to_string(),
                serde_json::Value::String(username.to_string()),
            )]),
            ..ProviderMetadata::default()
        };
        self.push_result(Ok(SignInResult {
            identity: Some(identity),
            provider_metadata: metadata,
        }))
    }

    /// Queue a sign-in that reports success without a user.
    pub fn push_empty_success(self) -> Self {
        self.push_result(Ok(SignInResult {
            identity: None,
            provider_metadata: ProviderMetadata::default(),
        }))
    }

    /// Queue a failed sign-in.
    pub fn push_error(self, error: Error) -> Self {
        self.push_result(Err(error))
    }

    fn push_result(self, result: Result<SignInResult, Error>) -> Self {
        self.responses.lock().unwrap().push_back(result);
        self
    }

    /// Requests received by `sign_in_interactively`, in order.
    pub fn requests(&self) -> Vec<SignInRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn current_identity_calls(&self) -> usize {
        self.current_identity_calls.load(Ordering::SeqCst)
    }

    pub fn sign_out_calls(&self) -> usize {
        self.sign_out_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IdentityService for ScriptedIdentityService {
    fn current_identity(&self) -> Option<Identity> {
        self.current_identity_calls.fetch_add(1, Ordering::SeqCst);
        self.current.lock().unwrap().clone()
    }

    async fn sign_in_interactively(
        &self,
        _context: &dyn InteractionContext,
        request: &SignInRequest,
    ) -> Result<SignInResult, Error> {
        self.requests.lock().unwrap().push(request.clone());

        if let Some(gate) = &self.gate {
            gate.notified().await;
        }

        let next = self.responses.lock().unwrap().pop_front();
        let result = next.unwrap_or_else(|| Err(provider_error(None, "no scripted response")));

        if let Ok(SignInResult {
            identity: Some(identity),
            ..
        }) = &result
        {
            *self.current.lock().unwrap() = Some(identity.clone());
        }
        result
    }

    async fn sign_out(&self) {
        self.sign_out_calls.fetch_add(1, Ordering::SeqCst);
        *self.current.lock().unwrap() = None;
    }
}
