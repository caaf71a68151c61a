//! GitHub identity service.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use log::*;
use reqwest::header::ACCEPT;
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Map, Value};
use url::Url;

use super::api::{
    primary_email, GitHubEmail, GitHubUser, TokenExchangeRequest, TokenExchangeResponse,
};
use super::pkce::{generate_state, Pkce};
use crate::context::InteractionContext;
use crate::error::{cancelled_error, provider_error, Error, ErrorKind};
use crate::http::{HttpClientBuilder, HttpClientConfig};
use crate::identity::{Identity, ProviderMetadata, SignInResult};
use crate::provider::{ProviderKind, SignInRequest};
use crate::service::IdentityService;

const GITHUB_API_ACCEPT: &str = "application/vnd.github+json";

/// Endpoints used by the GitHub flow. Overridable so tests can target a mock server.
#[derive(Debug, Clone)]
pub struct GitHubUrls {
    pub authorize_url: String,
    pub token_url: String,
    pub api_base_url: String,
}

impl Default for GitHubUrls {
    fn default() -> Self {
        Self {
            authorize_url: "https://github.com/login/oauth/authorize".to_string(),
            token_url: "https://github.com/login/oauth/access_token".to_string(),
            api_base_url: "https://api.github.com".to_string(),
        }
    }
}

struct SignedInUser {
    identity: Identity,
    // Held for the lifetime of the session; GitHub tokens do not expire.
    _access_token: SecretString,
}

/// GitHub OAuth identity service.
///
/// Keeps the signed-in user in memory for the lifetime of the process.
pub struct GitHubIdentityService {
    client_id: String,
    client_secret: SecretString,
    redirect_uri: String,
    urls: GitHubUrls,
    http_client: reqwest::Client,
    current: RwLock<Option<SignedInUser>>,
}

impl GitHubIdentityService {
    /// Create a new GitHub identity service.
    ///
    /// # Arguments
    ///
    /// * `client_id` - GitHub OAuth app client ID
    /// * `client_secret` - GitHub OAuth app client secret
    /// * `redirect_uri` - Callback URL registered with the OAuth app
    /// * `urls` - GitHub endpoints
    /// * `http_config` - Timeout and user agent for outgoing requests
    pub fn new(
        client_id: String,
        client_secret: SecretString,
        redirect_uri: String,
        urls: GitHubUrls,
        http_config: HttpClientConfig,
    ) -> Result<Self, Error> {
        let http_client = HttpClientBuilder::new()
            .with_timeout(http_config.timeout)
            .with_user_agent(http_config.user_agent)
            .build()?;

        Ok(Self {
            client_id,
            client_secret,
            redirect_uri,
            urls,
            http_client,
            current: RwLock::new(None),
        })
    }

    /// Build the authorization URL the consent surface should open.
    pub fn authorization_url(
        &self,
        request: &SignInRequest,
        state: &str,
        pkce: &Pkce,
    ) -> Result<Url, Error> {
        let mut url = Url::parse(&self.urls.authorize_url)?;
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("client_id", &self.client_id)
                .append_pair("redirect_uri", &self.redirect_uri)
                .append_pair("scope", &request.scope_string())
                .append_pair("state", state)
                .append_pair("code_challenge", pkce.challenge())
                .append_pair("code_challenge_method", "S256");
            for (name, value) in &request.custom_parameters {
                query.append_pair(name, value);
            }
        }
        Ok(url)
    }

    /// Pull the authorization code out of the provider's redirect.
    fn authorization_code(redirect: &Url, expected_state: &str) -> Result<String, Error> {
        let params: HashMap<String, String> = redirect.query_pairs().into_owned().collect();

        if let Some(error) = params.get("error") {
            if error == "access_denied" {
                return Err(cancelled_error(
                    "The user cancelled the GitHub consent screen",
                ));
            }
            let description = params
                .get("error_description")
                .map(String::as_str)
                .unwrap_or(error.as_str());
            return Err(provider_error(Some(error.as_str()), description));
        }

        match params.get("state") {
            Some(state) if state == expected_state => {}
            _ => {
                return Err(provider_error(
                    Some("invalid-state"),
                    "OAuth state parameter did not match the request",
                ))
            }
        }

        params.get("code").cloned().ok_or_else(|| {
            provider_error(
                Some("invalid-response"),
                "Redirect did not include an authorization code",
            )
        })
    }

    /// Exchange an authorization code for an access token.
    async fn exchange_code(&self, code: &str, pkce: &Pkce) -> Result<SecretString, Error> {
        let request = TokenExchangeRequest {
            client_id: &self.client_id,
            client_secret: self.client_secret.expose_secret(),
            code,
            redirect_uri: &self.redirect_uri,
            code_verifier: pkce.verifier(),
        };

        debug!("Exchanging GitHub OAuth code for an access token");

        let response = self
            .http_client
            .post(&self.urls.token_url)
            .header(ACCEPT, "application/json")
            .form(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        match serde_json::from_str::<TokenExchangeResponse>(&body) {
            Ok(TokenExchangeResponse::Token(token)) if status.is_success() => {
                debug!(
                    "Received {} token with scopes [{}]",
                    token.token_type, token.scope
                );
                Ok(SecretString::from(token.access_token))
            }
            Ok(TokenExchangeResponse::Error(err)) => {
                warn!("GitHub token exchange failed: {}", err.error);
                let description = err.error_description.as_deref().unwrap_or(err.error.as_str());
                Err(provider_error(Some(err.error.as_str()), description))
            }
            _ => {
                warn!("Unexpected GitHub token response ({status})");
                Err(provider_error(
                    Some("invalid-response"),
                    &format!("Unexpected token response from GitHub ({status})"),
                ))
            }
        }
    }

    /// Load the user's profile, falling back to the email list when the profile hides it.
    async fn fetch_identity(
        &self,
        access_token: &SecretString,
    ) -> Result<(Identity, ProviderMetadata), Error> {
        let response = self
            .http_client
            .get(format!("{}/user", self.urls.api_base_url))
            .header(ACCEPT, GITHUB_API_ACCEPT)
            .bearer_auth(access_token.expose_secret())
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(provider_error(
                Some("invalid-credential"),
                "GitHub rejected the access token",
            ));
        }
        if !status.is_success() {
            return Err(provider_error(
                Some("invalid-response"),
                &format!("GitHub user lookup failed ({status})"),
            ));
        }

        let profile: Map<String, Value> = response.json().await?;
        let user: GitHubUser =
            serde_json::from_value(Value::Object(profile.clone())).map_err(|e| Error {
                source: Some(Box::new(e)),
                error_kind: ErrorKind::Provider {
                    code: Some("invalid-response".to_string()),
                },
            })?;

        let email = match user.email {
            Some(email) => Some(email),
            None => self.fetch_primary_email(access_token).await,
        };

        let provider_id = ProviderKind::GitHub.as_str().to_string();
        let identity = Identity {
            uid: user.id.to_string(),
            display_name: user.name,
            email,
            provider_username: Some(user.login.clone()),
            photo_url: user.avatar_url,
            provider_id: provider_id.clone(),
        };
        let metadata = ProviderMetadata {
            provider_id,
            username: Some(user.login),
            is_new_user: false,
            profile,
        };

        Ok((identity, metadata))
    }

    /// The email list is best effort; a failure leaves the email unset.
    async fn fetch_primary_email(&self, access_token: &SecretString) -> Option<String> {
        let result = self
            .http_client
            .get(format!("{}/user/emails", self.urls.api_base_url))
            .header(ACCEPT, GITHUB_API_ACCEPT)
            .bearer_auth(access_token.expose_secret())
            .send()
            .await
            .and_then(|response| response.error_for_status());

        let response = match result {
            Ok(response) => response,
            Err(e) => {
                warn!("Failed to load GitHub email addresses: {e}");
                return None;
            }
        };

        match response.json::<Vec<GitHubEmail>>().await {
            Ok(emails) => primary_email(emails),
            Err(e) => {
                warn!("Failed to parse GitHub email addresses: {e}");
                None
            }
        }
    }
}

#[async_trait]
impl IdentityService for GitHubIdentityService {
    fn current_identity(&self) -> Option<Identity> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|user| user.identity.clone())
    }

    async fn sign_in_interactively(
        &self,
        context: &dyn InteractionContext,
        request: &SignInRequest,
    ) -> Result<SignInResult, Error> {
        let pkce = Pkce::generate();
        let state = generate_state();
        let authorize_url = self.authorization_url(request, &state, &pkce)?;

        debug!("Presenting GitHub consent screen");
        let redirect = context.present(&authorize_url).await?;
        let code = Self::authorization_code(&redirect, &state)?;

        let access_token = self.exchange_code(&code, &pkce).await?;
        let (identity, provider_metadata) = self.fetch_identity(&access_token).await?;

        info!("GitHub sign-in completed for user {}", identity.uid);

        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Some(SignedInUser {
            identity: identity.clone(),
            _access_token: access_token,
        });

        Ok(SignInResult {
            identity: Some(identity),
            provider_metadata,
        })
    }

    async fn sign_out(&self) {
        let previous = self
            .current
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(user) = previous {
            info!("Signed out GitHub user {}", user.identity.uid);
        }
    }
}
