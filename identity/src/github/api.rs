//! Wire types for the GitHub OAuth and REST endpoints.

use serde::{Deserialize, Serialize};

/// Request to exchange an authorization code for an access token.
#[derive(Debug, Serialize)]
pub(crate) struct TokenExchangeRequest<'a> {
    pub client_id: &'a str,
    pub client_secret: &'a str,
    pub code: &'a str,
    pub redirect_uri: &'a str,
    pub code_verifier: &'a str,
}

/// GitHub answers token requests with HTTP 200 for both outcomes.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum TokenExchangeResponse {
    Token(TokenResponse),
    Error(OAuthErrorResponse),
}

#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: String,
    #[serde(default)]
    pub scope: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OAuthErrorResponse {
    pub error: String,
    pub error_description: Option<String>,
}

/// `GET /user`
#[derive(Debug, Deserialize)]
pub(crate) struct GitHubUser {
    pub id: u64,
    pub login: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

/// One entry of `GET /user/emails`
#[derive(Debug, Deserialize)]
pub(crate) struct GitHubEmail {
    pub email: String,
    pub primary: bool,
    pub verified: bool,
}

/// Pick the primary verified address, if the user has one.
pub(crate) fn primary_email(emails: Vec<GitHubEmail>) -> Option<String> {
    emails
        .into_iter()
        .find(|entry| entry.primary && entry.verified)
        .map(|entry| entry.email)
}
