//! # identity
//!
//! The contract between the sign-in screen and the external identity service:
//! - `IdentityService` trait the coordinator calls into
//! - Identity model and the display-name fallback chain
//! - Provider configuration (scopes and custom parameters)
//! - Error tree and the ordered classification into user-facing messages
//! - A GitHub OAuth implementation of `IdentityService`
//!
//! ## Usage
//!
//! ```rust,ignore
//! use identity::{
//!     github::{GitHubIdentityService, GitHubUrls},
//!     IdentityService, ProviderConfig,
//! };
//! ```

pub mod classify;
pub mod context;
pub mod display_name;
pub mod error;
pub mod github;
pub mod http;
pub mod identity;
pub mod provider;
pub mod service;

// Re-export commonly used types
pub use classify::classify;
pub use context::InteractionContext;
pub use error::{Error, ErrorKind};
pub use identity::{Identity, ProviderMetadata, SignInResult};
pub use provider::{ProviderConfig, ProviderKind, SignInRequest};
pub use service::IdentityService;
