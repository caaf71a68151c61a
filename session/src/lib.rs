//! Authentication session for the sign-in screen.
//!
//! This crate holds the screen's single piece of state and the component that
//! is allowed to change it.
//!
//! # Architecture
//!
//! - **AuthState**: Idle, Loading, Authenticated or Failed; exactly one at a time.
//! - **Store**: owns the current state and notifies observers synchronously on
//!   every change. Writes are crate-private.
//! - **Coordinator**: runs sign-in, sign-out and error dismissal against an
//!   injected `identity::IdentityService` and is the store's only writer.
//!
//! # Example
//!
//! ```rust,ignore
//! use session::{Coordinator, Store};
//!
//! let store = Arc::new(Store::new());
//! store.subscribe(Arc::new(|state: &AuthState| render(state)));
//!
//! let coordinator = Coordinator::new(Arc::new(github_service), Arc::clone(&store));
//! coordinator.check_existing_session();
//! coordinator.sign_in(Some(&browser_context)).await;
//! ```

pub mod coordinator;
pub mod error;
pub mod state;
pub mod store;

pub use coordinator::{Coordinator, SignInOutcome};
pub use error::SignInError;
pub use state::{AuthState, Event};
pub use store::{Observer, Store, SubscriptionId};
