// Testing Tools Library
//
// Test doubles for the identity service contract:
// - ScriptedIdentityService: answers sign-ins from a queue and records calls
// - StaticContext: an interaction context that is available or not

mod context;
mod scripted;

pub use context::StaticContext;
pub use scripted::{identity_with, ScriptedIdentityService};
