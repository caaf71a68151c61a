//! HTTP client building for identity provider calls.

mod client;

pub use client::{HttpClientBuilder, HttpClientConfig};
