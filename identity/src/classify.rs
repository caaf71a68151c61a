//! Reduces identity-service errors to user-facing messages.
//!
//! Rules are checked in order against the error's code and message; the first
//! match wins.

use crate::error::Error;

/// Message used when nothing matches and the error carries no usable text.
pub const GENERIC_FAILURE: &str = "Sign-in failed. Please try again.";

/// A single classification rule.
#[derive(Debug, Clone, Copy)]
pub struct Rule {
    /// Substring looked for in the normalized code and message.
    pub needle: &'static str,
    /// What the user sees when the rule matches.
    pub message: &'static str,
}

/// Ordered classification table.
pub const RULES: &[Rule] = &[
    Rule {
        needle: "cancel",
        message: "Sign-in was cancelled",
    },
    Rule {
        needle: "network",
        message: "Network error. Check your connection and try again.",
    },
    Rule {
        needle: "invalid-credential",
        message: "Invalid credentials. Please try again.",
    },
    Rule {
        needle: "account-exists-with-different-credential",
        message: "An account already exists with the same email address but a different sign-in method.",
    },
    Rule {
        needle: "user-disabled",
        message: "This account has been disabled.",
    },
    Rule {
        needle: "too-many-requests",
        message: "Too many sign-in attempts. Please try again later.",
    },
    Rule {
        needle: "bad-verification-code",
        message: "The authorization code expired. Please try again.",
    },
];

/// Classify an identity-service error into a user-facing message.
pub fn classify(error: &Error) -> String {
    classify_parts(error.code(), error.message().as_deref())
}

/// Classify from a raw code and message.
pub fn classify_parts(code: Option<&str>, message: Option<&str>) -> String {
    let code = code.map(normalize);
    let normalized_message = message.map(normalize);

    let matched = RULES.iter().find(|rule| {
        code.as_deref().is_some_and(|c| c.contains(rule.needle))
            || normalized_message
                .as_deref()
                .is_some_and(|m| m.contains(rule.needle))
    });

    match matched {
        Some(rule) => rule.message.to_string(),
        None => match message.map(str::trim) {
            Some(text) if !text.is_empty() => text.to_string(),
            _ => GENERIC_FAILURE.to_string(),
        },
    }
}

fn normalize(text: &str) -> String {
    text.to_lowercase().replace('_', "-")
}
