//! Text rendering of the sign-in screen.

use std::io::{self, Write};

use session::{AuthState, Observer};

/// What the user can ask the screen to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    SignIn,
    SignOut,
    Dismiss,
    Quit,
}

impl Command {
    /// Parse one line of input. Unknown input yields `None`.
    pub fn parse(line: &str) -> Option<Self> {
        match line.trim().to_lowercase().as_str() {
            "s" | "sign-in" | "signin" => Some(Self::SignIn),
            "o" | "sign-out" | "signout" => Some(Self::SignOut),
            "c" | "dismiss" => Some(Self::Dismiss),
            "q" | "quit" | "exit" => Some(Self::Quit),
            _ => None,
        }
    }
}

/// The text shown for `state`, including the commands available in it.
pub fn render(state: &AuthState) -> String {
    match state {
        AuthState::Idle => {
            "GitHub Sign-In\n\nSign in to continue.\n\n[s] Sign in with GitHub   [q] Quit".to_string()
        }
        AuthState::Loading => {
            "GitHub Sign-In\n\nSigning in... finish the consent screen in your browser.".to_string()
        }
        AuthState::Authenticated { display_name } => {
            format!("GitHub Sign-In\n\nWelcome, {display_name}!\n\n[o] Sign out   [q] Quit")
        }
        AuthState::Failed { message } => format!(
            "GitHub Sign-In\n\nError: {message}\n\n[s] Try again   [c] Dismiss   [q] Quit"
        ),
    }
}

/// Store observer that redraws the screen on stdout.
pub struct Screen;

impl Screen {
    pub fn draw(state: &AuthState) {
        let mut out = io::stdout().lock();
        // A closed stdout leaves nothing to draw on.
        let _ = writeln!(out, "\n{}\n", render(state));
        let _ = out.flush();
    }
}

impl Observer for Screen {
    fn on_state_changed(&self, state: &AuthState) {
        Self::draw(state)
    }
}
