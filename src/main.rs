use identity::github::{GitHubIdentityService, GitHubUrls};
use identity::http::HttpClientConfig;
use log::*;
use secrecy::SecretString;
use service::{config::Config, logging::Logger};
use session::{Coordinator, Store};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

mod screen;
mod surface;

use screen::{Command, Screen};
use surface::LoopbackContext;

#[tokio::main]
async fn main() {
    let config = Config::new();
    if let Err(e) = Logger::init_logger(&config) {
        eprintln!("Failed to start logger: {e}");
        std::process::exit(1);
    }

    info!("Starting GitHub sign-in [{}]", config.runtime_env());

    let identity = match github_identity_service(&config) {
        Ok(service) => Arc::new(service),
        Err(e) => {
            error!("Failed to set up the GitHub identity service: {e}");
            std::process::exit(1);
        }
    };

    let store = Arc::new(Store::new());
    let coordinator = Coordinator::new(identity, Arc::clone(&store));
    let context = LoopbackContext::new(config.redirect_addr(), config.consent_timeout());

    Screen::draw(&coordinator.check_existing_session());
    store.subscribe(Arc::new(Screen));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                error!("Failed to read input: {e}");
                break;
            }
        };

        match Command::parse(&line) {
            Some(Command::SignIn) => {
                coordinator.sign_in(Some(&context)).await;
            }
            Some(Command::SignOut) => coordinator.sign_out().await,
            Some(Command::Dismiss) => {
                coordinator.clear_error();
            }
            Some(Command::Quit) => break,
            None => Screen::draw(&coordinator.state()),
        }
    }

    info!("Exiting");
}

fn github_identity_service(config: &Config) -> Result<GitHubIdentityService, String> {
    let client_id = config
        .github_client_id()
        .ok_or("GITHUB_CLIENT_ID is not set")?;
    let client_secret = config
        .github_client_secret()
        .ok_or("GITHUB_CLIENT_SECRET is not set")?;

    let urls = GitHubUrls {
        authorize_url: config.github_authorize_url().to_string(),
        token_url: config.github_token_url().to_string(),
        api_base_url: config.github_api_base_url().to_string(),
    };
    let http_config = HttpClientConfig {
        timeout: config.http_timeout(),
        ..HttpClientConfig::default()
    };

    GitHubIdentityService::new(
        client_id,
        SecretString::from(client_secret),
        config.redirect_uri(),
        urls,
        http_config,
    )
    .map_err(|e| e.to_string())
}
