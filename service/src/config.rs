use clap::builder::TypedValueParser as _;
use clap::Parser;
use dotenvy::dotenv;
use log::LevelFilter;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_GITHUB_AUTHORIZE_URL: &str = "https://github.com/login/oauth/authorize";
pub const DEFAULT_GITHUB_TOKEN_URL: &str = "https://github.com/login/oauth/access_token";
pub const DEFAULT_GITHUB_API_BASE_URL: &str = "https://api.github.com";

/// Path the browser is redirected to after the consent screen.
pub const REDIRECT_PATH: &str = "/callback";

#[derive(Clone, Debug, PartialEq)]
pub enum RustEnv {
    Development,
    Production,
    Staging,
}

#[derive(Debug, PartialEq, Eq)]
pub struct RustEnvParseError;

impl FromStr for RustEnv {
    type Err = RustEnvParseError;
    fn from_str(level: &str) -> Result<RustEnv, Self::Err> {
        match level.to_lowercase().as_str() {
            "development" => Ok(RustEnv::Development),
            "production" => Ok(RustEnv::Production),
            "staging" => Ok(RustEnv::Staging),
            _ => Err(RustEnvParseError),
        }
    }
}

impl fmt::Display for RustEnv {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RustEnv::Development => write!(f, "development"),
            RustEnv::Production => write!(f, "production"),
            RustEnv::Staging => write!(f, "staging"),
        }
    }
}

#[derive(Clone, Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// The OAuth App client ID registered with GitHub
    #[arg(long, env)]
    github_client_id: Option<String>,

    /// The OAuth App client secret registered with GitHub
    #[arg(long, env, hide_env_values = true)]
    github_client_secret: Option<String>,

    /// GitHub's OAuth authorization endpoint.
    /// Override in tests to point at a mock server.
    #[arg(long, env, default_value = DEFAULT_GITHUB_AUTHORIZE_URL)]
    github_authorize_url: String,

    /// GitHub's OAuth token endpoint
    #[arg(long, env, default_value = DEFAULT_GITHUB_TOKEN_URL)]
    github_token_url: String,

    /// Base URL of the GitHub REST API
    #[arg(long, env, default_value = DEFAULT_GITHUB_API_BASE_URL)]
    github_api_base_url: String,

    /// The loopback interface to listen on for the OAuth redirect
    #[arg(long, env, default_value = "127.0.0.1")]
    pub redirect_interface: IpAddr,

    /// The TCP port to listen on for the OAuth redirect. Must match the
    /// callback URL registered for the OAuth App.
    #[arg(long, env, default_value_t = 8976)]
    pub redirect_port: u16,

    /// Seconds to wait for the browser to come back from the consent screen
    #[arg(long, env, default_value_t = 300)]
    pub consent_timeout_secs: u64,

    /// Timeout in seconds for each request made to GitHub
    #[arg(long, env, default_value_t = 30)]
    pub http_timeout_secs: u64,

    /// Set the log level verbosity threshold (level) to control what gets displayed on console output
    #[arg(
        short,
        long,
        env,
        default_value_t = LevelFilter::Info,
        value_parser = clap::builder::PossibleValuesParser::new(["OFF", "ERROR", "WARN", "INFO", "DEBUG", "TRACE"])
            .map(|s| s.parse::<LevelFilter>().unwrap()),
        )]
    pub log_level_filter: LevelFilter,

    /// Set the Rust runtime environment to use.
    #[arg(
    short,
    long,
    env,
    default_value_t = RustEnv::Development,
    value_parser = clap::builder::PossibleValuesParser::new([
        "DEVELOPMENT", "PRODUCTION", "STAGING",
        "development", "production", "staging"
    ])
        .map(|s| s.parse::<RustEnv>().unwrap()),
    )]
    pub runtime_env: RustEnv,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Self {
        // Load .env file first
        dotenv().ok();
        // Then parse the command line parameters and flags
        Config::parse()
    }

    pub fn set_github_credentials(mut self, client_id: String, client_secret: String) -> Self {
        self.github_client_id = Some(client_id);
        self.github_client_secret = Some(client_secret);
        self
    }

    pub fn github_client_id(&self) -> Option<String> {
        self.github_client_id.clone()
    }

    pub fn github_client_secret(&self) -> Option<String> {
        self.github_client_secret.clone()
    }

    pub fn github_authorize_url(&self) -> &str {
        &self.github_authorize_url
    }

    pub fn github_token_url(&self) -> &str {
        &self.github_token_url
    }

    pub fn github_api_base_url(&self) -> &str {
        &self.github_api_base_url
    }

    /// Address the loopback listener binds to.
    pub fn redirect_addr(&self) -> SocketAddr {
        SocketAddr::new(self.redirect_interface, self.redirect_port)
    }

    /// The `redirect_uri` sent to GitHub, e.g. `http://127.0.0.1:8976/callback`.
    pub fn redirect_uri(&self) -> String {
        format!("http://{}{}", self.redirect_addr(), REDIRECT_PATH)
    }

    pub fn consent_timeout(&self) -> Duration {
        Duration::from_secs(self.consent_timeout_secs)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn runtime_env(&self) -> RustEnv {
        self.runtime_env.clone()
    }

    pub fn is_production(&self) -> bool {
        self.runtime_env() == RustEnv::Production
    }
}
