use async_trait::async_trait;
use identity::{Error, InteractionContext};
use url::Url;

/// Interaction context with a fixed availability that answers every consent
/// screen with a canned redirect.
pub struct StaticContext {
    available: bool,
    redirect: Url,
}

impl StaticContext {
    pub fn available() -> Self {
        Self::new(true)
    }

    pub fn unavailable() -> Self {
        Self::new(false)
    }

    fn new(available: bool) -> Self {
        Self {
            available,
            redirect: Url::parse("http://127.0.0.1:8976/callback?code=test-code")
                .expect("static redirect URL is valid"),
        }
    }
}

#[async_trait]
impl InteractionContext for StaticContext {
    fn is_available(&self) -> bool {
        self.available
    }

    async fn present(&self, _authorize_url: &Url) -> Result<Url, Error> {
        Ok(self.redirect.clone())
    }
}
