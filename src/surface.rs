//! Consent surface backed by the user's browser and a one-shot loopback listener.

use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use identity::error::{cancelled_error, Error, ErrorKind};
use identity::InteractionContext;
use log::*;
use service::config::REDIRECT_PATH;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use url::Url;

const UNAVAILABLE_CODE: &str = "web-context-unavailable";

const DONE_PAGE: &str = "<!doctype html><html><body>\
<h1>You can close this tab</h1>\
<p>Return to the terminal to continue.</p>\
</body></html>";

/// Prints the authorize URL and waits for GitHub to redirect the browser back
/// to `addr`.
pub struct LoopbackContext {
    addr: SocketAddr,
    timeout: Duration,
}

impl LoopbackContext {
    pub fn new(addr: SocketAddr, timeout: Duration) -> Self {
        Self { addr, timeout }
    }
}

#[async_trait]
impl InteractionContext for LoopbackContext {
    fn is_available(&self) -> bool {
        self.addr.ip().is_loopback()
    }

    async fn present(&self, authorize_url: &Url) -> Result<Url, Error> {
        let listener = TcpListener::bind(self.addr).await.map_err(surface_error)?;
        let local_addr = listener.local_addr().map_err(surface_error)?;
        debug!("Waiting for the OAuth redirect on {local_addr}");

        println!("\nOpen this URL in your browser to continue:\n\n  {authorize_url}\n");

        match tokio::time::timeout(self.timeout, accept_redirect(&listener, local_addr)).await {
            Ok(redirect) => redirect,
            Err(_) => {
                warn!("No redirect within {:?}", self.timeout);
                Err(cancelled_error(
                    "Timed out waiting for the GitHub consent screen",
                ))
            }
        }
    }
}

/// Serve connections until one hits the callback path, and return its URL.
async fn accept_redirect(listener: &TcpListener, local_addr: SocketAddr) -> Result<Url, Error> {
    loop {
        let (mut socket, peer) = listener.accept().await.map_err(surface_error)?;

        match read_redirect(&mut socket, local_addr).await {
            Ok(Some(redirect)) => {
                respond(&mut socket, "200 OK", DONE_PAGE).await;
                info!("Received OAuth redirect");
                return Ok(redirect);
            }
            Ok(None) => {
                // Browsers also ask for /favicon.ico and the like.
                respond(&mut socket, "404 Not Found", "").await;
            }
            Err(e) => warn!("Failed to read request from {peer}: {e}"),
        }
    }
}

async fn read_redirect(
    socket: &mut TcpStream,
    local_addr: SocketAddr,
) -> std::io::Result<Option<Url>> {
    let mut reader = BufReader::new(socket);
    let mut request_line = String::new();
    reader.read_line(&mut request_line).await?;

    // Drain the headers so closing the socket doesn't reset the connection.
    let mut header = String::new();
    loop {
        header.clear();
        if reader.read_line(&mut header).await? == 0 || header.trim().is_empty() {
            break;
        }
    }

    Ok(parse_redirect(&request_line, local_addr))
}

/// Parse an HTTP request line into the redirect URL, if it targets the callback path.
fn parse_redirect(request_line: &str, local_addr: SocketAddr) -> Option<Url> {
    let mut parts = request_line.split_whitespace();
    let method = parts.next()?;
    let target = parts.next()?;
    if method != "GET" || !target.starts_with('/') {
        return None;
    }

    let url = Url::parse(&format!("http://{local_addr}{target}")).ok()?;
    (url.path() == REDIRECT_PATH).then_some(url)
}

async fn respond(socket: &mut TcpStream, status: &str, body: &str) {
    let response = format!(
        "HTTP/1.1 {status}\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    if let Err(e) = socket.write_all(response.as_bytes()).await {
        debug!("Failed to answer browser: {e}");
    }
}

/// The listener failed; the consent surface can't be hosted.
fn surface_error(err: std::io::Error) -> Error {
    Error {
        source: Some(Box::new(err)),
        error_kind: ErrorKind::Provider {
            code: Some(UNAVAILABLE_CODE.to_string()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;

    fn local() -> SocketAddr {
        "127.0.0.1:8976".parse().unwrap()
    }

    #[test]
    fn test_parse_redirect_on_callback_path() {
        let url = parse_redirect(
            "GET /callback?code=abc&state=xyz HTTP/1.1\r\n",
            local(),
        )
        .unwrap();

        assert_eq!(url.as_str(), "http://127.0.0.1:8976/callback?code=abc&state=xyz");
    }

    #[test]
    fn test_parse_redirect_ignores_other_requests() {
        assert!(parse_redirect("GET /favicon.ico HTTP/1.1\r\n", local()).is_none());
        assert!(parse_redirect("POST /callback HTTP/1.1\r\n", local()).is_none());
        assert!(parse_redirect("", local()).is_none());
    }

    #[test]
    fn test_only_loopback_addresses_are_available() {
        let timeout = Duration::from_secs(1);
        assert!(LoopbackContext::new(local(), timeout).is_available());
        assert!(!LoopbackContext::new("0.0.0.0:8976".parse().unwrap(), timeout).is_available());
    }

    #[tokio::test]
    async fn test_accept_redirect_skips_unrelated_requests() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let browser = tokio::spawn(async move {
            let mut favicon = TcpStream::connect(addr).await.unwrap();
            favicon
                .write_all(b"GET /favicon.ico HTTP/1.1\r\n\r\n")
                .await
                .unwrap();
            let mut body = String::new();
            favicon.read_to_string(&mut body).await.unwrap();
            assert!(body.starts_with("HTTP/1.1 404"));

            let mut callback = TcpStream::connect(addr).await.unwrap();
            callback
                .write_all(b"GET /callback?code=abc&state=xyz HTTP/1.1\r\n\r\n")
                .await
                .unwrap();
            let mut body = String::new();
            callback.read_to_string(&mut body).await.unwrap();
            body
        });

        let redirect = accept_redirect(&listener, addr).await.unwrap();
        let page = browser.await.unwrap();

        assert_eq!(redirect.path(), "/callback");
        assert_eq!(
            redirect.query_pairs().find(|(k, _)| k == "code").unwrap().1,
            "abc"
        );
        assert!(page.starts_with("HTTP/1.1 200 OK"));
    }

    #[test]
    fn test_listener_failure_is_not_a_cancellation() {
        let err = surface_error(std::io::Error::new(
            std::io::ErrorKind::ConnectionAborted,
            "accept failed",
        ));

        assert_eq!(err.code(), Some(UNAVAILABLE_CODE));
        assert_ne!(identity::classify(&err), "Sign-in was cancelled");
    }

    #[tokio::test]
    async fn test_timeout_is_a_cancellation() {
        let context = LoopbackContext::new(
            "127.0.0.1:0".parse().unwrap(),
            Duration::from_millis(20),
        );
        let authorize = Url::parse("https://github.com/login/oauth/authorize").unwrap();

        let err = context.present(&authorize).await.unwrap_err();

        assert!(matches!(err.error_kind, ErrorKind::Cancelled));
    }
}
