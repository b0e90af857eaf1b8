// src/checker/transport.rs
// =============================================================================
// This module makes the actual HTTP requests.
//
// Key functionality:
// - Makes HTTP HEAD requests (lightweight, no body download)
// - Falls back to GET if the server refuses HEAD (405 / 501)
// - Follows redirects itself instead of letting reqwest do it, so the first
//   redirect target can be compared with the bookmarked URL
// - Turns transport errors (timeout, DNS, TLS...) into a readable message
//
// The checker talks to a `dyn Transport`, which keeps the HTTP client out of
// the engine tests.
//
// Rust concepts:
// - async_trait: async methods on a trait object
// - Send + Sync + 'static: the transport is shared by tasks on any thread
// =============================================================================

use async_trait::async_trait;
use reqwest::header::LOCATION;
use reqwest::redirect::Policy;
use reqwest::{Client, Response, StatusCode};
use tracing::debug;
use url::Url;

use crate::config::CheckerConfig;
use crate::error::TransportError;

/// What came back for one URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// Final HTTP status after following redirects
    Status(u16),
    /// No usable response; the message says why
    Failed(String),
}

/// The result of probing one URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Probe {
    pub outcome: ProbeOutcome,
    /// Where the server first tried to send us, if it redirected at all
    pub observed_redirect: Option<String>,
}

impl Probe {
    pub fn status(code: u16) -> Self {
        Self {
            outcome: ProbeOutcome::Status(code),
            observed_redirect: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            outcome: ProbeOutcome::Failed(message.into()),
            observed_redirect: None,
        }
    }

    pub fn redirected(mut self, target: impl Into<String>) -> Self {
        self.observed_redirect = Some(target.into());
        self
    }
}

/// Something that can check whether a URL answers.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    async fn probe(&self, url: &Url) -> Probe;
}

/// reqwest-backed transport used by the CLI.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    max_redirects: usize,
    head_first: bool,
}

impl HttpTransport {
    pub fn new(config: &CheckerConfig) -> Result<Self, TransportError> {
        // We reuse this client for all requests (connection pooling).
        // Policy::none() hands every 3xx back to us.
        let client = Client::builder()
            .timeout(config.timeout)
            .redirect(Policy::none())
            .user_agent(config.user_agent.as_str())
            .build()?;

        Ok(Self {
            client,
            max_redirects: config.max_redirects,
            head_first: config.head_first,
        })
    }

    async fn send(&self, url: &Url) -> Result<Response, reqwest::Error> {
        if !self.head_first {
            return self.client.get(url.clone()).send().await;
        }
        let response = self.client.head(url.clone()).send().await?;
        if matches!(
            response.status(),
            StatusCode::METHOD_NOT_ALLOWED | StatusCode::NOT_IMPLEMENTED
        ) {
            debug!(%url, status = response.status().as_u16(), "HEAD refused, retrying with GET");
            return self.client.get(url.clone()).send().await;
        }
        Ok(response)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn probe(&self, url: &Url) -> Probe {
        let mut current = url.clone();
        let mut observed_redirect = None;

        for _ in 0..=self.max_redirects {
            let response = match self.send(&current).await {
                Ok(response) => response,
                Err(e) => {
                    return Probe {
                        outcome: ProbeOutcome::Failed(describe_error(&e)),
                        observed_redirect,
                    }
                }
            };

            let status = response.status();
            match redirect_target(&current, &response) {
                Some((next, raw)) => {
                    debug!(
                        from = %current,
                        to = %next,
                        status = status.as_u16(),
                        "following redirect"
                    );
                    if observed_redirect.is_none() {
                        observed_redirect = Some(raw);
                    }
                    current = next;
                }
                None => {
                    return Probe {
                        outcome: ProbeOutcome::Status(status.as_u16()),
                        observed_redirect,
                    }
                }
            }
        }

        Probe {
            outcome: ProbeOutcome::Failed(format!(
                "more than {} redirects",
                self.max_redirects
            )),
            observed_redirect,
        }
    }
}

/// For a followable redirect, returns the next URL and the target as the
/// server wrote it (resolved against `current` when it was relative).
fn redirect_target(current: &Url, response: &Response) -> Option<(Url, String)> {
    let status = response.status();
    let followable = matches!(
        status,
        StatusCode::MOVED_PERMANENTLY
            | StatusCode::FOUND
            | StatusCode::SEE_OTHER
            | StatusCode::TEMPORARY_REDIRECT
            | StatusCode::PERMANENT_REDIRECT
    );
    if !followable {
        return None;
    }

    let location = response.headers().get(LOCATION)?.to_str().ok()?.trim();
    // Absolute targets keep their exact spelling; Url would normalise them
    match Url::parse(location) {
        Ok(next) => Some((next, location.to_string())),
        Err(_) => {
            let next = current.join(location).ok()?;
            let raw = next.to_string();
            Some((next, raw))
        }
    }
}

// Categorizes different error types from reqwest
fn describe_error(error: &reqwest::Error) -> String {
    let error_string = error.to_string();

    if error.is_timeout() {
        "Request timed out".to_string()
    } else if error.is_connect() {
        if error_string.contains("dns") {
            "Could not resolve hostname".to_string()
        } else {
            "Connection failed".to_string()
        }
    } else if error_string.contains("certificate") || error_string.contains("ssl") {
        "SSL certificate error".to_string()
    } else {
        error_string
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn transport() -> HttpTransport {
        let config = CheckerConfig {
            timeout: Duration::from_secs(5),
            max_redirects: 2,
            ..CheckerConfig::default()
        };
        HttpTransport::new(&config).unwrap()
    }

    fn url(server: &MockServer, route: &str) -> Url {
        Url::parse(&format!("{}{}", server.uri(), route)).unwrap()
    }

    #[tokio::test]
    async fn test_probe_ok() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(path("/ok"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let probe = transport().probe(&url(&server, "/ok")).await;
        assert_eq!(probe, Probe::status(200));
    }

    #[tokio::test]
    async fn test_probe_missing() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(path("/gone"))
            .respond_with(ResponseTemplate::new(410))
            .mount(&server)
            .await;

        let probe = transport().probe(&url(&server, "/gone")).await;
        assert_eq!(probe.outcome, ProbeOutcome::Status(410));
    }

    #[tokio::test]
    async fn test_probe_records_first_redirect() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(path("/old"))
            .respond_with(ResponseTemplate::new(301).insert_header("Location", "/new"))
            .mount(&server)
            .await;
        Mock::given(method("HEAD"))
            .and(path("/new"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let probe = transport().probe(&url(&server, "/old")).await;
        assert_eq!(probe.outcome, ProbeOutcome::Status(200));
        assert_eq!(
            probe.observed_redirect,
            Some(format!("{}/new", server.uri()))
        );
    }

    #[tokio::test]
    async fn test_probe_keeps_absolute_location_spelling() {
        let server = MockServer::start().await;
        let target = format!("{}/a/", server.uri());
        Mock::given(method("HEAD"))
            .and(path("/a"))
            .respond_with(ResponseTemplate::new(308).insert_header("Location", target.as_str()))
            .mount(&server)
            .await;
        Mock::given(method("HEAD"))
            .and(path("/a/"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let probe = transport().probe(&url(&server, "/a")).await;
        assert_eq!(probe.observed_redirect, Some(target));
    }

    #[tokio::test]
    async fn test_probe_falls_back_to_get() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(path("/page"))
            .respond_with(ResponseTemplate::new(405))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/page"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let probe = transport().probe(&url(&server, "/page")).await;
        assert_eq!(probe.outcome, ProbeOutcome::Status(200));
    }

    #[tokio::test]
    async fn test_probe_redirect_loop_fails() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(path("/loop"))
            .respond_with(ResponseTemplate::new(302).insert_header("Location", "/loop"))
            .mount(&server)
            .await;

        let probe = transport().probe(&url(&server, "/loop")).await;
        assert!(matches!(probe.outcome, ProbeOutcome::Failed(_)));
        assert!(probe.observed_redirect.is_some());
    }

    #[tokio::test]
    async fn test_probe_connection_refused() {
        // nothing listens on port 1
        let target = Url::parse("http://127.0.0.1:1/").unwrap();
        let probe = transport().probe(&target).await;
        assert!(matches!(probe.outcome, ProbeOutcome::Failed(_)));
        assert_eq!(probe.observed_redirect, None);
    }
}
