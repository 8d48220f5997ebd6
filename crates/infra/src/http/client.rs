//! Shared reqwest client for the remote store.
//!
//! One attempt per request unless `max_attempts` is raised. Even then only
//! replay-safe methods are resent: a POST inserts a stage or calls the save
//! procedure, and sending it twice could create two rows.

use std::time::Duration;

use dealdesk_domain::constants::{DEFAULT_REMOTE_MAX_ATTEMPTS, DEFAULT_REMOTE_TIMEOUT_SECS};
use dealdesk_domain::DealDeskError;
use reqwest::{Client, Method, Request, RequestBuilder, Response};
use tracing::{debug, warn};

use crate::errors::InfraError;

const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(200);

/// Methods whose repeat leaves the server as a single send would.
fn replay_safe(method: &Method) -> bool {
    matches!(*method, Method::GET | Method::HEAD | Method::PUT | Method::PATCH | Method::DELETE)
}

/// Transport failures that happened before the server could have acted.
fn transient(err: &reqwest::Error) -> bool {
    err.is_connect() || err.is_timeout()
}

fn infra(err: reqwest::Error) -> DealDeskError {
    InfraError::from(err).into()
}

#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    max_attempts: usize,
    retry_delay: Duration,
}

impl HttpClient {
    pub fn builder() -> HttpClientBuilder {
        HttpClientBuilder::default()
    }

    pub fn new() -> Result<Self, DealDeskError> {
        Self::builder().build()
    }

    pub fn request<U: reqwest::IntoUrl>(&self, method: Method, url: U) -> RequestBuilder {
        self.client.request(method, url)
    }

    /// Send a request and hand back whatever status the server answered.
    ///
    /// 5xx responses and connect/timeout failures are retried only for
    /// replay-safe methods with attempts left. The delay doubles each time.
    pub async fn send(&self, builder: RequestBuilder) -> Result<Response, DealDeskError> {
        let request = builder.build().map_err(infra)?;
        let attempts = if self.may_retry(&request) { self.max_attempts } else { 1 };

        let mut delay = self.retry_delay;
        let mut next = Some(request);
        let mut attempt = 1;
        while let Some(request) = next.take() {
            // Keep a copy for the next attempt while one is allowed.
            let spare = if attempt < attempts { request.try_clone() } else { None };
            let (method, url) = (request.method().clone(), request.url().clone());

            let outcome = self.client.execute(request).await;
            let retry = spare.is_some()
                && match &outcome {
                    Ok(response) => response.status().is_server_error(),
                    Err(err) => transient(err),
                };

            match &outcome {
                Ok(response) => debug!(attempt, %method, %url, status = %response.status(), "remote response"),
                Err(err) => debug!(attempt, %method, %url, error = %err, "remote request failed"),
            }
            if !retry {
                return outcome.map_err(infra);
            }

            warn!(attempt, %method, %url, ?delay, "retrying remote request");
            tokio::time::sleep(delay).await;
            delay = delay.saturating_mul(2);
            attempt += 1;
            next = spare;
        }

        Err(DealDeskError::Internal("remote request was never sent".into()))
    }

    /// Whether [`Self::send`] may resend this request.
    pub fn may_retry(&self, request: &Request) -> bool {
        self.max_attempts > 1 && replay_safe(request.method())
    }
}

#[derive(Debug)]
pub struct HttpClientBuilder {
    timeout: Duration,
    max_attempts: usize,
    retry_delay: Duration,
    user_agent: Option<String>,
}

impl Default for HttpClientBuilder {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_REMOTE_TIMEOUT_SECS),
            max_attempts: DEFAULT_REMOTE_MAX_ATTEMPTS,
            retry_delay: DEFAULT_RETRY_DELAY,
            user_agent: None,
        }
    }
}

impl HttpClientBuilder {
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Attempts per replay-safe request, the first send included.
    pub fn max_attempts(mut self, attempts: usize) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// Pause before the first resend.
    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    pub fn build(self) -> Result<HttpClient, DealDeskError> {
        let mut client = Client::builder().timeout(self.timeout).no_proxy();
        if let Some(agent) = self.user_agent {
            client = client.user_agent(agent);
        }

        Ok(HttpClient {
            client: client.build().map_err(infra)?,
            max_attempts: self.max_attempts.max(1),
            retry_delay: self.retry_delay,
        })
    }
}
