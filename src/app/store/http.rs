//! Core HTTP operations with optional rate limiting
//!
//! Every request the Azure client makes goes through [`HttpHandler`], which
//! applies the configured request rate and the storage API version header.
//! Retries are deliberately absent here: the fetch executor owns the retry
//! policy so that each object is attempted exactly as often as configured.

use std::num::NonZeroU32;
use std::time::Duration;

use governor::{clock::DefaultClock, state::InMemoryState, Jitter, Quota, RateLimiter};
use reqwest::{Client, Response};
use url::Url;

use crate::constants::store;

type DirectRateLimiter = RateLimiter<governor::state::NotKeyed, InMemoryState, DefaultClock>;

/// HTTP operations handler
#[derive(Debug)]
pub struct HttpHandler {
    client: Client,
    rate_limiter: Option<DirectRateLimiter>,
}

impl HttpHandler {
    /// Creates a new HttpHandler; a rate of zero disables rate limiting
    pub fn new(client: Client, rate_limit_rps: u32) -> Self {
        let rate_limiter =
            NonZeroU32::new(rate_limit_rps).map(|rps| RateLimiter::direct(Quota::per_second(rps)));

        Self {
            client,
            rate_limiter,
        }
    }

    /// Whether requests are throttled
    pub fn is_rate_limited(&self) -> bool {
        self.rate_limiter.is_some()
    }

    /// Issue a GET request and return the raw response for streaming
    ///
    /// `timeout` bounds the whole request including the body. Status
    /// handling is left to the caller.
    pub async fn get(&self, url: &Url, timeout: Option<Duration>) -> reqwest::Result<Response> {
        if let Some(rate_limiter) = &self.rate_limiter {
            // Jitter avoids a thundering herd when all workers wake at once
            rate_limiter
                .until_ready_with_jitter(Jitter::up_to(Duration::from_millis(50)))
                .await;
        }

        tracing::trace!("GET {}://{}{}", url.scheme(), url.host_str().unwrap_or(""), url.path());

        let mut request = self
            .client
            .get(url.as_str())
            .header("x-ms-version", store::AZURE_API_VERSION);
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }

        request.send().await
    }
}
