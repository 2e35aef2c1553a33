//! The network seam: a trait for remote fetches plus the HTTP implementation.
//!
//! Pipelines never talk to the network directly — they hold a `&dyn Fetcher`,
//! so tests substitute a stub and never open a socket. Failures come back as
//! values; nothing in here panics on a dead link.

use std::time::Duration;

use crate::error::Error;

/// Remote capability consumed by the localize and check pipelines.
pub trait Fetcher: Send + Sync {
    /// Whether the URL answers successfully within the bounded timeout.
    /// Timeouts and transport failures are `false`, never an error.
    fn exists(&self, url: &str) -> bool;

    /// Download the resource body.
    ///
    /// # Errors
    ///
    /// Returns `Error::Fetch` on timeout, non-2xx status, or transport
    /// failure.
    fn fetch(&self, url: &str) -> Result<Vec<u8>, Error>;
}

/// Production fetcher backed by a blocking HTTP client. Redirects are
/// followed; every request shares the run's timeout and optional proxy.
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

impl HttpFetcher {
    /// Build a fetcher with a per-request timeout and an optional proxy URL
    /// applied to both http and https traffic.
    ///
    /// # Errors
    ///
    /// Returns `Error::HttpClient` if the proxy URL is malformed or the
    /// client cannot be constructed.
    pub fn new(timeout: Duration, proxy: Option<&str>) -> Result<Self, Error> {
        let mut builder = reqwest::blocking::Client::builder().timeout(timeout);
        if let Some(proxy_url) = proxy {
            let proxy = reqwest::Proxy::all(proxy_url).map_err(|e| Error::HttpClient {
                reason: format!("invalid proxy `{proxy_url}`: {e}"),
            })?;
            builder = builder.proxy(proxy);
        }
        let client = builder.build().map_err(|e| Error::HttpClient {
            reason: e.to_string(),
        })?;
        Ok(Self { client })
    }
}

impl Fetcher for HttpFetcher {
    fn exists(&self, url: &str) -> bool {
        self.client
            .head(url)
            .send()
            .is_ok_and(|response| response.status().is_success())
    }

    fn fetch(&self, url: &str) -> Result<Vec<u8>, Error> {
        let response = self
            .client
            .get(url)
            .send()
            .and_then(reqwest::blocking::Response::error_for_status)
            .map_err(|e| Error::Fetch {
                reason: e.to_string(),
                url: url.to_string(),
            })?;
        let body = response.bytes().map_err(|e| Error::Fetch {
            reason: e.to_string(),
            url: url.to_string(),
        })?;
        Ok(body.to_vec())
    }
}
