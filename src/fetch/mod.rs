//! Bounded Fetcher: outbound GET with an overall deadline and a hard ceiling on
//! the number of body bytes held in memory.

use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use reqwest::{header, redirect, Client, Response};
use thiserror::Error;
use url::Url;

use crate::config::{FetchLimits, USER_AGENT};
use crate::guard::UrlGuard;

/// Redirect hops followed before the chain is abandoned.
pub const MAX_REDIRECTS: usize = 10;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("upstream returned status {0}")]
    Upstream(u16),

    #[error("fetch exceeded its deadline")]
    Timeout,

    #[error("response exceeds the {limit} byte limit")]
    TooLarge { limit: usize },

    #[error("redirect target rejected")]
    RedirectRejected,

    #[error("transport error: {0}")]
    Transport(#[source] reqwest::Error),
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            FetchError::Timeout
        } else if e.is_redirect() {
            FetchError::RedirectRejected
        } else {
            FetchError::Transport(e)
        }
    }
}

/// A fully read, size-checked response body.
#[derive(Debug, Clone)]
pub struct Fetched {
    pub body: Bytes,
    pub content_type: Option<String>,
}

/// Shared HTTP client plus the limits every fetch runs under.
///
/// Cloning is cheap; the underlying connection pool is shared.
#[derive(Clone)]
pub struct Fetcher {
    client: Client,
    limits: FetchLimits,
}

impl Fetcher {
    /// Build a fetcher whose redirect policy runs every hop through `guard`.
    pub fn new(guard: Arc<UrlGuard>, limits: FetchLimits) -> Result<Self, FetchError> {
        let policy = redirect::Policy::custom(move |attempt| {
            if attempt.previous().len() >= MAX_REDIRECTS {
                return attempt.error("too many redirects");
            }
            let verdict = guard.check(attempt.url().as_str());
            match verdict {
                Ok(_) => attempt.follow(),
                Err(rejection) => {
                    tracing::warn!(target_url = %attempt.url(), %rejection, "Blocked redirect hop");
                    attempt.error(rejection)
                }
            }
        });

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(limits.timeout)
            .redirect(policy)
            .build()
            .map_err(FetchError::Transport)?;

        Ok(Fetcher { client, limits })
    }

    pub fn limits(&self) -> FetchLimits {
        self.limits
    }

    /// GET `url` and return its body, failing once `max_bytes` would be
    /// exceeded or the configured timeout elapses.
    ///
    /// The caller is responsible for having validated `url`. Dropping the
    /// in-flight future on timeout closes the connection and frees any
    /// partially read body.
    pub async fn fetch(
        &self,
        url: &Url,
        accept: &str,
        max_bytes: usize,
    ) -> Result<Fetched, FetchError> {
        match tokio::time::timeout(self.limits.timeout, self.fetch_bounded(url, accept, max_bytes))
            .await
        {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(url = %url, timeout = ?self.limits.timeout, "Fetch timed out");
                Err(FetchError::Timeout)
            }
        }
    }

    async fn fetch_bounded(
        &self,
        url: &Url,
        accept: &str,
        max_bytes: usize,
    ) -> Result<Fetched, FetchError> {
        let response = self
            .client
            .get(url.clone())
            .header(header::ACCEPT, accept)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(url = %url, status = status.as_u16(), "Upstream returned an error status");
            return Err(FetchError::Upstream(status.as_u16()));
        }

        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);

        let body = read_limited(response, max_bytes).await?;
        tracing::debug!(url = %url, bytes = body.len(), "Fetched response body");

        Ok(Fetched { body, content_type })
    }
}

/// Read a response body, aborting as soon as it is known to exceed
/// `max_bytes`.
///
/// A declared `Content-Length` over the limit fails before any body bytes are
/// read. Otherwise chunks are accumulated with a running total, so at most
/// `max_bytes` plus one chunk is ever held.
pub async fn read_limited(mut response: Response, max_bytes: usize) -> Result<Bytes, FetchError> {
    if let Some(declared) = response.content_length() {
        if declared > max_bytes as u64 {
            tracing::warn!(declared, limit = max_bytes, "Declared Content-Length over limit");
            return Err(FetchError::TooLarge { limit: max_bytes });
        }
    }

    let initial = response
        .content_length()
        .map_or(0, |len| len as usize)
        .min(max_bytes);
    let mut buf = BytesMut::with_capacity(initial);

    while let Some(chunk) = response.chunk().await? {
        if buf.len() + chunk.len() > max_bytes {
            tracing::warn!(
                read = buf.len() + chunk.len(),
                limit = max_bytes,
                "Response body over limit; aborting read"
            );
            return Err(FetchError::TooLarge { limit: max_bytes });
        }
        buf.extend_from_slice(&chunk);
    }

    Ok(buf.freeze())
}

// ── Unit tests ─────────────────────────────────────────────────────────────
