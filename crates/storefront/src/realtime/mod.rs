//! Realtime cache invalidation.
//!
//! A single background task subscribes to the backend's server-sent event
//! stream and drops the cached queries each event makes stale. There is no
//! ordering, deduplication or conflict resolution: an event only ever causes
//! the next read to refetch. When the stream ends or fails the listener waits
//! a fixed delay and reconnects, until shutdown.

pub mod events;
pub mod sse;

use std::time::Duration;

use async_stream::stream;
use futures::{Stream, StreamExt};
use reqwest::header::{ACCEPT, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use tokio::sync::watch;
use url::Url;

use crate::api::QueryCache;
use crate::config::StorefrontConfig;

pub use events::invalidations;
pub use sse::RealtimeEvent;

/// Errors on the realtime channel. None of them are fatal.
#[derive(Debug, Error)]
pub enum RealtimeError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Event stream rejected with status {0}")]
    Status(u16),

    #[error("Parse error: {0}")]
    Parse(String),
}

/// Drop every cached query the event makes stale.
///
/// Returns the number of cache entries removed.
pub async fn apply_event(cache: &QueryCache, event: &RealtimeEvent) -> usize {
    let targets = invalidations(event);
    if targets.is_empty() {
        return 0;
    }
    let removed = cache.invalidate_many(targets).await;
    tracing::debug!(event = %event.name, removed, "Applied realtime event");
    removed
}

/// Background subscriber to the backend event stream.
pub struct RealtimeListener {
    client: reqwest::Client,
    url: Url,
    token: Option<SecretString>,
    reconnect_delay: Duration,
    cache: QueryCache,
}

impl RealtimeListener {
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &StorefrontConfig, cache: QueryCache) -> Result<Self, RealtimeError> {
        // No request timeout: the stream stays open indefinitely.
        let client = reqwest::Client::builder()
            .connect_timeout(config.api_timeout)
            .build()?;

        Ok(Self {
            client,
            url: config.realtime_url.clone(),
            token: config.service_token.clone(),
            reconnect_delay: config.realtime_reconnect,
            cache,
        })
    }

    /// Listen until `shutdown` flips to `true` or its sender is dropped.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        tracing::info!(url = %self.url, "Realtime listener started");

        loop {
            tokio::select! {
                _ = shutdown.changed() => break,
                result = self.listen_once() => match result {
                    Ok(count) => tracing::info!(events = count, "Realtime stream ended"),
                    Err(e) => tracing::warn!(error = %e, "Realtime stream failed"),
                },
            }

            if *shutdown.borrow() {
                break;
            }

            tokio::select! {
                _ = shutdown.changed() => break,
                () = tokio::time::sleep(self.reconnect_delay) => {
                    tracing::debug!("Reconnecting realtime stream");
                }
            }
        }

        tracing::info!("Realtime listener stopped");
    }

    /// Consume one connection. Returns the number of events applied.
    async fn listen_once(&self) -> Result<usize, RealtimeError> {
        let mut request = self
            .client
            .get(self.url.clone())
            .header(ACCEPT, HeaderValue::from_static("text/event-stream"));
        if let Some(token) = &self.token {
            request = request.bearer_auth(token.expose_secret());
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(RealtimeError::Status(status.as_u16()));
        }
        tracing::info!("Realtime stream connected");

        let mut applied = 0;
        let mut events = std::pin::pin!(event_stream(response));
        while let Some(event) = events.next().await {
            match event {
                Ok(event) => {
                    apply_event(&self.cache, &event).await;
                    applied += 1;
                }
                Err(RealtimeError::Parse(message)) => {
                    tracing::warn!(error = %message, "Skipping malformed realtime event");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(applied)
    }
}

/// Parse a streaming response body into events.
fn event_stream(
    response: reqwest::Response,
) -> impl Stream<Item = Result<RealtimeEvent, RealtimeError>> {
    stream! {
        let mut buffer = Vec::new();
        let mut byte_stream = std::pin::pin!(response.bytes_stream());

        while let Some(chunk_result) = byte_stream.next().await {
            match chunk_result {
                Ok(chunk) => {
                    sse::push_chunk(&mut buffer, &chunk);
                    while let Some(raw) = sse::extract_sse_event(&mut buffer) {
                        if let Some(parsed) = sse::parse_sse_event(&raw) {
                            yield parsed;
                        }
                    }
                    if let Err(e) = sse::enforce_limit(&mut buffer) {
                        yield Err(e);
                    }
                }
                Err(e) => {
                    yield Err(RealtimeError::Http(e));
                    break;
                }
            }
        }
    }
}
