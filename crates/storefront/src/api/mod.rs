//! REST backend client.
//!
//! All backend traffic goes through [`ApiClient`]:
//!
//! - reads (`GET`) are served from the [`QueryCache`] when fresh, fetched
//!   otherwise, and retried a fixed number of times on transport errors and
//!   5xx responses with no backoff
//! - mutations (`POST`/`PATCH`/`DELETE`) are sent once and never retried;
//!   callers invalidate or patch the cache afterwards
//!
//! Endpoint wrappers live in the submodules as `impl ApiClient` blocks.

mod analytics;
mod auth;
pub mod cache;
mod cart;
pub mod error;
mod notifications;
mod orders;
mod products;
mod reviews;
mod users;
mod wishlists;

pub use cache::{Invalidation, QueryCache, QueryKey, Resource};
pub use error::{ApiError, GENERIC_ERROR_MESSAGE};
pub use orders::OrderQuery;
pub use products::{MAX_SCAN_PAGES, ProductQuery, ProductScan};
pub use reviews::ReviewQuery;
pub use users::UserQuery;

use std::sync::Arc;

use reqwest::header::{ACCEPT, HeaderValue, RETRY_AFTER};
use reqwest::{Method, RequestBuilder};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::instrument;
use url::Url;

use emporium_core::UserId;

use crate::config::StorefrontConfig;
use crate::store::CurrentUser;

/// Who a request is made on behalf of.
///
/// Carries the bearer token and the cache scope for user-specific reads.
#[derive(Clone, Copy)]
pub struct Caller<'a> {
    user: Option<&'a CurrentUser>,
}

impl<'a> Caller<'a> {
    /// No bearer token; public reads only.
    #[must_use]
    pub const fn anonymous() -> Self {
        Self { user: None }
    }

    #[must_use]
    pub const fn user(user: &'a CurrentUser) -> Self {
        Self { user: Some(user) }
    }

    #[must_use]
    pub fn from_option(user: Option<&'a CurrentUser>) -> Self {
        Self { user }
    }

    fn token(&self) -> Option<&'a str> {
        self.user.map(|u| u.token.as_str())
    }

    /// Cache scope; `None` for anonymous reads.
    #[must_use]
    pub fn scope(&self) -> Option<UserId> {
        self.user.map(|u| u.id)
    }
}

impl std::fmt::Debug for Caller<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Caller")
            .field("user_id", &self.scope())
            .finish_non_exhaustive()
    }
}

/// Canonical query string for cache keys and URLs.
pub(crate) type Params = Vec<(&'static str, String)>;

pub(crate) fn params_key(params: &Params) -> String {
    params
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&")
}

/// REST backend client with a shared query cache.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    client: reqwest::Client,
    base_url: String,
    cache: QueryCache,
    retry_count: u32,
}

impl ApiClient {
    /// Create a new REST client from configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &StorefrontConfig) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(config.api_timeout)
            .build()?;

        Ok(Self {
            inner: Arc::new(ApiClientInner {
                client,
                base_url: config.api_url.as_str().trim_end_matches('/').to_string(),
                cache: QueryCache::new(config.cache_ttl, config.cache_max_capacity),
                retry_count: config.api_retry_count,
            }),
        })
    }

    /// The cache shared by every handler and the realtime listener.
    #[must_use]
    pub fn cache(&self) -> &QueryCache {
        &self.inner.cache
    }

    fn url(&self, path: &str, params: &Params) -> Result<Url, ApiError> {
        let mut url = Url::parse(&format!("{}{path}", self.inner.base_url))
            .map_err(|e| ApiError::Parse(format!("Invalid API URL for {path}: {e}")))?;
        if !params.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in params {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }

    fn request(&self, method: Method, url: Url, caller: Caller<'_>) -> RequestBuilder {
        let builder = self
            .inner
            .client
            .request(method, url)
            .header(ACCEPT, HeaderValue::from_static("application/json"));
        match caller.token() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Cached read. A hit never touches the network. A response that was
    /// in flight when its resource got invalidated is returned but not
    /// cached, so the next read refetches.
    #[instrument(skip(self, params), fields(resource = ?key.resource))]
    pub(crate) async fn query<T: DeserializeOwned>(
        &self,
        key: QueryKey,
        path: &str,
        params: &Params,
        caller: Caller<'_>,
    ) -> Result<T, ApiError> {
        if let Some(hit) = self.inner.cache.get(&key).await {
            tracing::trace!("Query cache hit");
            return T::deserialize(hit.as_ref())
                .map_err(|e| ApiError::Parse(format!("Failed to parse cached {path}: {e}")));
        }

        let seen = self.inner.cache.generation(key.resource);
        let value = self.fetch(path, params, caller).await?;
        let parsed = T::deserialize(&value)
            .map_err(|e| ApiError::Parse(format!("Failed to parse {path}: {e}")))?;
        self.inner.cache.insert_fresh(key, value, seen).await;
        Ok(parsed)
    }

    /// Uncached read with the fixed retry policy.
    pub(crate) async fn fetch(
        &self,
        path: &str,
        params: &Params,
        caller: Caller<'_>,
    ) -> Result<Value, ApiError> {
        let url = self.url(path, params)?;
        let mut attempt = 0;
        loop {
            let result = self
                .send(self.request(Method::GET, url.clone(), caller))
                .await;
            match result {
                Err(e) if e.is_retryable() && attempt < self.inner.retry_count => {
                    attempt += 1;
                    tracing::warn!(path, attempt, error = %e, "Retrying failed read");
                }
                other => return other,
            }
        }
    }

    /// Execute a POST request. Never retried.
    #[instrument(skip(self, body))]
    pub(crate) async fn post<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
        caller: Caller<'_>,
    ) -> Result<T, ApiError> {
        let url = self.url(path, &Vec::new())?;
        let value = self
            .send(self.request(Method::POST, url, caller).json(body))
            .await?;
        Self::parse(path, value)
    }

    /// Execute a PATCH request. Never retried.
    #[instrument(skip(self, body))]
    pub(crate) async fn patch<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
        caller: Caller<'_>,
    ) -> Result<T, ApiError> {
        let url = self.url(path, &Vec::new())?;
        let value = self
            .send(self.request(Method::PATCH, url, caller).json(body))
            .await?;
        Self::parse(path, value)
    }

    /// Execute a DELETE request. Never retried.
    #[instrument(skip(self))]
    pub(crate) async fn delete(&self, path: &str, caller: Caller<'_>) -> Result<(), ApiError> {
        let url = self.url(path, &Vec::new())?;
        self.send(self.request(Method::DELETE, url, caller))
            .await
            .map(drop)
    }

    /// Whether the backend answers its health endpoint.
    pub async fn health(&self) -> bool {
        match self.url("/health", &Vec::new()) {
            Ok(url) => self
                .send(self.request(Method::GET, url, Caller::anonymous()))
                .await
                .is_ok(),
            Err(_) => false,
        }
    }

    fn parse<T: DeserializeOwned>(path: &str, value: Value) -> Result<T, ApiError> {
        serde_json::from_value(value)
            .map_err(|e| ApiError::Parse(format!("Failed to parse {path}: {e}")))
    }

    /// Send and read the body as JSON. An empty body reads as `null`.
    async fn send(&self, request: RequestBuilder) -> Result<Value, ApiError> {
        let response = request.send().await?;
        let status = response.status();

        if status.is_success() {
            let body = response.text().await?;
            if body.trim().is_empty() {
                return Ok(Value::Null);
            }
            return serde_json::from_str(&body)
                .map_err(|e| ApiError::Parse(format!("Failed to parse response: {e}")));
        }

        Err(Self::parse_error(response).await)
    }

    /// Classify an error response.
    async fn parse_error(response: reqwest::Response) -> ApiError {
        let status = response.status().as_u16();
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse().ok());
        let body = response.text().await.unwrap_or_default();

        let error = ApiError::from_status(status, &body, retry_after);
        if error.is_server_error() {
            tracing::warn!(status, error = %error, "Backend returned an error");
        } else {
            tracing::debug!(status, error = %error, "Backend rejected request");
        }
        error
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.inner.base_url)
            .field("retry_count", &self.inner.retry_count)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn client(api_url: &str) -> ApiClient {
        let config = StorefrontConfig::new(Url::parse(api_url).unwrap(), "http://localhost:3000");
        ApiClient::new(&config).unwrap()
    }

    #[test]
    fn test_url_joins_base_path_and_params() {
        let client = client("https://api.emporium.test/v1/");
        let params: Params = vec![("q", "desk lamp".to_string()), ("page", "2".to_string())];
        let url = client.url("/products", &params).unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.emporium.test/v1/products?q=desk+lamp&page=2"
        );
    }

    #[test]
    fn test_url_without_params_has_no_query() {
        let client = client("http://127.0.0.1:9000");
        let url = client.url("/orders/4", &Vec::new()).unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:9000/orders/4");
    }

    #[test]
    fn test_params_key_is_stable() {
        let params: Params = vec![("page", "1".to_string()), ("sort", "name".to_string())];
        assert_eq!(params_key(&params), "page=1&sort=name");
    }

    #[test]
    fn test_caller_scope() {
        assert_eq!(Caller::anonymous().scope(), None);
    }
}
