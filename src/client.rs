//! HTTP client seam and the concurrency-limiting wrapper used by the listing phase.

mod http;
mod permit;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::HttpError;

pub use http::{ReqwestClient, ReqwestClientOptions};
pub use permit::{Permit, PermitPool};

#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
    pub timeout: Option<Duration>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

#[derive(Debug, Clone)]
pub struct Response {
    pub status: u16,
    pub url: String,
    pub body: String,
}

impl Response {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn error_for_status(self) -> Result<Self, HttpError> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(HttpError::Status {
                url: self.url,
                status: self.status,
            })
        }
    }
}

#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn get(&self, url: &str, options: RequestOptions) -> Result<Response, HttpError>;
    async fn post(&self, url: &str, options: RequestOptions) -> Result<Response, HttpError>;
}

#[async_trait]
impl<C: HttpClient + ?Sized> HttpClient for Arc<C> {
    async fn get(&self, url: &str, options: RequestOptions) -> Result<Response, HttpError> {
        (**self).get(url, options).await
    }

    async fn post(&self, url: &str, options: RequestOptions) -> Result<Response, HttpError> {
        (**self).post(url, options).await
    }
}

/// Wraps an [`HttpClient`] so that at most `max_concurrency` delegated calls are in flight.
///
/// The permit is held only while the wrapped call runs and is returned on every
/// path, including errors and a dropped future. Errors pass through unchanged.
pub struct LimitedClient<C> {
    client: C,
    permits: PermitPool,
}

impl<C: HttpClient> LimitedClient<C> {
    pub fn new(client: C, max_concurrency: Option<usize>) -> Self {
        Self {
            client,
            permits: PermitPool::new(max_concurrency),
        }
    }

    pub fn permits(&self) -> &PermitPool {
        &self.permits
    }

    pub fn inner(&self) -> &C {
        &self.client
    }
}

#[async_trait]
impl<C: HttpClient> HttpClient for LimitedClient<C> {
    async fn get(&self, url: &str, options: RequestOptions) -> Result<Response, HttpError> {
        let _permit = self.permits.acquire().await;
        self.client.get(url, options).await
    }

    async fn post(&self, url: &str, options: RequestOptions) -> Result<Response, HttpError> {
        let _permit = self.permits.acquire().await;
        self.client.post(url, options).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[derive(Default)]
    struct CountingClient {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
        fail: bool,
    }

    impl CountingClient {
        async fn call(&self, url: &str) -> Result<Response, HttpError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(10)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            if self.fail {
                Err(HttpError::Request {
                    url: url.to_string(),
                    message: "boom".into(),
                })
            } else {
                Ok(Response {
                    status: 200,
                    url: url.to_string(),
                    body: String::new(),
                })
            }
        }
    }

    #[async_trait]
    impl HttpClient for CountingClient {
        async fn get(&self, url: &str, _options: RequestOptions) -> Result<Response, HttpError> {
            self.call(url).await
        }
        async fn post(&self, url: &str, _options: RequestOptions) -> Result<Response, HttpError> {
            self.call(url).await
        }
    }

    #[tokio::test]
    async fn failures_release_their_permit() {
        let client = LimitedClient::new(
            CountingClient {
                fail: true,
                ..Default::default()
            },
            Some(2),
        );

        for _ in 0..5 {
            let res = client.get("https://example.com", RequestOptions::new()).await;
            assert!(matches!(res, Err(HttpError::Request { .. })));
        }
        assert_eq!(client.permits().available(), Some(2));
    }

    #[tokio::test]
    async fn mixed_get_and_post_share_the_limit() {
        let client = Arc::new(LimitedClient::new(CountingClient::default(), Some(3)));
        let calls = (0..12).map(|i| {
            let client = client.clone();
            async move {
                if i % 2 == 0 {
                    client.get("https://example.com", RequestOptions::new()).await
                } else {
                    client.post("https://example.com", RequestOptions::new()).await
                }
            }
        });
        let results = futures::future::join_all(calls).await;

        assert!(results.iter().all(Result::is_ok));
        assert_eq!(client.inner().peak.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn non_success_status_becomes_error() {
        let response = Response {
            status: 503,
            url: "https://example.com".into(),
            body: String::new(),
        };
        assert!(matches!(
            response.error_for_status(),
            Err(HttpError::Status { status: 503, .. })
        ));
    }
}
