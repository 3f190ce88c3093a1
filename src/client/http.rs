use std::time::Duration;

use async_trait::async_trait;

use super::{HttpClient, RequestOptions, Response};
use crate::error::{HttpError, SetupError};

const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

#[derive(Debug, Clone)]
pub struct ReqwestClientOptions {
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for ReqwestClientOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl ReqwestClientOptions {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

/// [`HttpClient`] backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct ReqwestClient {
    client: reqwest::Client,
}

impl ReqwestClient {
    pub fn new(options: ReqwestClientOptions) -> Result<Self, SetupError> {
        let client = reqwest::Client::builder()
            .timeout(options.timeout)
            .user_agent(options.user_agent)
            .build()
            .map_err(|err| SetupError::HttpClient(err.to_string()))?;
        Ok(Self { client })
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<Response, HttpError> {
        let response = request.send().await?;
        let status = response.status().as_u16();
        let url = response.url().to_string();
        let body = response.text().await?;
        Ok(Response { status, url, body })
    }

    fn apply(
        mut request: reqwest::RequestBuilder,
        options: RequestOptions,
    ) -> reqwest::RequestBuilder {
        if !options.query.is_empty() {
            request = request.query(&options.query);
        }
        for (name, value) in options.headers {
            request = request.header(name, value);
        }
        if let Some(body) = options.body {
            request = request.body(body);
        }
        if let Some(timeout) = options.timeout {
            request = request.timeout(timeout);
        }
        request
    }
}

#[async_trait]
impl HttpClient for ReqwestClient {
    async fn get(&self, url: &str, options: RequestOptions) -> Result<Response, HttpError> {
        tracing::debug!(url, "GET");
        self.send(Self::apply(self.client.get(url), options)).await
    }

    async fn post(&self, url: &str, options: RequestOptions) -> Result<Response, HttpError> {
        tracing::debug!(url, "POST");
        self.send(Self::apply(self.client.post(url), options)).await
    }
}
