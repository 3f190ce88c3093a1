use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum HttpError {
    #[error("request to '{url}' failed: {message}")]
    Request { url: String, message: String },

    #[error("'{url}' answered with status {status}")]
    Status { url: String, status: u16 },

    #[error("request to '{url}' timed out")]
    Timeout { url: String },
}

impl From<reqwest::Error> for HttpError {
    fn from(err: reqwest::Error) -> Self {
        let url = err
            .url()
            .map(|url| url.to_string())
            .unwrap_or_else(|| "<unknown>".into());
        if err.is_timeout() {
            HttpError::Timeout { url }
        } else if let Some(status) = err.status() {
            HttpError::Status {
                url,
                status: status.as_u16(),
            }
        } else {
            HttpError::Request {
                url,
                message: err.to_string(),
            }
        }
    }
}

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("failed to start browser session: {0}")]
    Launch(String),

    #[error("navigation to '{url}' failed: {message}")]
    Navigation { url: String, message: String },

    #[error("'{url}' did not load within {timeout:?}")]
    Timeout { url: String, timeout: Duration },

    #[error("failed to read rendered content of '{url}': {message}")]
    Content { url: String, message: String },
}

#[derive(Error, Debug)]
pub enum PersistError {
    #[error("failed to write '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode csv for '{}': {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("failed to encode json for '{}': {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Error, Debug)]
pub enum SetupError {
    #[error("invalid page range [{start}, {end}]: pages start at 1 and start must not exceed end")]
    PageRange { start: u32, end: u32 },

    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("failed to build http client: {0}")]
    HttpClient(String),

    #[error("failed to prepare renderer: {0}")]
    Renderer(String),

    #[error("failed to prepare output directory '{}': {source}", path.display())]
    OutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
