use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use chromiumoxide::browser::{Browser, BrowserConfig};
use futures::StreamExt;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use super::{Renderer, RendererFactory};
use crate::error::{RenderError, SetupError};

const CLOSE_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct ChromeOptions {
    pub headless: bool,
    pub page_load_timeout: Duration,
    /// Wait after navigation so client-side scripts can fill the page.
    pub settle_delay: Duration,
    /// Up to this much is added to `settle_delay` at random, per page.
    pub settle_jitter: Duration,
    pub chrome_executable: Option<PathBuf>,
}

impl Default for ChromeOptions {
    fn default() -> Self {
        Self {
            headless: true,
            page_load_timeout: Duration::from_secs(30),
            settle_delay: Duration::from_secs(3),
            settle_jitter: Duration::from_secs(2),
            chrome_executable: None,
        }
    }
}

impl ChromeOptions {
    pub fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    pub fn with_page_load_timeout(mut self, timeout: Duration) -> Self {
        self.page_load_timeout = timeout;
        self
    }

    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    pub fn with_settle_jitter(mut self, jitter: Duration) -> Self {
        self.settle_jitter = jitter;
        self
    }

    pub fn with_chrome_executable(mut self, path: impl Into<PathBuf>) -> Self {
        self.chrome_executable = Some(path.into());
        self
    }
}

/// Launches a separate Chromium process for every acquired renderer.
///
/// Must be created inside a multi-threaded tokio runtime: renderers drive the
/// browser from blocking threads through the captured runtime handle.
pub struct ChromeRendererFactory {
    options: ChromeOptions,
    handle: Handle,
    sessions: AtomicUsize,
}

impl ChromeRendererFactory {
    pub fn new(options: ChromeOptions) -> Result<Self, SetupError> {
        let handle = Handle::try_current().map_err(|err| SetupError::Renderer(err.to_string()))?;
        Ok(Self {
            options,
            handle,
            sessions: AtomicUsize::new(0),
        })
    }
}

impl RendererFactory for ChromeRendererFactory {
    type Renderer = ChromeRenderer;

    fn acquire(&self) -> Result<ChromeRenderer, RenderError> {
        let session = self.sessions.fetch_add(1, Ordering::Relaxed);
        ChromeRenderer::launch(&self.options, self.handle.clone(), session)
    }
}

pub struct ChromeRenderer {
    handle: Handle,
    browser: Option<Browser>,
    handler: JoinHandle<()>,
    user_data_dir: PathBuf,
    page_load_timeout: Duration,
    settle_delay: Duration,
    settle_jitter: Duration,
}

impl ChromeRenderer {
    fn launch(options: &ChromeOptions, handle: Handle, session: usize) -> Result<Self, RenderError> {
        let user_data_dir = std::env::temp_dir().join(format!(
            "college-scraper-{}-{}",
            std::process::id(),
            session
        ));

        let mut builder = BrowserConfig::builder()
            .user_data_dir(&user_data_dir)
            .no_sandbox()
            .request_timeout(options.page_load_timeout)
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-gpu");
        if !options.headless {
            builder = builder.with_head();
        }
        if let Some(path) = &options.chrome_executable {
            builder = builder.chrome_executable(path);
        }
        let config = builder.build().map_err(RenderError::Launch)?;

        let (browser, mut handler) = handle
            .block_on(Browser::launch(config))
            .map_err(|err| RenderError::Launch(err.to_string()))?;

        let handler = handle.spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(err) = event {
                    tracing::trace!("browser event error: {:?}", err);
                }
            }
        });
        tracing::debug!(session, "browser session started");

        Ok(Self {
            handle,
            browser: Some(browser),
            handler,
            user_data_dir,
            page_load_timeout: options.page_load_timeout,
            settle_delay: options.settle_delay,
            settle_jitter: options.settle_jitter,
        })
    }
}

fn settle_time(base: Duration, jitter: Duration) -> Duration {
    let jitter_ms = u64::try_from(jitter.as_millis()).unwrap_or(u64::MAX);
    if jitter_ms == 0 {
        return base;
    }
    base + Duration::from_millis(fastrand::u64(0..=jitter_ms))
}

impl Renderer for ChromeRenderer {
    fn render(&mut self, url: &str) -> Result<String, RenderError> {
        let browser = self
            .browser
            .as_ref()
            .ok_or_else(|| RenderError::Launch("browser session already closed".into()))?;
        let timeout = self.page_load_timeout;
        let settle_delay = settle_time(self.settle_delay, self.settle_jitter);

        self.handle.block_on(async move {
            let page = tokio::time::timeout(timeout, browser.new_page(url))
                .await
                .map_err(|_| RenderError::Timeout {
                    url: url.to_string(),
                    timeout,
                })?
                .map_err(|err| RenderError::Navigation {
                    url: url.to_string(),
                    message: err.to_string(),
                })?;

            tokio::time::sleep(settle_delay).await;

            let content = page.content().await.map_err(|err| RenderError::Content {
                url: url.to_string(),
                message: err.to_string(),
            });
            if let Err(err) = page.close().await {
                tracing::debug!(url, "failed to close page: {}", err);
            }
            content
        })
    }
}

impl Drop for ChromeRenderer {
    fn drop(&mut self) {
        if let Some(mut browser) = self.browser.take() {
            self.handle.block_on(async move {
                match tokio::time::timeout(CLOSE_TIMEOUT, browser.close()).await {
                    Ok(Ok(_)) => {
                        let _ = tokio::time::timeout(CLOSE_TIMEOUT, browser.wait()).await;
                    }
                    Ok(Err(err)) => {
                        tracing::warn!("failed to close browser, killing it: {}", err);
                        let _ = browser.kill().await;
                    }
                    Err(_) => {
                        tracing::warn!("browser did not close within {:?}, killing it", CLOSE_TIMEOUT);
                        let _ = browser.kill().await;
                    }
                }
            });
        }
        self.handler.abort();
        if let Err(err) = std::fs::remove_dir_all(&self.user_data_dir) {
            tracing::trace!(
                "could not remove '{}': {}",
                self.user_data_dir.display(),
                err
            );
        }
        tracing::debug!("browser session released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settle_time_stays_within_jitter() {
        let base = Duration::from_secs(3);
        assert_eq!(settle_time(base, Duration::ZERO), base);

        let jitter = Duration::from_secs(2);
        for _ in 0..200 {
            let delay = settle_time(base, jitter);
            assert!(delay >= base && delay <= base + jitter, "{delay:?}");
        }
    }

    #[test]
    fn default_settle_window_is_three_to_five_seconds() {
        let options = ChromeOptions::default();
        assert_eq!(options.settle_delay, Duration::from_secs(3));
        assert_eq!(options.settle_delay + options.settle_jitter, Duration::from_secs(5));
    }
}
