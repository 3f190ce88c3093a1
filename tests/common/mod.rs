#![allow(dead_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use college_scraper::{
    Fields, HttpClient, HttpError, PersistError, Record, RecordCollection, RenderError, Renderer,
    RendererFactory, RequestOptions, Response, Sink, Site,
};

pub const NAME: &str = "Name";
pub const URL: &str = "URL";

/// Listing pages are lines of `name,detail-url`; detail pages are lines of `field=value`.
pub struct FakeSite;

impl Site for FakeSite {
    fn name(&self) -> String {
        "fake".into()
    }

    fn listing_url(&self, page: u32) -> String {
        format!("fake://listing/{page}")
    }

    fn parse_listing(&self, html: &str) -> Vec<Record> {
        html.lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| {
                let mut record = Record::new();
                let mut parts = line.trim().splitn(2, ',');
                record.set_or_default(NAME, parts.next().map(str::to_string));
                record.set_or_default(URL, parts.next().map(str::to_string));
                record
            })
            .collect()
    }

    fn detail_url_field(&self) -> &str {
        URL
    }

    fn extract_detail(&self, html: &str) -> Fields {
        if html.contains("PANIC") {
            panic!("extractor blew up");
        }
        html.lines()
            .filter_map(|line| line.trim().split_once('='))
            .collect()
    }
}

#[derive(Clone)]
pub enum Page {
    Ok { delay: Duration, body: String },
    Status { delay: Duration, status: u16 },
    Fail { delay: Duration },
}

impl Page {
    pub fn ok(delay_ms: u64, body: &str) -> Self {
        Page::Ok {
            delay: Duration::from_millis(delay_ms),
            body: body.to_string(),
        }
    }
}

#[derive(Default)]
pub struct FakeClient {
    pages: HashMap<String, Page>,
    pub calls: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    pub peak: AtomicUsize,
}

impl FakeClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, page: u32, response: Page) -> Self {
        self.pages.insert(FakeSite.listing_url(page), response);
        self
    }

    pub fn calls_to(&self, url: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|called| called.as_str() == url)
            .count()
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HttpClient for FakeClient {
    async fn get(&self, url: &str, _options: RequestOptions) -> Result<Response, HttpError> {
        self.calls.lock().unwrap().push(url.to_string());
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        let page = self.pages.get(url).cloned().unwrap_or(Page::Ok {
            delay: Duration::from_millis(1),
            body: String::new(),
        });
        let result = match page {
            Page::Ok { delay, body } => {
                tokio::time::sleep(delay).await;
                Ok(Response {
                    status: 200,
                    url: url.to_string(),
                    body,
                })
            }
            Page::Status { delay, status } => {
                tokio::time::sleep(delay).await;
                Ok(Response {
                    status,
                    url: url.to_string(),
                    body: "error page".into(),
                })
            }
            Page::Fail { delay } => {
                tokio::time::sleep(delay).await;
                Err(HttpError::Request {
                    url: url.to_string(),
                    message: "connection reset".into(),
                })
            }
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }

    async fn post(&self, url: &str, options: RequestOptions) -> Result<Response, HttpError> {
        self.get(url, options).await
    }
}

/// Serves detail pages from memory and counts session starts, releases and
/// the most sessions alive at once.
pub struct FakeRenderers {
    pages: HashMap<String, Result<String, ()>>,
    render_delay: Duration,
    pub acquired: AtomicUsize,
    pub released: Arc<AtomicUsize>,
    live: Arc<AtomicUsize>,
    pub peak: Arc<AtomicUsize>,
    pub rendered: Arc<Mutex<Vec<String>>>,
    pub fail_acquire: bool,
}

impl Default for FakeRenderers {
    fn default() -> Self {
        Self {
            pages: HashMap::new(),
            render_delay: Duration::from_millis(2),
            acquired: AtomicUsize::new(0),
            released: Arc::new(AtomicUsize::new(0)),
            live: Arc::new(AtomicUsize::new(0)),
            peak: Arc::new(AtomicUsize::new(0)),
            rendered: Arc::new(Mutex::new(Vec::new())),
            fail_acquire: false,
        }
    }
}

impl FakeRenderers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, url: &str, body: &str) -> Self {
        self.pages.insert(url.to_string(), Ok(body.to_string()));
        self
    }

    pub fn with_broken_page(mut self, url: &str) -> Self {
        self.pages.insert(url.to_string(), Err(()));
        self
    }

    pub fn with_render_delay(mut self, delay: Duration) -> Self {
        self.render_delay = delay;
        self
    }

    pub fn failing_to_start() -> Self {
        Self {
            fail_acquire: true,
            ..Default::default()
        }
    }

    pub fn acquired(&self) -> usize {
        self.acquired.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

pub struct FakeRenderer {
    pages: HashMap<String, Result<String, ()>>,
    delay: Duration,
    released: Arc<AtomicUsize>,
    live: Arc<AtomicUsize>,
    rendered: Arc<Mutex<Vec<String>>>,
}

impl Renderer for FakeRenderer {
    fn render(&mut self, url: &str) -> Result<String, RenderError> {
        self.rendered.lock().unwrap().push(url.to_string());
        std::thread::sleep(self.delay);
        match self.pages.get(url) {
            Some(Ok(body)) => Ok(body.clone()),
            _ => Err(RenderError::Navigation {
                url: url.to_string(),
                message: "net::ERR_CONNECTION_REFUSED".into(),
            }),
        }
    }
}

impl Drop for FakeRenderer {
    fn drop(&mut self) {
        self.live.fetch_sub(1, Ordering::SeqCst);
        self.released.fetch_add(1, Ordering::SeqCst);
    }
}

impl RendererFactory for FakeRenderers {
    type Renderer = FakeRenderer;

    fn acquire(&self) -> Result<FakeRenderer, RenderError> {
        if self.fail_acquire {
            return Err(RenderError::Launch("chromium not found".into()));
        }
        self.acquired.fetch_add(1, Ordering::SeqCst);
        let now = self.live.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        Ok(FakeRenderer {
            pages: self.pages.clone(),
            delay: self.render_delay,
            released: self.released.clone(),
            live: self.live.clone(),
            rendered: self.rendered.clone(),
        })
    }
}

/// Keeps every snapshot in memory.
pub struct MemorySink {
    path: PathBuf,
    pub snapshots: Mutex<Vec<RecordCollection>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self {
            path: PathBuf::from("memory"),
            snapshots: Mutex::new(Vec::new()),
        }
    }

    pub fn snapshots(&self) -> Vec<RecordCollection> {
        self.snapshots.lock().unwrap().clone()
    }
}

impl Sink for MemorySink {
    fn persist(&self, collection: &RecordCollection) -> Result<(), PersistError> {
        self.snapshots.lock().unwrap().push(collection.clone());
        Ok(())
    }

    fn destination(&self) -> &Path {
        &self.path
    }
}
