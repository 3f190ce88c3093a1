mod detail;
mod listing;
mod statistics;

use std::future::Future;
use std::ops::RangeInclusive;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::client::{HttpClient, LimitedClient};
use crate::error::SetupError;
use crate::persist::{persist, Sink};
use crate::record::RecordCollection;
use crate::render::RendererFactory;
use crate::site::Site;

pub use statistics::{Statistics, StatisticsSnapshot};

/// Inclusive range of listing pages, starting at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRange {
    start: u32,
    end: u32,
}

impl PageRange {
    pub fn new(start: u32, end: u32) -> Result<Self, SetupError> {
        if start == 0 || start > end {
            return Err(SetupError::PageRange { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> u32 {
        self.start
    }

    pub fn end(&self) -> u32 {
        self.end
    }

    pub fn iter(&self) -> RangeInclusive<u32> {
        self.start..=self.end
    }

    /// Number of pages; never zero.
    pub(crate) fn len(&self) -> usize {
        (self.end - self.start) as usize + 1
    }
}

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub pages: PageRange,
    /// Outstanding listing requests; `None` or `Some(0)` means unlimited.
    pub max_concurrency: Option<usize>,
    pub detail_workers: usize,
    pub listing_save_interval: usize,
    pub detail_save_interval: usize,
    pub skip_details: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            pages: PageRange { start: 1, end: 5 },
            max_concurrency: Some(5),
            detail_workers: 6,
            listing_save_interval: 5,
            detail_save_interval: 10,
            skip_details: false,
        }
    }
}

impl PipelineOptions {
    pub fn new(pages: PageRange) -> Self {
        Self {
            pages,
            ..Default::default()
        }
    }

    pub fn with_max_concurrency(mut self, max_concurrency: Option<usize>) -> Self {
        self.max_concurrency = max_concurrency;
        self
    }

    pub fn with_detail_workers(mut self, workers: usize) -> Self {
        self.detail_workers = workers;
        self
    }

    pub fn with_listing_save_interval(mut self, interval: usize) -> Self {
        self.listing_save_interval = interval;
        self
    }

    pub fn with_detail_save_interval(mut self, interval: usize) -> Self {
        self.detail_save_interval = interval;
        self
    }

    pub fn with_skip_details(mut self, skip: bool) -> Self {
        self.skip_details = skip;
        self
    }

    /// A zero save interval is rejected rather than silently reinterpreted.
    pub fn validate(&self) -> Result<(), SetupError> {
        if self.listing_save_interval == 0 {
            return Err(SetupError::Zero("listing save interval"));
        }
        if self.detail_save_interval == 0 {
            return Err(SetupError::Zero("detail save interval"));
        }
        if self.detail_workers == 0 {
            return Err(SetupError::Zero("detail workers"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Phase {
    Idle,
    Listing,
    Detail,
    Done,
}

/// Where a run persists to: `partial` receives the periodic snapshots, `output`
/// the final result.
pub struct Sinks<'a> {
    pub partial: &'a dyn Sink,
    pub output: &'a dyn Sink,
}

#[derive(Debug)]
pub struct RunReport {
    pub records: RecordCollection,
    pub statistics: StatisticsSnapshot,
    pub running_time: Duration,
    pub phase: Phase,
    pub interrupted: bool,
}

pub struct Pipeline {
    options: PipelineOptions,
    phase: Phase,
}

impl Pipeline {
    pub fn new(options: PipelineOptions) -> Result<Self, SetupError> {
        options.validate()?;
        Ok(Self {
            options,
            phase: Phase::Idle,
        })
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    fn advance(&mut self, next: Phase) {
        debug_assert!(next > self.phase, "pipeline phases only move forward");
        tracing::info!("pipeline: {:?} -> {:?}", self.phase, next);
        self.phase = next;
    }

    /// Runs listing, then details, then writes the final output.
    ///
    /// When `shutdown` resolves, pending listing pages are abandoned, no new
    /// records are dispatched to the detail workers (records already rendering
    /// finish), and the final output is still written.
    pub async fn run<C, F, S>(
        mut self,
        site: Arc<dyn Site>,
        client: C,
        renderers: Arc<F>,
        sinks: Sinks<'_>,
        shutdown: S,
    ) -> RunReport
    where
        C: HttpClient,
        F: RendererFactory,
        S: Future + Send + 'static,
        S::Output: Send,
    {
        tracing::info!("running site '{}'", site.name());
        let starting_time = Instant::now();
        let stats = Statistics::default();
        let mut records = RecordCollection::new();

        let token = CancellationToken::new();
        let finished = CancellationToken::new();
        let tracker = TaskTracker::new();
        {
            let token = token.clone();
            let finished = finished.clone();
            tracker.spawn(async move {
                tokio::select! {
                    _ = shutdown => {
                        tracing::warn!("shutdown requested, finishing in-flight work");
                        token.cancel();
                    }
                    _ = finished.cancelled() => {}
                }
            });
        }
        tracker.close();

        let client = LimitedClient::new(client, self.options.max_concurrency);

        self.advance(Phase::Listing);
        listing::fetch_listings(
            site.as_ref(),
            &client,
            self.options.pages,
            self.options.listing_save_interval,
            &mut records,
            sinks.partial,
            &stats,
            &token,
        )
        .await;
        tracing::info!(records = records.len(), "listing phase complete");

        self.advance(Phase::Detail);
        if self.options.skip_details {
            tracing::info!("detail phase skipped");
        } else if !token.is_cancelled() {
            detail::enrich_details(
                site.clone(),
                renderers,
                self.options.detail_workers,
                self.options.detail_save_interval,
                &mut records,
                sinks.partial,
                &stats,
                &token,
            )
            .await;
        }

        let written = persist(sinks.output, &records);
        stats.record_snapshot(written);
        if written {
            tracing::info!(
                "final data saved to '{}'",
                sinks.output.destination().display()
            );
        }

        let interrupted = token.is_cancelled();
        finished.cancel();
        tracker.wait().await;

        self.advance(Phase::Done);
        let running_time = starting_time.elapsed();
        stats.write_to_log(running_time);

        RunReport {
            records,
            statistics: stats.snapshot(),
            running_time,
            phase: self.phase,
            interrupted,
        }
    }
}
