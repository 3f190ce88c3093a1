use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

#[derive(Debug, Clone)]
pub struct Statistics {
    pub num_pages: Arc<AtomicUsize>,
    pub num_page_errors: Arc<AtomicUsize>,
    pub num_listed: Arc<AtomicUsize>,
    pub num_detail_attempts: Arc<AtomicUsize>,
    pub num_detail_errors: Arc<AtomicUsize>,
    pub num_detail_skips: Arc<AtomicUsize>,
    pub num_snapshots: Arc<AtomicUsize>,
    pub num_snapshot_errors: Arc<AtomicUsize>,
}

/// Plain copy of the counters at one point in time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct StatisticsSnapshot {
    pub num_pages: usize,
    pub num_page_errors: usize,
    pub num_listed: usize,
    pub num_detail_attempts: usize,
    pub num_detail_errors: usize,
    pub num_detail_skips: usize,
    pub num_snapshots: usize,
    pub num_snapshot_errors: usize,
}

impl Default for Statistics {
    fn default() -> Self {
        Self {
            num_pages: Arc::new(AtomicUsize::new(0)),
            num_page_errors: Arc::new(AtomicUsize::new(0)),
            num_listed: Arc::new(AtomicUsize::new(0)),
            num_detail_attempts: Arc::new(AtomicUsize::new(0)),
            num_detail_errors: Arc::new(AtomicUsize::new(0)),
            num_detail_skips: Arc::new(AtomicUsize::new(0)),
            num_snapshots: Arc::new(AtomicUsize::new(0)),
            num_snapshot_errors: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl Statistics {
    pub(crate) fn incr(counter: &AtomicUsize) {
        counter.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn record_snapshot(&self, written: bool) {
        if written {
            Self::incr(&self.num_snapshots);
        } else {
            Self::incr(&self.num_snapshot_errors);
        }
    }

    pub fn snapshot(&self) -> StatisticsSnapshot {
        StatisticsSnapshot {
            num_pages: self.num_pages.load(Ordering::Relaxed),
            num_page_errors: self.num_page_errors.load(Ordering::Relaxed),
            num_listed: self.num_listed.load(Ordering::Relaxed),
            num_detail_attempts: self.num_detail_attempts.load(Ordering::Relaxed),
            num_detail_errors: self.num_detail_errors.load(Ordering::Relaxed),
            num_detail_skips: self.num_detail_skips.load(Ordering::Relaxed),
            num_snapshots: self.num_snapshots.load(Ordering::Relaxed),
            num_snapshot_errors: self.num_snapshot_errors.load(Ordering::Relaxed),
        }
    }

    pub fn write_to_log(&self, running_time: Duration) {
        let stats = self.snapshot();
        tracing::info!(
            num_pages = stats.num_pages,
            num_page_errors = stats.num_page_errors,
            num_listed = stats.num_listed,
            num_detail_attempts = stats.num_detail_attempts,
            num_detail_errors = stats.num_detail_errors,
            num_detail_skips = stats.num_detail_skips,
            num_snapshots = stats.num_snapshots,
            num_snapshot_errors = stats.num_snapshot_errors,
            running_time = ?running_time,
            "statistics"
        );
    }
}
