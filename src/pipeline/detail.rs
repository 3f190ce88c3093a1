use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::Statistics;
use crate::error::RenderError;
use crate::persist::{persist, Sink};
use crate::record::{Record, RecordCollection, NOT_AVAILABLE};
use crate::render::{Renderer, RendererFactory};
use crate::site::Site;

#[derive(Debug)]
enum Outcome {
    Enriched(Record),
    Skipped,
    Failed,
}

/// Renders every record's detail page on a pool of `workers` blocking threads
/// and merges the extracted fields back at the record's index.
///
/// Workers only read their own copy of a record; the calling task is the single
/// writer of `records`. Snapshots are taken by completed count, so completion
/// order does not matter.
#[allow(clippy::too_many_arguments)]
pub(crate) async fn enrich_details<F: RendererFactory>(
    site: Arc<dyn Site>,
    renderers: Arc<F>,
    workers: usize,
    save_interval: usize,
    records: &mut RecordCollection,
    sink: &dyn Sink,
    stats: &Statistics,
    token: &CancellationToken,
) {
    let total = records.len();
    if total == 0 {
        tracing::info!("no records to enrich");
        return;
    }

    let jobs: Vec<(usize, Record)> = records.records().iter().cloned().enumerate().collect();
    let (results_tx, mut results_rx) = mpsc::channel(workers);

    let pool = {
        let stats = stats.clone();
        let token = token.clone();
        tokio::spawn(async move {
            stream::iter(jobs)
                .take_until(token.cancelled_owned())
                .for_each_concurrent(workers, |(index, record)| {
                    let site = site.clone();
                    let renderers = renderers.clone();
                    let results_tx = results_tx.clone();
                    let stats = stats.clone();
                    async move {
                        let outcome = enrich_record(site, renderers, index, record, &stats).await;
                        let _ = results_tx.send((index, outcome)).await;
                    }
                })
                .await;
        })
    };

    let mut completed = 0;
    while let Some((index, outcome)) = results_rx.recv().await {
        completed += 1;
        if let Outcome::Enriched(record) = outcome {
            records.set(index, record);
        }

        if completed % save_interval == 0 || completed == total {
            stats.record_snapshot(persist(sink, records));
            tracing::info!(
                "partial data saved after scraping {} of {} college details",
                completed,
                total
            );
        }
    }

    if let Err(err) = pool.await {
        tracing::error!("detail worker pool failed: {}", err);
    }
    if completed < total {
        tracing::warn!(
            "detail phase stopped after {} of {} records",
            completed,
            total
        );
    }
}

async fn enrich_record<F: RendererFactory>(
    site: Arc<dyn Site>,
    renderers: Arc<F>,
    index: usize,
    mut record: Record,
    stats: &Statistics,
) -> Outcome {
    let url = match record.get(site.detail_url_field()) {
        Some(url) if url != NOT_AVAILABLE => url.to_string(),
        _ => {
            Statistics::incr(&stats.num_detail_skips);
            tracing::debug!(index, "no detail url, skipping");
            return Outcome::Skipped;
        }
    };
    Statistics::incr(&stats.num_detail_attempts);

    let task = {
        let url = url.clone();
        tokio::task::spawn_blocking(move || -> Result<_, RenderError> {
            // dropped on every return path, and while unwinding
            let mut renderer = renderers.acquire()?;
            let html = renderer.render(&url)?;
            Ok(site.extract_detail(&html))
        })
    };

    match task.await {
        Ok(Ok(fields)) => {
            tracing::debug!(index, url = %url, fields = fields.len(), "details extracted");
            record.merge(fields);
            Outcome::Enriched(record)
        }
        Ok(Err(err)) => {
            Statistics::incr(&stats.num_detail_errors);
            tracing::error!(index, url = %url, "error fetching details: {}", err);
            Outcome::Failed
        }
        Err(err) => {
            Statistics::incr(&stats.num_detail_errors);
            tracing::error!(index, url = %url, "detail task aborted: {}", err);
            Outcome::Failed
        }
    }
}
