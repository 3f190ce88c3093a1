use std::sync::atomic::Ordering;

use futures::stream::{FuturesOrdered, StreamExt};
use tokio_util::sync::CancellationToken;

use super::{PageRange, Statistics};
use crate::client::{HttpClient, RequestOptions, Response};
use crate::persist::{persist, Sink};
use crate::record::{Record, RecordCollection};
use crate::site::Site;

/// Fetches every page of `pages` at once and appends the parsed records in page order.
///
/// All page futures live in one `FuturesOrdered` polled by the calling task, so
/// the only limit on outstanding requests is the client's permit pool. A page
/// is consumed as soon as it and every page before it have settled.
#[allow(clippy::too_many_arguments)]
pub(crate) async fn fetch_listings<C: HttpClient>(
    site: &dyn Site,
    client: &C,
    pages: PageRange,
    save_interval: usize,
    records: &mut RecordCollection,
    sink: &dyn Sink,
    stats: &Statistics,
    token: &CancellationToken,
) {
    let total = pages.len();
    let mut fetches: FuturesOrdered<_> = pages
        .iter()
        .map(|page| fetch_page(site, client, page, stats))
        .collect();
    let mut consumed = 0;

    loop {
        let next = tokio::select! {
            biased;
            _ = token.cancelled() => {
                tracing::warn!("listing phase interrupted after {} of {} pages", consumed, total);
                break;
            }
            next = fetches.next() => next,
        };
        let Some((page, listed)) = next else {
            break;
        };

        consumed += 1;
        stats.num_listed.fetch_add(listed.len(), Ordering::SeqCst);
        records.extend(listed);

        if consumed % save_interval == 0 || consumed == total {
            stats.record_snapshot(persist(sink, records));
            tracing::info!(
                page,
                records = records.len(),
                "partial data saved after {} of {} listing pages",
                consumed,
                total
            );
        }
    }
}

async fn fetch_page<C: HttpClient>(
    site: &dyn Site,
    client: &C,
    page: u32,
    stats: &Statistics,
) -> (u32, Vec<Record>) {
    let url = site.listing_url(page);
    Statistics::incr(&stats.num_pages);
    let response = client
        .get(&url, RequestOptions::new())
        .await
        .and_then(Response::error_for_status);

    match response {
        Ok(response) => {
            let listed = site.parse_listing(&response.body);
            tracing::debug!(page, records = listed.len(), "listing page parsed");
            (page, listed)
        }
        Err(err) => {
            Statistics::incr(&stats.num_page_errors);
            tracing::error!(page, url = %url, "error fetching page: {}", err);
            (page, Vec::new())
        }
    }
}
