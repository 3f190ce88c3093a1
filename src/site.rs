use crate::record::{Fields, Record};

/// The site-specific half of a scrape: where listing pages live and how to read
/// listing and detail pages.
///
/// Parsing is total. A missing element becomes [`NOT_AVAILABLE`](crate::record::NOT_AVAILABLE)
/// for that field instead of an error.
pub trait Site: Send + Sync {
    fn name(&self) -> String;
    fn listing_url(&self, page: u32) -> String;
    fn parse_listing(&self, html: &str) -> Vec<Record>;
    /// Field of a listing record holding its detail page URL.
    fn detail_url_field(&self) -> &str;
    fn extract_detail(&self, html: &str) -> Fields;
}
