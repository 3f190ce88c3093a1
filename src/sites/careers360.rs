//! Careers360 college listings (`careers360.com/colleges/india-colleges-fctp`).

use scraper::{ElementRef, Html, Selector};

use crate::record::{Fields, Record};
use crate::site::Site;

const LISTING_URL: &str = "https://www.careers360.com/colleges/india-colleges-fctp";
const DEGREES: &str = "64,2,72,14,6,65,100,101,150,75,168,9,211";
const SORT_BY: &str = "3";

pub const COLLEGE_NAME: &str = "College Name";
pub const LOCATION: &str = "Location";
pub const FEES: &str = "Fees";
pub const RATING: &str = "Rating";
pub const REVIEWS: &str = "Reviews";
pub const NIRF_RANKING: &str = "NIRF Ranking";
pub const COURSES_OFFERED: &str = "Courses Offered";
pub const COLLEGE_URL: &str = "College URL";

pub const COURSE_TITLE: &str = "Course Title";
pub const TOTAL_FEES: &str = "Total Fees";
pub const COURSE_DURATION: &str = "Course Duration";
pub const COURSE_MODE: &str = "Course Mode";
pub const COURSE_DESCRIPTION: &str = "Course Description";
pub const ELIGIBILITY_CRITERIA: &str = "Eligibility Criteria";
pub const SELECTION_PROCESS: &str = "Selection Process";
pub const ENTRANCE_EXAM: &str = "Entrance Exam";
pub const TOTAL_SEATS: &str = "Total Seats";

#[derive(Debug, Clone, Default)]
pub struct Careers360;

impl Careers360 {
    pub fn new() -> Self {
        Self
    }
}

impl Site for Careers360 {
    fn name(&self) -> String {
        "careers360".to_string()
    }

    fn listing_url(&self, page: u32) -> String {
        format!("{LISTING_URL}?page={page}&degree={DEGREES}&sort_by={SORT_BY}")
    }

    fn parse_listing(&self, html: &str) -> Vec<Record> {
        let document = Html::parse_document(html);
        let Ok(card) = Selector::parse("div.card_block") else {
            return Vec::new();
        };
        document.select(&card).map(parse_card).collect()
    }

    fn detail_url_field(&self) -> &str {
        COLLEGE_URL
    }

    fn extract_detail(&self, html: &str) -> Fields {
        let document = Html::parse_document(html);
        let root = document.root_element();
        let mut fields = Fields::new();

        fields.set_or_default(COURSE_TITLE, text_of(root, "h1"));
        fields.set_or_default(TOTAL_FEES, text_of(root, "div.fee"));

        for (label, value) in labelled_values(root, ".course_detail_para div", "p", "span") {
            match label.as_str() {
                "duration" => fields.set(COURSE_DURATION, value),
                "mode" => fields.set(COURSE_MODE, value),
                _ => {}
            }
        }
        fields.set_default(COURSE_DURATION);
        fields.set_default(COURSE_MODE);

        fields.set_or_default(COURSE_DESCRIPTION, text_of(root, ".list_tick_style p"));
        fields.set_or_default(
            ELIGIBILITY_CRITERIA,
            text_of(root, "div#eligiblity div.data_html_blk"),
        );
        fields.set_or_default(
            SELECTION_PROCESS,
            text_of(root, "div#admission_detail div.data_html_blk"),
        );

        for (label, value) in labelled_values(
            root,
            ".quick_facts_table td",
            ".right_upr",
            ".right_btm span",
        ) {
            match label.as_str() {
                "total fees" if !fields.is_populated(TOTAL_FEES) => fields.set(TOTAL_FEES, value),
                "exam" => fields.set(ENTRANCE_EXAM, value),
                "seats" => fields.set(TOTAL_SEATS, value),
                _ => {}
            }
        }
        fields.set_default(ENTRANCE_EXAM);
        fields.set_default(TOTAL_SEATS);

        fields
    }
}

fn parse_card(card: ElementRef<'_>) -> Record {
    let mut record = Record::new();
    record.set_or_default(COLLEGE_NAME, text_of(card, "h3.college_name"));
    record.set_or_default(LOCATION, text_of(card, "span.location"));
    record.set_or_default(FEES, fees_of(card));
    record.set_or_default(RATING, text_of(card, "span.star_text"));
    record.set_or_default(REVIEWS, text_of(card, "span.review_text"));
    record.set_or_default(NIRF_RANKING, text_of(card, "div.ranking_strip"));
    record.set_or_default(COURSES_OFFERED, courses_of(card));
    record.set_or_default(COLLEGE_URL, attr_of(card, "a.general_text", "href"));
    record
}

fn first<'a>(scope: ElementRef<'a>, css: &str) -> Option<ElementRef<'a>> {
    let selector = Selector::parse(css).ok()?;
    scope.select(&selector).next()
}

fn text(element: ElementRef<'_>) -> Option<String> {
    let text = element.text().collect::<String>();
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

fn text_of(scope: ElementRef<'_>, css: &str) -> Option<String> {
    first(scope, css).and_then(text)
}

fn attr_of(scope: ElementRef<'_>, css: &str, attr: &str) -> Option<String> {
    first(scope, css)?
        .value()
        .attr(attr)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

fn fees_of(card: ElementRef<'_>) -> Option<String> {
    let selector = Selector::parse("li").ok()?;
    card.select(&selector)
        .filter_map(text)
        .find(|text| text.contains("Fees :"))
        .map(|text| text.replace("Fees :", "").trim().to_string())
}

fn courses_of(card: ElementRef<'_>) -> Option<String> {
    let selector = Selector::parse("div.snippet_block ul.snippet_list li a").ok()?;
    let courses: Vec<String> = card.select(&selector).filter_map(text).collect();
    (!courses.is_empty()).then(|| courses.join(", "))
}

/// Pairs of (lowercased label, value) read from repeated label/value blocks.
fn labelled_values(
    scope: ElementRef<'_>,
    block_css: &str,
    label_css: &str,
    value_css: &str,
) -> Vec<(String, String)> {
    let Ok(block) = Selector::parse(block_css) else {
        return Vec::new();
    };
    scope
        .select(&block)
        .filter_map(|block| {
            let label = text_of(block, label_css)?;
            let value = text_of(block, value_css)?;
            Some((label.to_lowercase(), value))
        })
        .collect()
}
