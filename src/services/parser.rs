// src/services/parser.rs

//! Subject and detail page parsing.
//!
//! Field extraction is selector-driven: the CSS selectors live in the
//! `[selectors]` configuration table, so a portal markup change is a
//! config edit rather than a code change.

use scraper::{ElementRef, Html, Selector};

use crate::error::{AppError, Result};
use crate::models::{Catalog, CourseExtras, CourseRecord, CourseRef, SelectorConfig};

/// Extract the hrefs of all anchors whose href starts with `prefix`, in
/// document order.
pub fn extract_prefixed_links(html: &str, prefix: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let Ok(anchor) = Selector::parse("a") else {
        return Vec::new();
    };
    document
        .select(&anchor)
        .filter_map(|a| a.value().attr("href"))
        .filter(|href| href.starts_with(prefix))
        .map(str::to_string)
        .collect()
}

/// Parses subject and course-detail pages into catalog records.
pub trait PageParser: Send + Sync {
    /// Parse a subject page: insert one summary record per course row into
    /// `catalog` and return the detail-page references in row order.
    fn parse_subject_page(&self, html: &str, catalog: &mut Catalog) -> Result<Vec<CourseRef>>;

    /// Parse a course detail page into its supplemental fields.
    fn parse_course_page(&self, html: &str, crn: &str) -> Result<CourseExtras>;
}

/// Selector-driven [`PageParser`] implementation.
pub struct SelectorParser {
    course_row: Selector,
    crn_link: Selector,
    subject_code: Selector,
    course_number: Selector,
    instruction_type: Selector,
    instruction_method: Selector,
    section: Selector,
    title: Selector,
    days_time: Selector,
    instructor: Selector,
    detail_row: Selector,
    detail_cell: Selector,
    credits_label: String,
    prereqs_label: String,
}

impl SelectorParser {
    /// Compile the configured selectors.
    pub fn new(config: &SelectorConfig) -> Result<Self> {
        Ok(Self {
            course_row: Self::parse_selector(&config.course_row)?,
            crn_link: Self::parse_selector(&config.crn_link)?,
            subject_code: Self::parse_selector(&config.subject_code)?,
            course_number: Self::parse_selector(&config.course_number)?,
            instruction_type: Self::parse_selector(&config.instruction_type)?,
            instruction_method: Self::parse_selector(&config.instruction_method)?,
            section: Self::parse_selector(&config.section)?,
            title: Self::parse_selector(&config.title)?,
            days_time: Self::parse_selector(&config.days_time)?,
            instructor: Self::parse_selector(&config.instructor)?,
            detail_row: Self::parse_selector(&config.detail_row)?,
            detail_cell: Self::parse_selector(&config.detail_cell)?,
            credits_label: config.credits_label.clone(),
            prereqs_label: config.prereqs_label.clone(),
        })
    }

    fn parse_selector(s: &str) -> Result<Selector> {
        Selector::parse(s).map_err(|e| AppError::selector(s, format!("{e:?}")))
    }

    /// Text of the first element matching `selector` within `row`, with
    /// whitespace normalized; empty when there is no match.
    fn cell_text(row: &ElementRef, selector: &Selector) -> String {
        row.select(selector)
            .next()
            .map(|el| normalize_whitespace(&el.text().collect::<String>()))
            .unwrap_or_default()
    }
}

fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

impl PageParser for SelectorParser {
    fn parse_subject_page(&self, html: &str, catalog: &mut Catalog) -> Result<Vec<CourseRef>> {
        let document = Html::parse_document(html);
        let mut refs = Vec::new();

        for row in document.select(&self.course_row) {
            let link = row
                .select(&self.crn_link)
                .next()
                .ok_or_else(|| AppError::parse("course row has no CRN link"))?;

            let crn = normalize_whitespace(&link.text().collect::<String>());
            if crn.is_empty() {
                return Err(AppError::parse("course row has an empty CRN"));
            }
            let href = link
                .value()
                .attr("href")
                .ok_or_else(|| AppError::parse(format!("CRN {crn} link has no href")))?;

            let instructors = Self::cell_text(&row, &self.instructor)
                .split(',')
                .map(|name| name.trim().to_string())
                .filter(|name| !name.is_empty())
                .collect();

            let record = CourseRecord {
                crn: crn.clone(),
                subject_code: Self::cell_text(&row, &self.subject_code),
                course_number: Self::cell_text(&row, &self.course_number),
                instruction_type: Self::cell_text(&row, &self.instruction_type),
                instruction_method: Self::cell_text(&row, &self.instruction_method),
                section: Self::cell_text(&row, &self.section),
                course_title: Self::cell_text(&row, &self.title),
                days_time: Self::cell_text(&row, &self.days_time),
                instructors,
                credits: String::new(),
                prereqs: String::new(),
                rating: None,
            };

            catalog.insert(crn.clone(), record);
            refs.push(CourseRef {
                crn,
                link: href.to_string(),
            });
        }

        Ok(refs)
    }

    fn parse_course_page(&self, html: &str, crn: &str) -> Result<CourseExtras> {
        let document = Html::parse_document(html);
        let mut credits = None;
        let mut prereqs = None;

        for row in document.select(&self.detail_row) {
            let mut cells = row.select(&self.detail_cell);
            let (Some(label), Some(value)) = (cells.next(), cells.next()) else {
                continue;
            };
            let label = normalize_whitespace(&label.text().collect::<String>());
            let value = normalize_whitespace(&value.text().collect::<String>());

            if label == self.credits_label {
                credits = Some(value);
            } else if label == self.prereqs_label {
                prereqs = Some(value);
            }
        }

        let credits = credits.ok_or_else(|| {
            AppError::parse(format!(
                "detail page for CRN {crn} has no '{}' row",
                self.credits_label
            ))
        })?;

        Ok(CourseExtras {
            credits,
            prereqs: prereqs.unwrap_or_default(),
        })
    }
}
