//! Course catalog data structures.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// The assembled catalog, keyed by CRN.
///
/// A `BTreeMap` keeps every serialization of the same content
/// byte-identical, which the on-disk caches rely on.
pub type Catalog = BTreeMap<String, CourseRecord>;

/// One scheduled course offering (a specific section in a specific term).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CourseRecord {
    /// Course reference number, unique within a term
    pub crn: String,

    /// Subject code (e.g. "CS")
    pub subject_code: String,

    /// Course number within the subject
    pub course_number: String,

    /// Instruction type (lecture, lab, ...)
    pub instruction_type: String,

    /// Instruction method (face to face, online, ...)
    pub instruction_method: String,

    /// Section identifier
    pub section: String,

    /// Course title
    pub course_title: String,

    /// Meeting days and times as shown on the subject page
    pub days_time: String,

    /// Instructor display names, primary instructor first
    pub instructors: Vec<String>,

    /// Credit count, only available from the detail page
    #[serde(default)]
    pub credits: String,

    /// Prerequisite description, only available from the detail page
    #[serde(default)]
    pub prereqs: String,

    /// Instructor rating statistics, present only when enrichment found them
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<Rating>,
}

impl CourseRecord {
    /// Copy cached supplemental fields into the record.
    pub fn apply_extras(&mut self, extras: &CourseExtras) {
        self.credits = extras.credits.clone();
        self.prereqs = extras.prereqs.clone();
    }
}

/// Supplemental fields cached per CRN across runs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CourseExtras {
    pub credits: String,
    pub prereqs: String,
}

/// Aggregate rating statistics for one instructor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Rating {
    pub avg_rating: f64,
    pub avg_difficulty: f64,
    pub num_ratings: u64,
}

/// Link to a course detail page discovered on a subject page.
///
/// Lives for a single traversal step; never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourseRef {
    pub crn: String,
    pub link: String,
}
