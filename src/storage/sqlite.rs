// src/storage/sqlite.rs

//! SQLite catalog sink, used by the optional database-population step.

use std::path::PathBuf;

use async_trait::async_trait;
use rusqlite::{Connection, params};

use crate::error::Result;
use crate::models::Catalog;
use crate::storage::{CatalogSink, WriteSummary};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS courses (
    crn                TEXT PRIMARY KEY,
    subject_code       TEXT NOT NULL,
    course_number      TEXT NOT NULL,
    instruction_type   TEXT NOT NULL,
    instruction_method TEXT NOT NULL,
    section            TEXT NOT NULL,
    course_title       TEXT NOT NULL,
    days_time          TEXT NOT NULL,
    instructors        TEXT NOT NULL,
    credits            TEXT NOT NULL,
    prereqs            TEXT NOT NULL,
    avg_rating         REAL,
    avg_difficulty     REAL,
    num_ratings        INTEGER
);
";

/// Loads the catalog into a SQLite database, upserting by CRN.
pub struct SqliteCatalog {
    path: PathBuf,
}

impl SqliteCatalog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// All rows go in one transaction; a failed load leaves the previous
    /// table contents untouched.
    fn load(&self, catalog: &Catalog) -> Result<usize> {
        let mut conn = Connection::open(&self.path)?;
        conn.execute_batch(SCHEMA)?;

        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT OR REPLACE INTO courses (
                    crn, subject_code, course_number, instruction_type,
                    instruction_method, section, course_title, days_time,
                    instructors, credits, prereqs,
                    avg_rating, avg_difficulty, num_ratings
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
            )?;

            for record in catalog.values() {
                stmt.execute(params![
                    record.crn,
                    record.subject_code,
                    record.course_number,
                    record.instruction_type,
                    record.instruction_method,
                    record.section,
                    record.course_title,
                    record.days_time,
                    record.instructors.join(", "),
                    record.credits,
                    record.prereqs,
                    record.rating.as_ref().map(|r| r.avg_rating),
                    record.rating.as_ref().map(|r| r.avg_difficulty),
                    record.rating.as_ref().map(|r| r.num_ratings as i64),
                ])?;
            }
        }
        tx.commit()?;

        Ok(catalog.len())
    }
}

#[async_trait]
impl CatalogSink for SqliteCatalog {
    async fn write(&self, catalog: &Catalog) -> Result<WriteSummary> {
        let record_count = self.load(catalog)?;
        Ok(WriteSummary {
            record_count,
            location: self.path.display().to_string(),
        })
    }
}
