//! CSV report output
//!
//! One row per article, in the order the articles were parsed. The report is
//! written to a temporary file next to the target and renamed into place, so
//! a failed run never leaves a partial report behind.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use csv::{Terminator, WriterBuilder};
use serde::Serialize;
use tempfile::NamedTempFile;
use tracing::{debug, info, instrument};

use crate::error::Result;
use crate::pubmed::models::ArticleRecord;

/// Directory every report is written under
pub const DATA_DIR: &str = "data";

/// Report file name used when none is given
pub const DEFAULT_REPORT_FILE: &str = "papers.csv";

/// Column headers, in output order
pub const HEADER: [&str; 6] = [
    "PubmedID",
    "Title",
    "Publication Date",
    "Non-academic Author(s)",
    "Company Affiliation(s)",
    "Corresponding Email",
];

#[derive(Debug, Serialize)]
struct ReportRow<'a> {
    #[serde(rename = "PubmedID")]
    pmid: &'a str,
    #[serde(rename = "Title")]
    title: &'a str,
    #[serde(rename = "Publication Date")]
    publication_date: &'a str,
    #[serde(rename = "Non-academic Author(s)")]
    non_academic_authors: String,
    #[serde(rename = "Company Affiliation(s)")]
    company_affiliations: String,
    #[serde(rename = "Corresponding Email")]
    corresponding_email: &'a str,
}

impl<'a> From<&'a ArticleRecord> for ReportRow<'a> {
    fn from(record: &'a ArticleRecord) -> Self {
        Self {
            pmid: &record.pmid,
            title: &record.title,
            publication_date: &record.publication_year,
            non_academic_authors: record.author_names_field(),
            company_affiliations: record.company_affiliations_field(),
            // No placeholder here: an absent email is an empty cell
            corresponding_email: record.corresponding_email.as_deref().unwrap_or(""),
        }
    }
}

/// Write the header and one row per record to `writer`
///
/// Fields are quoted only when needed and records end with CRLF.
pub fn write_records<W: Write>(writer: W, records: &[ArticleRecord]) -> Result<()> {
    let mut wtr = WriterBuilder::new()
        .has_headers(false)
        .terminator(Terminator::CRLF)
        .from_writer(writer);

    wtr.write_record(HEADER)?;
    for record in records {
        wtr.serialize(ReportRow::from(record))?;
    }
    wtr.flush()?;

    Ok(())
}

/// Writes reports under a fixed output directory
#[derive(Debug, Clone)]
pub struct ReportWriter {
    output_dir: PathBuf,
}

impl ReportWriter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Target path for `filename`, which may contain subdirectories
    pub fn output_path(&self, filename: &str) -> PathBuf {
        self.output_dir.join(filename)
    }

    /// Write `records` to `filename` under the output directory
    ///
    /// Missing parent directories are created. Returns the final path.
    #[instrument(skip(self, records), fields(records = records.len()))]
    pub fn write(&self, filename: &str, records: &[ArticleRecord]) -> Result<PathBuf> {
        let path = self.output_path(filename);
        let parent = path.parent().unwrap_or(&self.output_dir);
        fs::create_dir_all(parent)?;

        let mut tmp = NamedTempFile::new_in(parent)?;
        debug!(tmp = %tmp.path().display(), "Writing report to temporary file");
        write_records(tmp.as_file_mut(), records)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&path).map_err(|e| e.error)?;

        info!(path = %path.display(), "Report written");
        Ok(path)
    }
}

impl Default for ReportWriter {
    fn default() -> Self {
        Self::new(DATA_DIR)
    }
}
