//! Per-article author extraction
//!
//! Turns the authors of one article into the non-academic author list and the
//! corresponding email. Email capture does not depend on classification: an
//! academic author's affiliation can supply it.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::affiliation::{AffiliationClassifier, AffiliationKind};
use crate::pubmed::models::{AuthorRecord, NonAcademicAuthor};

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]+").unwrap());

/// Author-level findings for one article
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthorSummary {
    /// Non-academic authors in document order
    pub non_academic_authors: Vec<NonAcademicAuthor>,
    /// First email found across all affiliations
    pub corresponding_email: Option<String>,
}

/// Classify `authors` in order and collect the non-academic ones plus the first email
pub fn extract_authors(
    classifier: &AffiliationClassifier,
    authors: &[AuthorRecord],
) -> AuthorSummary {
    let mut summary = AuthorSummary::default();

    for author in authors {
        if classifier.classify(&author.affiliation) == AffiliationKind::NonAcademic {
            summary.non_academic_authors.push(NonAcademicAuthor {
                name: author.display_name(),
                affiliation: author.affiliation.clone(),
            });
        }

        if summary.corresponding_email.is_none() {
            summary.corresponding_email = extract_email(&author.affiliation).map(str::to_string);
        }
    }

    summary
}

/// First email-like substring of `text`
pub fn extract_email(text: &str) -> Option<&str> {
    EMAIL_RE.find(text).map(|m| m.as_str())
}
