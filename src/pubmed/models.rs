use serde::{Deserialize, Serialize};

/// Placeholder written for missing scalar fields and empty author lists
pub const NOT_AVAILABLE: &str = "N/A";

/// Separator between entries of a list-valued report field
pub const LIST_SEPARATOR: &str = "; ";

/// One `<Author>` element as it appears in the EFetch document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorRecord {
    /// `<LastName>` (empty when absent)
    pub last_name: String,
    /// `<Initials>` (empty when absent)
    pub initials: String,
    /// First `<AffiliationInfo>/<Affiliation>` text (empty when absent)
    pub affiliation: String,
}

impl AuthorRecord {
    pub fn new(
        last_name: impl Into<String>,
        initials: impl Into<String>,
        affiliation: impl Into<String>,
    ) -> Self {
        Self {
            last_name: last_name.into(),
            initials: initials.into(),
            affiliation: affiliation.into(),
        }
    }

    /// "LastName Initials", trimmed; empty when both parts are empty
    pub fn display_name(&self) -> String {
        format!("{} {}", self.last_name, self.initials)
            .trim()
            .to_string()
    }
}

/// An author classified as non-academic, with the affiliation that decided it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NonAcademicAuthor {
    pub name: String,
    /// Affiliation text as written in the document (original casing)
    pub affiliation: String,
}

/// Normalized per-article result of parsing an EFetch document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleRecord {
    /// PubMed ID, or "N/A"
    pub pmid: String,
    /// Article title, or "N/A"
    pub title: String,
    /// `<PubDate>/<Year>`, or "N/A"
    pub publication_year: String,
    /// Non-academic authors in document order
    pub non_academic_authors: Vec<NonAcademicAuthor>,
    /// First email found in any author affiliation, in document order
    pub corresponding_email: Option<String>,
}

impl ArticleRecord {
    /// Names of the non-academic authors, in document order
    pub fn author_names(&self) -> Vec<&str> {
        self.non_academic_authors
            .iter()
            .map(|author| author.name.as_str())
            .collect()
    }

    /// Affiliations of the non-academic authors, parallel to [`Self::author_names`]
    pub fn company_affiliations(&self) -> Vec<&str> {
        self.non_academic_authors
            .iter()
            .map(|author| author.affiliation.as_str())
            .collect()
    }

    /// Report cell for the author names: `"; "`-joined, or "N/A" when empty
    pub fn author_names_field(&self) -> String {
        join_or_not_available(&self.author_names())
    }

    /// Report cell for the affiliations: `"; "`-joined, or "N/A" when empty
    pub fn company_affiliations_field(&self) -> String {
        join_or_not_available(&self.company_affiliations())
    }
}

fn join_or_not_available(values: &[&str]) -> String {
    if values.is_empty() {
        NOT_AVAILABLE.to_string()
    } else {
        values.join(LIST_SEPARATOR)
    }
}
