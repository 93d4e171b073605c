//! Academic vs. non-academic affiliation classification
//!
//! Classification is an ordered two-pass substring scan over the lowercased
//! affiliation text: any academic keyword wins, otherwise any non-academic
//! keyword marks the affiliation as non-academic, otherwise it is treated as
//! academic.

use serde::{Deserialize, Serialize};

/// Keywords that mark an affiliation as academic. Checked first.
pub const ACADEMIC_KEYWORDS: &[&str] = &[
    "university",
    "institute",
    "college",
    "academy",
    "school",
    "lab",
    "research center",
    "department",
    "faculty",
    "center for",
    "school of",
    "national laboratory",
    "polytechnic",
    "higher education",
];

/// Keywords that mark an affiliation as company, hospital or other non-academic body
pub const NON_ACADEMIC_KEYWORDS: &[&str] = &[
    "pharma",
    "inc.",
    "corporation",
    "private ltd",
    "hospital",
    "clinic",
    "biotech",
    "limited",
    "ltd.",
    "corp.",
    "gmbh",
    "pvt",
    "s.a.",
    "llc",
    "co.",
    "foundation",
    "healthcare",
    "medical center",
    "biopharma",
    "research institute",
    "r&d",
    "venture",
];

/// Outcome of classifying one affiliation string
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AffiliationKind {
    Academic,
    NonAcademic,
}

/// Keyword-driven affiliation classifier
///
/// The keyword sets are fixed when the classifier is built; `classify` is a
/// pure function of its input.
///
/// # Example
///
/// ```
/// use pubmed_paper_fetcher::{AffiliationClassifier, AffiliationKind};
///
/// let classifier = AffiliationClassifier::default();
/// assert_eq!(classifier.classify("Harvard University"), AffiliationKind::Academic);
/// assert_eq!(classifier.classify("Big Pharma Inc."), AffiliationKind::NonAcademic);
/// assert_eq!(classifier.classify(""), AffiliationKind::Academic);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AffiliationClassifier {
    academic: Vec<String>,
    non_academic: Vec<String>,
}

impl AffiliationClassifier {
    /// Build a classifier from two keyword sets. Keywords are lowercased.
    pub fn new<A, N>(academic: A, non_academic: N) -> Self
    where
        A: IntoIterator,
        A::Item: AsRef<str>,
        N: IntoIterator,
        N::Item: AsRef<str>,
    {
        Self {
            academic: normalize_keywords(academic),
            non_academic: normalize_keywords(non_academic),
        }
    }

    pub fn classify(&self, affiliation: &str) -> AffiliationKind {
        let text = affiliation.to_lowercase();

        if contains_any(&text, &self.academic) {
            return AffiliationKind::Academic;
        }

        if contains_any(&text, &self.non_academic) {
            return AffiliationKind::NonAcademic;
        }

        AffiliationKind::Academic
    }

    pub fn is_non_academic(&self, affiliation: &str) -> bool {
        self.classify(affiliation) == AffiliationKind::NonAcademic
    }

    pub fn academic_keywords(&self) -> &[String] {
        &self.academic
    }

    pub fn non_academic_keywords(&self) -> &[String] {
        &self.non_academic
    }
}

impl Default for AffiliationClassifier {
    fn default() -> Self {
        Self::new(ACADEMIC_KEYWORDS, NON_ACADEMIC_KEYWORDS)
    }
}

fn normalize_keywords<I>(keywords: I) -> Vec<String>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    keywords
        .into_iter()
        .map(|keyword| keyword.as_ref().to_lowercase())
        .filter(|keyword| !keyword.is_empty())
        .collect()
}

fn contains_any(text: &str, keywords: &[String]) -> bool {
    keywords.iter().any(|keyword| text.contains(keyword.as_str()))
}
