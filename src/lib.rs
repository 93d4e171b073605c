//! # PubMed Paper Fetcher
//!
//! Searches PubMed, fetches the matching articles and reports the papers with
//! at least one author affiliated with a company, hospital or other
//! non-academic body.
//!
//! ## Features
//!
//! - **E-utilities integration**: ESearch for PMIDs, one batched EFetch for details
//! - **Affiliation classification**: keyword based, academic keywords take precedence
//! - **Resilience**: NCBI rate limiting and retry of transient failures
//! - **CSV reports**: atomic writes under `data/`
//!
//! ## Quick Start
//!
//! ```no_run
//! use pubmed_paper_fetcher::{ClientConfig, PubMedClient, ReportWriter};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = PubMedClient::with_config(ClientConfig::new().with_max_results(20));
//!     let articles = client.search_and_fetch("cancer immunotherapy").await?;
//!
//!     for article in &articles {
//!         println!("{}: {}", article.pmid, article.company_affiliations_field());
//!     }
//!
//!     ReportWriter::default().write("papers.csv", &articles)?;
//!     Ok(())
//! }
//! ```
//!
//! ### Parsing an EFetch document
//!
//! ```
//! use pubmed_paper_fetcher::parse_articles_from_xml;
//!
//! let xml = r#"<PubmedArticleSet><PubmedArticle>
//!     <PMID>12345</PMID>
//!     <ArticleTitle>Sample Title</ArticleTitle>
//!     <Author>
//!         <LastName>Doe</LastName><Initials>J</Initials>
//!         <AffiliationInfo><Affiliation>XYZ Biotech Ltd, example@biotech.com</Affiliation></AffiliationInfo>
//!     </Author>
//! </PubmedArticle></PubmedArticleSet>"#;
//!
//! let articles = parse_articles_from_xml(xml)?;
//! assert_eq!(articles[0].author_names_field(), "Doe J");
//! assert_eq!(articles[0].corresponding_email.as_deref(), Some("example@biotech.com"));
//! # Ok::<(), pubmed_paper_fetcher::PubMedError>(())
//! ```

pub mod affiliation;
pub mod config;
pub mod error;
pub mod pubmed;
pub mod rate_limit;
pub mod report;
pub mod retry;

// Re-export main types for convenience
pub use affiliation::{AffiliationClassifier, AffiliationKind};
pub use config::ClientConfig;
pub use error::{PubMedError, Result};
pub use pubmed::{
    ArticleRecord, AuthorRecord, NonAcademicAuthor, PubMedClient, PubMedXmlParser,
    parse_articles_from_xml,
};
pub use report::{ReportWriter, write_records};
pub use retry::RetryConfig;
