pub mod authors;
pub mod client;
pub mod models;
pub mod parser;
pub mod responses;

pub use authors::{AuthorSummary, extract_authors, extract_email};
pub use client::PubMedClient;
pub use models::{ArticleRecord, AuthorRecord, NonAcademicAuthor};
pub use parser::{PubMedXmlParser, parse_articles_from_xml};
