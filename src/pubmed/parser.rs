use crate::affiliation::AffiliationClassifier;
use crate::error::{PubMedError, Result};
use crate::pubmed::authors::extract_authors;
use crate::pubmed::models::{ArticleRecord, AuthorRecord, NOT_AVAILABLE};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use std::io::BufReader;
use tracing::{debug, instrument};

/// Parser for EFetch `PubmedArticleSet` documents
///
/// Produces one [`ArticleRecord`] per `<PubmedArticle>`, in document order.
#[derive(Debug, Clone, Default)]
pub struct PubMedXmlParser {
    classifier: AffiliationClassifier,
}

impl PubMedXmlParser {
    pub fn new(classifier: AffiliationClassifier) -> Self {
        Self { classifier }
    }

    pub fn classifier(&self) -> &AffiliationClassifier {
        &self.classifier
    }

    /// Parse every article of an EFetch XML response
    ///
    /// # Errors
    ///
    /// * `PubMedError::XmlParseError` - If the document is not well-formed
    #[instrument(skip_all, fields(xml_size = xml.len()))]
    pub fn parse_articles(&self, xml: &str) -> Result<Vec<ArticleRecord>> {
        let mut reader = Reader::from_reader(BufReader::new(xml.as_bytes()));
        let mut state = DocumentState::default();
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(ref e)) => {
                    check_attributes(e)?;
                    state.start(e.name().as_ref())?;
                }
                Ok(Event::Empty(ref e)) => {
                    check_attributes(e)?;
                    state.start(e.name().as_ref())?;
                    state.end(e.name().as_ref(), &self.classifier);
                }
                Ok(Event::End(ref e)) => state.end(e.name().as_ref(), &self.classifier),
                Ok(Event::Text(ref e)) => {
                    if state.stack.is_empty() && !e.iter().all(u8::is_ascii_whitespace) {
                        return Err(xml_error("text outside the root element"));
                    }
                    // Entities are checked everywhere, not only in captured fields
                    let text = e
                        .unescape()
                        .map_err(|err| xml_error(format!("Failed to decode XML text: {}", err)))?;
                    if state.is_capturing() {
                        state.text(&text);
                    }
                }
                Ok(Event::CData(ref e)) => {
                    if state.is_capturing() {
                        state.text(&String::from_utf8_lossy(e));
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(xml_error(format!(
                        "XML parsing error at position {}: {}",
                        reader.buffer_position(),
                        e
                    )));
                }
                _ => {}
            }
            buf.clear();
        }

        if let Some(open) = state.stack.last() {
            return Err(xml_error(format!(
                "unexpected end of document inside <{}>",
                String::from_utf8_lossy(open)
            )));
        }
        if !state.root_seen {
            return Err(xml_error("document has no root element"));
        }

        debug!(articles = state.articles.len(), "Completed XML parsing");
        Ok(state.articles)
    }
}

/// Parse an EFetch response with the default keyword sets
pub fn parse_articles_from_xml(xml: &str) -> Result<Vec<ArticleRecord>> {
    PubMedXmlParser::default().parse_articles(xml)
}

/// Reject malformed attributes (unquoted, duplicated, bad entities)
fn check_attributes(e: &BytesStart) -> Result<()> {
    for attr in e.attributes() {
        let attr = attr.map_err(|err| xml_error(format!("Malformed attribute: {}", err)))?;
        attr.unescape_value()
            .map_err(|err| xml_error(format!("Failed to decode attribute value: {}", err)))?;
    }
    Ok(())
}

fn xml_error(message: impl Into<String>) -> PubMedError {
    PubMedError::XmlParseError {
        message: message.into(),
    }
}

#[derive(Default)]
struct DocumentState {
    stack: Vec<Vec<u8>>,
    root_seen: bool,
    article: Option<ArticleState>,
    articles: Vec<ArticleRecord>,
}

impl DocumentState {
    fn start(&mut self, name: &[u8]) -> Result<()> {
        if self.stack.is_empty() {
            if self.root_seen {
                return Err(xml_error("more than one root element"));
            }
            self.root_seen = true;
        }

        let depth = self.stack.len();
        let parent = self.stack.last().map(Vec::as_slice).unwrap_or_default();

        match self.article.as_mut() {
            Some(article) => article.start_element(name, parent, depth),
            // Articles are looked up below the root only
            None if name == b"PubmedArticle" && depth > 0 => {
                self.article = Some(ArticleState::new(depth))
            }
            None => {}
        }

        self.stack.push(name.to_vec());
        Ok(())
    }

    fn end(&mut self, name: &[u8], classifier: &AffiliationClassifier) {
        self.stack.pop();
        let depth = self.stack.len();

        let finished = match self.article.as_mut() {
            Some(article) if article.depth == depth => true,
            Some(article) => {
                article.end_element(name, depth);
                false
            }
            None => false,
        };

        if finished {
            if let Some(article) = self.article.take() {
                let record = article.finish(classifier);
                debug!(
                    pmid = %record.pmid,
                    title = %record.title,
                    publication_year = %record.publication_year,
                    non_academic_authors = %record.author_names_field(),
                    company_affiliations = %record.company_affiliations_field(),
                    corresponding_email = record.corresponding_email.as_deref().unwrap_or(NOT_AVAILABLE),
                    "Parsed article"
                );
                self.articles.push(record);
            }
        }
    }

    fn is_capturing(&self) -> bool {
        self.article
            .as_ref()
            .is_some_and(|article| article.capture.is_some())
    }

    fn text(&mut self, text: &str) {
        if let Some(article) = self.article.as_mut() {
            article.push_text(text);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Pmid,
    Title,
    Year,
    LastName,
    Initials,
    Affiliation,
}

#[derive(Default)]
struct AuthorState {
    depth: usize,
    last_name: Option<String>,
    initials: Option<String>,
    affiliation: Option<String>,
}

impl AuthorState {
    fn into_record(self) -> AuthorRecord {
        AuthorRecord {
            last_name: trimmed(self.last_name),
            initials: trimmed(self.initials),
            // Kept as written, whitespace included
            affiliation: self.affiliation.unwrap_or_default(),
        }
    }
}

/// Accumulates one `<PubmedArticle>`. Every field keeps the text of the
/// first matching element only.
struct ArticleState {
    depth: usize,
    pmid: Option<String>,
    title: Option<String>,
    year: Option<String>,
    authors: Vec<AuthorRecord>,
    author: Option<AuthorState>,
    /// Field being captured and the depth of the element that opened it
    capture: Option<(Field, usize)>,
}

impl ArticleState {
    fn new(depth: usize) -> Self {
        Self {
            depth,
            pmid: None,
            title: None,
            year: None,
            authors: Vec::new(),
            author: None,
            capture: None,
        }
    }

    fn start_element(&mut self, name: &[u8], parent: &[u8], depth: usize) {
        // Markup nested in a captured field only contributes its text
        if self.capture.is_some() {
            return;
        }

        match name {
            b"PMID" if self.pmid.is_none() => self.begin(Field::Pmid, depth),
            b"ArticleTitle" if self.title.is_none() => self.begin(Field::Title, depth),
            b"Year" if parent == b"PubDate" && self.year.is_none() => {
                self.begin(Field::Year, depth)
            }
            b"Author" if self.author.is_none() => {
                self.author = Some(AuthorState {
                    depth,
                    ..AuthorState::default()
                });
            }
            b"LastName" if parent == b"Author" => self.begin(Field::LastName, depth),
            b"Initials" if parent == b"Author" => self.begin(Field::Initials, depth),
            b"Affiliation" if parent == b"AffiliationInfo" => {
                self.begin(Field::Affiliation, depth)
            }
            _ => {}
        }
    }

    fn end_element(&mut self, name: &[u8], depth: usize) {
        if self.capture.is_some_and(|(_, open_depth)| open_depth == depth) {
            self.capture = None;
        }

        if name == b"Author" {
            if let Some(author) = self.author.take_if(|author| author.depth == depth) {
                self.authors.push(author.into_record());
            }
        }
    }

    /// Start capturing `field` unless it already holds a value
    fn begin(&mut self, field: Field, depth: usize) {
        if let Some(slot) = self.slot(field) {
            if slot.is_none() {
                *slot = Some(String::new());
                self.capture = Some((field, depth));
            }
        }
    }

    fn push_text(&mut self, text: &str) {
        if let Some((field, _)) = self.capture {
            if let Some(Some(value)) = self.slot(field) {
                value.push_str(text);
            }
        }
    }

    fn slot(&mut self, field: Field) -> Option<&mut Option<String>> {
        match field {
            Field::Pmid => Some(&mut self.pmid),
            Field::Title => Some(&mut self.title),
            Field::Year => Some(&mut self.year),
            Field::LastName => self.author.as_mut().map(|author| &mut author.last_name),
            Field::Initials => self.author.as_mut().map(|author| &mut author.initials),
            Field::Affiliation => self.author.as_mut().map(|author| &mut author.affiliation),
        }
    }

    fn finish(self, classifier: &AffiliationClassifier) -> ArticleRecord {
        let summary = extract_authors(classifier, &self.authors);

        ArticleRecord {
            pmid: or_not_available(self.pmid),
            title: or_not_available(self.title),
            publication_year: or_not_available(self.year),
            non_academic_authors: summary.non_academic_authors,
            corresponding_email: summary.corresponding_email,
        }
    }
}

fn trimmed(value: Option<String>) -> String {
    value.map(|v| v.trim().to_string()).unwrap_or_default()
}

/// Absent, empty and whitespace-only values all collapse to "N/A"
fn or_not_available(value: Option<String>) -> String {
    let value = trimmed(value);
    if value.is_empty() {
        NOT_AVAILABLE.to_string()
    } else {
        value
    }
}
