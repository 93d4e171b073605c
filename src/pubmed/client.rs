use crate::affiliation::AffiliationClassifier;
use crate::config::ClientConfig;
use crate::error::{PubMedError, Result};
use crate::pubmed::models::ArticleRecord;
use crate::pubmed::parser::PubMedXmlParser;
use crate::pubmed::responses::ESearchResult;
use crate::rate_limit::RateLimiter;
use crate::retry::with_retry;
use reqwest::Client;
use tracing::{debug, info, instrument, warn};

/// ESearch refuses to page past this many results
const MAX_SEARCH_RESULTS: usize = 9999;

/// Client for the PubMed E-utilities (ESearch + EFetch)
#[derive(Clone)]
pub struct PubMedClient {
    client: Client,
    base_url: String,
    rate_limiter: RateLimiter,
    config: ClientConfig,
    parser: PubMedXmlParser,
}

impl PubMedClient {
    /// Create a new PubMed client with default configuration
    ///
    /// Uses default NCBI rate limiting (3 requests/second) and no API key.
    ///
    /// # Example
    ///
    /// ```
    /// use pubmed_paper_fetcher::PubMedClient;
    ///
    /// let client = PubMedClient::new();
    /// ```
    pub fn new() -> Self {
        Self::with_config(ClientConfig::new())
    }

    /// Create a new PubMed client with custom configuration
    ///
    /// # Example
    ///
    /// ```
    /// use pubmed_paper_fetcher::{ClientConfig, PubMedClient};
    ///
    /// let config = ClientConfig::new()
    ///     .with_api_key("your_api_key_here")
    ///     .with_email("researcher@example.org");
    ///
    /// let client = PubMedClient::with_config(config);
    /// ```
    pub fn with_config(config: ClientConfig) -> Self {
        let rate_limiter = config.create_rate_limiter();
        let base_url = config.effective_base_url().to_string();

        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(config.effective_user_agent())
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            base_url,
            rate_limiter,
            config,
            parser: PubMedXmlParser::default(),
        }
    }

    /// Replace the affiliation classifier used when parsing fetched articles
    pub fn with_classifier(mut self, classifier: AffiliationClassifier) -> Self {
        self.parser = PubMedXmlParser::new(classifier);
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Search PubMed and return up to `limit` PMIDs
    ///
    /// # Errors
    ///
    /// * `PubMedError::SearchLimitExceeded` - If `limit` is above 9999
    /// * `PubMedError::ApiError` - If NCBI answers with an error status or an `ERROR` field
    /// * `PubMedError::JsonError` - If the response is not ESearch JSON
    /// * `PubMedError::UpstreamUnavailable` - If transient failures outlast the retry budget
    ///
    /// # Example
    ///
    /// ```no_run
    /// use pubmed_paper_fetcher::PubMedClient;
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), Box<dyn std::error::Error>> {
    ///     let client = PubMedClient::new();
    ///     let pmids = client.search_articles("cancer immunotherapy", 10).await?;
    ///     println!("Found {} articles", pmids.len());
    ///     Ok(())
    /// }
    /// ```
    #[instrument(skip(self), fields(query = %query, limit = limit))]
    pub async fn search_articles(&self, query: &str, limit: usize) -> Result<Vec<String>> {
        if query.trim().is_empty() {
            debug!("Empty query provided, returning empty results");
            return Ok(Vec::new());
        }

        if limit > MAX_SEARCH_RESULTS {
            return Err(PubMedError::SearchLimitExceeded {
                requested: limit,
                maximum: MAX_SEARCH_RESULTS,
            });
        }

        let url = format!(
            "{}/esearch.fcgi?db=pubmed&term={}&retmax={}&retmode=json",
            self.base_url,
            urlencoding::encode(query),
            limit
        );

        debug!("Making ESearch API request");
        let body = self.make_request(&url).await?;
        let search_result: ESearchResult = serde_json::from_str(&body)?;

        if let Some(error_msg) = &search_result.esearchresult.error {
            warn!(error = %error_msg, "ESearch returned an error");
            return Err(PubMedError::ApiError {
                status: 200,
                message: format!("NCBI ESearch API error: {}", error_msg),
            });
        }

        let pmids = search_result.esearchresult.idlist;
        info!(
            results_found = pmids.len(),
            total_count = search_result.esearchresult.count.as_deref().unwrap_or("0"),
            "Search completed successfully"
        );

        Ok(pmids)
    }

    /// Fetch the EFetch XML document for `pmids` in a single request
    ///
    /// # Errors
    ///
    /// * `PubMedError::InvalidPmid` - If any ID is not a decimal number
    /// * `PubMedError::ApiError` - If NCBI answers with an error status
    /// * `PubMedError::UpstreamUnavailable` - If transient failures outlast the retry budget
    #[instrument(skip(self, pmids), fields(pmids_count = pmids.len()))]
    pub async fn fetch_articles_xml<S: AsRef<str>>(&self, pmids: &[S]) -> Result<String> {
        let pmids: Vec<&str> = pmids.iter().map(|pmid| pmid.as_ref()).collect();
        for pmid in &pmids {
            if pmid.is_empty() || !pmid.chars().all(|c| c.is_ascii_digit()) {
                warn!(pmid = %pmid, "Invalid PMID format provided");
                return Err(PubMedError::InvalidPmid {
                    pmid: pmid.to_string(),
                });
            }
        }

        let url = format!(
            "{}/efetch.fcgi?db=pubmed&id={}&retmode=xml",
            self.base_url,
            pmids.join(",")
        );

        debug!("Making EFetch API request");
        let xml = self.make_request(&url).await?;
        debug!(response_size = xml.len(), "Received EFetch response");

        Ok(xml)
    }

    /// Fetch and parse the articles for `pmids`, in document order
    pub async fn fetch_articles<S: AsRef<str>>(&self, pmids: &[S]) -> Result<Vec<ArticleRecord>> {
        if pmids.is_empty() {
            return Ok(Vec::new());
        }

        let xml = self.fetch_articles_xml(pmids).await?;
        let articles = self.parser.parse_articles(&xml)?;

        info!(articles_parsed = articles.len(), "Fetched articles");
        Ok(articles)
    }

    /// Search with the configured `max_results` and fetch every hit
    ///
    /// A search without hits returns an empty list without calling EFetch.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use pubmed_paper_fetcher::PubMedClient;
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), Box<dyn std::error::Error>> {
    ///     let client = PubMedClient::new();
    ///     for article in client.search_and_fetch("crispr").await? {
    ///         println!("{}: {}", article.pmid, article.author_names_field());
    ///     }
    ///     Ok(())
    /// }
    /// ```
    #[instrument(skip(self), fields(query = %query))]
    pub async fn search_and_fetch(&self, query: &str) -> Result<Vec<ArticleRecord>> {
        let pmids = self.search_articles(query, self.config.max_results).await?;

        if pmids.is_empty() {
            warn!("No papers found for query");
            return Ok(Vec::new());
        }

        self.fetch_articles(&pmids).await
    }

    /// GET `url` with the API parameters appended, under rate limiting and retry
    async fn make_request(&self, url: &str) -> Result<String> {
        let mut full_url = url.to_string();
        for (key, value) in self.config.build_api_params() {
            full_url.push('&');
            full_url.push_str(&key);
            full_url.push('=');
            full_url.push_str(&urlencoding::encode(&value));
        }
        let url = full_url.as_str();

        with_retry(
            || async {
                self.rate_limiter.acquire().await;
                debug!("Making API request to: {url}");
                let response = self.client.get(url).send().await?;

                let status = response.status();
                if !status.is_success() {
                    warn!(status = status.as_u16(), "API request failed");
                    return Err(PubMedError::ApiError {
                        status: status.as_u16(),
                        message: status
                            .canonical_reason()
                            .unwrap_or("Unknown error")
                            .to_string(),
                    });
                }

                Ok(response.text().await?)
            },
            &self.config.retry_config,
            "NCBI API request",
        )
        .await
    }
}

impl Default for PubMedClient {
    fn default() -> Self {
        Self::new()
    }
}
