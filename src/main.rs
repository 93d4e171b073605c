use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use pubmed_paper_fetcher::config::{DEFAULT_MAX_RESULTS, DEFAULT_TOOL};
use pubmed_paper_fetcher::report::DEFAULT_REPORT_FILE;
use pubmed_paper_fetcher::{ClientConfig, PubMedClient, ReportWriter, RetryConfig};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser, Debug)]
#[command(
    name = "get-papers-list",
    version,
    about = "Fetch PubMed papers with non-academic authors and write them to CSV",
    long_about = "Searches PubMed for QUERY, fetches the matching papers and writes those with \
                  at least one company or other non-academic author to data/<FILE>"
)]
struct Cli {
    /// PubMed search query
    query: String,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Output file name, written under data/
    #[arg(short, long, default_value = DEFAULT_REPORT_FILE)]
    file: String,

    /// Maximum number of PMIDs to fetch
    #[arg(long, default_value_t = DEFAULT_MAX_RESULTS)]
    max_results: usize,

    /// API key for NCBI E-utilities (increases rate limit)
    #[arg(long, env = "NCBI_API_KEY")]
    api_key: Option<String>,

    /// Email for NCBI requests (recommended)
    #[arg(long, env = "NCBI_EMAIL")]
    email: Option<String>,

    /// Tool name for NCBI requests
    #[arg(long, env = "NCBI_TOOL", default_value = DEFAULT_TOOL)]
    tool: String,

    /// Network timeout per request, in seconds
    #[arg(long, default_value_t = 10)]
    timeout: u64,

    /// Attempts per remote call before giving up
    #[arg(long, default_value_t = 3)]
    retries: u32,
}

impl Cli {
    fn client_config(&self) -> ClientConfig {
        let mut config = ClientConfig::new()
            .with_tool(&self.tool)
            .with_timeout(Duration::from_secs(self.timeout))
            .with_max_results(self.max_results)
            .with_retry_config(RetryConfig::new().with_max_attempts(self.retries));

        if let Some(api_key) = &self.api_key {
            config = config.with_api_key(api_key);
        }
        if let Some(email) = &self.email {
            config = config.with_email(email);
        }

        config
    }
}

fn init_tracing(debug: bool) {
    let filter = if debug {
        "info,pubmed_paper_fetcher=debug,get_papers_list=debug"
    } else {
        "info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .without_time()
                .with_writer(std::io::stderr),
        )
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();
}

async fn run(cli: &Cli) -> Result<ExitCode> {
    let client = PubMedClient::with_config(cli.client_config());

    let articles = client
        .search_and_fetch(&cli.query)
        .await
        .with_context(|| format!("failed to fetch papers for query {:?}", cli.query))?;

    if articles.is_empty() {
        warn!(query = %cli.query, "No papers found, nothing written");
        return Ok(ExitCode::FAILURE);
    }

    let path = ReportWriter::default()
        .write(&cli.file, &articles)
        .with_context(|| format!("failed to write report {:?}", cli.file))?;

    info!(
        papers = articles.len(),
        path = %path.display(),
        "Saved results"
    );
    Ok(ExitCode::SUCCESS)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    match run(&cli).await {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}
