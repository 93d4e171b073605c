//! Search/fetch pipeline against a mocked E-utilities server
//!
//! Uses wiremock to simulate ESearch and EFetch, including transient and
//! permanent failures.

mod common;

use common::{
    create_mock_client, create_mock_client_with_retry, esearch_body, load_fixture,
};
use pubmed_paper_fetcher::retry::RetryableError;
use pubmed_paper_fetcher::{ClientConfig, PubMedClient, PubMedError, RetryConfig};
use rstest::rstest;
use std::net::TcpListener;
use std::time::Duration;
use tracing_test::traced_test;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mount_esearch(mock_server: &MockServer, ids: &[&str]) {
    Mock::given(method("GET"))
        .and(path("/esearch.fcgi"))
        .respond_with(ResponseTemplate::new(200).set_body_string(esearch_body(ids)))
        .mount(mock_server)
        .await;
}

async fn mount_efetch(mock_server: &MockServer, fixture: &str) {
    Mock::given(method("GET"))
        .and(path("/efetch.fcgi"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(load_fixture(fixture))
                .insert_header("content-type", "application/xml"),
        )
        .mount(mock_server)
        .await;
}

#[tokio::test]
#[traced_test]
async fn test_search_and_fetch_pipeline() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/esearch.fcgi"))
        .and(query_param("db", "pubmed"))
        .and(query_param("term", "breast cancer"))
        .and(query_param("retmax", "10"))
        .and(query_param("retmode", "json"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(esearch_body(&["38000001", "38000002"])),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/efetch.fcgi"))
        .and(query_param("db", "pubmed"))
        .and(query_param("id", "38000001,38000002"))
        .and(query_param("retmode", "xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(load_fixture("mixed_batch")))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = create_mock_client(&mock_server.uri());
    let articles = client.search_and_fetch("breast cancer").await.unwrap();

    assert_eq!(articles.len(), 2);
    assert_eq!(articles[0].pmid, "38000001");
    assert_eq!(articles[1].pmid, "38000002");
    assert_eq!(articles[1].author_names_field(), "Singh R");
}

#[tokio::test]
#[traced_test]
async fn test_no_hits_skips_efetch() {
    let mock_server = MockServer::start().await;
    mount_esearch(&mock_server, &[]).await;

    Mock::given(method("GET"))
        .and(path("/efetch.fcgi"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let client = create_mock_client(&mock_server.uri());
    let articles = client.search_and_fetch("no such topic").await.unwrap();

    assert!(articles.is_empty());
    let received_requests = mock_server.received_requests().await.unwrap();
    assert_eq!(received_requests.len(), 1);
    assert_eq!(received_requests[0].url.path(), "/esearch.fcgi");
}

#[tokio::test]
async fn test_max_results_is_sent_as_retmax() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/esearch.fcgi"))
        .and(query_param("retmax", "25"))
        .respond_with(ResponseTemplate::new(200).set_body_string(esearch_body(&["1"])))
        .expect(1)
        .mount(&mock_server)
        .await;
    mount_efetch(&mock_server, "biotech_author").await;

    let config = ClientConfig::new()
        .with_base_url(mock_server.uri())
        .with_rate_limit(100.0)
        .with_max_results(25);
    let client = PubMedClient::with_config(config);

    let articles = client.search_and_fetch("biotech").await.unwrap();
    assert_eq!(articles.len(), 1);
}

#[tokio::test]
#[traced_test]
async fn test_transient_failures_are_retried() {
    let mock_server = MockServer::start().await;
    mount_esearch(&mock_server, &["123456"]).await;

    Mock::given(method("GET"))
        .and(path("/efetch.fcgi"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .mount(&mock_server)
        .await;
    mount_efetch(&mock_server, "biotech_author").await;

    let client = create_mock_client(&mock_server.uri());
    let articles = client.search_and_fetch("biotech").await.unwrap();

    assert_eq!(articles.len(), 1);
    assert_eq!(articles[0].author_names_field(), "Doe J");

    let efetch_calls = mock_server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|request| request.url.path() == "/efetch.fcgi")
        .count();
    assert_eq!(efetch_calls, 3);
}

#[rstest]
#[case(500)]
#[case(502)]
#[case(429)]
#[tokio::test]
async fn test_retry_exhaustion_is_upstream_unavailable(#[case] status: u16) {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/esearch.fcgi"))
        .respond_with(ResponseTemplate::new(status))
        .expect(3)
        .mount(&mock_server)
        .await;

    let client = create_mock_client(&mock_server.uri());
    let result = client.search_articles("cancer", 10).await;

    match result {
        Err(PubMedError::UpstreamUnavailable { attempts, source }) => {
            assert_eq!(attempts, 3);
            assert!(matches!(*source, PubMedError::ApiError { status: s, .. } if s == status));
        }
        other => panic!("expected UpstreamUnavailable, got {:?}", other),
    }
    assert_eq!(mock_server.received_requests().await.unwrap().len(), 3);
}

/// Address of a local port nothing listens on
fn refused_base_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("http://127.0.0.1:{}", port)
}

#[tokio::test]
#[traced_test]
async fn test_connection_refused_is_retried_then_unavailable() {
    let client = create_mock_client(&refused_base_url());

    let result = client.search_articles("cancer", 10).await;

    match result {
        Err(PubMedError::UpstreamUnavailable { attempts, source }) => {
            assert_eq!(attempts, 3);
            match *source {
                PubMedError::RequestError(ref err) => assert!(err.is_connect()),
                ref other => panic!("expected RequestError, got {:?}", other),
            }
            assert_eq!(source.retry_reason(), "Connection error");
        }
        other => panic!("expected UpstreamUnavailable, got {:?}", other),
    }
}

fn timeout_client(base_url: &str) -> PubMedClient {
    let config = ClientConfig::new()
        .with_base_url(base_url)
        .with_rate_limit(100.0)
        .with_timeout(Duration::from_millis(200));
    PubMedClient::with_config(config)
}

#[tokio::test]
#[traced_test]
async fn test_timeout_is_retried_then_succeeds() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/esearch.fcgi"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(esearch_body(&["123456"]))
                .set_delay(Duration::from_secs(2)),
        )
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;
    mount_esearch(&mock_server, &["123456"]).await;

    let client = timeout_client(&mock_server.uri());
    let pmids = client.search_articles("biotech", 10).await.unwrap();

    assert_eq!(pmids, vec!["123456"]);
}

#[tokio::test]
async fn test_persistent_timeout_is_upstream_unavailable() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/esearch.fcgi"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(esearch_body(&["123456"]))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&mock_server)
        .await;

    let client = timeout_client(&mock_server.uri());
    let result = client.search_articles("biotech", 10).await;

    match result {
        Err(PubMedError::UpstreamUnavailable { attempts, source }) => {
            assert_eq!(attempts, 3);
            match *source {
                PubMedError::RequestError(ref err) => assert!(err.is_timeout()),
                ref other => panic!("expected RequestError, got {:?}", other),
            }
        }
        other => panic!("expected UpstreamUnavailable, got {:?}", other),
    }
}

#[tokio::test]
async fn test_retry_budget_is_configurable() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/esearch.fcgi"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let client =
        create_mock_client_with_retry(&mock_server.uri(), RetryConfig::new().with_max_attempts(5));
    let result = client.search_articles("cancer", 10).await;

    assert!(matches!(
        result,
        Err(PubMedError::UpstreamUnavailable { attempts: 5, .. })
    ));
    assert_eq!(mock_server.received_requests().await.unwrap().len(), 5);
}

#[tokio::test]
#[traced_test]
async fn test_malformed_xml_is_not_retried() {
    let mock_server = MockServer::start().await;
    mount_esearch(&mock_server, &["123456"]).await;
    mount_efetch(&mock_server, "malformed").await;

    let client = create_mock_client(&mock_server.uri());
    let result = client.search_and_fetch("anything").await;

    assert!(matches!(result, Err(PubMedError::XmlParseError { .. })));
    let efetch_calls = mock_server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|request| request.url.path() == "/efetch.fcgi")
        .count();
    assert_eq!(efetch_calls, 1);
}

#[tokio::test]
async fn test_malformed_json_is_not_retried() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/esearch.fcgi"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&mock_server)
        .await;

    let client = create_mock_client(&mock_server.uri());
    let result = client.search_articles("cancer", 10).await;

    assert!(matches!(result, Err(PubMedError::JsonError(_))));
    assert_eq!(mock_server.received_requests().await.unwrap().len(), 1);
}

#[rstest]
#[case(400)]
#[case(404)]
#[tokio::test]
async fn test_client_errors_are_not_retried(#[case] status: u16) {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/esearch.fcgi"))
        .respond_with(ResponseTemplate::new(status))
        .mount(&mock_server)
        .await;

    let client = create_mock_client(&mock_server.uri());
    let result = client.search_articles("cancer", 10).await;

    assert!(matches!(result, Err(PubMedError::ApiError { status: s, .. }) if s == status));
    assert_eq!(mock_server.received_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_esearch_error_field_is_api_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/esearch.fcgi"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(r#"{"esearchresult": {"ERROR": "Invalid query syntax"}}"#),
        )
        .mount(&mock_server)
        .await;

    let client = create_mock_client(&mock_server.uri());
    let result = client.search_articles("cancer[", 10).await;

    match result {
        Err(PubMedError::ApiError { status, message }) => {
            assert_eq!(status, 200);
            assert!(message.contains("Invalid query syntax"));
        }
        other => panic!("expected ApiError, got {:?}", other),
    }
}

#[tokio::test]
async fn test_api_etiquette_params_are_sent() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/esearch.fcgi"))
        .and(query_param("api_key", "secret-key"))
        .and(query_param("email", "curator@example.org"))
        .and(query_param("tool", "paper-audit"))
        .respond_with(ResponseTemplate::new(200).set_body_string(esearch_body(&["123456"])))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/efetch.fcgi"))
        .and(query_param("api_key", "secret-key"))
        .and(query_param("email", "curator@example.org"))
        .and(query_param("tool", "paper-audit"))
        .respond_with(ResponseTemplate::new(200).set_body_string(load_fixture("biotech_author")))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = ClientConfig::new()
        .with_base_url(mock_server.uri())
        .with_rate_limit(100.0)
        .with_api_key("secret-key")
        .with_email("curator@example.org")
        .with_tool("paper-audit");
    let client = PubMedClient::with_config(config);

    let articles = client.search_and_fetch("biotech").await.unwrap();
    assert_eq!(articles.len(), 1);
}

#[tokio::test]
async fn test_default_tool_param_is_sent() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/esearch.fcgi"))
        .and(query_param("tool", "pubmed-paper-fetcher"))
        .respond_with(ResponseTemplate::new(200).set_body_string(esearch_body(&[])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = create_mock_client(&mock_server.uri());
    assert!(client.search_articles("cancer", 10).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_invalid_pmids_never_reach_the_server() {
    let mock_server = MockServer::start().await;
    let client = create_mock_client(&mock_server.uri());

    let result = client.fetch_articles(&["31978945", "PMC7906746"]).await;

    assert!(matches!(result, Err(PubMedError::InvalidPmid { .. })));
    assert!(mock_server.received_requests().await.unwrap().is_empty());
}
