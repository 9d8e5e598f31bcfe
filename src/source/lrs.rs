//! Learning Record Store client
//!
//! Reads `GET {endpoint}/statements` and follows the `more` link of each
//! result page until the store reports no further pages.

use super::{SourceError, StatementSource};
use crate::config::StoreConfig;
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;
use serde_json::Value;
use std::time::{Duration, Instant};
use tracing::{debug, info};

const VERSION_HEADER: &str = "X-Experience-API-Version";

/// Configuration for one LRS endpoint
#[derive(Debug, Clone)]
pub struct LrsConfig {
    /// Base xAPI endpoint (e.g., "https://lrs.example.com/xapi")
    pub endpoint: String,
    /// Basic auth key
    pub key: Option<String>,
    /// Basic auth secret
    pub secret: Option<String>,
    /// Value of the X-Experience-API-Version header
    pub version: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Statements per page requested from the store
    pub page_limit: Option<u32>,
    /// Only fetch statements stored after this instant (ISO-8601)
    pub since: Option<String>,
}

impl Default for LrsConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8080/xapi".to_string(),
            key: None,
            secret: None,
            version: "1.0.3".to_string(),
            timeout_secs: 30,
            page_limit: None,
            since: None,
        }
    }
}

impl From<&StoreConfig> for LrsConfig {
    fn from(store: &StoreConfig) -> Self {
        Self {
            endpoint: store.endpoint.clone(),
            key: store.key.clone(),
            secret: store.secret.clone(),
            version: store.version.clone(),
            timeout_secs: store.timeout_secs,
            page_limit: store.page_limit,
            since: store.since.clone(),
        }
    }
}

/// One page of a statement query
#[derive(Debug, Deserialize)]
struct StatementPage {
    #[serde(default)]
    statements: Vec<Value>,
    #[serde(default)]
    more: Option<String>,
}

/// HTTP client for one LRS
pub struct LrsClient {
    client: Client,
    config: LrsConfig,
}

impl LrsClient {
    /// Create a new client with the given configuration
    pub fn new(config: LrsConfig) -> Result<Self, SourceError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { client, config })
    }

    /// Get the current configuration
    pub fn config(&self) -> &LrsConfig {
        &self.config
    }

    /// URL of the first page, with `since` and `limit` parameters
    fn first_page_url(&self) -> String {
        let mut url = format!("{}/statements", self.config.endpoint.trim_end_matches('/'));

        let mut params = Vec::new();
        if let Some(since) = &self.config.since {
            params.push(format!("since={}", urlencoding::encode(since)));
        }
        if let Some(limit) = self.config.page_limit {
            params.push(format!("limit={}", limit));
        }
        if !params.is_empty() {
            url.push('?');
            url.push_str(&params.join("&"));
        }
        url
    }

    /// Resolve a `more` link, which is usually relative to the server root
    fn next_page_url(&self, more: &str) -> Result<String, SourceError> {
        let base = Url::parse(&self.config.endpoint)
            .map_err(|e| SourceError::Parse(format!("invalid endpoint: {}", e)))?;
        let next = base
            .join(more)
            .map_err(|e| SourceError::Parse(format!("invalid more link {}: {}", more, e)))?;
        Ok(next.to_string())
    }

    async fn get_page(&self, url: &str) -> Result<StatementPage, SourceError> {
        let mut request = self
            .client
            .get(url)
            .header(VERSION_HEADER, &self.config.version);
        if let Some(key) = &self.config.key {
            request = request.basic_auth(key, self.config.secret.as_ref());
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                SourceError::Timeout
            } else if e.is_connect() {
                SourceError::Unavailable
            } else {
                SourceError::Request(e)
            }
        })?;

        if response.status().is_success() {
            response.json::<StatementPage>().await.map_err(|e| {
                if e.is_timeout() {
                    SourceError::Timeout
                } else {
                    SourceError::Parse(e.to_string())
                }
            })
        } else {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            Err(SourceError::Api {
                status: status.as_u16(),
                message: text,
            })
        }
    }
}

#[async_trait]
impl StatementSource for LrsClient {
    fn name(&self) -> &str {
        &self.config.endpoint
    }

    async fn fetch(&self) -> Result<Vec<Value>, SourceError> {
        let start = Instant::now();
        let mut statements = Vec::new();
        let mut pages = 0usize;
        let mut url = self.first_page_url();

        loop {
            let page = self.get_page(&url).await?;
            pages += 1;
            debug!(url = %url, statements = page.statements.len(), "Fetched page");
            statements.extend(page.statements);

            match page.more.as_deref().map(str::trim) {
                Some(more) if !more.is_empty() => {
                    let next = self.next_page_url(more)?;
                    if next == url {
                        return Err(SourceError::Parse(format!(
                            "more link points back to the same page: {}",
                            more
                        )));
                    }
                    url = next;
                }
                _ => break,
            }
        }

        info!(
            endpoint = %self.config.endpoint,
            statements = statements.len(),
            pages,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Fetched statements"
        );
        Ok(statements)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(endpoint: String) -> LrsClient {
        LrsClient::new(LrsConfig {
            endpoint,
            key: Some("key".to_string()),
            secret: Some("secret".to_string()),
            ..LrsConfig::default()
        })
        .unwrap()
    }

    fn doc(id: &str) -> Value {
        json!({
            "id": id,
            "actor": {"mbox": "mailto:alice@example.com"},
            "verb": {"id": "http://adlnet.gov/expapi/verbs/completed"},
            "object": {"id": "http://example.com/course"}
        })
    }

    #[tokio::test]
    async fn test_fetch_single_page_sends_headers() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/xapi/statements"))
            .and(header("X-Experience-API-Version", "1.0.3"))
            .and(header("Authorization", "Basic a2V5OnNlY3JldA=="))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "statements": [doc("6690e6c9-3ef0-4ed3-8b37-7f3964730bee")],
                "more": ""
            })))
            .expect(1)
            .mount(&server)
            .await;

        let statements = client(format!("{}/xapi", server.uri())).fetch().await.unwrap();
        assert_eq!(statements.len(), 1);
    }

    #[tokio::test]
    async fn test_fetch_follows_more_links() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/xapi/statements"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "statements": [doc("6690e6c9-3ef0-4ed3-8b37-7f3964730bee")],
                "more": "/xapi/more/2"
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/xapi/more/2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "statements": [
                    doc("d1f0b0a4-6a4e-4c4f-9a1f-0c8b3d9f2a11"),
                    doc("0b9c7ad6-2f4e-4d7e-8f57-9e4d1c2b3a44")
                ]
            })))
            .mount(&server)
            .await;

        let statements = client(format!("{}/xapi", server.uri())).fetch().await.unwrap();
        let ids: Vec<_> = statements.iter().map(|s| s["id"].as_str().unwrap()).collect();
        assert_eq!(
            ids,
            vec![
                "6690e6c9-3ef0-4ed3-8b37-7f3964730bee",
                "d1f0b0a4-6a4e-4c4f-9a1f-0c8b3d9f2a11",
                "0b9c7ad6-2f4e-4d7e-8f57-9e4d1c2b3a44"
            ]
        );
    }

    #[tokio::test]
    async fn test_since_and_limit_query_params() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/xapi/statements"))
            .and(query_param("since", "2025-01-01T00:00:00Z"))
            .and(query_param("limit", "50"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"statements": []})))
            .expect(1)
            .mount(&server)
            .await;

        let client = LrsClient::new(LrsConfig {
            endpoint: format!("{}/xapi/", server.uri()),
            page_limit: Some(50),
            since: Some("2025-01-01T00:00:00Z".to_string()),
            ..LrsConfig::default()
        })
        .unwrap();

        assert!(client.fetch().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_error_status_is_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/xapi/statements"))
            .respond_with(ResponseTemplate::new(401).set_body_string("Unauthorized"))
            .mount(&server)
            .await;

        let err = client(format!("{}/xapi", server.uri())).fetch().await.unwrap_err();
        match err {
            SourceError::Api { status, message } => {
                assert_eq!(status, 401);
                assert_eq!(message, "Unauthorized");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_invalid_body_is_parse_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/xapi/statements"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>nope</html>"))
            .mount(&server)
            .await;

        let err = client(format!("{}/xapi", server.uri())).fetch().await.unwrap_err();
        assert!(matches!(err, SourceError::Parse(_)));
    }

    #[tokio::test]
    async fn test_slow_store_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/xapi/statements"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"statements": []}))
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&server)
            .await;

        let client = LrsClient::new(LrsConfig {
            endpoint: format!("{}/xapi", server.uri()),
            timeout_secs: 1,
            ..LrsConfig::default()
        })
        .unwrap();

        assert!(matches!(client.fetch().await, Err(SourceError::Timeout)));
    }

    #[test]
    fn test_next_page_url_resolution() {
        let client = client("https://lrs.example.com/xapi".to_string());
        assert_eq!(
            client.next_page_url("/xapi/statements?more=abc").unwrap(),
            "https://lrs.example.com/xapi/statements?more=abc"
        );
        assert_eq!(
            client.next_page_url("https://other.example.com/more/1").unwrap(),
            "https://other.example.com/more/1"
        );
    }

    #[test]
    fn test_store_config_since_is_forwarded() {
        let store = StoreConfig {
            endpoint: "https://lrs.example.com/xapi".to_string(),
            page_limit: Some(50),
            since: Some("2025-01-01T00:00:00Z".to_string()),
            ..StoreConfig::default()
        };
        let client = LrsClient::new(LrsConfig::from(&store)).unwrap();
        assert_eq!(
            client.first_page_url(),
            "https://lrs.example.com/xapi/statements?since=2025-01-01T00%3A00%3A00Z&limit=50"
        );
    }

    #[test]
    fn test_first_page_url_encodes_since() {
        let client = LrsClient::new(LrsConfig {
            endpoint: "https://lrs.example.com/xapi/".to_string(),
            since: Some("2025-01-01T00:00:00+01:00".to_string()),
            ..LrsConfig::default()
        })
        .unwrap();
        assert_eq!(
            client.first_page_url(),
            "https://lrs.example.com/xapi/statements?since=2025-01-01T00%3A00%3A00%2B01%3A00"
        );
    }
}
