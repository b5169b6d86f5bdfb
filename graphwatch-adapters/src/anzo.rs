//! Graphmart status adapter using the Anzo / Altair Graph Studio REST API.
//!
//! This adapter fetches graphmart status by querying the management API,
//! which is typically available over HTTPS on port 8443.
//!
//! ## Data Collected
//!
//! - **Aggregate state**: Online, Offline, Activating, ...
//! - **Completion**: whether the graphmart has finished processing
//! - **Engine**: the static graph engine (AnzoGraph server) it is bound to
//! - **Layers**: enabled/dirty flags and error text per layer
//! - **Steps**: the same per step, nested under their layer
//!
//! ## Example
//!
//! ```rust,no_run
//! use graphwatch_adapters::anzo::GraphmartStatusClient;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = GraphmartStatusClient::builder()
//!         .endpoint("https://anzo.example.com:8443")
//!         .credentials("admin", "secret")
//!         .build()?;
//!
//!     let uri = "http://cambridgesemantics.com/graphmart/sales";
//!     let status = client.fetch_status(uri).await?;
//!
//!     for layer in &status.components {
//!         println!("Layer: {} error={:?}", layer.display_name(), layer.error_text());
//!     }
//!
//!     Ok(())
//! }
//! ```

use std::time::Duration;

use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use tracing::debug;

use graphwatch_types::{AggregateState, RawStatus, ResourceId, SubComponentStatus};

use crate::AdapterError;

/// Client for the graphmart status endpoints.
#[derive(Debug, Clone)]
pub struct GraphmartStatusClient {
    client: Client,
    endpoint: String,
    username: String,
    password: String,
}

impl GraphmartStatusClient {
    /// Create a new builder for configuring the client.
    pub fn builder() -> GraphmartStatusClientBuilder {
        GraphmartStatusClientBuilder::default()
    }

    /// The configured API endpoint.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Fetch the detailed status of a graphmart.
    pub async fn fetch_status(&self, graphmart_uri: &str) -> Result<RawStatus, AdapterError> {
        let url = format!(
            "{}/api/graphmarts/{}/status?detail=true",
            self.endpoint,
            urlencoded(graphmart_uri)
        );
        debug!(graphmart = graphmart_uri, "fetching graphmart status");

        let response = self.get(&url, graphmart_uri).await?;
        let detail: StatusDetail = response
            .json()
            .await
            .map_err(|e| AdapterError::Parse(e.to_string()))?;

        Ok(detail.into_raw_status(ResourceId::from(graphmart_uri)))
    }

    /// Fetch the title of a graphmart.
    pub async fn title(&self, graphmart_uri: &str) -> Result<String, AdapterError> {
        let url = format!("{}/api/graphmarts/{}", self.endpoint, urlencoded(graphmart_uri));

        let response = self.get(&url, graphmart_uri).await?;
        let info: GraphmartInfo = response
            .json()
            .await
            .map_err(|e| AdapterError::Parse(e.to_string()))?;

        Ok(info.title)
    }

    async fn get(&self, url: &str, graphmart_uri: &str) -> Result<Response, AdapterError> {
        let response = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, "application/json")
            .basic_auth(&self.username, Some(&self.password))
            .send()
            .await?;

        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Err(AdapterError::Auth("Invalid credentials".to_string()))
            }
            StatusCode::NOT_FOUND => Err(AdapterError::NotFound(format!(
                "Graphmart '{}' not found",
                graphmart_uri
            ))),
            status if !status.is_success() => {
                Err(AdapterError::Http(format!("API returned status {}", status)))
            }
            _ => Ok(response),
        }
    }
}

/// Builder for GraphmartStatusClient.
#[derive(Debug, Default)]
pub struct GraphmartStatusClientBuilder {
    endpoint: Option<String>,
    username: Option<String>,
    password: Option<String>,
    timeout: Option<Duration>,
    accept_invalid_certs: Option<bool>,
}

impl GraphmartStatusClientBuilder {
    /// Set the API endpoint (e.g., "https://anzo.example.com:8443").
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Set the username and password for authentication.
    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Set the request timeout (default: 180 seconds).
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Accept self-signed certificates (default: true).
    pub fn accept_invalid_certs(mut self, accept: bool) -> Self {
        self.accept_invalid_certs = Some(accept);
        self
    }

    /// Build the client.
    pub fn build(self) -> Result<GraphmartStatusClient, AdapterError> {
        let timeout = self.timeout.unwrap_or(Duration::from_secs(180));

        let client = Client::builder()
            .timeout(timeout)
            .danger_accept_invalid_certs(self.accept_invalid_certs.unwrap_or(true))
            .build()
            .map_err(|e| AdapterError::Config(e.to_string()))?;

        let endpoint = self
            .endpoint
            .unwrap_or_else(|| "https://localhost:8443".to_string());

        Ok(GraphmartStatusClient {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            username: self.username.unwrap_or_default(),
            password: self.password.unwrap_or_default(),
        })
    }
}

// Percent-encode a graphmart URI for use as a single path segment
fn urlencoded(s: &str) -> String {
    let mut out = String::with_capacity(s.len() * 3);
    for byte in s.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}

/// Graphmart resource from the management API.
#[derive(Debug, Deserialize)]
struct GraphmartInfo {
    title: String,
}

/// Detailed status from `/status?detail=true`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatusDetail {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    is_complete: bool,
    #[serde(default)]
    static_azg_server: Option<String>,
    #[serde(default)]
    child_layer: Vec<ComponentDetail>,
}

#[derive(Debug, Deserialize)]
struct ComponentDetail {
    #[serde(default)]
    uri: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    enabled: bool,
    #[serde(default, alias = "isDirty")]
    dirty: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    child: Vec<ComponentDetail>,
}

impl StatusDetail {
    fn into_raw_status(self, resource: ResourceId) -> RawStatus {
        RawStatus {
            resource,
            state: self
                .status
                .as_deref()
                .map(AggregateState::parse)
                .unwrap_or_default(),
            complete: self.is_complete,
            engine: self.static_azg_server.filter(|s| !s.trim().is_empty()),
            components: self.child_layer.into_iter().map(Into::into).collect(),
        }
    }
}

impl From<ComponentDetail> for SubComponentStatus {
    fn from(detail: ComponentDetail) -> Self {
        SubComponentStatus {
            id: detail
                .uri
                .or_else(|| detail.title.clone())
                .unwrap_or_else(|| "unknown".to_string()),
            title: detail.title,
            enabled: detail.enabled,
            dirty: detail.dirty,
            error: detail.error,
            children: detail.child.into_iter().map(Into::into).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DETAIL_JSON: &str = r#"{
        "status": "http://cambridgesemantics.com/ontologies/Graphmarts#Online",
        "isComplete": true,
        "staticAzgServer": "http://cambridgesemantics.com/azg/primary",
        "failedLayers": 1,
        "dirtyLayers": 0,
        "childLayer": [
            {
                "uri": "http://example.org/layer/ingest",
                "title": "Ingest",
                "enabled": true,
                "child": [
                    {
                        "uri": "http://example.org/step/index",
                        "title": "Index",
                        "enabled": true,
                        "error": "Elasticsearch cluster unreachable"
                    }
                ]
            },
            {
                "uri": "http://example.org/layer/archive",
                "title": "Archive",
                "enabled": false
            }
        ]
    }"#;

    #[test]
    fn test_builder_defaults() {
        let client = GraphmartStatusClient::builder().build().unwrap();
        assert_eq!(client.endpoint, "https://localhost:8443");
        assert_eq!(client.username, "");
        assert_eq!(client.password, "");
    }

    #[test]
    fn test_builder_custom() {
        let client = GraphmartStatusClient::builder()
            .endpoint("https://anzo.local:8443/")
            .credentials("admin", "secret")
            .timeout(Duration::from_secs(5))
            .accept_invalid_certs(false)
            .build()
            .unwrap();

        assert_eq!(client.endpoint(), "https://anzo.local:8443");
        assert_eq!(client.username, "admin");
        assert_eq!(client.password, "secret");
    }

    #[test]
    fn test_urlencoded() {
        assert_eq!(
            urlencoded("http://example.org/gm"),
            "http%3A%2F%2Fexample.org%2Fgm"
        );
        assert_eq!(urlencoded("a b#c"), "a%20b%23c");
        assert_eq!(urlencoded("simple-1_2.3~"), "simple-1_2.3~");
    }

    #[test]
    fn test_detail_to_raw_status() {
        let detail: StatusDetail = serde_json::from_str(DETAIL_JSON).unwrap();
        let status = detail.into_raw_status(ResourceId::from("gm"));

        assert_eq!(status.state, AggregateState::Online);
        assert!(status.complete);
        assert_eq!(status.components.len(), 2);

        let ingest = &status.components[0];
        assert_eq!(ingest.id, "http://example.org/layer/ingest");
        assert_eq!(ingest.display_name(), "Ingest");
        assert!(ingest.enabled);
        assert_eq!(
            ingest.children[0].error_text(),
            Some("Elasticsearch cluster unreachable")
        );
        assert!(!status.components[1].enabled);
        assert_eq!(
            status.engine.as_deref(),
            Some("http://cambridgesemantics.com/azg/primary")
        );
    }

    #[test]
    fn test_blank_engine_is_none() {
        let detail: StatusDetail =
            serde_json::from_str(r#"{"status": "Online", "staticAzgServer": " "}"#).unwrap();
        assert_eq!(detail.into_raw_status(ResourceId::from("gm")).engine, None);
    }

    #[test]
    fn test_missing_fields_default() {
        let detail: StatusDetail = serde_json::from_str("{}").unwrap();
        let status = detail.into_raw_status(ResourceId::from("gm"));
        assert_eq!(status.state, AggregateState::Unknown);
        assert!(!status.complete);
        assert!(status.components.is_empty());
        assert!(status.engine.is_none());
    }

    #[tokio::test]
    async fn test_fetch_status_over_http() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/graphmarts/gm1/status")
            .match_query(mockito::Matcher::UrlEncoded("detail".into(), "true".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(DETAIL_JSON)
            .create_async()
            .await;

        let client = GraphmartStatusClient::builder()
            .endpoint(server.url())
            .credentials("admin", "secret")
            .build()
            .unwrap();

        let status = client.fetch_status("gm1").await.unwrap();
        assert_eq!(status.resource.as_str(), "gm1");
        assert!(status.is_ready());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_fetch_status_unauthorized() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/graphmarts/gm1/status")
            .match_query(mockito::Matcher::Any)
            .with_status(401)
            .create_async()
            .await;

        let client = GraphmartStatusClient::builder()
            .endpoint(server.url())
            .build()
            .unwrap();

        let err = client.fetch_status("gm1").await.unwrap_err();
        assert!(matches!(err, AdapterError::Auth(_)));
        assert!(!err.is_transient());
    }

    #[tokio::test]
    async fn test_fetch_status_not_found_and_server_error() {
        let mut server = mockito::Server::new_async().await;
        let _missing = server
            .mock("GET", "/api/graphmarts/missing/status")
            .match_query(mockito::Matcher::Any)
            .with_status(404)
            .create_async()
            .await;
        let _broken = server
            .mock("GET", "/api/graphmarts/broken/status")
            .match_query(mockito::Matcher::Any)
            .with_status(503)
            .create_async()
            .await;

        let client = GraphmartStatusClient::builder()
            .endpoint(server.url())
            .build()
            .unwrap();

        let err = client.fetch_status("missing").await.unwrap_err();
        assert!(matches!(err, AdapterError::NotFound(_)));

        let err = client.fetch_status("broken").await.unwrap_err();
        assert!(matches!(err, AdapterError::Http(_)));
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_fetch_status_bad_body() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/graphmarts/gm1/status")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body("not json")
            .create_async()
            .await;

        let client = GraphmartStatusClient::builder()
            .endpoint(server.url())
            .build()
            .unwrap();

        let err = client.fetch_status("gm1").await.unwrap_err();
        assert!(matches!(err, AdapterError::Parse(_)));
    }

    #[tokio::test]
    async fn test_title() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/graphmarts/gm1")
            .with_status(200)
            .with_body(r#"{"title": "Sales", "uri": "gm1"}"#)
            .create_async()
            .await;

        let client = GraphmartStatusClient::builder()
            .endpoint(server.url())
            .build()
            .unwrap();

        assert_eq!(client.title("gm1").await.unwrap(), "Sales");
    }
}
