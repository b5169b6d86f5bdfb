//! HTTP status source backed by the graphmart management API.

use async_trait::async_trait;
use graphwatch_adapters::anzo::GraphmartStatusClient;
use graphwatch_types::{RawStatus, ResourceId};
use tracing::debug;

use super::{FetchError, StatusFetcher};

/// A status fetcher that queries the graphmart REST API.
///
/// # Example
///
/// ```no_run
/// use graphwatch::HttpFetcher;
/// use graphwatch::adapters::anzo::GraphmartStatusClient;
///
/// let client = GraphmartStatusClient::builder()
///     .endpoint("https://anzo.example.com:8443")
///     .credentials("admin", "secret")
///     .build()
///     .unwrap();
/// let fetcher = HttpFetcher::new(client);
/// ```
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: GraphmartStatusClient,
    description: String,
}

impl HttpFetcher {
    /// Wrap a configured client.
    pub fn new(client: GraphmartStatusClient) -> Self {
        let description = format!("http: {}", client.endpoint());
        Self {
            client,
            description,
        }
    }
}

#[async_trait]
impl StatusFetcher for HttpFetcher {
    async fn fetch(&self, id: &ResourceId) -> Result<RawStatus, FetchError> {
        Ok(self.client.fetch_status(id.as_str()).await?)
    }

    async fn title(&self, id: &ResourceId) -> Option<String> {
        match self.client.title(id.as_str()).await {
            Ok(title) if !title.trim().is_empty() => Some(title),
            Ok(_) => None,
            Err(e) => {
                debug!(resource = %id, error = %e, "title lookup failed");
                None
            }
        }
    }

    fn description(&self) -> &str {
        &self.description
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn description_names_endpoint() {
        let client = GraphmartStatusClient::builder()
            .endpoint("https://anzo.local:8443")
            .build()
            .unwrap();
        let fetcher = HttpFetcher::new(client);
        assert_eq!(fetcher.description(), "http: https://anzo.local:8443");
    }

    #[tokio::test]
    async fn unreachable_server_is_fetch_error() {
        let client = GraphmartStatusClient::builder()
            .endpoint("http://127.0.0.1:1")
            .timeout(std::time::Duration::from_secs(2))
            .build()
            .unwrap();
        let fetcher = HttpFetcher::new(client);

        let err = fetcher.fetch(&ResourceId::from("gm")).await.unwrap_err();
        assert!(matches!(err, FetchError::Api(_)));
    }

    #[tokio::test]
    async fn title_is_looked_up_best_effort() {
        let mut server = mockito::Server::new_async().await;
        let _sales = server
            .mock("GET", "/api/graphmarts/sales")
            .with_status(200)
            .with_body(r#"{"title": "Sales"}"#)
            .create_async()
            .await;
        let _blank = server
            .mock("GET", "/api/graphmarts/blank")
            .with_status(200)
            .with_body(r#"{"title": "  "}"#)
            .create_async()
            .await;
        let _missing = server
            .mock("GET", "/api/graphmarts/missing")
            .with_status(404)
            .create_async()
            .await;

        let client = GraphmartStatusClient::builder()
            .endpoint(server.url())
            .build()
            .unwrap();
        let fetcher = HttpFetcher::new(client);

        assert_eq!(fetcher.title(&"sales".into()).await.as_deref(), Some("Sales"));
        assert_eq!(fetcher.title(&"blank".into()).await, None);
        assert_eq!(fetcher.title(&"missing".into()).await, None);
    }
}
