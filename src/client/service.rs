use std::time::Duration;

use reqwest::{Client, Response};
use serde::Serialize;
use serde_json::Value;

use super::error::ClientError;
use super::types::{AddEpisodeRequest, BuildCommunitiesRequest, EpisodeQuery, SearchRequest};

/// HTTP client for the knowledge graph service. All graph semantics
/// (ranking, temporal indexing, community detection) live on the other
/// side of this boundary; responses stay untyped JSON.
pub struct ServiceClient {
    http: Client,
    base_url: String,
}

impl ServiceClient {
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        let http = Client::builder().timeout(Duration::from_secs(120)).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Search relationship edges.
    pub async fn search_edges(&self, request: &SearchRequest) -> Result<Vec<Value>, ClientError> {
        let body = self.post("/search", request).await?;
        Ok(extract_list(body, "edges"))
    }

    /// Search entity nodes. Used as a fallback when an edge search comes
    /// back empty.
    pub async fn search_nodes(&self, request: &SearchRequest) -> Result<Vec<Value>, ClientError> {
        let body = self.post("/search/nodes", request).await?;
        Ok(extract_list(body, "nodes"))
    }

    /// Ingest one episode. Returns the service's result payload
    /// (episode, extracted nodes, extracted edges).
    pub async fn add_episode(&self, request: &AddEpisodeRequest) -> Result<Value, ClientError> {
        self.post("/episodes", request).await
    }

    /// Retrieve the most recent episodes before a reference time.
    pub async fn retrieve_episodes(&self, query: &EpisodeQuery) -> Result<Vec<Value>, ClientError> {
        let url = format!("{}/episodes", self.base_url);
        let mut params: Vec<(&str, String)> = vec![
            ("last_n", query.last_n.to_string()),
            ("reference_time", query.reference_time.to_rfc3339()),
        ];
        if let Some(group_id) = &query.group_id {
            params.push(("group_id", group_id.clone()));
        }

        let response = self.http.get(&url).query(&params).send().await?;
        let body = read_json(response).await?;
        Ok(extract_list(body, "episodes"))
    }

    /// Kick off community detection on the service.
    pub async fn build_communities(
        &self,
        request: &BuildCommunitiesRequest,
    ) -> Result<Value, ClientError> {
        self.post("/communities/build", request).await
    }

    async fn post<B: Serialize>(&self, path: &str, body: &B) -> Result<Value, ClientError> {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!(%url, "calling knowledge graph service");
        let response = self.http.post(&url).json(body).send().await?;
        read_json(response).await
    }
}

async fn read_json(response: Response) -> Result<Value, ClientError> {
    let status = response.status();
    if !status.is_success() {
        let message = response
            .text()
            .await
            .unwrap_or_else(|_| "unknown error".to_string());
        return Err(ClientError::Api {
            status: status.as_u16(),
            message,
        });
    }
    Ok(response.json().await?)
}

/// Accept either a bare JSON array or an object wrapping the array under
/// the given key.
fn extract_list(body: Value, key: &str) -> Vec<Value> {
    match body {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove(key) {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        },
        _ => Vec::new(),
    }
}
