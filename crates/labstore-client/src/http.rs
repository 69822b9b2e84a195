use crate::{BackendError, ListFilter, StorageBackend};
use async_trait::async_trait;
use labstore_api::{
    CanDeleteResponse, CanMoveResponse, CascadeDeleteSummary, ErrorBody, NodePayload, NodeRecord,
};
use labstore_core::{NodeId, NodeRef, NodeType};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::debug;

pub const API_PREFIX: &str = "/rest/storage";
pub const CSRF_HEADER: &str = "X-CSRF-Token";

pub struct RequestConfig {
    pub client: reqwest::Client,
    pub api_url: String,
    pub csrf_token: Option<String>,
}

impl RequestConfig {
    /// Builds a client with a cookie store so the session cookie set by the
    /// server is replayed on every request.
    pub fn new(api_url: &str, csrf_token: Option<String>) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .build()
            .map_err(|e| BackendError::Network(e.to_string()))?;
        Ok(Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            csrf_token: csrf_token.filter(|t| !t.is_empty()),
        })
    }
}

trait WithCsrf {
    fn with_csrf(self, token: Option<&str>) -> Self;
}

impl WithCsrf for RequestBuilder {
    fn with_csrf(self, token: Option<&str>) -> Self {
        match token {
            Some(token) => self.header(CSRF_HEADER, token),
            None => self,
        }
    }
}

pub fn collection_path(node_type: NodeType) -> String {
    format!("{API_PREFIX}/{}", node_type.plural())
}

pub fn node_path(node: NodeRef) -> String {
    format!("{}/{}", collection_path(node.node_type), node.id)
}

/// Query pairs for a collection listing (`status=active`, `roomId=3`).
pub fn list_query(filter: ListFilter) -> Vec<(String, String)> {
    let mut query = Vec::new();
    if let Some(active) = filter.active {
        let status = if active { "active" } else { "inactive" };
        query.push(("status".to_string(), status.to_string()));
    }
    if let Some(parent) = filter.parent {
        query.push((format!("{}Id", parent.node_type.key()), parent.id.to_string()));
    }
    query
}

pub struct HttpBackend {
    config: RequestConfig,
}

impl HttpBackend {
    pub fn new(config: RequestConfig) -> Self {
        Self { config }
    }

    pub fn connect(api_url: &str, csrf_token: Option<String>) -> Result<Self, BackendError> {
        RequestConfig::new(api_url, csrf_token).map(Self::new)
    }

    pub fn api_url(&self) -> &str {
        &self.config.api_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        debug!(%method, path, "storage request");
        self.config
            .client
            .request(method, format!("{}{}", self.config.api_url, path))
            .header(reqwest::header::ACCEPT, "application/json")
            .with_csrf(self.config.csrf_token.as_deref())
    }
}

/// Passes 2xx responses through and turns everything else into
/// [`BackendError::Rejected`], keeping whatever error body the server sent.
async fn ensure_success(response: Response) -> Result<Response, BackendError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    Err(rejection(status, response).await)
}

async fn rejection(status: StatusCode, response: Response) -> BackendError {
    let body = response.json::<ErrorBody>().await.unwrap_or_default();
    BackendError::Rejected {
        status: status.as_u16(),
        body,
    }
}

async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, BackendError> {
    ensure_success(response)
        .await?
        .json::<T>()
        .await
        .map_err(|e| BackendError::Decode(e.to_string()))
}

#[async_trait]
impl StorageBackend for HttpBackend {
    async fn get_node(&self, node: NodeRef) -> Result<NodeRecord, BackendError> {
        let response = self.request(Method::GET, &node_path(node)).send().await?;
        read_json(response).await
    }

    async fn list_nodes(
        &self,
        node_type: NodeType,
        filter: ListFilter,
    ) -> Result<Vec<NodeRecord>, BackendError> {
        let response = self
            .request(Method::GET, &collection_path(node_type))
            .query(&list_query(filter))
            .send()
            .await?;
        read_json(response).await
    }

    async fn update_node(&self, node: NodeRef, payload: &NodePayload) -> Result<(), BackendError> {
        let response = self
            .request(Method::PUT, &node_path(node))
            .json(payload)
            .send()
            .await?;
        ensure_success(response).await.map(|_| ())
    }

    async fn create_node(
        &self,
        node_type: NodeType,
        payload: &NodePayload,
    ) -> Result<NodeRecord, BackendError> {
        let response = self
            .request(Method::POST, &collection_path(node_type))
            .json(payload)
            .send()
            .await?;
        read_json(response).await
    }

    async fn can_move(
        &self,
        node: NodeRef,
        new_parent: NodeId,
    ) -> Result<CanMoveResponse, BackendError> {
        let param = node.node_type.move_param().unwrap_or("newParentId");
        let response = self
            .request(Method::GET, &format!("{}/can-move", node_path(node)))
            .query(&[(param, new_parent.to_string())])
            .send()
            .await?;
        read_json(response).await
    }

    async fn can_delete(&self, node: NodeRef) -> Result<CanDeleteResponse, BackendError> {
        let response = self
            .request(Method::GET, &format!("{}/can-delete", node_path(node)))
            .send()
            .await?;
        if response.status() == StatusCode::CONFLICT {
            let mut body = response
                .json::<CanDeleteResponse>()
                .await
                .map_err(|e| BackendError::Decode(e.to_string()))?;
            body.can_delete = false;
            return Ok(body);
        }
        read_json(response).await
    }

    async fn cascade_delete_summary(
        &self,
        node: NodeRef,
    ) -> Result<CascadeDeleteSummary, BackendError> {
        let response = self
            .request(
                Method::GET,
                &format!("{}/cascade-delete-summary", node_path(node)),
            )
            .send()
            .await?;
        read_json(response).await
    }

    async fn delete_node(&self, node: NodeRef) -> Result<(), BackendError> {
        let response = self
            .request(Method::DELETE, &node_path(node))
            .send()
            .await?;
        ensure_success(response).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_use_plural_segments() {
        let shelf = NodeRef::new(NodeType::Shelf, NodeId(12));
        assert_eq!(node_path(shelf), "/rest/storage/shelves/12");
        assert_eq!(collection_path(NodeType::Room), "/rest/storage/rooms");
    }

    #[test]
    fn test_list_query_names_parent_filter_after_parent_type() {
        let filter = ListFilter::active().with_parent(NodeRef::new(NodeType::Device, NodeId(3)));
        assert_eq!(
            list_query(filter),
            vec![
                ("status".to_string(), "active".to_string()),
                ("deviceId".to_string(), "3".to_string()),
            ]
        );
        assert!(list_query(ListFilter::default()).is_empty());
    }

    #[test]
    fn test_config_trims_trailing_slash_and_blank_token() {
        let config = RequestConfig::new("http://lab.local/", Some(String::new())).expect("config");
        assert_eq!(config.api_url, "http://lab.local");
        assert_eq!(config.csrf_token, None);
    }
}
