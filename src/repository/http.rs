//! HTTP Repository
//!
//! `reqwest` implementation of the repository traits against the organizer
//! JSON API. Non-2xx answers and transport errors both map to
//! `DomainError::Remote`.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::OrganizerConfig;
use crate::domain::{DomainError, DomainResult, ItemRecord, NodeId};

use super::traits::{FolderRepository, PointerRepository};

// ========================
// Request Bodies
// ========================

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct NodeIdsBody<'a> {
    node_ids: &'a [NodeId],
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MovePointersBody<'a> {
    pointer_ids: &'a [NodeId],
    from_node_id: &'a NodeId,
    to_node_id: &'a NodeId,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PointerIdsBody<'a> {
    pointer_ids: &'a [NodeId],
}

#[derive(Serialize)]
struct AddPointerBody<'a> {
    #[serde(rename = "pointerID")]
    pointer_id: &'a NodeId,
    #[serde(rename = "toNodeID")]
    to_node_id: &'a NodeId,
}

#[derive(Serialize)]
struct CreateFolderBody<'a> {
    node_id: &'a NodeId,
    title: &'a str,
}

#[derive(Serialize)]
struct EditBody<'a> {
    name: &'static str,
    value: &'a str,
}

#[derive(Serialize)]
struct EmptyBody {}

// ========================
// Paths
// ========================

mod paths {
    use crate::domain::NodeId;

    pub fn folder_pointers(folder: &NodeId) -> String {
        format!("/api/v1/project/{}/get_folder_pointers/", folder)
    }

    pub fn add_pointers(folder: &NodeId) -> String {
        format!("/api/v1/project/{}/pointer/", folder)
    }

    pub fn move_pointers() -> String {
        "/api/v1/pointers/move/".to_string()
    }

    pub fn delete_pointers(folder: &NodeId) -> String {
        format!("/api/v1/folder/{}/pointers/", folder)
    }

    pub fn children(node: &NodeId) -> String {
        format!("/api/v1/dashboard/{}", node)
    }

    pub fn expand_state(node: &NodeId, expanded: bool) -> String {
        let action = if expanded { "expand" } else { "collapse" };
        format!("/api/v1/project/{}/{}/", node, action)
    }

    pub fn add_pointer() -> String {
        "/api/v1/pointer/".to_string()
    }

    pub fn remove_pointer(folder: &NodeId, pointer: &NodeId) -> String {
        format!("/api/v1/folder/{}/pointer/{}", folder, pointer)
    }

    pub fn folders() -> String {
        "/api/v1/folder/".to_string()
    }

    pub fn folder(node: &NodeId) -> String {
        format!("/api/v1/folder/{}", node)
    }

    pub fn edit(node: &NodeId) -> String {
        format!("/api/v1/project/{}/edit/", node)
    }
}

/// Organizer API client
#[derive(Debug, Clone)]
pub struct HttpRepository {
    client: Client,
    base_url: String,
}

impl HttpRepository {
    pub fn new(config: &OrganizerConfig) -> DomainResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| DomainError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send(&self, request: RequestBuilder, path: &str) -> DomainResult<Response> {
        let response = request
            .send()
            .await
            .map_err(|e| DomainError::Remote(format!("{}: {}", path, e)))?;

        let status = response.status();
        if !status.is_success() {
            log::warn!("[HTTP] {} answered {}", path, status);
            return Err(DomainError::Remote(format!("HTTP {} from {}", status, path)));
        }
        Ok(response)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> DomainResult<T> {
        let response = self.send(self.client.get(self.url(path)), path).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| DomainError::Remote(format!("Malformed response from {}: {}", path, e)))
    }

    async fn post<B: Serialize + Sync>(&self, path: &str, body: &B) -> DomainResult<()> {
        self.send(self.client.post(self.url(path)).json(body), path).await?;
        Ok(())
    }

    async fn put<B: Serialize + Sync>(&self, path: &str, body: &B) -> DomainResult<()> {
        self.send(self.client.put(self.url(path)).json(body), path).await?;
        Ok(())
    }

    async fn delete<B: Serialize + Sync>(&self, path: &str, body: Option<&B>) -> DomainResult<()> {
        let mut request = self.client.delete(self.url(path));
        if let Some(body) = body {
            request = request.json(body);
        }
        self.send(request, path).await?;
        Ok(())
    }
}

#[async_trait]
impl PointerRepository for HttpRepository {
    async fn fetch_child_pointer_ids(&self, folder: &NodeId) -> DomainResult<HashSet<NodeId>> {
        let ids: Vec<NodeId> = self.get_json(&paths::folder_pointers(folder)).await?;
        Ok(ids.into_iter().collect())
    }

    async fn add_pointers(&self, folder: &NodeId, ids: &[NodeId]) -> DomainResult<()> {
        self.post(&paths::add_pointers(folder), &NodeIdsBody { node_ids: ids }).await
    }

    async fn move_pointers(&self, ids: &[NodeId], from: &NodeId, to: &NodeId) -> DomainResult<()> {
        let body = MovePointersBody {
            pointer_ids: ids,
            from_node_id: from,
            to_node_id: to,
        };
        self.post(&paths::move_pointers(), &body).await
    }

    async fn delete_pointers(&self, ids: &[NodeId], folder: &NodeId) -> DomainResult<()> {
        self.delete(&paths::delete_pointers(folder), Some(&PointerIdsBody { pointer_ids: ids }))
            .await
    }
}

#[async_trait]
impl FolderRepository for HttpRepository {
    async fn fetch_children(&self, node: &NodeId) -> DomainResult<Vec<ItemRecord>> {
        self.get_json(&paths::children(node)).await
    }

    async fn set_expanded(&self, node: &NodeId, expanded: bool) -> DomainResult<()> {
        self.post(&paths::expand_state(node, expanded), &EmptyBody {}).await
    }

    async fn add_pointer(&self, folder: &NodeId, pointer: &NodeId) -> DomainResult<()> {
        let body = AddPointerBody {
            pointer_id: pointer,
            to_node_id: folder,
        };
        self.post(&paths::add_pointer(), &body).await
    }

    async fn remove_pointer(&self, folder: &NodeId, pointer: &NodeId) -> DomainResult<()> {
        self.delete::<EmptyBody>(&paths::remove_pointer(folder, pointer), None).await
    }

    async fn create_folder(&self, parent: &NodeId, title: &str) -> DomainResult<()> {
        self.put(&paths::folders(), &CreateFolderBody { node_id: parent, title }).await
    }

    async fn delete_folder(&self, node: &NodeId) -> DomainResult<()> {
        self.delete::<EmptyBody>(&paths::folder(node), None).await
    }

    async fn rename(&self, node: &NodeId, title: &str) -> DomainResult<()> {
        self.post(&paths::edit(node), &EditBody { name: "title", value: title }).await
    }
}
