//! Drive tree nodes
//!
//! [`DriveNode`] implements the [`RemoteNode`] port over the iCloud
//! drive web service. Each node owns its child-listing cache behind a
//! `tokio::sync::Mutex`; [`invalidate`](RemoteNode::invalidate) clears
//! it so the next lookup re-reads the service. The cache is never
//! shared between node handles - two handles to the same folder have
//! independent caches and independent staleness, which is exactly the
//! behavior the resolver's poll loop is built for.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use icmirror_core::{RemoteError, RemoteNode, RemoteNodeRef};
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

use crate::client::DriveClient;
use crate::upload;

/// drivewsid of the drive root folder
pub const ROOT_DRIVEWSID: &str = "FOLDER::com.apple.CloudDocs::root";

/// Raw node record as the listing endpoint returns it
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeData {
    /// Tree-service identifier ("FOLDER::zone::guid" / "FILE::zone::guid")
    pub drivewsid: String,
    /// Document-service identifier (upload flow addresses folders by it)
    #[serde(default)]
    pub docwsid: String,
    /// Zone the node lives in (usually "com.apple.CloudDocs")
    #[serde(default = "default_zone")]
    pub zone: String,
    /// Name without extension
    pub name: String,
    /// File extension, absent for folders and extensionless files
    #[serde(default)]
    pub extension: Option<String>,
    /// "FOLDER", "APP_LIBRARY" or "FILE"
    #[serde(rename = "type")]
    pub node_type: String,
    /// Concurrency tag required by mutations such as trash
    #[serde(default)]
    pub etag: Option<String>,
    /// File size in bytes; folders have none
    #[serde(default)]
    pub size: Option<u64>,
    /// Last-modified timestamp; folders have none
    #[serde(default)]
    pub date_modified: Option<DateTime<Utc>>,
    /// Child records, present when the listing was fetched with details
    #[serde(default)]
    pub items: Option<Vec<NodeData>>,
}

fn default_zone() -> String {
    "com.apple.CloudDocs".to_string()
}

impl NodeData {
    /// Name as shown in the drive: `name` plus `.extension` when present
    pub fn full_name(&self) -> String {
        match &self.extension {
            Some(ext) if !ext.is_empty() => format!("{}.{}", self.name, ext),
            _ => self.name.clone(),
        }
    }

    /// Whether this record describes a folder-like node
    pub fn is_folder(&self) -> bool {
        matches!(self.node_type.as_str(), "FOLDER" | "APP_LIBRARY")
    }
}

/// One directory or file in the drive tree
pub struct DriveNode {
    client: Arc<DriveClient>,
    data: NodeData,
    /// Display name, cached so `name()` can hand out a borrow
    full_name: String,
    /// Child listing keyed by full name; `None` means "not fetched"
    children: Mutex<Option<HashMap<String, NodeData>>>,
}

impl DriveNode {
    /// Wraps a listing record in a node handle with an empty cache
    pub fn new(client: Arc<DriveClient>, data: NodeData) -> Self {
        let full_name = data.full_name();
        Self {
            client,
            data,
            full_name,
            children: Mutex::new(None),
        }
    }

    /// Fetches the drive root node
    pub async fn root(client: Arc<DriveClient>) -> Result<RemoteNodeRef, RemoteError> {
        let data = fetch_node(&client, ROOT_DRIVEWSID).await?;
        Ok(Arc::new(Self::new(client, data)))
    }

    /// Returns the child listing, fetching it if the cache is empty
    async fn children_by_name(&self) -> Result<HashMap<String, NodeData>, RemoteError> {
        let mut cache = self.children.lock().await;
        if let Some(listing) = cache.as_ref() {
            return Ok(listing.clone());
        }

        let data = fetch_node(&self.client, &self.data.drivewsid).await?;
        let listing: HashMap<String, NodeData> = data
            .items
            .unwrap_or_default()
            .into_iter()
            .map(|item| (item.full_name(), item))
            .collect();
        debug!(
            folder = %self.full_name,
            children = listing.len(),
            "fetched folder listing"
        );
        *cache = Some(listing.clone());
        Ok(listing)
    }
}

/// Fetches one node's details (including its child items) by drivewsid
async fn fetch_node(client: &DriveClient, drivewsid: &str) -> Result<NodeData, RemoteError> {
    let body = serde_json::json!([{
        "drivewsid": drivewsid,
        "partialData": false,
    }]);
    let reply = client.post_drive("/retrieveItemDetailsInFolders", &body).await?;

    let first = reply
        .as_array()
        .and_then(|nodes| nodes.first())
        .cloned()
        .ok_or_else(|| RemoteError::Protocol("empty retrieveItemDetailsInFolders reply".into()))?;
    serde_json::from_value(first)
        .map_err(|e| RemoteError::Protocol(format!("malformed node record: {e}")))
}

#[async_trait::async_trait]
impl RemoteNode for DriveNode {
    fn name(&self) -> &str {
        &self.full_name
    }

    fn is_dir(&self) -> bool {
        self.data.is_folder()
    }

    fn size(&self) -> Option<u64> {
        self.data.size
    }

    fn modified(&self) -> Option<DateTime<Utc>> {
        self.data.date_modified
    }

    async fn child(&self, name: &str) -> Result<Option<RemoteNodeRef>, RemoteError> {
        let listing = self.children_by_name().await?;
        Ok(listing.get(name).cloned().map(|data| {
            Arc::new(DriveNode::new(self.client.clone(), data)) as RemoteNodeRef
        }))
    }

    async fn create_child_dir(&self, name: &str) -> Result<(), RemoteError> {
        let folder_client_id = format!("FOLDER::{}::{}", self.data.zone, Uuid::new_v4());
        let body = serde_json::json!({
            "destinationDrivewsId": self.data.drivewsid,
            "folders": [{
                "clientId": folder_client_id,
                "name": name,
            }],
        });
        debug!(folder = %self.full_name, child = %name, "creating folder");
        self.client.post_drive("/createFolders", &body).await?;
        // The reply may already carry the new folder record, but it is
        // not guaranteed to be visible in listings yet; callers poll.
        Ok(())
    }

    async fn invalidate(&self) {
        *self.children.lock().await = None;
        debug!(folder = %self.full_name, "listing cache invalidated");
    }

    async fn upload(&self, name: &str, data: Vec<u8>) -> Result<(), RemoteError> {
        upload::send_file(&self.client, &self.data, name, data).await
    }

    async fn delete(&self) -> Result<(), RemoteError> {
        let body = serde_json::json!({
            "items": [{
                "drivewsid": self.data.drivewsid,
                "etag": self.data.etag,
                "clientId": self.client.client_id(),
            }],
        });
        debug!(node = %self.full_name, "moving to trash");
        self.client.post_drive("/moveItemsToTrash", &body).await?;
        Ok(())
    }
}
