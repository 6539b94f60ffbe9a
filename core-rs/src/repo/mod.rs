//! Remote repository boundary
//!
//! Everything ontosync knows about the remote resource store goes through the
//! [`RemoteStore`] trait:
//! - `get_resource_by_id` / `search_by_relation` for reads
//! - `create_resource` / `update_metadata` / `delete_resource` for writes
//! - `import_batch` for bulk submission of a sanitized [`ImportBatch`]
//!
//! Implementations: [`HttpStore`] (REST repository) and [`MemoryStore`]
//! (in-process, used by tests).

pub mod http;
pub mod memory;
pub mod metadata;

pub use http::HttpStore;
pub use memory::{MemoryStore, StoreCounters};
pub use metadata::Metadata;

use async_trait::async_trait;
use futures::{StreamExt, TryStreamExt};
use oxigraph::model::{NamedNode, NamedNodeRef};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

use crate::import::ImportBatch;
use crate::ontology::OwlObjectKind;

#[derive(Error, Debug, Clone)]
pub enum StoreError {
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Request failed: {0}")]
    Request(String),

    #[error("Unexpected response {status} from {url}: {body}")]
    Status { status: u16, url: String, body: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for StoreError {
    fn from(err: reqwest::Error) -> Self {
        StoreError::Request(err.to_string())
    }
}

impl From<oxigraph::model::IriParseError> for StoreError {
    fn from(err: oxigraph::model::IriParseError) -> Self {
        StoreError::InvalidResponse(err.to_string())
    }
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}

/// Metadata write mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Replace the stored metadata
    Overwrite,
    /// Add statements to the stored metadata, replacing single values
    Merge,
}

impl WriteMode {
    pub fn as_str(self) -> &'static str {
        match self {
            WriteMode::Overwrite => "overwrite",
            WriteMode::Merge => "merge",
        }
    }
}

/// Binary content of a repository resource
#[derive(Debug, Clone, PartialEq)]
pub struct BinaryPayload {
    pub data: Vec<u8>,
    pub filename: String,
    pub media_type: String,
}

impl BinaryPayload {
    pub fn from_file(path: &Path, media_type: &str) -> std::io::Result<Self> {
        let data = std::fs::read(path)?;
        let filename = path
            .file_name()
            .map(|f| f.to_string_lossy().to_string())
            .unwrap_or_else(|| "binary".to_string());
        Ok(Self {
            data,
            filename,
            media_type: media_type.to_string(),
        })
    }
}

/// A resource as seen in the remote store
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteResource {
    /// Repository URI of the resource
    pub uri: String,
    pub metadata: Metadata,
}

/// What happened to a single object during a bulk import
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportOutcome {
    Created,
    Updated,
    Unchanged,
}

/// Result of writing one batch entry
#[derive(Debug, Clone, PartialEq)]
pub struct ImportedEntry {
    pub id: NamedNode,
    pub kind: OwlObjectKind,
    pub uri: String,
    pub outcome: ImportOutcome,
}

#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Look a resource up by one of its identifiers
    async fn get_resource_by_id(&self, id: &str) -> Result<RemoteResource, StoreError>;

    async fn create_resource(
        &self,
        metadata: &Metadata,
        payload: Option<BinaryPayload>,
    ) -> Result<RemoteResource, StoreError>;

    async fn update_metadata(
        &self,
        uri: &str,
        metadata: &Metadata,
        mode: WriteMode,
    ) -> Result<RemoteResource, StoreError>;

    async fn delete_resource(&self, uri: &str) -> Result<(), StoreError>;

    /// Resources having `predicate` pointing at the resource identified by `value`
    async fn search_by_relation(
        &self,
        predicate: NamedNodeRef<'_>,
        value: &str,
    ) -> Result<Vec<RemoteResource>, StoreError>;

    /// Predicates maintained by the store itself, ignored when comparing
    /// local and remote metadata
    fn is_store_managed(&self, _predicate: NamedNodeRef<'_>) -> bool {
        false
    }

    /// Overwrite the metadata of the resource identified by `id`, or create
    /// it when it does not exist yet. Metadata already matching the remote
    /// copy is left untouched.
    async fn update_or_create(
        &self,
        id: &str,
        metadata: &Metadata,
    ) -> Result<(RemoteResource, ImportOutcome), StoreError> {
        match self.get_resource_by_id(id).await {
            Ok(existing) => {
                if existing.metadata.same_content(metadata, |p| self.is_store_managed(p)) {
                    debug!("unchanged {} as {}", id, existing.uri);
                    return Ok((existing, ImportOutcome::Unchanged));
                }
                let updated = self.update_metadata(&existing.uri, metadata, WriteMode::Overwrite).await?;
                info!("updating {} as {}", id, updated.uri);
                Ok((updated, ImportOutcome::Updated))
            }
            Err(StoreError::NotFound(_)) => {
                let created = self.create_resource(metadata, None).await?;
                info!("creating {} as {}", id, created.uri);
                Ok((created, ImportOutcome::Created))
            }
            Err(e) => Err(e),
        }
    }

    /// Write every batch entry, at most `concurrency` requests in flight.
    /// The first failing create/update aborts the import.
    async fn import_batch(
        &self,
        batch: &ImportBatch,
        concurrency: usize,
    ) -> Result<Vec<ImportedEntry>, StoreError> {
        let writes: Vec<_> = batch
            .entries()
            .map(|entry| async move {
                let (resource, outcome) = self
                    .update_or_create(entry.id.as_str(), &entry.metadata)
                    .await
                    .map_err(|e| {
                        tracing::error!("writing {} failed: {}", entry.id.as_str(), e);
                        e
                    })?;
                Ok::<_, StoreError>(ImportedEntry {
                    id: entry.id.clone(),
                    kind: entry.kind,
                    uri: resource.uri,
                    outcome,
                })
            })
            .collect();
        futures::stream::iter(writes)
            .buffered(concurrency.max(1))
            .try_collect()
            .await
    }
}
