//! In-process RemoteStore
//!
//! Resources live in a map keyed by a generated URI (`{base}/{n}`). Every
//! write is counted, and deletes or writes can be made to fail on demand, so
//! reconciliation runs can be observed without a repository server.

use async_trait::async_trait;
use oxigraph::model::{NamedNode, NamedNodeRef};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use super::{BinaryPayload, Metadata, RemoteResource, RemoteStore, StoreError, WriteMode};

/// Write operations performed against a MemoryStore
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreCounters {
    pub creates: usize,
    pub updates: usize,
    pub deletes: usize,
    pub failed_deletes: usize,
}

#[derive(Debug)]
struct StoredResource {
    metadata: Metadata,
    binary: Option<BinaryPayload>,
}

#[derive(Debug, Default)]
struct MemoryState {
    resources: BTreeMap<String, StoredResource>,
    next_id: u64,
    /// uri -> remaining injected failures, `None` fails forever
    delete_failures: HashMap<String, Option<usize>>,
    write_failures: HashSet<String>,
    counters: StoreCounters,
}

#[derive(Debug)]
pub struct MemoryStore {
    base_url: String,
    id_predicate: NamedNode,
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    /// Create an empty store
    ///
    /// # Arguments
    /// * `base_url` - Prefix of generated resource URIs
    /// * `id_predicate` - Predicate holding resource identifiers
    pub fn new(base_url: &str, id_predicate: NamedNodeRef<'_>) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            id_predicate: id_predicate.into_owned(),
            state: Mutex::new(MemoryState::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Store a resource without counting it as a create
    pub fn seed(&self, metadata: Metadata) -> String {
        let mut state = self.state();
        let uri = self.next_uri(&mut state);
        state.resources.insert(uri.clone(), StoredResource { metadata, binary: None });
        uri
    }

    /// Make deleting `uri` fail `times` times, or forever with `None`
    pub fn fail_deletes(&self, uri: &str, times: Option<usize>) {
        self.state().delete_failures.insert(uri.to_string(), times);
    }

    /// Make every create/update of the resource identified by `id` fail
    pub fn fail_writes(&self, id: &str) {
        self.state().write_failures.insert(id.to_string());
    }

    pub fn counters(&self) -> StoreCounters {
        self.state().counters
    }

    pub fn reset_counters(&self) {
        self.state().counters = StoreCounters::default();
    }

    pub fn len(&self) -> usize {
        self.state().resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, uri: &str) -> bool {
        self.state().resources.contains_key(uri)
    }

    pub fn metadata(&self, uri: &str) -> Option<Metadata> {
        self.state().resources.get(uri).map(|r| r.metadata.clone())
    }

    pub fn binary(&self, uri: &str) -> Option<BinaryPayload> {
        self.state().resources.get(uri).and_then(|r| r.binary.clone())
    }

    /// URI of the resource carrying identifier `id`
    pub fn uri_of(&self, id: &str) -> Option<String> {
        Self::find(&self.state(), self.id_predicate.as_ref(), id)
    }

    fn next_uri(&self, state: &mut MemoryState) -> String {
        state.next_id += 1;
        format!("{}/{}", self.base_url, state.next_id)
    }

    fn find(state: &MemoryState, id_predicate: NamedNodeRef<'_>, id: &str) -> Option<String> {
        if state.resources.contains_key(id) {
            return Some(id.to_string());
        }
        state
            .resources
            .iter()
            .find(|(_, r)| r.metadata.has_node(id_predicate, id))
            .map(|(uri, _)| uri.clone())
    }

    fn check_write(&self, state: &MemoryState, metadata: &Metadata) -> Result<(), StoreError> {
        let blocked = metadata
            .objects(self.id_predicate.as_ref())
            .into_iter()
            .find(|id| matches!(id, oxigraph::model::Term::NamedNode(n) if state.write_failures.contains(n.as_str())));
        match blocked {
            Some(id) => Err(StoreError::Request(format!("injected write failure for {}", id))),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl RemoteStore for MemoryStore {
    async fn get_resource_by_id(&self, id: &str) -> Result<RemoteResource, StoreError> {
        let state = self.state();
        let uri = Self::find(&state, self.id_predicate.as_ref(), id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        let metadata = state.resources[&uri].metadata.clone();
        Ok(RemoteResource { uri, metadata })
    }

    async fn create_resource(
        &self,
        metadata: &Metadata,
        payload: Option<BinaryPayload>,
    ) -> Result<RemoteResource, StoreError> {
        let mut state = self.state();
        self.check_write(&state, metadata)?;

        let uri = self.next_uri(&mut state);
        state.resources.insert(
            uri.clone(),
            StoredResource {
                metadata: metadata.clone(),
                binary: payload,
            },
        );
        state.counters.creates += 1;
        Ok(RemoteResource {
            uri,
            metadata: metadata.clone(),
        })
    }

    async fn update_metadata(
        &self,
        uri: &str,
        metadata: &Metadata,
        mode: WriteMode,
    ) -> Result<RemoteResource, StoreError> {
        let mut state = self.state();
        self.check_write(&state, metadata)?;

        let stored = state
            .resources
            .get_mut(uri)
            .ok_or_else(|| StoreError::NotFound(uri.to_string()))?;
        match mode {
            WriteMode::Overwrite => stored.metadata = metadata.clone(),
            WriteMode::Merge => stored.metadata.merge(metadata),
        }
        let metadata = stored.metadata.clone();
        state.counters.updates += 1;
        Ok(RemoteResource {
            uri: uri.to_string(),
            metadata,
        })
    }

    async fn delete_resource(&self, uri: &str) -> Result<(), StoreError> {
        tokio::task::yield_now().await;

        let mut state = self.state();
        if let Some(remaining) = state.delete_failures.get_mut(uri) {
            let fail = match remaining {
                None => true,
                Some(0) => false,
                Some(n) => {
                    *n -= 1;
                    true
                }
            };
            if fail {
                state.counters.failed_deletes += 1;
                return Err(StoreError::Request(format!("injected delete failure for {}", uri)));
            }
        }

        state
            .resources
            .remove(uri)
            .ok_or_else(|| StoreError::NotFound(uri.to_string()))?;
        state.counters.deletes += 1;
        Ok(())
    }

    async fn search_by_relation(
        &self,
        predicate: NamedNodeRef<'_>,
        value: &str,
    ) -> Result<Vec<RemoteResource>, StoreError> {
        let state = self.state();
        let target = Self::find(&state, self.id_predicate.as_ref(), value);
        Ok(state
            .resources
            .iter()
            .filter(|(_, r)| {
                r.metadata.has_node(predicate, value)
                    || target.as_deref().is_some_and(|t| r.metadata.has_node(predicate, t))
            })
            .map(|(uri, r)| RemoteResource {
                uri: uri.clone(),
                metadata: r.metadata.clone(),
            })
            .collect())
    }
}
