/**
 * sweeper.rs
 * Removal of remote objects the current ontology no longer contains
 *
 * For one container the sweeper fetches every remote child, keeps those in
 * the imported set and deletes the rest. Deletes run concurrently with at
 * most `concurrency` in flight. Failed deletes are retried for up to
 * `retry_budget` further rounds; whatever is still left afterwards is a
 * fatal reconciliation error. A delete answered with NotFound counts as
 * done.
 */

use futures::stream::{self, StreamExt};
use oxigraph::model::{NamedNode, NamedNodeRef};
use std::collections::{BTreeSet, HashSet};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::errors::{Result, SyncError};
use crate::repo::{RemoteStore, StoreError};

pub struct ObsoleteChildSweeper<'a> {
    store: &'a dyn RemoteStore,
    parent: NamedNode,
    concurrency: usize,
    retry_budget: usize,
    cancel: CancellationToken,
}

impl<'a> ObsoleteChildSweeper<'a> {
    /// # Arguments
    /// * `parent` - Predicate linking children to their container
    pub fn new(
        store: &'a dyn RemoteStore,
        parent: NamedNodeRef<'_>,
        concurrency: usize,
        retry_budget: usize,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            store,
            parent: parent.into_owned(),
            concurrency: concurrency.max(1),
            retry_budget,
            cancel,
        }
    }

    /// Remote children of `container` whose URI is not in `keep`
    pub async fn obsolete_children(&self, container: &str, keep: &HashSet<String>) -> Result<Vec<String>> {
        let children = self.store.search_by_relation(self.parent.as_ref(), container).await?;
        let obsolete: BTreeSet<String> = children
            .into_iter()
            .map(|c| c.uri)
            .filter(|uri| !keep.contains(uri))
            .collect();
        Ok(obsolete.into_iter().collect())
    }

    /// Delete the obsolete children of `container`, returning the removed URIs
    pub async fn sweep(&self, container: &str, keep: &HashSet<String>) -> Result<Vec<String>> {
        let mut pending = self.obsolete_children(container, keep).await?;
        let mut deleted = Vec::new();
        if pending.is_empty() {
            return Ok(deleted);
        }
        info!("removing {} obsolete children of {}", pending.len(), container);

        for round in 0..=self.retry_budget {
            if pending.is_empty() {
                break;
            }
            if round > 0 {
                warn!("retrying {} deletes under {} (round {}/{})", pending.len(), container, round, self.retry_budget);
            }

            let results = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    return Err(SyncError::Cancelled(format!(
                        "sweep of {} interrupted with {} deletes outstanding",
                        container,
                        pending.len()
                    )));
                }
                results = self.delete_round(&pending) => results,
            };

            let mut failed = Vec::new();
            for (uri, result) in results {
                match result {
                    Ok(()) | Err(StoreError::NotFound(_)) => {
                        info!("    deleted {}", uri);
                        deleted.push(uri);
                    }
                    Err(e) => {
                        warn!("    deleting {} failed: {}", uri, e);
                        failed.push(uri);
                    }
                }
            }
            failed.sort();
            pending = failed;
        }

        if !pending.is_empty() {
            error!("{} obsolete children of {} could not be removed", pending.len(), container);
            return Err(SyncError::Reconciliation {
                container: container.to_string(),
                outstanding: pending,
            });
        }
        Ok(deleted)
    }

    async fn delete_round(&self, uris: &[String]) -> Vec<(String, std::result::Result<(), StoreError>)> {
        stream::iter(uris.iter().cloned())
            .map(|uri| async move {
                let result = self.store.delete_resource(&uri).await;
                (uri, result)
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await
    }
}
