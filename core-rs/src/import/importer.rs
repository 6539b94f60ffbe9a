//! OntologyImporter: one full reconciliation cycle
//!
//! 1. get-or-create the ontology root and one container per object kind
//! 2. check and normalize every node (see [`OntologyChecker::prepare`])
//! 3. sanitize the accepted nodes into an [`ImportBatch`]
//! 4. write the batch, remembering every resulting repository URI
//! 5. sweep obsolete children out of each kind container

use oxigraph::model::Subject;
use std::collections::HashSet;
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::batch::{BatchEntry, ImportBatch};
use super::report::ImportReport;
use super::sanitize::{local_name, sanitize};
use super::sweeper::ObsoleteChildSweeper;
use crate::checker::{EntityStatus, OntologyChecker};
use crate::config::Config;
use crate::errors::{Result, SyncError};
use crate::ontology::{OntologyGraph, OwlObjectKind};
use crate::repo::{Metadata, RemoteResource, RemoteStore, StoreError};

pub struct OntologyImporter<'a> {
    config: &'a Config,
    concurrency: usize,
    retry_budget: usize,
}

/// Fetch the resource identified by `id`, creating it with `metadata` when
/// it does not exist
pub async fn get_or_create(store: &dyn RemoteStore, id: &str, metadata: Metadata) -> Result<RemoteResource> {
    match store.get_resource_by_id(id).await {
        Ok(existing) => Ok(existing),
        Err(StoreError::NotFound(_)) => {
            let created = store.create_resource(&metadata, None).await?;
            info!("created {} as {}", id, created.uri);
            Ok(created)
        }
        Err(e) => Err(e.into()),
    }
}

impl<'a> OntologyImporter<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self {
            config,
            concurrency: config.import.concurrency,
            retry_budget: config.import.retry_budget(),
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_retry_budget(mut self, retry_budget: usize) -> Self {
        self.retry_budget = retry_budget;
        self
    }

    /// Identifiers of the top-level containers: the ontology root followed
    /// by one per object kind
    pub fn container_ids(&self) -> Vec<String> {
        let mut ids = vec![self.config.schema.ontology_root()];
        ids.extend(OwlObjectKind::IMPORT_ORDER.iter().map(|k| k.iri().as_str().to_string()));
        ids
    }

    pub async fn ensure_containers(&self, store: &dyn RemoteStore) -> Result<()> {
        info!("creating top-level collections");
        let schema = &self.config.schema;
        for id in self.container_ids() {
            let mut meta = Metadata::new();
            meta.add_lang_literal(schema.label(), local_name(&id), "en");
            meta.add_node(schema.id(), &id);
            get_or_create(store, &id, meta).await?;
        }
        Ok(())
    }

    /// Check and normalize the whole graph, then sanitize the accepted
    /// nodes into a batch. Rejections, anonymous nodes and duplicates are
    /// counted in `report`.
    pub fn stage(&self, graph: &mut OntologyGraph, report: &mut ImportReport) -> ImportBatch {
        let schema = &self.config.schema;

        let mut checker = OntologyChecker::new(graph, schema, self.config.import.restriction_ids);
        let entities = checker.prepare();
        report.diagnostics.extend_from_slice(checker.diagnostics());

        let mut batch = ImportBatch::new();
        for entity in entities {
            match entity.status {
                EntityStatus::Rejected => report.rejected += 1,
                EntityStatus::Anonymous => report.skipped += 1,
                EntityStatus::Duplicate => report.duplicates += 1,
                EntityStatus::Accepted => {
                    let Subject::NamedNode(id) = entity.id else {
                        report.skipped += 1;
                        continue;
                    };
                    let metadata = sanitize(
                        graph,
                        &entity.node,
                        &id,
                        entity.kind.iri().as_str(),
                        schema,
                        &self.config.import.default_lang,
                    );
                    if !batch.push(BatchEntry {
                        id,
                        kind: entity.kind,
                        metadata,
                    }) {
                        report.duplicates += 1;
                    }
                }
            }
        }
        info!("staged {} objects", batch.len());
        batch
    }

    /// Run a full reconciliation of `graph` against `store`
    pub async fn import(
        &self,
        graph: &mut OntologyGraph,
        store: &dyn RemoteStore,
        cancel: &CancellationToken,
    ) -> Result<ImportReport> {
        self.ensure_containers(store).await?;

        let mut report = ImportReport::default();
        let batch = self.stage(graph, &mut report);

        if cancel.is_cancelled() {
            return Err(SyncError::Cancelled("import interrupted before writing".to_string()));
        }
        info!("importing {} objects", batch.len());
        let imported = store.import_batch(&batch, self.concurrency).await?;
        let mut keep: HashSet<String> = HashSet::with_capacity(imported.len());
        for entry in imported {
            report.record(entry.outcome);
            keep.insert(entry.uri);
        }

        info!("removing obsolete resources");
        let sweeper = ObsoleteChildSweeper::new(
            store,
            self.config.schema.parent(),
            self.concurrency,
            self.retry_budget,
            cancel.clone(),
        );
        for kind in OwlObjectKind::IMPORT_ORDER {
            let deleted = sweeper.sweep(kind.iri().as_str(), &keep).await?;
            report.deleted += deleted.len();
        }

        Ok(report)
    }
}
