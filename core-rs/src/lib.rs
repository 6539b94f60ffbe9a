//! # ontosync - OWL ontology checker and repository importer
//!
//! Reads an OWL ontology, checks its properties and restrictions against a
//! small set of consistency rules, normalizes it, and reconciles its
//! classes, properties and restrictions with a remote resource repository.
//!
//! ## Pipeline
//!
//! ```text
//!  ontology file ──► OntologyGraph ──► OntologyChecker ──► ImportBatch
//!                                          (normalize)          │
//!                                                               ▼
//!                    ObsoleteChildSweeper ◄──── RemoteStore::import_batch
//! ```
//!
//! Restrictions are blank nodes in the source; the checker gives each one a
//! synthetic identifier derived from its content, so re-importing an
//! unchanged ontology performs no remote writes.

pub mod checker;
pub mod config;
pub mod errors;
pub mod import;
pub mod logging;
pub mod ontology;
pub mod repo;

pub use checker::{CheckReport, Diagnostic, EntityChecker, OntologyChecker, Verdict};
pub use config::{Config, ImportSettings, RepositoryConfig, RestrictionIdScheme, Schema};
pub use errors::{Result, SyncError};
pub use import::{
    BinaryOutcome, ImportBatch, ImportReport, ObsoleteChildSweeper, OntologyImporter, OntologyInfo, OwlBinaryUploader,
};
pub use ontology::{OntologyGraph, OwlObjectKind};
pub use repo::{HttpStore, MemoryStore, Metadata, RemoteStore, StoreError, WriteMode};

/// Version of the ontosync library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
