//! Import of a checked ontology into the remote store
//!
//! - [`OntologyImporter`] runs one reconciliation: stage, write, sweep
//! - [`ObsoleteChildSweeper`] removes remote objects no longer in the ontology
//! - [`OwlBinaryUploader`] keeps a versioned copy of the owl file

pub mod batch;
pub mod binary;
pub mod importer;
pub mod report;
pub mod sanitize;
pub mod sweeper;

pub use batch::{BatchEntry, ImportBatch};
pub use binary::{BinaryOutcome, OntologyInfo, OwlBinaryUploader};
pub use importer::{get_or_create, OntologyImporter};
pub use report::ImportReport;
pub use sanitize::{local_name, sanitize};
pub use sweeper::ObsoleteChildSweeper;
