//! Error types for ontosync

use thiserror::Error;

use crate::repo::StoreError;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid IRI: {0}")]
    InvalidIri(String),

    #[error("Failed to parse ontology: {0}")]
    OntologyParse(String),

    #[error("Unsupported RDF format: {0}")]
    UnsupportedFormat(String),

    #[error("Fixity hash {0} not supported")]
    UnsupportedFixity(String),

    #[error("Remote store error: {0}")]
    Store(#[from] StoreError),

    #[error("Obsolete children of {container} could not be removed: {}", .outstanding.join(", "))]
    Reconciliation {
        container: String,
        outstanding: Vec<String>,
    },

    #[error("Operation cancelled: {0}")]
    Cancelled(String),
}

impl From<oxigraph::io::RdfParseError> for SyncError {
    fn from(err: oxigraph::io::RdfParseError) -> Self {
        SyncError::OntologyParse(err.to_string())
    }
}

impl From<oxigraph::store::LoaderError> for SyncError {
    fn from(err: oxigraph::store::LoaderError) -> Self {
        SyncError::OntologyParse(err.to_string())
    }
}

impl From<oxigraph::store::StorageError> for SyncError {
    fn from(err: oxigraph::store::StorageError) -> Self {
        SyncError::OntologyParse(err.to_string())
    }
}

impl From<oxigraph::model::IriParseError> for SyncError {
    fn from(err: oxigraph::model::IriParseError) -> Self {
        SyncError::InvalidIri(err.to_string())
    }
}

impl From<reqwest::Error> for SyncError {
    fn from(err: reqwest::Error) -> Self {
        SyncError::Store(StoreError::from(err))
    }
}

impl SyncError {
    /// Fatal errors that must stop a run before it touches the repository
    pub fn is_preflight(&self) -> bool {
        matches!(
            self,
            SyncError::Config(_)
                | SyncError::InvalidIri(_)
                | SyncError::OntologyParse(_)
                | SyncError::UnsupportedFormat(_)
                | SyncError::UnsupportedFixity(_)
                | SyncError::FileNotFound(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
