/**
 * config.rs
 * Parser for the ontosync YAML configuration file
 *
 * Format:
 * ```yaml
 * schema:
 *   id: https://vocabs.example.org/schema#hasIdentifier
 *   parent: https://vocabs.example.org/schema#isPartOf
 *   label: https://vocabs.example.org/schema#hasTitle
 *   hash: https://vocabs.example.org/schema#hasHash
 *   isNewVersionOf: https://vocabs.example.org/schema#isNewVersionOf
 *   namespaces:
 *     id: https://id.example.org/
 *     ontology: https://vocabs.example.org/schema#
 *   ontology:
 *     vocabs: https://vocabs.example.org/schema#vocabs
 *     langTag: https://vocabs.example.org/schema#langTag
 *     recommendedClass: https://vocabs.example.org/schema#recommendedClass
 *     defaultValue: https://vocabs.example.org/schema#defaultValue
 * import:
 *   concurrency: 3
 *   retryBudget: 3
 *   defaultLang: en
 *   restrictionIds: contentHash
 * repository:
 *   url: https://repo.example.org/api
 *   user: admin
 * ```
 */

use oxigraph::model::{NamedNode, NamedNodeRef};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::errors::SyncError;

/// Default number of concurrently running remote requests
pub const DEFAULT_CONCURRENCY: usize = 3;

/// Default language attached to language-less string literals
pub const DEFAULT_LANG: &str = "en";

/// ontosync configuration file structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    pub schema: Schema,
    #[serde(default)]
    pub import: ImportSettings,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repository: Option<RepositoryConfig>,
}

/// Mapping of semantic roles to the predicate IRIs used by the repository
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Schema {
    pub id: String,
    pub parent: String,
    pub label: String,
    pub hash: String,
    pub is_new_version_of: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_restriction: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_start: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_end: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub info: Option<String>,
    pub namespaces: Namespaces,
    pub ontology: OntologyAnnotations,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Namespaces {
    pub id: String,
    pub ontology: String,
}

/// Annotation properties the ontology uses to describe its own properties
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OntologyAnnotations {
    pub vocabs: String,
    pub lang_tag: String,
    pub recommended_class: String,
    pub default_value: String,
}

/// How synthetic restriction identifiers are generated
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum RestrictionIdScheme {
    /// Hash of the restriction's normalized statements, stable across runs
    #[default]
    ContentHash,
    /// Monotonic microsecond timestamp
    Timestamp,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ImportSettings {
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Delete retry rounds; falls back to `concurrency`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_budget: Option<usize>,
    #[serde(default = "default_lang")]
    pub default_lang: String,
    #[serde(default)]
    pub restriction_ids: RestrictionIdScheme,
    /// Identifier of the collection storing owl binaries
    #[serde(skip_serializing_if = "Option::is_none")]
    pub binary_collection: Option<String>,
    /// Access restriction value attached to uploaded owl binaries
    #[serde(skip_serializing_if = "Option::is_none")]
    pub binary_access: Option<String>,
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            retry_budget: None,
            default_lang: DEFAULT_LANG.to_string(),
            restriction_ids: RestrictionIdScheme::default(),
            binary_collection: None,
            binary_access: None,
        }
    }
}

impl ImportSettings {
    pub fn retry_budget(&self) -> usize {
        self.retry_budget.unwrap_or(self.concurrency)
    }
}

/// Remote repository connection settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryConfig {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    /// Predicate prefixes maintained by the repository itself; ignored when
    /// deciding whether a remote object is up to date
    #[serde(default)]
    pub managed_prefixes: Vec<String>,
}

fn default_concurrency() -> usize {
    DEFAULT_CONCURRENCY
}

fn default_lang() -> String {
    DEFAULT_LANG.to_string()
}

fn check_iri(role: &str, value: &str) -> Result<(), SyncError> {
    NamedNode::new(value)
        .map(|_| ())
        .map_err(|e| SyncError::Config(format!("{} is not a valid IRI ({}): {}", role, value, e)))
}

impl Config {
    /// Load a configuration file
    ///
    /// # Arguments
    /// * `path` - Path to the YAML configuration
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, SyncError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(SyncError::FileNotFound(path.to_string_lossy().to_string()));
        }

        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self, SyncError> {
        let config: Config = serde_yaml::from_str(content)
            .map_err(|e| SyncError::Config(format!("Invalid configuration YAML: {}", e)))?;

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration structure
    ///
    /// Ensures:
    /// - every schema role is an absolute IRI
    /// - namespaces are non-empty absolute IRIs
    /// - concurrency is at least 1
    pub fn validate(&self) -> Result<(), SyncError> {
        self.schema.validate()?;

        if self.import.concurrency == 0 {
            return Err(SyncError::Config("import.concurrency must be at least 1".to_string()));
        }

        if self.import.default_lang.is_empty() {
            return Err(SyncError::Config("import.defaultLang cannot be empty".to_string()));
        }

        if let Some(coll) = &self.import.binary_collection {
            check_iri("import.binaryCollection", coll)?;
        }

        if let Some(repo) = &self.repository {
            if repo.url.is_empty() {
                return Err(SyncError::Config("repository.url cannot be empty".to_string()));
            }
        }

        Ok(())
    }
}

impl Schema {
    pub fn validate(&self) -> Result<(), SyncError> {
        let required = [
            ("schema.id", &self.id),
            ("schema.parent", &self.parent),
            ("schema.label", &self.label),
            ("schema.hash", &self.hash),
            ("schema.isNewVersionOf", &self.is_new_version_of),
            ("schema.ontology.vocabs", &self.ontology.vocabs),
            ("schema.ontology.langTag", &self.ontology.lang_tag),
            ("schema.ontology.recommendedClass", &self.ontology.recommended_class),
            ("schema.ontology.defaultValue", &self.ontology.default_value),
        ];
        for (role, value) in required {
            check_iri(role, value)?;
        }

        let optional = [
            ("schema.accessRestriction", &self.access_restriction),
            ("schema.dateStart", &self.date_start),
            ("schema.dateEnd", &self.date_end),
            ("schema.url", &self.url),
            ("schema.version", &self.version),
            ("schema.info", &self.info),
        ];
        for (role, value) in optional {
            if let Some(value) = value {
                check_iri(role, value)?;
            }
        }

        if self.namespaces.ontology.is_empty() {
            return Err(SyncError::Config("schema.namespaces.ontology cannot be empty".to_string()));
        }
        if self.namespaces.id.is_empty() {
            return Err(SyncError::Config("schema.namespaces.id cannot be empty".to_string()));
        }
        // synthetic restriction ids and the ontology root are built on these
        check_iri("schema.namespaces.ontology", &self.namespaces.ontology)?;
        check_iri("schema.namespaces.id", &self.namespaces.id)?;

        Ok(())
    }

    // Accessors below rely on validate() having accepted every IRI.

    pub fn id(&self) -> NamedNodeRef<'_> {
        NamedNodeRef::new_unchecked(&self.id)
    }

    pub fn parent(&self) -> NamedNodeRef<'_> {
        NamedNodeRef::new_unchecked(&self.parent)
    }

    pub fn label(&self) -> NamedNodeRef<'_> {
        NamedNodeRef::new_unchecked(&self.label)
    }

    pub fn hash(&self) -> NamedNodeRef<'_> {
        NamedNodeRef::new_unchecked(&self.hash)
    }

    pub fn is_new_version_of(&self) -> NamedNodeRef<'_> {
        NamedNodeRef::new_unchecked(&self.is_new_version_of)
    }

    pub fn vocabs(&self) -> NamedNodeRef<'_> {
        NamedNodeRef::new_unchecked(&self.ontology.vocabs)
    }

    pub fn lang_tag(&self) -> NamedNodeRef<'_> {
        NamedNodeRef::new_unchecked(&self.ontology.lang_tag)
    }

    pub fn recommended_class(&self) -> NamedNodeRef<'_> {
        NamedNodeRef::new_unchecked(&self.ontology.recommended_class)
    }

    pub fn default_value(&self) -> NamedNodeRef<'_> {
        NamedNodeRef::new_unchecked(&self.ontology.default_value)
    }

    /// Predicate for an optional role, if configured
    pub fn optional(value: &Option<String>) -> Option<NamedNodeRef<'_>> {
        value.as_deref().map(NamedNodeRef::new_unchecked)
    }

    /// Identifier of the top-level ontology collection
    pub fn ontology_root(&self) -> String {
        format!("{}ontology", self.namespaces.ontology)
    }
}
