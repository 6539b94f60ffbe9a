/**
 * binary.rs
 * Versioned upload of the ontology's owl file
 *
 * The current owl binary is identified by the ontology namespace without its
 * trailing separator. A new upload is compared with it through the fixity
 * hash the repository stores (`md5:`, `sha1:` or `sha256:`). When they
 * differ the file is uploaded as a new resource which takes the current
 * identifier over and points back at its predecessor.
 */

use chrono::{DateTime, NaiveDate, Utc};
use md5::Md5;
use oxigraph::model::vocab::xsd as ox_xsd;
use oxigraph::model::{Literal, NamedNode};
use regex::Regex;
use sha1::Sha1;
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::Path;
use tracing::{info, warn};

use super::importer::get_or_create;
use crate::config::{Config, Schema};
use crate::errors::{Result, SyncError};
use crate::repo::{BinaryPayload, Metadata, RemoteStore, StoreError, WriteMode};

/// Descriptive values attached to an uploaded owl binary
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OntologyInfo {
    pub version: Option<String>,
    /// `YYYY-MM-DD` or RFC 3339
    pub date: Option<String>,
    pub url: Option<String>,
    pub info: Option<String>,
}

impl OntologyInfo {
    pub fn is_empty(&self) -> bool {
        self.version.is_none() && self.date.is_none() && self.url.is_none() && self.info.is_none()
    }

    /// Add the values to `meta` under the predicates configured in `schema`.
    /// Values whose role has no predicate configured are ignored.
    pub fn apply(&self, meta: &mut Metadata, schema: &Schema) -> Result<()> {
        if let Some(date) = &self.date {
            let value = parse_date(date)?;
            for role in [&schema.date_start, &schema.date_end] {
                if let Some(p) = Schema::optional(role) {
                    meta.set(p, Literal::new_typed_literal(value.clone(), ox_xsd::DATE_TIME));
                }
            }
        }

        if let Some(url) = &self.url {
            NamedNode::new(url.as_str())
                .map_err(|e| SyncError::Config(format!("ontology url {} is not a valid IRI: {}", url, e)))?;
            if let Some(p) = Schema::optional(&schema.url) {
                meta.set(p, Literal::new_typed_literal(url.as_str(), ox_xsd::ANY_URI));
            }
        }

        if let Some(version) = &self.version {
            if let Some(p) = Schema::optional(&schema.version) {
                meta.set(p, Literal::new_simple_literal(version.as_str()));
            }
        }

        if let Some(info) = &self.info {
            if let Some(p) = Schema::optional(&schema.info) {
                meta.remove_all(p);
                meta.add_lang_literal(p, info, "und");
            }
        }

        Ok(())
    }
}

fn parse_date(value: &str) -> Result<String> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc).format("%Y-%m-%dT%H:%M:%SZ").to_string());
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map(|d| format!("{}T00:00:00Z", d.format("%Y-%m-%d")))
        .map_err(|e| SyncError::Config(format!("invalid ontology date {}: {}", value, e)))
}

/// What an upload did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BinaryOutcome {
    /// No owl binary existed, it was created
    Created(String),
    /// The file changed and was uploaded as a new version
    NewVersion { previous: String, current: String },
    /// The stored binary already matches the file
    UpToDate(String),
}

impl fmt::Display for BinaryOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BinaryOutcome::Created(uri) => write!(f, "created {}", uri),
            BinaryOutcome::NewVersion { previous, current } => {
                write!(f, "new version {} (previous {})", current, previous)
            }
            BinaryOutcome::UpToDate(uri) => write!(f, "up to date {}", uri),
        }
    }
}

fn hex_digest<D: Digest>(data: &[u8]) -> String {
    hex::encode(D::digest(data))
}

/// Whether `data` matches a `scheme:hex` fixity hash
pub fn fixity_matches(hash: &str, data: &[u8]) -> Result<bool> {
    let re = Regex::new(r"^(md5|sha1|sha256):([0-9a-fA-F]+)$")
        .map_err(|e| SyncError::Config(format!("Invalid regex: {}", e)))?;
    let caps = re
        .captures(hash)
        .ok_or_else(|| SyncError::UnsupportedFixity(hash.to_string()))?;

    let expected = caps[2].to_ascii_lowercase();
    let actual = match &caps[1] {
        "md5" => hex_digest::<Md5>(data),
        "sha1" => hex_digest::<Sha1>(data),
        _ => hex_digest::<Sha256>(data),
    };
    Ok(actual == expected)
}

fn media_type_for(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("ttl") => "text/turtle",
        Some("nt") => "application/n-triples",
        Some("jsonld") => "application/ld+json",
        _ => "application/rdf+xml",
    }
}

pub struct OwlBinaryUploader<'a> {
    config: &'a Config,
}

impl<'a> OwlBinaryUploader<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self { config }
    }

    /// Identifier of the collection holding every owl binary version
    pub fn collection_id(&self) -> String {
        match &self.config.import.binary_collection {
            Some(id) => id.clone(),
            None => format!("{}ontology-binaries", self.config.schema.namespaces.id),
        }
    }

    /// Identifier of the current owl binary
    pub fn current_id(&self) -> String {
        self.config
            .schema
            .namespaces
            .ontology
            .trim_end_matches(|c| c == '#' || c == '/')
            .to_string()
    }

    pub async fn upload(&self, store: &dyn RemoteStore, owl_path: &Path, info: &OntologyInfo) -> Result<BinaryOutcome> {
        let schema = &self.config.schema;
        info!("updating the owl binary");

        let coll_id = self.collection_id();
        let mut coll_meta = Metadata::new();
        coll_meta.add_node(schema.id(), &coll_id);
        coll_meta.add_lang_literal(schema.label(), "Ontology binaries", "en");
        let coll = get_or_create(store, &coll_id, coll_meta).await?;

        let cur_id = NamedNode::new(self.current_id())?;
        let version_id = format!("{}/{}", cur_id.as_str(), Utc::now().format("%Y-%m-%d_%H:%M:%S"));

        let mut new_meta = Metadata::new();
        new_meta.add_node(schema.id(), &version_id);
        new_meta.add_lang_literal(schema.label(), "Ontology owl file", "en");
        new_meta.add_node(schema.parent(), &coll.uri);
        if let (Some(p), Some(access)) = (
            Schema::optional(&schema.access_restriction),
            &self.config.import.binary_access,
        ) {
            new_meta.add_node(p, access);
        }
        info.apply(&mut new_meta, schema)?;

        let payload = BinaryPayload::from_file(owl_path, media_type_for(owl_path))?;

        let old = match store.get_resource_by_id(cur_id.as_str()).await {
            Ok(old) => old,
            Err(StoreError::NotFound(_)) => {
                info!("no owl binary - creating");
                new_meta.add(schema.id(), cur_id);
                let created = store.create_resource(&new_meta, Some(payload)).await?;
                return Ok(BinaryOutcome::Created(created.uri));
            }
            Err(e) => return Err(e.into()),
        };

        let up_to_date = match old.metadata.literal(schema.hash()) {
            Some(hash) => fixity_matches(hash.value(), &payload.data)?,
            None => {
                warn!("owl binary {} has no fixity hash", old.uri);
                false
            }
        };
        if up_to_date {
            info!("owl binary up to date");
            return Ok(BinaryOutcome::UpToDate(old.uri));
        }

        info!("uploading a new owl binary version");
        let new = store.create_resource(&new_meta, Some(payload)).await?;

        // the old version must lose the current identifier before the new one takes it
        let mut old_meta = old.metadata.clone();
        old_meta.remove(schema.id(), cur_id.as_ref().into());
        store.update_metadata(&old.uri, &old_meta, WriteMode::Overwrite).await?;

        new_meta.add(schema.id(), cur_id);
        new_meta.add_node(schema.is_new_version_of(), &old.uri);
        let new = store.update_metadata(&new.uri, &new_meta, WriteMode::Merge).await?;
        info!("    {}", new.uri);

        Ok(BinaryOutcome::NewVersion {
            previous: old.uri,
            current: new.uri,
        })
    }
}
