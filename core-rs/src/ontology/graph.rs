/**
 * graph.rs
 * In-memory ontology graph backed by Oxigraph
 *
 * The checker mutates this graph in place (restriction rewrites, owl:Thing
 * edges), so one OntologyGraph is owned exclusively by a single run.
 */

use oxigraph::io::RdfFormat;
use oxigraph::model::{Graph, NamedNode, NamedNodeRef, Subject, SubjectRef, Term, TermRef, Triple, TripleRef};
use oxigraph::store::Store;
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

use super::vocab::{owl, rdf, rdfs, OwlObjectKind};
use crate::config::Schema;
use crate::errors::{Result, SyncError};
use crate::repo::RemoteStore;

#[derive(Debug, Clone, Default)]
pub struct OntologyGraph {
    graph: Graph,
}

/// Object term as a graph node, if it is a named or blank node
pub fn as_subject(term: &Term) -> Option<Subject> {
    match term {
        Term::NamedNode(n) => Some(Subject::NamedNode(n.clone())),
        Term::BlankNode(b) => Some(Subject::BlankNode(b.clone())),
        _ => None,
    }
}

/// Human readable node identifier for diagnostics
pub fn node_str(node: &Subject) -> String {
    match node {
        Subject::NamedNode(n) => n.as_str().to_string(),
        other => other.to_string(),
    }
}

/// Guess the RDF serialization from a media type or file extension
pub fn detect_format(path: &Path, media_type: Option<&str>) -> Result<RdfFormat> {
    if let Some(media_type) = media_type {
        return RdfFormat::from_media_type(media_type)
            .ok_or_else(|| SyncError::UnsupportedFormat(media_type.to_string()));
    }

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "owl" | "rdf" | "xml" => Ok(RdfFormat::RdfXml),
        other => RdfFormat::from_extension(other)
            .ok_or_else(|| SyncError::UnsupportedFormat(path.display().to_string())),
    }
}

impl OntologyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse serialized RDF into a graph
    pub fn parse(format: RdfFormat, data: &[u8]) -> Result<Self> {
        let store = Store::new()?;
        store.load_from_reader(format, data)?;

        let mut graph = Graph::new();
        for quad in store.iter() {
            let triple = Triple::from(quad?);
            graph.insert(&triple);
        }
        Ok(Self { graph })
    }

    /// Load an ontology file and make sure owl:Thing is declared as a class
    pub fn load_file(path: &Path, media_type: Option<&str>) -> Result<Self> {
        if !path.exists() {
            return Err(SyncError::FileNotFound(path.display().to_string()));
        }

        let format = detect_format(path, media_type)?;
        let content = fs::read(path)?;
        let mut graph = Self::parse(format, &content)?;
        graph.ensure_thing_is_class();

        info!("Loaded {} statements from {}", graph.len(), path.display());
        Ok(graph)
    }

    /// Build the graph from the ontology objects already stored in the
    /// repository: every child of the five kind collections, keyed by its
    /// repository URI
    pub async fn load_from_store(store: &dyn RemoteStore, schema: &Schema) -> Result<Self> {
        let mut graph = Self::new();
        for kind in OwlObjectKind::IMPORT_ORDER {
            let children = store.search_by_relation(schema.parent(), kind.iri().as_str()).await?;
            debug!("{} objects stored under {}", children.len(), kind);
            for child in children {
                let subject = Subject::NamedNode(NamedNode::new(&child.uri)?);
                for (p, o) in child.metadata.statements() {
                    graph.insert(&subject, p.as_ref(), o.as_ref());
                }
            }
        }
        Ok(graph)
    }

    pub fn len(&self) -> usize {
        self.graph.len()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.is_empty()
    }

    pub fn inner(&self) -> &Graph {
        &self.graph
    }

    /// Declare owl:Thing as an owl:Class unless the ontology already does
    pub fn ensure_thing_is_class(&mut self) -> bool {
        self.graph.insert(TripleRef::new(owl::THING, rdf::TYPE, owl::CLASS))
    }

    pub fn insert(&mut self, subject: &Subject, predicate: NamedNodeRef<'_>, object: TermRef<'_>) -> bool {
        self.graph.insert(TripleRef::new(subject.as_ref(), predicate, object))
    }

    pub fn remove(&mut self, subject: &Subject, predicate: NamedNodeRef<'_>, object: TermRef<'_>) -> bool {
        self.graph.remove(TripleRef::new(subject.as_ref(), predicate, object))
    }

    /// Remove every statement of `subject` using `predicate`, returning the removed objects
    pub fn remove_all(&mut self, subject: &Subject, predicate: NamedNodeRef<'_>) -> Vec<Term> {
        let objects = self.objects(subject, predicate);
        for o in &objects {
            self.remove(subject, predicate, o.as_ref());
        }
        objects
    }

    pub fn contains(&self, subject: &Subject, predicate: NamedNodeRef<'_>, object: TermRef<'_>) -> bool {
        self.graph.contains(TripleRef::new(subject.as_ref(), predicate, object))
    }

    pub fn objects(&self, subject: &Subject, predicate: NamedNodeRef<'_>) -> Vec<Term> {
        self.graph
            .objects_for_subject_predicate(subject.as_ref(), predicate)
            .map(TermRef::into_owned)
            .collect()
    }

    pub fn object(&self, subject: &Subject, predicate: NamedNodeRef<'_>) -> Option<Term> {
        self.graph
            .object_for_subject_predicate(subject.as_ref(), predicate)
            .map(TermRef::into_owned)
    }

    /// First object of `predicate` that is a graph node (not a literal)
    pub fn node_object(&self, subject: &Subject, predicate: NamedNodeRef<'_>) -> Option<Subject> {
        self.objects(subject, predicate).iter().find_map(as_subject)
    }

    pub fn has_predicate(&self, subject: &Subject, predicate: NamedNodeRef<'_>) -> bool {
        self.graph
            .objects_for_subject_predicate(subject.as_ref(), predicate)
            .next()
            .is_some()
    }

    pub fn subjects(&self, predicate: NamedNodeRef<'_>, object: TermRef<'_>) -> Vec<Subject> {
        let mut subjects: Vec<Subject> = self
            .graph
            .subjects_for_predicate_object(predicate, object)
            .map(SubjectRef::into_owned)
            .collect();
        subjects.sort_by_key(|s| s.to_string());
        subjects
    }

    /// All statements about `subject` as (predicate, object) pairs
    pub fn statements(&self, subject: &Subject) -> Vec<(NamedNode, Term)> {
        self.graph
            .triples_for_subject(subject.as_ref())
            .map(|t| (t.predicate.into_owned(), t.object.into_owned()))
            .collect()
    }

    /// Nodes declared with the given `rdf:type`, in a stable order
    pub fn all_of_type(&self, rdf_type: NamedNodeRef<'_>) -> Vec<Subject> {
        self.subjects(rdf::TYPE, rdf_type.into())
    }

    pub fn has_type(&self, subject: &Subject, rdf_type: NamedNodeRef<'_>) -> bool {
        self.contains(subject, rdf::TYPE, rdf_type.into())
    }

    /// Whether the node appears anywhere in the graph
    pub fn mentions(&self, node: &Subject) -> bool {
        let term = Term::from(node.clone());
        self.graph.triples_for_subject(node.as_ref()).next().is_some()
            || self.graph.triples_for_object(term.as_ref()).next().is_some()
    }

    /// Checks if `what` inherits from `from`
    ///
    /// True when both are the same node, when `from` is one of the universal
    /// roots (owl:Thing, rdfs:Literal), or when `what` inherits from some `X`
    /// with `X rdfs:subClassOf from`. Nodes are visited at most once, so
    /// cyclic hierarchies terminate.
    pub fn does_inherit(&self, what: &Subject, from: &Subject) -> bool {
        let mut visited: HashSet<Subject> = HashSet::new();
        let mut pending = vec![from.clone()];

        while let Some(current) = pending.pop() {
            if &current == what || is_universal_root(&current) {
                return true;
            }
            if !visited.insert(current.clone()) {
                continue;
            }
            let term = Term::from(current);
            pending.extend(
                self.graph
                    .subjects_for_predicate_object(rdfs::SUB_CLASS_OF, term.as_ref())
                    .map(SubjectRef::into_owned)
                    .filter(|s| !visited.contains(s)),
            );
        }
        false
    }
}

fn is_universal_root(node: &Subject) -> bool {
    match node {
        Subject::NamedNode(n) => n.as_ref() == owl::THING || n.as_ref() == rdfs::LITERAL,
        _ => false,
    }
}
