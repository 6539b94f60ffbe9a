//! Synthetic restriction identifiers
//!
//! Restrictions are usually blank nodes, so they are imported under an
//! identifier `{ontology namespace}restriction-{suffix}`. The suffix is
//! either a content hash (stable across runs) or a monotonic microsecond
//! timestamp. Identifiers never repeat within a run and never reuse a node
//! already present in the graph.

use chrono::Utc;
use oxigraph::model::{NamedNode, Subject, Term};
use sha2::{Digest, Sha256};
use std::collections::HashSet;

use crate::config::RestrictionIdScheme;
use crate::ontology::{node_str, OntologyGraph};

/// Hex digits of the content hash kept in identifiers
const HASH_LEN: usize = 16;

#[derive(Debug, Clone)]
pub struct RestrictionIdGenerator {
    scheme: RestrictionIdScheme,
    namespace: String,
    issued: HashSet<String>,
    last_micros: i64,
}

impl RestrictionIdGenerator {
    pub fn new(scheme: RestrictionIdScheme, namespace: &str) -> Self {
        Self {
            scheme,
            namespace: namespace.to_string(),
            issued: HashSet::new(),
            last_micros: 0,
        }
    }

    pub fn scheme(&self) -> RestrictionIdScheme {
        self.scheme
    }

    /// Generate an identifier for `restriction`, whose dependent classes are
    /// `dependents`
    pub fn generate(&mut self, graph: &OntologyGraph, restriction: &Subject, dependents: &[Subject]) -> NamedNode {
        let suffix = match self.scheme {
            RestrictionIdScheme::ContentHash => content_hash(graph, restriction, dependents),
            RestrictionIdScheme::Timestamp => self.next_timestamp().to_string(),
        };
        let base = format!("{}restriction-{}", self.namespace, suffix);

        let mut candidate = base.clone();
        let mut n = 1;
        while self.is_taken(graph, &candidate) {
            n += 1;
            candidate = format!("{}-{}", base, n);
        }
        self.issued.insert(candidate.clone());
        NamedNode::new_unchecked(candidate)
    }

    fn is_taken(&self, graph: &OntologyGraph, iri: &str) -> bool {
        self.issued.contains(iri) || graph.mentions(&Subject::NamedNode(NamedNode::new_unchecked(iri)))
    }

    fn next_timestamp(&mut self) -> i64 {
        let now = Utc::now().timestamp_micros();
        self.last_micros = if now > self.last_micros { now } else { self.last_micros + 1 };
        self.last_micros
    }
}

/// Hash over the restriction's statements and its dependents. Blank node
/// labels change between parses, so blank objects and blank dependents
/// hash as `_:`.
fn content_hash(graph: &OntologyGraph, restriction: &Subject, dependents: &[Subject]) -> String {
    let mut lines: Vec<String> = graph
        .statements(restriction)
        .into_iter()
        .map(|(p, o)| {
            let object = match o {
                Term::BlankNode(_) => "_:".to_string(),
                other => other.to_string(),
            };
            format!("{} {}", p, object)
        })
        .collect();
    lines.extend(dependents.iter().map(|d| match d {
        Subject::BlankNode(_) => "^ _:".to_string(),
        named => format!("^ {}", node_str(named)),
    }));
    lines.sort();

    let mut hasher = Sha256::new();
    for line in &lines {
        hasher.update(line.as_bytes());
        hasher.update(b"\n");
    }
    let digest = hex::encode(hasher.finalize());
    digest[..HASH_LEN].to_string()
}
