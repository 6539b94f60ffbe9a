//! Ontology consistency checking and normalization
//!
//! Each graph node is checked by an [`EntityChecker`] chosen from its
//! declared OWL type:
//! - `Plain` - annotation properties, always accepted
//! - `Class` - adds `rdfs:subClassOf owl:Thing` to top-level classes
//! - `Property` - range, language tag and vocabulary rules
//! - `Restriction` - validates the restriction and rewrites its dependents
//!   to a synthetic identifier
//!
//! [`OntologyChecker`] drives the checkers over a whole graph.

pub mod class;
pub mod ids;
pub mod ontology;
pub mod property;
pub mod restriction;

pub use class::RdfClass;
pub use ids::RestrictionIdGenerator;
pub use ontology::{CheckReport, CheckedEntity, EntityStatus, OntologyChecker};
pub use property::Property;
pub use restriction::Restriction;

use oxigraph::model::Subject;
use serde::Serialize;
use std::fmt;
use tracing::warn;

use crate::config::{RestrictionIdScheme, Schema};
use crate::ontology::{node_str, OntologyGraph, OwlObjectKind};

/// Outcome of checking a single node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    /// Import the node
    Pass,
    /// Validation failure, the node is excluded
    Fail,
    /// Excluded without a diagnostic
    Skip,
}

impl Verdict {
    pub fn is_pass(self) -> bool {
        self == Verdict::Pass
    }
}

/// A validation problem found on one node
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub node: String,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.node, self.message)
    }
}

/// State shared by all checkers during one run
pub struct CheckContext<'a> {
    pub schema: &'a Schema,
    pub ids: RestrictionIdGenerator,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> CheckContext<'a> {
    pub fn new(schema: &'a Schema, scheme: RestrictionIdScheme) -> Self {
        Self {
            schema,
            ids: RestrictionIdGenerator::new(scheme, &schema.namespaces.ontology),
            diagnostics: Vec::new(),
        }
    }

    /// Record a diagnostic about `node`
    pub fn report(&mut self, node: &Subject, message: impl Into<String>) {
        let diagnostic = Diagnostic {
            node: node_str(node),
            message: message.into(),
        };
        warn!("{}", diagnostic);
        self.diagnostics.push(diagnostic);
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diagnostics)
    }
}

/// Checker variant for one graph node, selected by its declared type
#[derive(Debug)]
pub enum EntityChecker {
    Plain(Subject),
    Class(RdfClass),
    Property(Property),
    Restriction(Restriction),
}

impl EntityChecker {
    pub fn for_kind(kind: OwlObjectKind, node: Subject) -> Self {
        match kind {
            OwlObjectKind::Class => EntityChecker::Class(RdfClass::new(node)),
            OwlObjectKind::ObjectProperty | OwlObjectKind::DatatypeProperty => {
                EntityChecker::Property(Property::new(node))
            }
            OwlObjectKind::Restriction => EntityChecker::Restriction(Restriction::new(node)),
            OwlObjectKind::AnnotationProperty => EntityChecker::Plain(node),
        }
    }

    pub fn node(&self) -> &Subject {
        match self {
            EntityChecker::Plain(node) => node,
            EntityChecker::Class(c) => c.node(),
            EntityChecker::Property(p) => p.node(),
            EntityChecker::Restriction(r) => r.node(),
        }
    }

    /// Check the node. May mutate the graph.
    pub fn check(&mut self, graph: &mut OntologyGraph, ctx: &mut CheckContext<'_>) -> Verdict {
        match self {
            EntityChecker::Plain(_) => Verdict::Pass,
            EntityChecker::Class(c) => c.check(graph),
            EntityChecker::Property(p) => p.check(graph, ctx),
            EntityChecker::Restriction(r) => r.check(graph, ctx),
        }
    }

    /// Identifier to import the node under
    pub fn id(&self) -> Subject {
        match self {
            EntityChecker::Restriction(r) => r.id(),
            other => other.node().clone(),
        }
    }
}
