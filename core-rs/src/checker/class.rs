use oxigraph::model::Subject;

use super::Verdict;
use crate::ontology::vocab::{owl, rdfs};
use crate::ontology::{as_subject, OntologyGraph};

/// owl:Class checker
///
/// A class is top-level when none of its superclasses is typed owl:Class.
/// Top-level classes other than owl:Thing get an explicit
/// `rdfs:subClassOf owl:Thing`. Classes always pass.
#[derive(Debug, Clone)]
pub struct RdfClass {
    node: Subject,
}

impl RdfClass {
    pub fn new(node: Subject) -> Self {
        Self { node }
    }

    pub fn node(&self) -> &Subject {
        &self.node
    }

    pub fn is_top_level(&self, graph: &OntologyGraph) -> bool {
        !graph
            .objects(&self.node, rdfs::SUB_CLASS_OF)
            .iter()
            .filter_map(as_subject)
            .any(|parent| graph.has_type(&parent, owl::CLASS))
    }

    pub fn check(&self, graph: &mut OntologyGraph) -> Verdict {
        let is_thing = matches!(&self.node, Subject::NamedNode(n) if n.as_ref() == owl::THING);
        if !is_thing && self.is_top_level(graph) {
            graph.insert(&self.node, rdfs::SUB_CLASS_OF, owl::THING.into());
        }
        Verdict::Pass
    }
}
