/**
 * restriction.rs
 * owl:Restriction checker
 *
 * A restriction passes when:
 * - at least one class inherits from it (`C rdfs:subClassOf R`)
 * - its owl:onProperty property has both rdfs:domain and rdfs:range
 * - every inheriting class inherits from the property's domain
 * - its cardinality is exactly 1, at most 1, or at least 0 or 1
 * - it does not make a property with a default value mandatory
 *
 * Qualified cardinalities are simplified to plain ones. A passing
 * restriction gets a synthetic identifier and every `C rdfs:subClassOf R`
 * edge is rewritten to point at it.
 */

use oxigraph::model::{NamedNode, NamedNodeRef, Subject, Term};
use tracing::info;

use super::{CheckContext, Verdict};
use crate::ontology::vocab::{owl, rdfs};
use crate::ontology::{node_str, OntologyGraph};

#[derive(Debug, Clone)]
pub struct Restriction {
    node: Subject,
    synthetic_id: Option<NamedNode>,
}

/// Cardinality bounds declared on a restriction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Bounds {
    exact: Option<u64>,
    min: Option<u64>,
    max: Option<u64>,
}

impl Bounds {
    fn is_mandatory(&self) -> bool {
        self.exact == Some(1) || self.min.is_some_and(|m| m >= 1)
    }
}

impl Restriction {
    pub fn new(node: Subject) -> Self {
        Self { node, synthetic_id: None }
    }

    pub fn node(&self) -> &Subject {
        &self.node
    }

    /// Synthetic identifier once the restriction passed, the node otherwise
    pub fn id(&self) -> Subject {
        match &self.synthetic_id {
            Some(id) => Subject::NamedNode(id.clone()),
            None => self.node.clone(),
        }
    }

    pub fn synthetic_id(&self) -> Option<&NamedNode> {
        self.synthetic_id.as_ref()
    }

    pub fn check(&mut self, graph: &mut OntologyGraph, ctx: &mut CheckContext<'_>) -> Verdict {
        let node = self.node.clone();
        let node_term = Term::from(node.clone());

        let dependents = graph.subjects(rdfs::SUB_CLASS_OF, node_term.as_ref());
        if dependents.is_empty() {
            ctx.report(&node, "no classes inherit from the restriction");
            return Verdict::Fail;
        }

        let Some(property) = graph.node_object(&node, owl::ON_PROPERTY) else {
            ctx.report(&node, "it lacks owl:onProperty");
            // without a property there is no domain to check the dependents against
            ctx.report(&node, "property (none) has no rdfs:domain");
            return Verdict::Fail;
        };
        let property_str = node_str(&property);
        let Some(domain) = graph.node_object(&property, rdfs::DOMAIN) else {
            ctx.report(&node, format!("property {} has no rdfs:domain", property_str));
            return Verdict::Fail;
        };
        if graph.node_object(&property, rdfs::RANGE).is_none() {
            ctx.report(&node, format!("property {} has no rdfs:range", property_str));
            return Verdict::Fail;
        }

        let mut ok = true;
        for class in &dependents {
            if !graph.does_inherit(class, &domain) {
                ctx.report(
                    &node,
                    format!(
                        "restriction for class {} and property {} - the class is not a subclass of property's domain ({})",
                        node_str(class),
                        property_str,
                        node_str(&domain)
                    ),
                );
                ok = false;
            }
        }
        if !ok {
            return Verdict::Fail;
        }

        self.simplify(graph);

        let bounds = match self.bounds(graph, ctx) {
            Some(bounds) => bounds,
            None => return Verdict::Fail,
        };

        if bounds.is_mandatory() && graph.has_predicate(&property, ctx.schema.default_value()) {
            ctx.report(
                &node,
                format!("property {} has a default value but the restriction makes it mandatory", property_str),
            );
            return Verdict::Fail;
        }

        let id = ctx.ids.generate(graph, &node, &dependents);
        let id_term = Term::from(id.clone());
        for class in &dependents {
            graph.remove(class, rdfs::SUB_CLASS_OF, node_term.as_ref());
            graph.insert(class, rdfs::SUB_CLASS_OF, id_term.as_ref());
        }
        info!("restriction {} imported as {}", node_str(&node), id.as_str());
        self.synthetic_id = Some(id);

        Verdict::Pass
    }

    /// Drop owl:onClass / owl:onDataRange and turn qualified cardinalities
    /// into plain ones
    fn simplify(&self, graph: &mut OntologyGraph) {
        let mut changed = !graph.remove_all(&self.node, owl::ON_CLASS).is_empty();
        changed |= !graph.remove_all(&self.node, owl::ON_DATA_RANGE).is_empty();
        for (qualified, plain) in owl::QUALIFIED_TO_PLAIN {
            for value in graph.remove_all(&self.node, qualified) {
                graph.insert(&self.node, plain, value.as_ref());
                changed = true;
            }
        }
        if changed {
            info!("simplifying {}", node_str(&self.node));
        }
    }

    /// Read and validate the cardinality bounds, reporting every invalid one
    fn bounds(&self, graph: &OntologyGraph, ctx: &mut CheckContext<'_>) -> Option<Bounds> {
        let mut bounds = Bounds::default();
        let mut ok = true;

        let checks: [(NamedNodeRef<'_>, &str, &[u64]); 3] = [
            (owl::CARDINALITY, "cardinality", &[1]),
            (owl::MIN_CARDINALITY, "min cardinality", &[0, 1]),
            (owl::MAX_CARDINALITY, "max cardinality", &[1]),
        ];
        for (predicate, name, allowed) in checks {
            for value in graph.objects(&self.node, predicate) {
                let parsed = match &value {
                    Term::Literal(l) => l.value().trim().parse::<u64>().ok(),
                    _ => None,
                };
                match parsed {
                    Some(n) if allowed.contains(&n) => {
                        let slot = match predicate {
                            p if p == owl::CARDINALITY => &mut bounds.exact,
                            p if p == owl::MIN_CARDINALITY => &mut bounds.min,
                            _ => &mut bounds.max,
                        };
                        *slot = Some(slot.map_or(n, |old| old.max(n)));
                    }
                    Some(n) => {
                        ctx.report(&self.node, format!("unsupported {} {}", name, n));
                        ok = false;
                    }
                    None => {
                        ctx.report(&self.node, format!("{} {} is not a non-negative integer", name, value));
                        ok = false;
                    }
                }
            }
        }

        ok.then_some(bounds)
    }
}
