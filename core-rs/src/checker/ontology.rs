//! OntologyChecker: runs the entity checkers over a whole graph
//!
//! Two entry points:
//! - [`OntologyChecker::check`] validates restrictions and properties and
//!   backs the `check` command
//! - [`OntologyChecker::prepare`] checks every importable node kind by kind
//!   and decides which nodes get imported under which identifier

use oxigraph::model::Subject;
use serde::Serialize;
use std::collections::HashSet;
use tracing::{debug, info};

use super::{CheckContext, Diagnostic, EntityChecker, Property, Restriction, Verdict};
use crate::config::{RestrictionIdScheme, Schema};
use crate::ontology::vocab::owl;
use crate::ontology::{node_str, OntologyGraph, OwlObjectKind};

/// Result of [`OntologyChecker::check`]
#[derive(Debug, Clone, Default, Serialize)]
pub struct CheckReport {
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub diagnostics: Vec<Diagnostic>,
}

impl CheckReport {
    pub fn is_valid(&self) -> bool {
        self.failed == 0
    }

    fn record(&mut self, verdict: Verdict) {
        match verdict {
            Verdict::Pass => self.passed += 1,
            Verdict::Fail => self.failed += 1,
            Verdict::Skip => self.skipped += 1,
        }
    }
}

/// Import decision for one checked node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityStatus {
    Accepted,
    /// Failed validation
    Rejected,
    /// Resolved to a blank node
    Anonymous,
    /// Identifier already taken earlier in the run
    Duplicate,
}

#[derive(Debug, Clone)]
pub struct CheckedEntity {
    pub kind: OwlObjectKind,
    pub node: Subject,
    pub id: Subject,
    pub verdict: Verdict,
    pub status: EntityStatus,
}

pub struct OntologyChecker<'a> {
    graph: &'a mut OntologyGraph,
    ctx: CheckContext<'a>,
}

impl<'a> OntologyChecker<'a> {
    pub fn new(graph: &'a mut OntologyGraph, schema: &'a Schema, scheme: RestrictionIdScheme) -> Self {
        Self {
            graph,
            ctx: CheckContext::new(schema, scheme),
        }
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        self.ctx.diagnostics()
    }

    /// Check all restrictions, then object and datatype properties.
    /// With `property_namespace` only properties whose IRI starts with it
    /// are checked, the rest are skipped.
    pub fn check(&mut self, property_namespace: Option<&str>) -> CheckReport {
        let mut report = CheckReport::default();

        for node in self.graph.all_of_type(owl::RESTRICTION) {
            let verdict = Restriction::new(node).check(self.graph, &mut self.ctx);
            report.record(verdict);
        }

        for kind in [owl::DATATYPE_PROPERTY, owl::OBJECT_PROPERTY] {
            for node in self.graph.all_of_type(kind) {
                let in_scope = match property_namespace {
                    Some(ns) => node_str(&node).starts_with(ns),
                    None => true,
                };
                let verdict = if in_scope {
                    Property::new(node).check(self.graph, &mut self.ctx)
                } else {
                    Verdict::Skip
                };
                report.record(verdict);
            }
        }

        report.diagnostics = self.ctx.take_diagnostics();
        info!(
            "checked {} nodes: {} passed, {} failed, {} skipped",
            report.passed + report.failed + report.skipped,
            report.passed,
            report.failed,
            report.skipped
        );
        report
    }

    /// Check every node of every importable kind, in import order, and
    /// decide what gets imported. The graph is fully normalized once this
    /// returns.
    pub fn prepare(&mut self) -> Vec<CheckedEntity> {
        let mut seen: HashSet<Subject> = HashSet::new();
        let mut entities = Vec::new();

        for kind in OwlObjectKind::IMPORT_ORDER {
            info!("checking {}", kind);
            for node in self.graph.all_of_type(kind.iri()) {
                let mut checker = EntityChecker::for_kind(kind, node.clone());
                let verdict = checker.check(self.graph, &mut self.ctx);
                let id = checker.id();

                let status = if matches!(id, Subject::BlankNode(_)) {
                    debug!("skipping an anonymous {} {}", kind, node_str(&node));
                    EntityStatus::Anonymous
                } else if !seen.insert(id.clone()) {
                    info!("skipping a duplicated resource {}", node_str(&id));
                    EntityStatus::Duplicate
                } else if verdict.is_pass() {
                    EntityStatus::Accepted
                } else {
                    info!("rejecting {}", node_str(&id));
                    EntityStatus::Rejected
                };

                entities.push(CheckedEntity {
                    kind,
                    node,
                    id,
                    verdict,
                    status,
                });
            }
        }
        entities
    }
}
