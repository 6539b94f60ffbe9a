use oxigraph::model::{Subject, Term};

use super::{CheckContext, Verdict};
use crate::ontology::vocab::{owl, rdfs, xsd};
use crate::ontology::{node_str, OntologyGraph};

/// owl:ObjectProperty / owl:DatatypeProperty checker
///
/// Rules are independent; every violation is reported and the verdict is
/// the conjunction of all of them. When the range is missing only the
/// range-independent rules run.
#[derive(Debug, Clone)]
pub struct Property {
    node: Subject,
}

impl Property {
    pub fn new(node: Subject) -> Self {
        Self { node }
    }

    pub fn node(&self) -> &Subject {
        &self.node
    }

    pub fn check(&self, graph: &mut OntologyGraph, ctx: &mut CheckContext<'_>) -> Verdict {
        let node = &self.node;
        let schema = ctx.schema;
        let mut ok = true;

        let is_datatype = graph.has_type(node, owl::DATATYPE_PROPERTY);
        let is_object = graph.has_type(node, owl::OBJECT_PROPERTY);
        // any value marks the property, including `false`
        let lang_tag = graph.has_predicate(node, schema.lang_tag());
        let vocabs = graph.has_predicate(node, schema.vocabs());
        let range = graph.node_object(node, rdfs::RANGE).map(|r| node_str(&r));

        if lang_tag && !is_datatype {
            ctx.report(node, "requires a language tag but it's not a DatatypeProperty");
            ok = false;
        }
        if is_datatype && vocabs {
            ctx.report(node, "is a DatatypeProperty but uses a vocabulary");
            ok = false;
        }
        if graph
            .objects(node, schema.recommended_class())
            .iter()
            .any(|o| matches!(o, Term::Literal(_)))
        {
            ctx.report(node, "recommended class must be a class, not a literal");
            ok = false;
        }

        let Some(range) = range else {
            ctx.report(node, "has an empty range");
            return Verdict::Fail;
        };
        let is_literal_range = xsd::is_literal_type(&range);

        if lang_tag && range != xsd::STRING.as_str() {
            ctx.report(node, format!("requires a language tag but its range {} is not xsd:string", range));
            ok = false;
        }
        if vocabs && range != xsd::ANY_URI.as_str() {
            ctx.report(node, format!("uses vocabulary but its range {} is not xsd:anyURI", range));
            ok = false;
        }
        if is_datatype && !is_literal_range {
            ctx.report(
                node,
                format!("is a DatatypeProperty but its range {} doesn't indicate a literal value", range),
            );
            ok = false;
        }
        // vocabulary values are stored as anyURI literals
        let vocab_exempt = vocabs && range == xsd::ANY_URI.as_str();
        if is_object && is_literal_range && !vocab_exempt {
            ctx.report(
                node,
                format!("is an ObjectProperty but its range {} indicates a literal value", range),
            );
            ok = false;
        }

        if ok {
            Verdict::Pass
        } else {
            Verdict::Fail
        }
    }
}
