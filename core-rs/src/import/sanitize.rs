//! Turn a checked graph node into repository metadata

use oxigraph::model::vocab::xsd as ox_xsd;
use oxigraph::model::{Literal, NamedNode, Subject, Term};

use crate::config::Schema;
use crate::ontology::OntologyGraph;
use crate::repo::Metadata;

/// Last path or fragment segment of an IRI
pub fn local_name(iri: &str) -> &str {
    iri.rsplit(|c: char| c == '/' || c == '#').next().unwrap_or(iri)
}

/// Copy the statements of `node` into fresh metadata:
/// - empty literals are dropped
/// - plain strings without a language get `default_lang`
/// - blank node objects are dropped
///
/// The identifier and parent are forced to `id` and `parent`, and a label
/// is derived from the identifier when the node has none.
pub fn sanitize(
    graph: &OntologyGraph,
    node: &Subject,
    id: &NamedNode,
    parent: &str,
    schema: &Schema,
    default_lang: &str,
) -> Metadata {
    let mut meta = Metadata::new();

    for (p, o) in graph.statements(node) {
        match o {
            Term::Literal(l) if l.value().is_empty() => {}
            Term::Literal(l) if l.language().is_none() && l.datatype() == ox_xsd::STRING => {
                meta.add_lang_literal(p.as_ref(), l.value(), default_lang);
            }
            Term::BlankNode(_) => {}
            other => {
                meta.add(p.as_ref(), other);
            }
        }
    }

    meta.set(schema.id(), id.clone());
    meta.set(schema.parent(), NamedNode::new_unchecked(parent));

    if meta.literal(schema.label()).is_none() {
        let label = Literal::new_language_tagged_literal(local_name(id.as_str()), default_lang)
            .unwrap_or_else(|_| Literal::new_simple_literal(local_name(id.as_str())));
        meta.add(schema.label(), label);
    }

    meta
}
