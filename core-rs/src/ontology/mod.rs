/**
 * ontology module
 *
 * - vocab: OWL/RDF/RDFS/XSD terms and the importable object kinds
 * - graph: in-memory ontology graph (Oxigraph), loading and inheritance test
 */

pub mod graph;
pub mod vocab;

pub use graph::{as_subject, detect_format, node_str, OntologyGraph};
pub use vocab::OwlObjectKind;
