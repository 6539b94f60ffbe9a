// Validation Rule Contract Tests
//
// The rules deciding which properties and restrictions may be imported.
// Repository forms depend on them; loosening one lets broken metadata in.

use ontosync_core::{Config, OntologyChecker, OntologyGraph, RestrictionIdScheme};

const CONFIG: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/core-rs/tests/fixtures/config.yaml"));

fn failures(body: &str) -> usize {
    let config = Config::from_yaml(CONFIG).unwrap();
    let ttl = format!(
        "@prefix owl: <http://www.w3.org/2002/07/owl#> .\n\
         @prefix rdfs: <http://www.w3.org/2000/01/rdf-schema#> .\n\
         @prefix xsd: <http://www.w3.org/2001/XMLSchema#> .\n\
         @prefix : <https://vocabs.example.org/schema#> .\n{}",
        body
    );
    let mut graph = OntologyGraph::parse(oxigraph::io::RdfFormat::Turtle, ttl.as_bytes()).unwrap();
    graph.ensure_thing_is_class();
    OntologyChecker::new(&mut graph, &config.schema, RestrictionIdScheme::ContentHash)
        .check(None)
        .failed
}

/// WHY: A restriction nobody inherits from cannot be attached anywhere
/// BREAKS: Orphan restrictions pile up in the repository
#[test]
fn restriction_without_dependents_fails() {
    assert_eq!(
        failures(":p a owl:DatatypeProperty ; rdfs:domain :A ; rdfs:range xsd:string .\n[] a owl:Restriction ; owl:onProperty :p ; owl:maxCardinality 1 ."),
        1
    );
}

/// WHY: anyURI datatype properties without vocabularies are plain links
#[test]
fn datatype_property_with_any_uri_passes() {
    assert_eq!(failures(":p a owl:DatatypeProperty ; rdfs:range xsd:anyURI ."), 0);
}

/// WHY: Object properties must point at resources, not literals
/// BREAKS: Repository forms render a text box for a relation
#[test]
fn object_property_with_string_range_fails() {
    assert_eq!(failures(":p a owl:ObjectProperty ; rdfs:range xsd:string ."), 1);
}

/// WHY: Cardinalities above one are not supported by the repository
/// ALLOWED: exact 1, min 0 or 1, max 1
#[test]
fn cardinality_bounds_are_fixed() {
    let header = ":A a owl:Class ; rdfs:subClassOf [ a owl:Restriction ; owl:onProperty :p ; ";
    let property = " ] .\n:p a owl:DatatypeProperty ; rdfs:domain :A ; rdfs:range xsd:string .";
    for (cardinality, failed) in [
        ("owl:cardinality 1", 0),
        ("owl:cardinality 2", 1),
        ("owl:minCardinality 0", 0),
        ("owl:minCardinality 2", 1),
        ("owl:maxCardinality 1", 0),
        ("owl:maxCardinality 3", 1),
        ("owl:qualifiedCardinality 1 ; owl:onDataRange xsd:string", 0),
    ] {
        assert_eq!(failures(&format!("{}{}{}", header, cardinality, property)), failed, "{}", cardinality);
    }
}
