//! Integration tests for ontology checking
//!
//! Loads ontologies from disk and runs the checker the way the `check`
//! command does:
//! - Namespace scoping
//! - Restriction and property rules on a realistic ontology
//! - Normalization side effects on the graph

use ontosync_core::checker::{EntityStatus, OntologyChecker};
use ontosync_core::ontology::vocab::{owl, rdfs};
use ontosync_core::{Config, OntologyGraph, RestrictionIdScheme, SyncError};
use oxigraph::model::{NamedNodeRef, Subject, Term, TermRef};
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

const CONFIG: &str = include_str!("../fixtures/config.yaml");
const ONTOLOGY: &str = include_str!("../fixtures/ontology.ttl");

fn config() -> Config {
    Config::from_yaml(CONFIG).unwrap()
}

fn write(dir: &TempDir, name: &str, body: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, body).unwrap();
    path
}

fn named(iri: &str) -> Subject {
    Subject::NamedNode(oxigraph::model::NamedNode::new_unchecked(iri))
}

#[test]
fn test_check_fixture_reports_bad_property() {
    let config = config();
    let dir = TempDir::new().unwrap();
    let mut graph = OntologyGraph::load_file(&write(&dir, "ontology.ttl", ONTOLOGY), None).unwrap();

    let mut checker = OntologyChecker::new(&mut graph, &config.schema, RestrictionIdScheme::ContentHash);
    let report = checker.check(Some(&config.schema.namespaces.ontology));

    assert!(!report.is_valid());
    // badLink and the unused restriction
    assert_eq!(report.failed, 2);
    // the Person restriction and four properties
    assert_eq!(report.passed, 5);
    let nodes: Vec<&str> = report.diagnostics.iter().map(|d| d.node.as_str()).collect();
    assert!(nodes.contains(&"https://vocabs.example.org/schema#badLink"));
}

#[test]
fn test_foreign_namespace_properties_skipped() {
    let config = config();
    let dir = TempDir::new().unwrap();
    let body = r#"
        @prefix owl: <http://www.w3.org/2002/07/owl#> .
        @prefix rdfs: <http://www.w3.org/2000/01/rdf-schema#> .
        @prefix xsd: <http://www.w3.org/2001/XMLSchema#> .
        @prefix ext: <https://other.example.org/terms#> .

        ext:link a owl:ObjectProperty ; rdfs:range xsd:string .
        ext:text a owl:DatatypeProperty ; rdfs:range xsd:string .
    "#;
    let mut graph = OntologyGraph::load_file(&write(&dir, "ext.ttl", body), None).unwrap();

    let mut checker = OntologyChecker::new(&mut graph, &config.schema, RestrictionIdScheme::ContentHash);
    let report = checker.check(Some(&config.schema.namespaces.ontology));
    assert!(report.is_valid());
    assert_eq!(report.skipped, 2);

    let report = checker.check(None);
    assert!(!report.is_valid());
    assert_eq!(report.failed, 1);
}

#[test]
fn test_prepare_normalizes_graph() {
    let config = config();
    let dir = TempDir::new().unwrap();
    let mut graph = OntologyGraph::load_file(&write(&dir, "ontology.ttl", ONTOLOGY), None).unwrap();

    let entities = OntologyChecker::new(&mut graph, &config.schema, RestrictionIdScheme::ContentHash).prepare();
    assert_eq!(
        entities.iter().filter(|e| e.status == EntityStatus::Accepted).count(),
        10
    );

    let thing = Subject::NamedNode(owl::THING.into_owned());
    let thing_term: TermRef<'_> = owl::THING.into();

    // top-level classes gain exactly one owl:Thing superclass
    let agent = named("https://vocabs.example.org/schema#Agent");
    let place = named("https://vocabs.example.org/schema#Place");
    assert!(graph.contains(&agent, rdfs::SUB_CLASS_OF, thing_term));
    assert!(graph.contains(&place, rdfs::SUB_CLASS_OF, thing_term));
    assert!(!graph.contains(&thing, rdfs::SUB_CLASS_OF, thing_term));

    // Person already has a class-typed superclass
    let person = named("https://vocabs.example.org/schema#Person");
    assert!(!graph.contains(&person, rdfs::SUB_CLASS_OF, thing_term));

    // the restriction edge now points at its synthetic identifier
    let superclasses = graph.objects(&person, rdfs::SUB_CLASS_OF);
    assert_eq!(superclasses.len(), 2);
    assert!(superclasses.iter().all(|t| !matches!(t, Term::BlankNode(_))));
}

#[test]
fn test_timestamp_ids_are_unique() {
    let config = config();
    let dir = TempDir::new().unwrap();
    let body = r#"
        @prefix owl: <http://www.w3.org/2002/07/owl#> .
        @prefix rdfs: <http://www.w3.org/2000/01/rdf-schema#> .
        @prefix xsd: <http://www.w3.org/2001/XMLSchema#> .
        @prefix : <https://vocabs.example.org/schema#> .

        :A a owl:Class ;
            rdfs:subClassOf [ a owl:Restriction ; owl:onProperty :p ; owl:maxCardinality 1 ] ,
                            [ a owl:Restriction ; owl:onProperty :q ; owl:minCardinality 0 ] .
        :p a owl:DatatypeProperty ; rdfs:domain :A ; rdfs:range xsd:string .
        :q a owl:DatatypeProperty ; rdfs:domain :A ; rdfs:range xsd:anyURI .
    "#;
    let mut graph = OntologyGraph::load_file(&write(&dir, "a.ttl", body), None).unwrap();

    let entities = OntologyChecker::new(&mut graph, &config.schema, RestrictionIdScheme::Timestamp).prepare();
    let restriction_ids: Vec<&Subject> = entities
        .iter()
        .filter(|e| e.status == EntityStatus::Accepted && matches!(e.node, Subject::BlankNode(_)))
        .map(|e| &e.id)
        .collect();
    assert_eq!(restriction_ids.len(), 2);
    assert_ne!(restriction_ids[0], restriction_ids[1]);
}

#[test]
fn test_malformed_ontology_is_preflight_error() {
    let dir = TempDir::new().unwrap();
    let err = OntologyGraph::load_file(&write(&dir, "broken.ttl", "@prefix : <broken"), None).unwrap_err();
    assert!(err.is_preflight());
    assert!(matches!(err, SyncError::OntologyParse(_)));
}

#[test]
fn test_unknown_extension_rejected() {
    let dir = TempDir::new().unwrap();
    let err = OntologyGraph::load_file(&write(&dir, "ontology.docx", ""), None).unwrap_err();
    assert!(matches!(err, SyncError::UnsupportedFormat(_)));

    let path = write(&dir, "ontology.data", ONTOLOGY);
    let graph = OntologyGraph::load_file(&path, Some("text/turtle")).unwrap();
    assert!(graph.has_type(
        &named("https://vocabs.example.org/schema#Person"),
        NamedNodeRef::new_unchecked("http://www.w3.org/2002/07/owl#Class")
    ));
}
