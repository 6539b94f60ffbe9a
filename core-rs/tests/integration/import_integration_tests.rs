//! Integration tests for ontology import
//!
//! Runs complete import cycles against an in-memory repository:
//! - Creation of containers and objects
//! - Idempotent re-import
//! - Removal of obsolete objects and its failure modes
//! - Reading the imported ontology back from the repository

use ontosync_core::repo::{MemoryStore, RemoteStore, StoreCounters};
use ontosync_core::{Config, ImportReport, OntologyGraph, OntologyImporter, SyncError};
use oxigraph::model::{NamedNodeRef, Subject, Term};
use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

const CONFIG: &str = include_str!("../fixtures/config.yaml");
const ONTOLOGY: &str = include_str!("../fixtures/ontology.ttl");
const NS: &str = "https://vocabs.example.org/schema#";

const PREFIXES: &str = r#"
@prefix owl: <http://www.w3.org/2002/07/owl#> .
@prefix rdfs: <http://www.w3.org/2000/01/rdf-schema#> .
@prefix : <https://vocabs.example.org/schema#> .
"#;

fn config() -> Config {
    Config::from_yaml(CONFIG).unwrap()
}

fn store(config: &Config) -> MemoryStore {
    MemoryStore::new("https://repo.example.org/api", config.schema.id())
}

fn write_ontology(dir: &TempDir, name: &str, body: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, body).unwrap();
    path
}

fn load(dir: &TempDir, name: &str, body: &str) -> OntologyGraph {
    OntologyGraph::load_file(&write_ontology(dir, name, body), None).unwrap()
}

fn classes(names: &[(&str, &str)]) -> String {
    let mut body = PREFIXES.to_string();
    for (name, title) in names {
        body.push_str(&format!(":{} a owl:Class ; :hasTitle \"{}\"@en .\n", name, title));
    }
    body
}

#[tokio::test]
async fn test_full_import_creates_every_accepted_object() {
    let config = config();
    let store = store(&config);
    let dir = TempDir::new().unwrap();
    let mut graph = load(&dir, "ontology.ttl", ONTOLOGY);

    let report = OntologyImporter::new(&config)
        .import(&mut graph, &store, &CancellationToken::new())
        .await
        .unwrap();

    // note, 1 restriction, Thing/Agent/Person/Place, knows/livesIn, hasName/hasHomepage
    assert_eq!(report.created, 10);
    assert_eq!(report.rejected, 1, "badLink has a literal range");
    assert_eq!(report.skipped, 1, "the restriction nobody uses");
    assert_eq!(report.deleted, 0);
    assert!(report
        .diagnostics
        .iter()
        .any(|d| d.node == format!("{}badLink", NS)));

    // root + 5 kind containers + 10 objects
    assert_eq!(store.len(), 16);
    assert!(store.uri_of(&format!("{}badLink", NS)).is_none());
}

#[tokio::test]
async fn test_second_import_is_idempotent() {
    let config = config();
    let store = store(&config);
    let dir = TempDir::new().unwrap();
    let importer = OntologyImporter::new(&config);
    let cancel = CancellationToken::new();

    importer
        .import(&mut load(&dir, "ontology.ttl", ONTOLOGY), &store, &cancel)
        .await
        .unwrap();
    store.reset_counters();

    let report = importer
        .import(&mut load(&dir, "ontology.ttl", ONTOLOGY), &store, &cancel)
        .await
        .unwrap();

    assert_eq!(report.writes(), 0);
    assert_eq!(report.unchanged, 10);
    assert_eq!(store.counters(), StoreCounters::default());
}

/// Test: a restriction used only by an anonymous class keeps its id
///
/// The anonymous class is never imported, but it is the restriction's
/// dependent and is relabelled on every parse.
#[tokio::test]
async fn test_reimport_with_anonymous_dependent_is_idempotent() {
    let config = config();
    let store = store(&config);
    let dir = TempDir::new().unwrap();
    let importer = OntologyImporter::new(&config);
    let cancel = CancellationToken::new();

    let body = format!(
        "{}{}",
        PREFIXES,
        r#"
        @prefix xsd: <http://www.w3.org/2001/XMLSchema#> .
        :Agent a owl:Class .
        :hasName a owl:DatatypeProperty ; rdfs:domain :Agent ; rdfs:range xsd:string .
        [ a owl:Class ; rdfs:subClassOf :Agent , [
            a owl:Restriction ; owl:onProperty :hasName ; owl:maxCardinality 1
        ] ] .
        "#
    );

    let first = importer
        .import(&mut load(&dir, "anon.ttl", &body), &store, &cancel)
        .await
        .unwrap();
    // Thing, Agent, hasName and the restriction
    assert_eq!(first.created, 4);
    store.reset_counters();

    let second = importer
        .import(&mut load(&dir, "anon.ttl", &body), &store, &cancel)
        .await
        .unwrap();
    assert_eq!(second.writes(), 0);
    assert_eq!(second.deleted, 0);
    assert_eq!(store.counters(), StoreCounters::default());
}

#[tokio::test]
async fn test_restriction_imported_under_synthetic_id() {
    let config = config();
    let store = store(&config);
    let dir = TempDir::new().unwrap();

    OntologyImporter::new(&config)
        .import(&mut load(&dir, "ontology.ttl", ONTOLOGY), &store, &CancellationToken::new())
        .await
        .unwrap();

    let person = store.uri_of(&format!("{}Person", NS)).unwrap();
    let meta = store.metadata(&person).unwrap();
    let superclasses: Vec<String> = meta
        .objects(NamedNodeRef::new_unchecked("http://www.w3.org/2000/01/rdf-schema#subClassOf"))
        .into_iter()
        .filter_map(|t| match t {
            Term::NamedNode(n) => Some(n.as_str().to_string()),
            _ => None,
        })
        .collect();
    assert_eq!(superclasses.len(), 2);
    assert!(superclasses.contains(&format!("{}Agent", NS)));

    let restriction = superclasses
        .iter()
        .find(|s| s.starts_with(&format!("{}restriction-", NS)))
        .unwrap();
    assert!(store.uri_of(restriction).is_some());
}

#[tokio::test]
async fn test_obsolete_object_is_deleted() {
    let config = config();
    let store = store(&config);
    let dir = TempDir::new().unwrap();
    let importer = OntologyImporter::new(&config);
    let cancel = CancellationToken::new();

    let before = classes(&[("A", "A"), ("B", "B"), ("C", "C")]);
    importer
        .import(&mut load(&dir, "v1.ttl", &before), &store, &cancel)
        .await
        .unwrap();
    let c = store.uri_of(&format!("{}C", NS)).unwrap();

    let after = classes(&[("A", "A"), ("B", "B")]);
    let report = importer
        .import(&mut load(&dir, "v2.ttl", &after), &store, &cancel)
        .await
        .unwrap();

    assert_eq!(report.deleted, 1);
    assert!(!store.contains(&c));
    assert!(store.uri_of(&format!("{}A", NS)).is_some());
    assert!(store.uri_of(&format!("{}B", NS)).is_some());
}

#[tokio::test]
async fn test_undeletable_object_fails_after_budget() {
    let config = config();
    let store = store(&config);
    let dir = TempDir::new().unwrap();
    let importer = OntologyImporter::new(&config);
    let cancel = CancellationToken::new();

    let before = classes(&[("A", "A"), ("B", "B"), ("C", "C")]);
    importer
        .import(&mut load(&dir, "v1.ttl", &before), &store, &cancel)
        .await
        .unwrap();
    let c = store.uri_of(&format!("{}C", NS)).unwrap();
    store.fail_deletes(&c, None);
    store.reset_counters();

    let after = classes(&[("A", "A renamed"), ("B", "B")]);
    let err = importer
        .import(&mut load(&dir, "v2.ttl", &after), &store, &cancel)
        .await
        .unwrap_err();

    match err {
        SyncError::Reconciliation { container, outstanding } => {
            assert_eq!(container, "http://www.w3.org/2002/07/owl#Class");
            assert_eq!(outstanding, vec![c.clone()]);
        }
        other => panic!("unexpected error: {}", other),
    }

    // one initial round plus retryBudget (2) retries
    assert_eq!(store.counters().failed_deletes, 3);
    assert_eq!(store.counters().updates, 1);

    let a = store.uri_of(&format!("{}A", NS)).unwrap();
    let title = store
        .metadata(&a)
        .unwrap()
        .literal(config.schema.label())
        .map(|l| l.value().to_string());
    assert_eq!(title.as_deref(), Some("A renamed"));
    assert!(store.contains(&c));
}

#[tokio::test]
async fn test_retry_budget_override() {
    let config = config();
    let store = store(&config);
    let dir = TempDir::new().unwrap();
    let cancel = CancellationToken::new();

    let before = classes(&[("A", "A"), ("C", "C")]);
    OntologyImporter::new(&config)
        .import(&mut load(&dir, "v1.ttl", &before), &store, &cancel)
        .await
        .unwrap();
    let c = store.uri_of(&format!("{}C", NS)).unwrap();
    store.fail_deletes(&c, Some(4));

    let after = classes(&[("A", "A")]);
    let report = OntologyImporter::new(&config)
        .with_retry_budget(5)
        .with_concurrency(1)
        .import(&mut load(&dir, "v2.ttl", &after), &store, &cancel)
        .await
        .unwrap();

    assert_eq!(report.deleted, 1);
    assert_eq!(store.counters().failed_deletes, 4);
}

#[tokio::test]
async fn test_write_failure_aborts_before_sweep() {
    let config = config();
    let store = store(&config);
    let dir = TempDir::new().unwrap();
    let importer = OntologyImporter::new(&config);
    let cancel = CancellationToken::new();

    let before = classes(&[("A", "A"), ("C", "C")]);
    importer
        .import(&mut load(&dir, "v1.ttl", &before), &store, &cancel)
        .await
        .unwrap();
    let c = store.uri_of(&format!("{}C", NS)).unwrap();
    store.fail_writes(&format!("{}A", NS));

    let after = classes(&[("A", "A changed")]);
    let err = importer
        .import(&mut load(&dir, "v2.ttl", &after), &store, &cancel)
        .await
        .unwrap_err();

    assert!(matches!(err, SyncError::Store(_)));
    assert!(store.contains(&c), "nothing is swept after a failed write");
}

#[tokio::test]
async fn test_batch_holds_each_named_node_once() {
    let config = config();
    let dir = TempDir::new().unwrap();
    let mut graph = load(&dir, "ontology.ttl", ONTOLOGY);

    let mut report = ImportReport::default();
    let batch = OntologyImporter::new(&config).stage(&mut graph, &mut report);
    let ids: Vec<&str> = batch.entries().map(|e| e.id.as_str()).collect();
    let unique: HashSet<&str> = ids.iter().copied().collect();
    assert_eq!(unique.len(), ids.len());

    for name in ["note", "Agent", "Person", "Place", "hasName", "hasHomepage", "knows", "livesIn"] {
        assert!(unique.contains(format!("{}{}", NS, name).as_str()), "{} missing", name);
    }
    assert!(unique.contains("http://www.w3.org/2002/07/owl#Thing"));
    assert!(!unique.contains(format!("{}badLink", NS).as_str()));
}

#[tokio::test]
async fn test_ontology_read_back_from_store() {
    let config = config();
    let store = store(&config);
    let dir = TempDir::new().unwrap();

    OntologyImporter::new(&config)
        .import(&mut load(&dir, "ontology.ttl", ONTOLOGY), &store, &CancellationToken::new())
        .await
        .unwrap();

    let graph = OntologyGraph::load_from_store(&store, &config.schema).await.unwrap();
    let person = NamedNodeRef::new_unchecked("https://vocabs.example.org/schema#Person");
    let holders = graph.subjects(config.schema.id(), person.into());
    assert_eq!(holders.len(), 1);

    let Subject::NamedNode(uri) = &holders[0] else {
        panic!("repository resources are named nodes");
    };
    assert!(store.contains(uri.as_str()));

    let children = store
        .search_by_relation(config.schema.parent(), "http://www.w3.org/2002/07/owl#Class")
        .await
        .unwrap();
    assert_eq!(children.len(), 4);
}
