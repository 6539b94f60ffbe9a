//! Metadata of a single repository resource: a flat list of
//! (predicate, object) statements about one implicit subject.

use oxigraph::io::{RdfFormat, RdfSerializer};
use oxigraph::model::{Literal, NamedNode, NamedNodeRef, Term, TermRef, TripleRef};
use std::collections::HashSet;
use std::io;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Metadata {
    statements: Vec<(NamedNode, Term)>,
}

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a statement; exact duplicates are ignored
    pub fn add(&mut self, predicate: NamedNodeRef<'_>, object: impl Into<Term>) -> bool {
        let object = object.into();
        if self.contains(predicate, object.as_ref()) {
            return false;
        }
        self.statements.push((predicate.into_owned(), object));
        true
    }

    pub fn add_node(&mut self, predicate: NamedNodeRef<'_>, iri: &str) -> bool {
        self.add(predicate, NamedNode::new_unchecked(iri))
    }

    pub fn add_lang_literal(&mut self, predicate: NamedNodeRef<'_>, value: &str, lang: &str) -> bool {
        let literal = Literal::new_language_tagged_literal(value, lang)
            .unwrap_or_else(|_| Literal::new_simple_literal(value));
        self.add(predicate, literal)
    }

    /// Replace every value of `predicate` with `object`
    pub fn set(&mut self, predicate: NamedNodeRef<'_>, object: impl Into<Term>) {
        self.remove_all(predicate);
        self.add(predicate, object);
    }

    pub fn remove_all(&mut self, predicate: NamedNodeRef<'_>) -> usize {
        let before = self.statements.len();
        self.statements.retain(|(p, _)| p.as_ref() != predicate);
        before - self.statements.len()
    }

    pub fn remove(&mut self, predicate: NamedNodeRef<'_>, object: TermRef<'_>) -> bool {
        let before = self.statements.len();
        self.statements
            .retain(|(p, o)| !(p.as_ref() == predicate && o.as_ref() == object));
        before != self.statements.len()
    }

    pub fn contains(&self, predicate: NamedNodeRef<'_>, object: TermRef<'_>) -> bool {
        self.statements
            .iter()
            .any(|(p, o)| p.as_ref() == predicate && o.as_ref() == object)
    }

    pub fn has(&self, predicate: NamedNodeRef<'_>) -> bool {
        self.statements.iter().any(|(p, _)| p.as_ref() == predicate)
    }

    pub fn objects(&self, predicate: NamedNodeRef<'_>) -> Vec<&Term> {
        self.statements
            .iter()
            .filter(|(p, _)| p.as_ref() == predicate)
            .map(|(_, o)| o)
            .collect()
    }

    /// First literal value of `predicate`
    pub fn literal(&self, predicate: NamedNodeRef<'_>) -> Option<&Literal> {
        self.objects(predicate).into_iter().find_map(|o| match o {
            Term::Literal(l) => Some(l),
            _ => None,
        })
    }

    /// Whether any named node value of `predicate` equals `iri`
    pub fn has_node(&self, predicate: NamedNodeRef<'_>, iri: &str) -> bool {
        self.objects(predicate)
            .into_iter()
            .any(|o| matches!(o, Term::NamedNode(n) if n.as_str() == iri))
    }

    pub fn statements(&self) -> &[(NamedNode, Term)] {
        &self.statements
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    /// Apply `other` in merge mode: predicates present in `other` replace
    /// the local values
    pub fn merge(&mut self, other: &Metadata) {
        let replaced: HashSet<&NamedNode> = other.statements.iter().map(|(p, _)| p).collect();
        self.statements.retain(|(p, _)| !replaced.contains(p));
        for (p, o) in &other.statements {
            self.add(p.as_ref(), o.clone());
        }
    }

    /// Compare statement sets, ignoring order and every predicate for which
    /// `ignore` returns true
    pub fn same_content<F>(&self, other: &Metadata, ignore: F) -> bool
    where
        F: Fn(NamedNodeRef<'_>) -> bool,
    {
        let keep = |m: &Metadata| -> HashSet<(String, String)> {
            m.statements
                .iter()
                .filter(|(p, _)| !ignore(p.as_ref()))
                .map(|(p, o)| (p.as_str().to_string(), o.to_string()))
                .collect()
        };
        keep(self) == keep(other)
    }

    /// Serialize as N-Triples about `subject`
    pub fn to_ntriples(&self, subject: NamedNodeRef<'_>) -> io::Result<Vec<u8>> {
        let mut writer = RdfSerializer::from_format(RdfFormat::NTriples).for_writer(Vec::new());
        for (p, o) in &self.statements {
            writer.serialize_triple(TripleRef::new(subject, p.as_ref(), o.as_ref()))?;
        }
        writer.finish()
    }
}
