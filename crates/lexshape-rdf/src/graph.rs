//! Indexed in-memory graph.

use crate::list::{decode_linked_list, DecodedList, DEFAULT_MAX_LIST_LEN};
use crate::model::{RdfLiteral, RdfNode, RdfTerm, Triple};
use crate::vocab::{self, rdf};
use std::collections::{HashMap, HashSet};

/// Set of triples with a subject index and insertion order.
///
/// Blank nodes are plain [`RdfNode::Blank`] keys, so a node reached through
/// any link can be queried directly without rescanning the graph.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    triples: Vec<Triple>,
    seen: HashSet<Triple>,
    by_subject: HashMap<RdfNode, Vec<usize>>,
    prefixes: Vec<(String, String)>,
}

impl PartialEq for Graph {
    fn eq(&self, other: &Self) -> bool {
        self.seen == other.seen
    }
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a triple; returns `false` when it was already present.
    pub fn insert(&mut self, triple: Triple) -> bool {
        if self.seen.contains(&triple) {
            return false;
        }
        let index = self.triples.len();
        self.by_subject
            .entry(triple.subject.clone())
            .or_default()
            .push(index);
        self.seen.insert(triple.clone());
        self.triples.push(triple);
        true
    }

    pub fn add(&mut self, subject: RdfNode, predicate: &str, object: impl Into<RdfTerm>) -> bool {
        self.insert(Triple::new(subject, predicate, object))
    }

    pub fn extend(&mut self, other: &Graph) {
        for triple in other.triples() {
            self.insert(triple.clone());
        }
        for (prefix, ns) in other.prefixes() {
            self.bind_prefix(prefix, ns);
        }
    }

    pub fn len(&self) -> usize {
        self.triples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triples.is_empty()
    }

    pub fn triples(&self) -> impl Iterator<Item = &Triple> {
        self.triples.iter()
    }

    pub fn contains(&self, subject: &RdfNode, predicate: &str, object: &RdfTerm) -> bool {
        self.statements_about(subject)
            .any(|t| t.predicate == predicate && &t.object == object)
    }

    /// All triples with the given subject, in insertion order.
    pub fn statements_about<'a>(&'a self, subject: &RdfNode) -> impl Iterator<Item = &'a Triple> {
        self.by_subject
            .get(subject)
            .map(|ixs| ixs.as_slice())
            .unwrap_or(&[])
            .iter()
            .map(move |&i| &self.triples[i])
    }

    pub fn objects<'a>(
        &'a self,
        subject: &RdfNode,
        predicate: &'a str,
    ) -> impl Iterator<Item = &'a RdfTerm> {
        self.statements_about(subject)
            .filter(move |t| t.predicate == predicate)
            .map(|t| &t.object)
    }

    /// First object for `(subject, predicate)`.
    pub fn object(&self, subject: &RdfNode, predicate: &str) -> Option<&RdfTerm> {
        self.statements_about(subject)
            .find(|t| t.predicate == predicate)
            .map(|t| &t.object)
    }

    pub fn literal(&self, subject: &RdfNode, predicate: &str) -> Option<&RdfLiteral> {
        self.statements_about(subject)
            .filter(|t| t.predicate == predicate)
            .find_map(|t| t.object.as_literal())
    }

    pub fn literals<'a>(
        &'a self,
        subject: &RdfNode,
        predicate: &'a str,
    ) -> impl Iterator<Item = &'a RdfLiteral> {
        self.objects(subject, predicate).filter_map(RdfTerm::as_literal)
    }

    /// Distinct subjects with `predicate object`, in first-seen order.
    pub fn subjects_with(&self, predicate: &str, object: &RdfTerm) -> Vec<RdfNode> {
        let mut out: Vec<RdfNode> = Vec::new();
        let mut seen: HashSet<&RdfNode> = HashSet::new();
        for t in &self.triples {
            if t.predicate == predicate && &t.object == object && seen.insert(&t.subject) {
                out.push(t.subject.clone());
            }
        }
        out
    }

    pub fn subjects_of_type(&self, class_iri: &str) -> Vec<RdfNode> {
        self.subjects_with(rdf::TYPE, &RdfTerm::iri(class_iri))
    }

    pub fn has_type(&self, subject: &RdfNode, class_iri: &str) -> bool {
        self.objects(subject, rdf::TYPE)
            .any(|o| o.as_iri() == Some(class_iri))
    }

    /// Distinct subjects in first-seen order.
    pub fn subjects(&self) -> Vec<RdfNode> {
        let mut out = Vec::new();
        let mut seen = HashSet::new();
        for t in &self.triples {
            if seen.insert(&t.subject) {
                out.push(t.subject.clone());
            }
        }
        out
    }

    /// Distinct objects of `predicate` across the whole graph.
    pub fn objects_of_predicate(&self, predicate: &str) -> Vec<RdfTerm> {
        let mut out = Vec::new();
        let mut seen = HashSet::new();
        for t in &self.triples {
            if t.predicate == predicate && seen.insert(&t.object) {
                out.push(t.object.clone());
            }
        }
        out
    }

    /// Decode an `rdf:first`/`rdf:rest` collection starting at `head`.
    pub fn rdf_list(&self, head: &RdfNode) -> DecodedList<RdfTerm> {
        self.rdf_list_bounded(head, DEFAULT_MAX_LIST_LEN)
    }

    pub fn rdf_list_bounded(&self, head: &RdfNode, max_len: usize) -> DecodedList<RdfTerm> {
        decode_linked_list(
            head.clone(),
            |cell| cell.as_iri() == Some(rdf::NIL),
            |cell| self.object(cell, rdf::FIRST).cloned(),
            |cell| {
                self.object(cell, rdf::REST)
                    .and_then(RdfTerm::as_node)
                    .cloned()
            },
            max_len,
        )
    }

    /// Whether `node` looks like a list cell (`rdf:nil` or has `rdf:first`).
    pub fn is_list_head(&self, node: &RdfNode) -> bool {
        node.as_iri() == Some(rdf::NIL) || self.object(node, rdf::FIRST).is_some()
    }

    /// Items of a value that may be a collection head or a single direct value.
    pub fn list_or_value(&self, value: &RdfTerm) -> DecodedList<RdfTerm> {
        match value {
            RdfTerm::Node(node) if self.is_list_head(node) => self.rdf_list(node),
            other => DecodedList {
                items: vec![other.clone()],
                end: crate::list::ListEnd::Nil,
            },
        }
    }

    pub fn bind_prefix(&mut self, prefix: &str, namespace: &str) {
        if let Some(existing) = self.prefixes.iter_mut().find(|(p, _)| p == prefix) {
            existing.1 = namespace.to_string();
        } else {
            self.prefixes.push((prefix.to_string(), namespace.to_string()));
        }
    }

    pub fn prefixes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.prefixes.iter().map(|(p, ns)| (p.as_str(), ns.as_str()))
    }

    /// Compact an IRI with this graph's bindings, then the well-known ones.
    pub fn compact(&self, iri: &str) -> String {
        vocab::compact_with(
            iri,
            self.prefixes()
                .chain(vocab::WELL_KNOWN_PREFIXES.iter().map(|(p, ns)| (*p, *ns))),
        )
        .unwrap_or_else(|| iri.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::list::ListEnd;

    fn iri(s: &str) -> RdfNode {
        RdfNode::iri(s)
    }

    #[test]
    fn duplicate_triples_are_ignored() {
        let mut g = Graph::new();
        assert!(g.add(iri("urn:a"), "urn:p", RdfLiteral::plain("x")));
        assert!(!g.add(iri("urn:a"), "urn:p", RdfLiteral::plain("x")));
        assert_eq!(g.len(), 1);
    }

    #[test]
    fn blank_nodes_are_addressable() {
        let mut g = Graph::new();
        let b = RdfNode::blank("b0");
        g.add(iri("urn:a"), "urn:p", b.clone());
        g.add(b.clone(), rdf::TYPE, RdfTerm::iri(vocab::sh::PROPERTY_SHAPE));
        let linked = g.object(&iri("urn:a"), "urn:p").and_then(RdfTerm::as_node).cloned();
        assert_eq!(linked.as_ref(), Some(&b));
        assert!(g.has_type(&b, vocab::sh::PROPERTY_SHAPE));
    }

    #[test]
    fn single_value_lookups_borrow_only_the_graph() {
        let mut g = Graph::new();
        g.add(iri("urn:a"), "urn:p", RdfTerm::iri("urn:o"));
        g.add(iri("urn:a"), "urn:p", RdfLiteral::plain("label"));
        let (first, label) = {
            let predicate = String::from("urn:p");
            (g.object(&iri("urn:a"), &predicate), g.literal(&iri("urn:a"), &predicate))
        };
        assert_eq!(first, Some(&RdfTerm::iri("urn:o")));
        assert_eq!(label.map(|l| l.lexical.as_str()), Some("label"));
        assert!(g.literal(&iri("urn:b"), "urn:p").is_none());
    }

    #[test]
    fn rdf_list_walks_first_rest_chain() {
        let mut g = Graph::new();
        let (c1, c2) = (RdfNode::blank("l1"), RdfNode::blank("l2"));
        g.add(c1.clone(), rdf::FIRST, RdfTerm::iri("urn:x"));
        g.add(c1.clone(), rdf::REST, c2.clone());
        g.add(c2.clone(), rdf::FIRST, RdfTerm::iri("urn:y"));
        g.add(c2.clone(), rdf::REST, RdfTerm::iri(rdf::NIL));

        let list = g.rdf_list(&c1);
        assert_eq!(list.items, vec![RdfTerm::iri("urn:x"), RdfTerm::iri("urn:y")]);
        assert_eq!(list.end, ListEnd::Nil);
        assert!(g.rdf_list(&iri(rdf::NIL)).items.is_empty());
    }

    #[test]
    fn non_list_value_is_a_single_item() {
        let g = Graph::new();
        let out = g.list_or_value(&RdfTerm::iri("urn:direct"));
        assert_eq!(out.items, vec![RdfTerm::iri("urn:direct")]);
    }
}
