//! Property inheritance and merge logic

use crate::model::{NodeTypeDescriptor, PropertyDescriptor, QualifiedName};
use crate::{Error, Result};
use indexmap::IndexMap;
use std::collections::HashSet;

/// Tracks extends-edges between node types to detect cycles
#[derive(Debug, Default)]
pub struct InheritanceGraph {
    edges: Vec<(QualifiedName, QualifiedName)>, // (child, parent)
}

impl InheritanceGraph {
    pub fn new() -> Self {
        Self { edges: Vec::new() }
    }

    pub fn add_edge(&mut self, child: QualifiedName, parent: QualifiedName) {
        if !self.edges.iter().any(|(c, p)| c == &child && p == &parent) {
            self.edges.push((child, parent));
        }
    }

    /// Detect if adding this edge would create a cycle
    pub fn would_create_cycle(&self, child: &QualifiedName, parent: &QualifiedName) -> bool {
        if child == parent {
            return true;
        }

        // Does parent already depend on child, directly or transitively?
        let mut to_visit = vec![parent.clone()];
        let mut visited = HashSet::new();

        while let Some(current) = to_visit.pop() {
            if &current == child {
                return true;
            }
            if visited.insert(current.clone()) {
                for (c, p) in &self.edges {
                    if c == &current {
                        to_visit.push(p.clone());
                    }
                }
            }
        }

        false
    }
}

/// Merge a supertype's properties with the ones a subtype declares.
///
/// Inherited entries come first, in the supertype's order, and are marked
/// `inherited`. A subtype redeclaring an inherited name replaces it in place.
///
/// # Errors
///
/// Returns an error when the subtype declares the same name twice.
pub fn merge_properties(
    qualified_name: &QualifiedName,
    parent: Option<&NodeTypeDescriptor>,
    own: Vec<PropertyDescriptor>,
) -> Result<IndexMap<String, PropertyDescriptor>> {
    let mut merged: IndexMap<String, PropertyDescriptor> = IndexMap::new();

    if let Some(parent) = parent {
        for property in parent.properties() {
            let mut inherited = property.clone();
            inherited.inherited = true;
            merged.insert(inherited.name.clone(), inherited);
        }
    }

    let mut seen = HashSet::new();
    for mut property in own {
        if !seen.insert(property.name.clone()) {
            return Err(Error::duplicate_property(
                qualified_name.clone(),
                property.name,
            ));
        }
        property.inherited = false;
        // IndexMap::insert keeps the position of an existing key
        merged.insert(property.name.clone(), property);
    }

    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{PropertyKind, TypeBinding};

    fn qn(name: &str) -> QualifiedName {
        QualifiedName::new("test", name)
    }

    fn descriptor(name: &str, properties: Vec<PropertyDescriptor>) -> NodeTypeDescriptor {
        let props = merge_properties(&qn(name), None, properties).unwrap();
        NodeTypeDescriptor::new(
            qn(name),
            props,
            None,
            TypeBinding::Dynamic {
                key: name.to_string(),
            },
        )
    }

    #[test]
    fn test_merge_puts_inherited_first() {
        let parent = descriptor(
            "Statement",
            vec![PropertyDescriptor::attribute("label")],
        );

        let merged = merge_properties(
            &qn("SetStatement"),
            Some(&parent),
            vec![
                PropertyDescriptor::attribute("variable"),
                PropertyDescriptor::child("value"),
            ],
        )
        .unwrap();

        let names: Vec<&str> = merged.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["label", "variable", "value"]);
        assert!(merged["label"].inherited);
        assert!(!merged["variable"].inherited);
        assert_eq!(merged["value"].kind, PropertyKind::Child);
    }

    #[test]
    fn test_override_keeps_position() {
        let parent = descriptor(
            "Base",
            vec![
                PropertyDescriptor::attribute("a"),
                PropertyDescriptor::attribute("b"),
            ],
        );

        let merged = merge_properties(
            &qn("Derived"),
            Some(&parent),
            vec![PropertyDescriptor::child("a")],
        )
        .unwrap();

        let names: Vec<&str> = merged.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert!(merged["a"].is_child());
        assert!(!merged["a"].inherited);
        assert!(merged["b"].inherited);
    }

    #[test]
    fn test_duplicate_property_rejected() {
        let result = merge_properties(
            &qn("Dup"),
            None,
            vec![
                PropertyDescriptor::attribute("x"),
                PropertyDescriptor::child("x"),
            ],
        );

        match result {
            Err(Error::DuplicateProperty { property, .. }) => assert_eq!(property, "x"),
            other => panic!("Expected DuplicateProperty, got {other:?}"),
        }
    }

    #[test]
    fn test_circular_dependency_detection() {
        let mut graph = InheritanceGraph::new();

        // A -> B -> C
        graph.add_edge(qn("A"), qn("B"));
        graph.add_edge(qn("B"), qn("C"));

        assert!(graph.would_create_cycle(&qn("C"), &qn("A")));
        assert!(!graph.would_create_cycle(&qn("A"), &qn("D")));
        assert!(graph.would_create_cycle(&qn("A"), &qn("A")));
    }
}
