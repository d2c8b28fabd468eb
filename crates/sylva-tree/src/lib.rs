#![warn(rust_2018_idioms)]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::all)]

//! # sylva-tree
//!
//! The generic AST: schema-driven nodes with parent links, origins and
//! positions, the diagnostics model, and lazy traversals.
//!
//! Nodes are single-threaded (`Rc`) and owned by their parent through child
//! properties; parent links are weak. Node types come from a
//! [`sylva_schema::SchemaRegistry`], which is created once and passed in
//! wherever nodes are built.

/// Diagnostics collected by every stage.
pub mod issue;
/// Schema-driven node model.
pub mod node;
/// Node origins: source nodes, other AST nodes, or synthetic locations.
pub mod origin;
/// Line/column points and ranges.
pub mod position;
/// Indented dump of a tree.
pub mod printer;
/// Parent fix-up and position checks over whole trees.
pub mod processing;
/// Trees that transformations read from.
pub mod source;
/// Lazy traversals and searches.
pub mod traversal;
/// Attribute values and name references.
pub mod value;

pub use issue::{Issue, IssueArg, IssueKind, Severity};
pub use node::{
    ErrorNode, GENERIC_PACKAGE, GenericNode, Node, NodeRef, PLACEHOLDER_PACKAGE, PropertyValue,
};
pub use origin::Origin;
pub use position::{HasPosition, Point, Position};
pub use printer::debug_print;
pub use processing::{PositionProblem, assign_parents, clear_positions, invalid_positions};
pub use source::{AsAny, Source, SourceValue, downcast_rc};
pub use traversal::{
    collect_by_type, find, find_ancestor, find_ancestor_of_type, find_by_position,
    search_by_position, search_by_type, walk, walk_ancestors, walk_children, walk_descendants,
    walk_leaves_first, walk_within,
};
pub use value::{ReferenceByName, Value};

use sylva_schema::{PropertyKind, QualifiedName};
use thiserror::Error;

/// Structural errors raised by node mutators
#[derive(Error, Debug)]
pub enum Error {
    #[error("Property '{property}' of {node_type} is not a child property")]
    NotAChild {
        node_type: QualifiedName,
        property: String,
    },

    #[error("Property '{property}' of {node_type} is not a collection, use set_child")]
    NotACollection {
        node_type: QualifiedName,
        property: String,
    },

    #[error("Property '{property}' of {node_type} is a collection, use add_child")]
    IsACollection {
        node_type: QualifiedName,
        property: String,
    },

    #[error("Cannot attach {child_type} to '{property}' of {node_type}: it already has a parent")]
    AlreadyParented {
        node_type: QualifiedName,
        property: String,
        child_type: QualifiedName,
    },

    #[error("Cannot attach a node under itself ('{property}' of {node_type})")]
    CycleAttach {
        node_type: QualifiedName,
        property: String,
    },

    #[error("{node_type} has no property '{property}'")]
    UnknownProperty {
        node_type: QualifiedName,
        property: String,
    },

    #[error("Property '{property}' of {node_type} is {actual:?}, expected {expected:?}")]
    WrongPropertyKind {
        node_type: QualifiedName,
        property: String,
        expected: PropertyKind,
        actual: PropertyKind,
    },

    #[error(transparent)]
    Schema(#[from] sylva_schema::Error),
}

impl Error {
    pub fn not_a_child(node_type: &QualifiedName, property: &str) -> Self {
        Self::NotAChild {
            node_type: node_type.clone(),
            property: property.to_string(),
        }
    }

    pub fn not_a_collection(node_type: &QualifiedName, property: &str) -> Self {
        Self::NotACollection {
            node_type: node_type.clone(),
            property: property.to_string(),
        }
    }

    pub fn is_a_collection(node_type: &QualifiedName, property: &str) -> Self {
        Self::IsACollection {
            node_type: node_type.clone(),
            property: property.to_string(),
        }
    }

    pub fn already_parented(
        node_type: &QualifiedName,
        property: &str,
        child_type: &QualifiedName,
    ) -> Self {
        Self::AlreadyParented {
            node_type: node_type.clone(),
            property: property.to_string(),
            child_type: child_type.clone(),
        }
    }

    pub fn unknown_property(node_type: &QualifiedName, property: &str) -> Self {
        Self::UnknownProperty {
            node_type: node_type.clone(),
            property: property.to_string(),
        }
    }
}

/// Crate-local result type for node operations.
pub type Result<T> = std::result::Result<T, Error>;
