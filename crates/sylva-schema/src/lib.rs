#![warn(rust_2018_idioms)]
#![warn(clippy::all)]

//! # sylva-schema
//!
//! Node-type descriptors, inheritance merge, and the schema registry.
//!
//! Every AST node type is described once by a [`NodeTypeDescriptor`]: its
//! package, its name, the ordered table of properties it declares (which of
//! them hold children, which are collections, which are references) and the
//! type it extends. Descriptors are built from static [`TypeDefinition`]s at
//! registration time and are immutable afterwards; the [`SchemaRegistry`] is
//! the single place they are stored and looked up.

pub mod inheritance;
pub mod model;
pub mod registry;

pub use model::{
    DescriptorRef, NodeKind, NodeTypeDescriptor, PropertyDescriptor, PropertyKind, QualifiedName,
    TypeBinding, TypeDefinition,
};
pub use registry::{
    ConflictPolicy, ConflictResolution, ConflictResolver, RegistrationConflict, RegistryConfig,
    SchemaRegistry,
};

use thiserror::Error;

/// Errors that can occur when registering or looking up node types
#[derive(Error, Debug, Clone)]
pub enum Error {
    #[error("Node type not found: {0}")]
    NotFound(QualifiedName),

    #[error("Node type {qualified_name} is already bound to {existing}, cannot bind it to {incoming}")]
    Conflict {
        qualified_name: QualifiedName,
        existing: TypeBinding,
        incoming: TypeBinding,
    },

    #[error("Redefinition of {qualified_name}: {incoming} extends {existing} without changing its name")]
    Redefinition {
        qualified_name: QualifiedName,
        existing: TypeBinding,
        incoming: TypeBinding,
    },

    #[error("Property '{property}' is declared twice on {qualified_name}")]
    DuplicateProperty {
        qualified_name: QualifiedName,
        property: String,
    },

    #[error("Circular inheritance: {child} cannot extend {parent}")]
    CircularInheritance {
        child: QualifiedName,
        parent: QualifiedName,
    },

    #[error("Registry error: {0}")]
    Registry(String),
}

impl Error {
    /// Build a conflict error naming both competing types.
    pub fn conflict(
        qualified_name: QualifiedName,
        existing: TypeBinding,
        incoming: TypeBinding,
    ) -> Self {
        Self::Conflict {
            qualified_name,
            existing,
            incoming,
        }
    }

    /// Build a duplicate-property error.
    pub fn duplicate_property(qualified_name: QualifiedName, property: impl Into<String>) -> Self {
        Self::DuplicateProperty {
            qualified_name,
            property: property.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
