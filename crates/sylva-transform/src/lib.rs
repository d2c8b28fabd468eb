#![warn(rust_2018_idioms)]
#![warn(clippy::all)]

//! # sylva-transform
//!
//! Turns an arbitrary source tree into AST nodes.
//!
//! A [`Transformer`] holds node factories keyed by source type name. Each
//! source node is dispatched to the factory registered for its most specific
//! type, climbing its supertype chain when needed. Factories build nodes and
//! declare [`ChildWiring`]s that tell the engine where to read raw children
//! from the source and which property of the new node receives their
//! transformed form.
//!
//! ```ignore
//! let mut transformer = Transformer::new(registry);
//! transformer
//!     .register_kind_factory::<SetStatement>("SetStmtContext")
//!     .with_child("value", |source| Ok(expression_of(source)));
//! let ast = transformer.transform(SourceValue::one(parse_tree), None)?;
//! ```

pub mod config;
pub mod factory;
pub mod hooks;
pub mod transformer;

pub use config::TransformerConfig;
pub use factory::{ChildGetter, ChildSetter, ChildValue, ChildWiring, Finalizer, NodeConstructor, NodeFactory};
pub use hooks::{DefaultHooks, TransformHooks};
pub use transformer::Transformer;

use thiserror::Error;

/// Errors raised by the transformation engine
#[derive(Error, Debug)]
pub enum Error {
    #[error("Collection where single value expected: transform collections element-wise")]
    CollectionNotExpected,

    #[error("No node factory registered for source type {source_type}")]
    NoFactory { source_type: String },

    #[error("Node factory for {source_type} failed: {source:#}")]
    Constructor {
        source_type: String,
        source: anyhow::Error,
    },

    #[error("Cannot flatten multiple nodes into one ({count} produced)")]
    CannotFlatten { count: usize },

    #[error("Child wiring '{property}' of {node_type} failed: {source:#}")]
    ChildWiring {
        node_type: String,
        property: String,
        source: anyhow::Error,
    },

    #[error("Finalizer for {node_type} failed: {source:#}")]
    Finalizer {
        node_type: String,
        source: anyhow::Error,
    },

    #[error(transparent)]
    Tree(#[from] sylva_tree::Error),

    #[error(transparent)]
    Schema(#[from] sylva_schema::Error),
}

impl Error {
    pub fn child_wiring(
        node_type: impl Into<String>,
        property: impl Into<String>,
        source: anyhow::Error,
    ) -> Self {
        Self::ChildWiring {
            node_type: node_type.into(),
            property: property.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
