//! Overridable hooks of the transformation algorithm

use std::rc::Rc;
use sylva_tree::{NodeRef, Origin, Source};

/// Points where a concrete pipeline can redirect the engine without
/// changing the algorithm.
pub trait TransformHooks {
    /// Source that child wirings of `node` read from.
    ///
    /// Defaults to `source` itself.
    fn get_source(&self, node: &NodeRef, source: &Rc<dyn Source>) -> Rc<dyn Source> {
        let _ = node;
        Rc::clone(source)
    }

    /// Origin recorded on nodes built from `source`.
    ///
    /// Defaults to wrapping the source, which recognises AST nodes.
    fn as_origin(&self, source: &Rc<dyn Source>) -> Option<Origin> {
        Some(Origin::from_source(source))
    }
}

/// Hooks with the default behaviour
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultHooks;

impl TransformHooks for DefaultHooks {}
