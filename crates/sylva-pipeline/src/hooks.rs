//! Parse-tree aware transformation

use crate::Result;
use crate::parse_tree::ParseNode;
use std::rc::Rc;
use std::sync::Arc;
use sylva_schema::SchemaRegistry;
use sylva_transform::{TransformHooks, Transformer, TransformerConfig};
use sylva_tree::{Issue, NodeRef, Origin, Source};
use tracing::trace;

/// Hooks for transformers whose input is a [`ParseNode`] tree.
///
/// Nodes record the parse node they came from as origin, and child wirings
/// read from a node's parse-tree origin when it has one. A constructor can
/// therefore point a node at a different parse node than the one it was
/// dispatched on.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParseTreeHooks;

impl TransformHooks for ParseTreeHooks {
    fn get_source(&self, node: &NodeRef, source: &Rc<dyn Source>) -> Rc<dyn Source> {
        node.origin()
            .and_then(|origin| origin.as_source())
            .filter(|origin| origin.is::<ParseNode>())
            .unwrap_or_else(|| Rc::clone(source))
    }

    fn as_origin(&self, source: &Rc<dyn Source>) -> Option<Origin> {
        if source.is::<ParseNode>() {
            Some(Origin::Source(Rc::clone(source)))
        } else {
            trace!(source_type = %source.type_name(), "No parse-tree origin");
            None
        }
    }
}

/// A [`Transformer`] set up with [`ParseTreeHooks`], mapping whole parse
/// trees.
#[derive(Debug)]
pub struct ParseTreeTransformer {
    transformer: Transformer,
}

impl ParseTreeTransformer {
    pub fn new(registry: Arc<SchemaRegistry>) -> Self {
        Self::with_config(registry, TransformerConfig::default())
    }

    pub fn with_config(registry: Arc<SchemaRegistry>, config: TransformerConfig) -> Self {
        Self {
            transformer: Transformer::with_config(registry, config).with_hooks(ParseTreeHooks),
        }
    }

    pub fn transformer(&self) -> &Transformer {
        &self.transformer
    }

    /// For registering factories
    pub fn transformer_mut(&mut self) -> &mut Transformer {
        &mut self.transformer
    }

    /// Transform the tree rooted at `root`, moving the transformer's issues
    /// into `issues`.
    ///
    /// # Errors
    ///
    /// Fatal transformation failures.
    pub fn map(&self, root: &Rc<ParseNode>, issues: &mut Vec<Issue>) -> Result<Option<NodeRef>> {
        let source: Rc<dyn Source> = Rc::clone(root) as Rc<dyn Source>;
        let result = self.transformer.transform(source, None);
        issues.extend(self.transformer.take_issues());
        Ok(result?)
    }
}
