//! The transformation engine

use crate::config::TransformerConfig;
use crate::factory::{ChildValue, ChildWiring, NodeFactory, scoped_key};
use crate::hooks::{DefaultHooks, TransformHooks};
use crate::{Error, Result};
use indexmap::IndexMap;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;
use sylva_schema::{DescriptorRef, NodeKind, SchemaRegistry};
use sylva_tree::{Issue, Node, NodeRef, Severity, Source, SourceValue, downcast_rc};
use tracing::{debug, trace, warn};

/// (factory source type, node type, property) -> resolved wiring key
type WiringCacheKey = (String, String, String);

/// Registry of node factories plus the recursive, fault-tolerant
/// conversion of source trees into nodes.
///
/// Factories are registered up front through `&mut self`; transformations
/// run through `&self` and accumulate diagnostics in [`Transformer::issues`].
pub struct Transformer {
    registry: Arc<SchemaRegistry>,
    factories: IndexMap<String, NodeFactory>,
    resolution_cache: RefCell<HashMap<String, Option<String>>>,
    wiring_cache: RefCell<HashMap<WiringCacheKey, Option<String>>>,
    issues: RefCell<Vec<Issue>>,
    config: TransformerConfig,
    hooks: Box<dyn TransformHooks>,
}

impl Transformer {
    pub fn new(registry: Arc<SchemaRegistry>) -> Self {
        Self::with_config(registry, TransformerConfig::default())
    }

    pub fn with_config(registry: Arc<SchemaRegistry>, config: TransformerConfig) -> Self {
        Self {
            registry,
            factories: IndexMap::new(),
            resolution_cache: RefCell::new(HashMap::new()),
            wiring_cache: RefCell::new(HashMap::new()),
            issues: RefCell::new(Vec::new()),
            config,
            hooks: Box::new(DefaultHooks),
        }
    }

    /// Replace the `get_source`/`as_origin` hooks
    #[must_use]
    pub fn with_hooks(mut self, hooks: impl TransformHooks + 'static) -> Self {
        self.hooks = Box::new(hooks);
        self
    }

    /// Start with issues collected by an earlier stage
    #[must_use]
    pub fn with_issues(self, issues: Vec<Issue>) -> Self {
        *self.issues.borrow_mut() = issues;
        self
    }

    pub fn registry(&self) -> &Arc<SchemaRegistry> {
        &self.registry
    }

    pub fn config(&self) -> &TransformerConfig {
        &self.config
    }

    /// Create an empty node of kind `K`
    ///
    /// # Errors
    ///
    /// Returns an error when `K` cannot be registered.
    pub fn create<K: NodeKind>(&self) -> Result<NodeRef> {
        Ok(Node::of::<K>(&self.registry)?)
    }

    /// Descriptor of kind `K`, registering it on first use
    ///
    /// # Errors
    ///
    /// Returns an error when `K` cannot be registered.
    pub fn descriptor<K: NodeKind>(&self) -> Result<DescriptorRef> {
        Ok(self.registry.descriptor_for::<K>()?)
    }

    /// Register a factory, replacing any factory for the same source type
    pub fn register_factory(&mut self, factory: NodeFactory) -> &mut NodeFactory {
        let source_type = factory.source_type().to_string();
        debug!(source_type = %source_type, "Registering node factory");
        self.resolution_cache.borrow_mut().clear();
        self.wiring_cache.borrow_mut().clear();
        self.factories.insert(source_type.clone(), factory);
        &mut self.factories[source_type.as_str()]
    }

    /// Register a constructor building exactly one node
    pub fn register_node_factory<F>(&mut self, source_type: &str, constructor: F) -> &mut NodeFactory
    where
        F: Fn(&Rc<dyn Source>, &Transformer) -> anyhow::Result<NodeRef> + 'static,
    {
        self.register_factory(NodeFactory::new(source_type, move |source, transformer, _| {
            constructor(source, transformer).map(|node| vec![node])
        }))
    }

    /// Register a constructor that may decline to build a node
    pub fn register_optional_node_factory<F>(
        &mut self,
        source_type: &str,
        constructor: F,
    ) -> &mut NodeFactory
    where
        F: Fn(&Rc<dyn Source>, &Transformer, &NodeFactory) -> anyhow::Result<Option<NodeRef>>
            + 'static,
    {
        self.register_factory(NodeFactory::new(source_type, move |source, transformer, factory| {
            constructor(source, transformer, factory).map(|node| node.into_iter().collect())
        }))
    }

    /// Register a constructor building any number of nodes
    pub fn register_multiple_node_factory<F>(
        &mut self,
        source_type: &str,
        constructor: F,
    ) -> &mut NodeFactory
    where
        F: Fn(&Rc<dyn Source>, &Transformer, &NodeFactory) -> anyhow::Result<Vec<NodeRef>>
            + 'static,
    {
        self.register_factory(NodeFactory::new(source_type, constructor))
    }

    /// Register a factory creating an empty node of kind `K`, to be filled
    /// by child wirings
    pub fn register_kind_factory<K: NodeKind>(&mut self, source_type: &str) -> &mut NodeFactory {
        self.register_node_factory(source_type, |_, transformer| Ok(transformer.create::<K>()?))
    }

    /// Map AST nodes of `source_type` to themselves.
    ///
    /// Used when source and target schemas coincide. Children are kept as
    /// they are.
    pub fn register_identity_transformation(&mut self, source_type: &str) -> &mut NodeFactory {
        let factory = self.register_node_factory(source_type, |source, _| {
            downcast_rc::<Node>(source).ok_or_else(|| {
                anyhow::anyhow!(
                    "identity transformation needs an AST node, got {}",
                    source.type_name()
                )
            })
        });
        factory.set_skip_children(true)
    }

    /// Factory registered exactly for `source_type`
    pub fn factory(&self, source_type: &str) -> Option<&NodeFactory> {
        self.factories.get(source_type)
    }

    /// Transform `source` into zero or one node.
    ///
    /// # Errors
    ///
    /// Fails when more than one node is produced, plus everything
    /// [`Transformer::transform_into_nodes`] fails on.
    pub fn transform(
        &self,
        source: impl Into<SourceValue>,
        parent: Option<&NodeRef>,
    ) -> Result<Option<NodeRef>> {
        let mut nodes = self.transform_into_nodes(source, parent)?;
        match nodes.len() {
            0 | 1 => Ok(nodes.pop()),
            count => Err(Error::CannotFlatten { count }),
        }
    }

    /// Transform `source` into nodes whose parent is `parent`.
    ///
    /// Absent sources give no nodes. Unmapped source types and failing
    /// constructors give a placeholder or error node when generic nodes are
    /// allowed.
    ///
    /// # Errors
    ///
    /// Fails on collections, on unmapped types and constructor failures when
    /// generic nodes are not allowed, and on child wiring or finalizer
    /// failures.
    pub fn transform_into_nodes(
        &self,
        source: impl Into<SourceValue>,
        parent: Option<&NodeRef>,
    ) -> Result<Vec<NodeRef>> {
        let source = match source.into() {
            SourceValue::Absent => return Ok(Vec::new()),
            SourceValue::Many(_) => return Err(Error::CollectionNotExpected),
            SourceValue::One(source) => source,
        };
        let source_type = source.type_name();

        let Some(factory) = self.resolve_factory(&source) else {
            return self.unmapped(&source, &source_type, parent).map(|node| vec![node]);
        };

        let nodes = match (factory.constructor)(&source, self, factory) {
            Ok(nodes) => nodes,
            Err(error) if self.config.allow_generic_node => {
                warn!(source_type = %source_type, error = %format!("{error:#}"), "Node factory failed, substituting error node");
                let node = Node::error(&self.registry, &format!("{error:#}"), &source_type)?
                    .with_cause(&error.root_cause().to_string())?;
                node.set_origin(self.hooks.as_origin(&source));
                node.set_parent(parent);
                return Ok(vec![node]);
            }
            Err(error) => {
                return Err(Error::Constructor {
                    source_type,
                    source: error,
                });
            }
        };

        for node in &nodes {
            if node.origin().is_none() {
                node.set_origin(self.hooks.as_origin(&source));
            }
        }

        if !factory.skip_children && !factory.children_set_at_construction {
            for node in &nodes {
                self.wire_children(factory, node, &source)?;
            }
        }

        if let Some(finalizer) = &factory.finalizer {
            for node in &nodes {
                finalizer(node).map_err(|source| Error::Finalizer {
                    node_type: node.qualified_name().to_string(),
                    source,
                })?;
            }
        }

        for node in &nodes {
            node.set_parent(parent);
        }

        trace!(source_type = %source_type, nodes = nodes.len(), "Transformed source node");
        Ok(nodes)
    }

    /// Transform what the wiring `name` of `factory` reads from `source`.
    ///
    /// For constructors of factories whose children are set at
    /// construction time. The returned nodes have no parent yet.
    ///
    /// # Errors
    ///
    /// Fails when the factory has no such wiring or its getter fails, plus
    /// everything [`Transformer::transform_into_nodes`] fails on.
    pub fn transform_child(
        &self,
        factory: &NodeFactory,
        name: &str,
        source: &Rc<dyn Source>,
    ) -> Result<ChildValue> {
        let wiring = factory.wiring(name).ok_or_else(|| {
            Error::child_wiring(
                factory.source_type(),
                name,
                anyhow::anyhow!("no child wiring named '{name}'"),
            )
        })?;
        let raw = (wiring.getter)(source)
            .map_err(|error| Error::child_wiring(factory.source_type(), name, error))?;
        self.transform_raw(raw, None)
    }

    /// Issues collected so far
    pub fn issues(&self) -> Vec<Issue> {
        self.issues.borrow().clone()
    }

    /// Take the collected issues, leaving none behind
    pub fn take_issues(&self) -> Vec<Issue> {
        std::mem::take(&mut *self.issues.borrow_mut())
    }

    pub fn add_issue(&self, issue: Issue) {
        self.issues.borrow_mut().push(issue);
    }

    fn unmapped(
        &self,
        source: &Rc<dyn Source>,
        source_type: &str,
        parent: Option<&NodeRef>,
    ) -> Result<NodeRef> {
        if !self.config.allow_generic_node {
            return Err(Error::NoFactory {
                source_type: source_type.to_string(),
            });
        }

        debug!(source_type, "Source node not mapped, generating placeholder");
        let node = Node::placeholder(&self.registry, source_type)?;
        node.set_origin(self.hooks.as_origin(source));
        node.set_parent(parent);
        self.add_issue(
            Issue::semantic(format!("source node not mapped: {source_type}"))
                .with_severity(Severity::Info)
                .with_position(source.position()),
        );
        Ok(node)
    }

    /// Most specific factory along the source's type chain, cached per
    /// most specific type name
    fn resolve_factory(&self, source: &Rc<dyn Source>) -> Option<&NodeFactory> {
        let source_type = source.type_name();
        let cached = self.resolution_cache.borrow().get(&source_type).cloned();
        let resolved = match cached {
            Some(resolved) => resolved,
            None => {
                let resolved = source
                    .type_chain()
                    .into_iter()
                    .find(|candidate| self.factories.contains_key(candidate));
                trace!(source_type = %source_type, factory = ?resolved, "Resolved node factory");
                self.resolution_cache
                    .borrow_mut()
                    .insert(source_type, resolved.clone());
                resolved
            }
        };
        resolved.and_then(|key| self.factories.get(&key))
    }

    fn wire_children(
        &self,
        factory: &NodeFactory,
        node: &NodeRef,
        source: &Rc<dyn Source>,
    ) -> Result<()> {
        let effective = self.hooks.get_source(node, source);
        let descriptor = Arc::clone(node.descriptor());

        for property in descriptor.properties() {
            let Some(wiring) = self.find_wiring(factory, &descriptor, &property.name) else {
                continue;
            };
            let node_type = descriptor.qualified_name().to_string();

            let raw = (wiring.getter)(&effective)
                .map_err(|error| Error::child_wiring(&node_type, &property.name, error))?;
            let value = match self.transform_raw(raw, Some(node))? {
                ChildValue::One(child) if property.is_multiple() => ChildValue::Many(vec![child]),
                value => value,
            };

            if let Some(setter) = &wiring.setter {
                setter(node, value)
                    .map_err(|error| Error::child_wiring(&node_type, &property.name, error))?;
            }
        }
        Ok(())
    }

    fn transform_raw(&self, raw: SourceValue, parent: Option<&NodeRef>) -> Result<ChildValue> {
        match raw {
            SourceValue::Absent => Ok(ChildValue::None),
            SourceValue::One(child) => {
                let mut nodes = self.transform_into_nodes(SourceValue::One(child), parent)?;
                Ok(match nodes.len() {
                    0 => ChildValue::None,
                    1 => nodes.pop().map_or(ChildValue::None, ChildValue::One),
                    _ => ChildValue::Many(nodes),
                })
            }
            SourceValue::Many(children) => {
                let mut nodes = Vec::with_capacity(children.len());
                for child in children {
                    nodes.extend(self.transform_into_nodes(SourceValue::One(child), parent)?);
                }
                Ok(ChildValue::Many(nodes))
            }
        }
    }

    /// Wiring for `property` of a node of type `descriptor`: scoped key
    /// first, then the plain name. Misses are cached too.
    fn find_wiring<'f>(
        &self,
        factory: &'f NodeFactory,
        descriptor: &DescriptorRef,
        property: &str,
    ) -> Option<&'f ChildWiring> {
        let cache_key = (
            factory.source_type().to_string(),
            descriptor.qualified_name().to_string(),
            property.to_string(),
        );

        let cached = self.wiring_cache.borrow().get(&cache_key).cloned();
        let resolved = match cached {
            Some(resolved) => resolved,
            None => {
                let scoped = scoped_key(descriptor.qualified_name(), property);
                let resolved = if factory.wirings.contains_key(&scoped) {
                    Some(scoped)
                } else if factory.wirings.contains_key(property) {
                    Some(property.to_string())
                } else {
                    trace!(factory = factory.source_type(), node_type = %descriptor.qualified_name(), property, "No child wiring");
                    None
                };
                self.wiring_cache
                    .borrow_mut()
                    .insert(cache_key, resolved.clone());
                resolved
            }
        };
        resolved.and_then(|key| factory.wirings.get(&key))
    }
}

impl fmt::Debug for Transformer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transformer")
            .field("factories", &self.factories.keys().collect::<Vec<_>>())
            .field("issues", &self.issues.borrow().len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
