//! Node factories and child wirings

use crate::transformer::Transformer;
use indexmap::IndexMap;
use std::fmt;
use std::rc::Rc;
use sylva_schema::QualifiedName;
use sylva_tree::{NodeRef, Source, SourceValue};

/// Builds the nodes for one source node
pub type NodeConstructor =
    Rc<dyn Fn(&Rc<dyn Source>, &Transformer, &NodeFactory) -> anyhow::Result<Vec<NodeRef>>>;

/// Reads a raw child value from a source node
pub type ChildGetter = Rc<dyn Fn(&Rc<dyn Source>) -> anyhow::Result<SourceValue>>;

/// Stores transformed children into a node
pub type ChildSetter = Rc<dyn Fn(&NodeRef, ChildValue) -> anyhow::Result<()>>;

/// Runs on every node a factory built, after its children are wired
pub type Finalizer = Rc<dyn Fn(&NodeRef) -> anyhow::Result<()>>;

/// Transformed form of a raw child value
#[derive(Debug, Clone, Default)]
pub enum ChildValue {
    #[default]
    None,
    One(NodeRef),
    Many(Vec<NodeRef>),
}

impl ChildValue {
    /// Flatten into a list
    pub fn into_nodes(self) -> Vec<NodeRef> {
        match self {
            ChildValue::None => Vec::new(),
            ChildValue::One(node) => vec![node],
            ChildValue::Many(nodes) => nodes,
        }
    }

    /// Single node, if exactly one
    pub fn into_single(self) -> Option<NodeRef> {
        match self {
            ChildValue::One(node) => Some(node),
            ChildValue::Many(mut nodes) if nodes.len() == 1 => nodes.pop(),
            _ => None,
        }
    }
}

/// Where a child property's content comes from, and how it is stored
#[derive(Clone)]
pub struct ChildWiring {
    pub name: String,
    pub getter: ChildGetter,
    /// `None` when the factory's constructor sets this child itself
    pub setter: Option<ChildSetter>,
}

impl fmt::Debug for ChildWiring {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChildWiring")
            .field("name", &self.name)
            .field("has_setter", &self.setter.is_some())
            .finish()
    }
}

/// A registered rule turning one source type into nodes
#[derive(Clone)]
pub struct NodeFactory {
    source_type: String,
    pub(crate) constructor: NodeConstructor,
    pub(crate) wirings: IndexMap<String, ChildWiring>,
    pub(crate) finalizer: Option<Finalizer>,
    pub(crate) skip_children: bool,
    pub(crate) children_set_at_construction: bool,
}

impl NodeFactory {
    pub fn new<F>(source_type: impl Into<String>, constructor: F) -> Self
    where
        F: Fn(&Rc<dyn Source>, &Transformer, &NodeFactory) -> anyhow::Result<Vec<NodeRef>> + 'static,
    {
        Self {
            source_type: source_type.into(),
            constructor: Rc::new(constructor),
            wirings: IndexMap::new(),
            finalizer: None,
            skip_children: false,
            children_set_at_construction: false,
        }
    }

    /// Source type this factory is registered for
    pub fn source_type(&self) -> &str {
        &self.source_type
    }

    /// Wire property `name` of the built node to the value `getter` reads.
    ///
    /// Transformed children are stored through the schema: `set_child` for
    /// single properties, `add_child` for collections.
    pub fn with_child<G>(&mut self, name: &str, getter: G) -> &mut Self
    where
        G: Fn(&Rc<dyn Source>) -> anyhow::Result<SourceValue> + 'static,
    {
        let setter = schema_setter(name);
        self.add_wiring(name.to_string(), name, Rc::new(getter), Some(setter))
    }

    /// Like [`NodeFactory::with_child`] with a custom setter
    pub fn with_child_setter<G, S>(&mut self, name: &str, getter: G, setter: S) -> &mut Self
    where
        G: Fn(&Rc<dyn Source>) -> anyhow::Result<SourceValue> + 'static,
        S: Fn(&NodeRef, ChildValue) -> anyhow::Result<()> + 'static,
    {
        self.add_wiring(name.to_string(), name, Rc::new(getter), Some(Rc::new(setter)))
    }

    /// Declare where child `name` is read from, leaving it to the
    /// constructor to store it.
    ///
    /// The factory then sets all its children at construction time; see
    /// [`Transformer::transform_child`].
    pub fn with_constructed_child<G>(&mut self, name: &str, getter: G) -> &mut Self
    where
        G: Fn(&Rc<dyn Source>) -> anyhow::Result<SourceValue> + 'static,
    {
        self.add_wiring(name.to_string(), name, Rc::new(getter), None)
    }

    /// Wiring used only when the built node is of type `scope`.
    ///
    /// Scoped wirings win over unscoped ones with the same name, which lets
    /// one factory build unrelated node types sharing property names.
    pub fn with_scoped_child<G>(&mut self, scope: &QualifiedName, name: &str, getter: G) -> &mut Self
    where
        G: Fn(&Rc<dyn Source>) -> anyhow::Result<SourceValue> + 'static,
    {
        let setter = schema_setter(name);
        self.add_wiring(scoped_key(scope, name), name, Rc::new(getter), Some(setter))
    }

    /// Do not wire children of the built nodes
    pub fn set_skip_children(&mut self, skip: bool) -> &mut Self {
        self.skip_children = skip;
        self
    }

    pub fn with_finalizer<F>(&mut self, finalizer: F) -> &mut Self
    where
        F: Fn(&NodeRef) -> anyhow::Result<()> + 'static,
    {
        self.finalizer = Some(Rc::new(finalizer));
        self
    }

    pub fn skips_children(&self) -> bool {
        self.skip_children
    }

    pub fn children_set_at_construction(&self) -> bool {
        self.children_set_at_construction
    }

    /// Wiring registered under `key` (`name` or `Type#name`)
    pub fn wiring(&self, key: &str) -> Option<&ChildWiring> {
        self.wirings.get(key)
    }

    fn add_wiring(
        &mut self,
        key: String,
        name: &str,
        getter: ChildGetter,
        setter: Option<ChildSetter>,
    ) -> &mut Self {
        if setter.is_none() {
            self.children_set_at_construction = true;
        }
        self.wirings.insert(
            key,
            ChildWiring {
                name: name.to_string(),
                getter,
                setter,
            },
        );
        self
    }
}

impl fmt::Debug for NodeFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeFactory")
            .field("source_type", &self.source_type)
            .field("wirings", &self.wirings.keys().collect::<Vec<_>>())
            .field("skip_children", &self.skip_children)
            .field("children_set_at_construction", &self.children_set_at_construction)
            .finish_non_exhaustive()
    }
}

/// Key of a wiring scoped to a target node type
pub fn scoped_key(scope: &QualifiedName, name: &str) -> String {
    format!("{scope}#{name}")
}

/// Store children through the node's schema
fn schema_setter(name: &str) -> ChildSetter {
    let name = name.to_string();
    Rc::new(move |node: &NodeRef, value: ChildValue| {
        let multiple = node
            .descriptor()
            .property(&name)
            .is_some_and(|p| p.is_multiple());
        match value {
            ChildValue::None => {}
            ChildValue::One(child) if !multiple => node.set_child(&name, child)?,
            ChildValue::Many(children) if !multiple => match children.len() {
                0 => {}
                1 => {
                    for child in children {
                        node.set_child(&name, child)?;
                    }
                }
                count => anyhow::bail!("{count} nodes for single child property '{name}'"),
            },
            other => {
                for child in other.into_nodes() {
                    node.add_child(&name, child)?;
                }
            }
        }
        Ok(())
    })
}
