//! Schema-driven AST nodes

use crate::origin::Origin;
use crate::position::{HasPosition, Position};
use crate::source::Source;
use crate::value::{ReferenceByName, Value};
use crate::{Error, Result};
use std::cell::{Cell, Ref, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};
use sylva_schema::{
    DescriptorRef, NodeKind, PropertyDescriptor, PropertyKind, QualifiedName, SchemaRegistry,
    TypeDefinition,
};
use tracing::trace;

/// Shared handle to a node. Parents own children through it.
pub type NodeRef = Rc<Node>;

/// Content of one property slot
#[derive(Debug, Clone, Default)]
pub enum PropertyValue {
    /// Never set, or cleared
    #[default]
    Absent,
    Value(Value),
    Child(NodeRef),
    Children(Vec<NodeRef>),
    Reference(ReferenceByName),
}

impl PropertyValue {
    pub fn is_absent(&self) -> bool {
        matches!(self, PropertyValue::Absent)
    }
}

/// A node of an AST.
///
/// The node type is given by its descriptor; property contents live in
/// slots aligned with the descriptor's property table. Children are attached
/// with [`Node::set_child`] and [`Node::add_child`], which keep the parent
/// link of the child pointing back at its owner.
pub struct Node {
    descriptor: DescriptorRef,
    parent: RefCell<Weak<Node>>,
    origin: RefCell<Option<Origin>>,
    position_override: Cell<Option<Position>>,
    id: RefCell<Option<String>>,
    slots: RefCell<Vec<PropertyValue>>,
}

impl Node {
    /// Create a detached node of the given type
    pub fn new(descriptor: DescriptorRef) -> NodeRef {
        let slots = vec![PropertyValue::Absent; descriptor.property_count()];
        Rc::new(Self {
            descriptor,
            parent: RefCell::new(Weak::new()),
            origin: RefCell::new(None),
            position_override: Cell::new(None),
            id: RefCell::new(None),
            slots: RefCell::new(slots),
        })
    }

    /// Create a node of kind `K`, registering the kind on first use.
    ///
    /// # Errors
    ///
    /// Returns an error when the kind cannot be registered.
    pub fn of<K: NodeKind>(registry: &SchemaRegistry) -> Result<NodeRef> {
        Ok(Self::new(registry.descriptor_for::<K>()?))
    }

    /// Create a node of the type registered as `package.name`.
    ///
    /// # Errors
    ///
    /// Unknown types are a hard error.
    pub fn lookup(registry: &SchemaRegistry, package: &str, name: &str) -> Result<NodeRef> {
        Ok(Self::new(registry.lookup(package, name)?))
    }

    pub fn descriptor(&self) -> &DescriptorRef {
        &self.descriptor
    }

    pub fn qualified_name(&self) -> &QualifiedName {
        self.descriptor.qualified_name()
    }

    /// Node type is `K` or extends it
    pub fn is_kind<K: NodeKind>(&self) -> bool {
        self.descriptor.is_kind::<K>()
    }

    pub fn is_a(&self, qualified_name: &QualifiedName) -> bool {
        self.descriptor.is_a(qualified_name)
    }

    pub fn id(&self) -> Option<String> {
        self.id.borrow().clone()
    }

    pub fn set_id(&self, id: Option<String>) {
        *self.id.borrow_mut() = id;
    }

    pub fn parent(&self) -> Option<NodeRef> {
        self.parent.borrow().upgrade()
    }

    /// Overwrite the parent link, without touching any slot.
    ///
    /// Used by parent fix-up passes; prefer `set_child`/`add_child`.
    pub fn set_parent(&self, parent: Option<&NodeRef>) {
        *self.parent.borrow_mut() = parent.map_or_else(Weak::new, Rc::downgrade);
    }

    /// Fluent form of [`Node::set_parent`]
    pub fn with_parent(self: Rc<Self>, parent: Option<&NodeRef>) -> NodeRef {
        self.set_parent(parent);
        self
    }

    fn has_parent_other_than(&self, owner: &Node) -> bool {
        self.parent()
            .is_some_and(|p| !std::ptr::eq(Rc::as_ptr(&p), owner))
    }

    pub fn origin(&self) -> Option<Origin> {
        self.origin.borrow().clone()
    }

    /// Set the origin. A node is never its own origin: that request is ignored.
    pub fn set_origin(self: &Rc<Self>, origin: Option<Origin>) {
        if origin.as_ref().is_some_and(|o| o.is_node(self)) {
            trace!(node_type = %self.qualified_name(), "Ignoring self-origin");
            return;
        }
        *self.origin.borrow_mut() = origin;
    }

    /// Fluent form of [`Node::set_origin`]
    pub fn with_origin(self: Rc<Self>, origin: Option<Origin>) -> NodeRef {
        self.set_origin(origin);
        self
    }

    /// The explicit override if set, else the origin's position
    pub fn position(&self) -> Option<Position> {
        self.position_override
            .get()
            .or_else(|| self.origin.borrow().as_ref().and_then(Origin::position))
    }

    /// Set or clear the position override
    pub fn set_position(&self, position: Option<Position>) {
        self.position_override.set(position);
    }

    /// Fluent form of [`Node::set_position`]
    pub fn with_position(self: Rc<Self>, position: Option<Position>) -> NodeRef {
        self.set_position(position);
        self
    }

    /// Drop the origin and the position override
    pub fn clear_position(&self) {
        self.position_override.set(None);
        *self.origin.borrow_mut() = None;
    }

    /// Text this node was built from, as recorded by its origin
    pub fn source_text(&self) -> Option<String> {
        self.origin.borrow().as_ref().and_then(Origin::source_text)
    }

    /// Direct children, flattened in declared property order
    pub fn children(&self) -> Vec<NodeRef> {
        let slots = self.slots.borrow();
        let mut children = Vec::new();
        for (index, slot) in slots.iter().enumerate() {
            if !self.slot_descriptor(index).is_some_and(PropertyDescriptor::is_child) {
                continue;
            }
            match slot {
                PropertyValue::Child(child) => children.push(Rc::clone(child)),
                PropertyValue::Children(many) => children.extend(many.iter().cloned()),
                _ => {}
            }
        }
        children
    }

    pub fn child_names(&self) -> Vec<&str> {
        self.descriptor.child_names()
    }

    /// True iff the schema marks `name` as a child property
    pub fn is_child(&self, name: &str) -> bool {
        self.descriptor.is_child(name)
    }

    /// Content of a single-child property
    ///
    /// # Errors
    ///
    /// Returns an error when `name` is not a single child property.
    pub fn child(&self, name: &str) -> Result<Option<NodeRef>> {
        let (index, property) = self.declared(name)?;
        if !property.is_child() {
            return Err(Error::not_a_child(self.qualified_name(), name));
        }
        if property.is_multiple() {
            return Err(Error::is_a_collection(self.qualified_name(), name));
        }
        Ok(match &self.slots.borrow()[index] {
            PropertyValue::Child(child) => Some(Rc::clone(child)),
            _ => None,
        })
    }

    /// Content of a collection child property
    ///
    /// # Errors
    ///
    /// Returns an error when `name` is not a collection child property.
    pub fn children_of(&self, name: &str) -> Result<Vec<NodeRef>> {
        let (index, property) = self.declared(name)?;
        if !property.is_child() {
            return Err(Error::not_a_child(self.qualified_name(), name));
        }
        if !property.is_multiple() {
            return Err(Error::not_a_collection(self.qualified_name(), name));
        }
        Ok(match &self.slots.borrow()[index] {
            PropertyValue::Children(children) => children.clone(),
            _ => Vec::new(),
        })
    }

    /// Store `child` in the single-child property `name`.
    ///
    /// A child previously stored there is detached.
    ///
    /// # Errors
    ///
    /// Returns an error when `name` is not a single child property, when
    /// `child` already belongs to another parent, or when attaching it would
    /// create a cycle.
    pub fn set_child(self: &Rc<Self>, name: &str, child: NodeRef) -> Result<()> {
        let (index, property) = self.declared(name)?;
        if !property.is_child() {
            return Err(Error::not_a_child(self.qualified_name(), name));
        }
        if property.is_multiple() {
            return Err(Error::is_a_collection(self.qualified_name(), name));
        }
        self.check_attachable(name, &child)?;

        // Moving a child between slots of the same owner
        child.detach();

        let previous = std::mem::replace(
            &mut self.slots.borrow_mut()[index],
            PropertyValue::Child(Rc::clone(&child)),
        );
        if let PropertyValue::Child(previous) = previous {
            if !Rc::ptr_eq(&previous, &child) {
                previous.set_parent(None);
            }
        }

        child.set_parent(Some(self));
        trace!(parent = %self.qualified_name(), property = name, child = %child.qualified_name(), "Set child");
        Ok(())
    }

    /// Empty the single-child property `name`, returning what it held
    ///
    /// # Errors
    ///
    /// Returns an error when `name` is not a single child property.
    pub fn clear_child(&self, name: &str) -> Result<Option<NodeRef>> {
        let (index, property) = self.declared(name)?;
        if !property.is_child() {
            return Err(Error::not_a_child(self.qualified_name(), name));
        }
        if property.is_multiple() {
            return Err(Error::is_a_collection(self.qualified_name(), name));
        }
        let previous = std::mem::take(&mut self.slots.borrow_mut()[index]);
        Ok(match previous {
            PropertyValue::Child(previous) => {
                previous.set_parent(None);
                Some(previous)
            }
            _ => None,
        })
    }

    /// Append `child` to the collection property `name`
    ///
    /// # Errors
    ///
    /// Returns an error when `name` is not a collection child property, when
    /// `child` already belongs to another parent, or when attaching it would
    /// create a cycle.
    pub fn add_child(self: &Rc<Self>, name: &str, child: NodeRef) -> Result<()> {
        let (index, property) = self.declared(name)?;
        if !property.is_child() {
            return Err(Error::not_a_child(self.qualified_name(), name));
        }
        if !property.is_multiple() {
            return Err(Error::not_a_collection(self.qualified_name(), name));
        }
        self.check_attachable(name, &child)?;
        child.detach();

        {
            let mut slots = self.slots.borrow_mut();
            match &mut slots[index] {
                PropertyValue::Children(children) => children.push(Rc::clone(&child)),
                slot => *slot = PropertyValue::Children(vec![Rc::clone(&child)]),
            }
        }

        child.set_parent(Some(self));
        trace!(parent = %self.qualified_name(), property = name, child = %child.qualified_name(), "Added child");
        Ok(())
    }

    /// Remove this node from its parent's slot and clear the parent link.
    ///
    /// Returns `false` when the node had no parent.
    pub fn detach(self: &Rc<Self>) -> bool {
        let Some(parent) = self.parent() else {
            return false;
        };

        for slot in parent.slots.borrow_mut().iter_mut() {
            match slot {
                PropertyValue::Child(child) if Rc::ptr_eq(child, self) => {
                    *slot = PropertyValue::Absent;
                }
                PropertyValue::Children(children) => {
                    children.retain(|c| !Rc::ptr_eq(c, self));
                }
                _ => {}
            }
        }

        self.set_parent(None);
        true
    }

    fn check_attachable(self: &Rc<Self>, name: &str, child: &NodeRef) -> Result<()> {
        if child.has_parent_other_than(self) {
            return Err(Error::already_parented(
                self.qualified_name(),
                name,
                child.qualified_name(),
            ));
        }

        let mut ancestor = Some(Rc::clone(self));
        while let Some(current) = ancestor {
            if Rc::ptr_eq(&current, child) {
                return Err(Error::CycleAttach {
                    node_type: self.qualified_name().clone(),
                    property: name.to_string(),
                });
            }
            ancestor = current.parent();
        }
        Ok(())
    }

    /// Value of an attribute property
    ///
    /// # Errors
    ///
    /// Returns an error when `name` is not an attribute.
    pub fn property(&self, name: &str) -> Result<Option<Value>> {
        let (index, _) = self.declared_kind(name, PropertyKind::Attribute)?;
        Ok(match &self.slots.borrow()[index] {
            PropertyValue::Value(value) => Some(value.clone()),
            _ => None,
        })
    }

    /// Set an attribute property
    ///
    /// # Errors
    ///
    /// Returns an error when `name` is not an attribute.
    pub fn set_property(&self, name: &str, value: impl Into<Value>) -> Result<()> {
        let (index, _) = self.declared_kind(name, PropertyKind::Attribute)?;
        self.slots.borrow_mut()[index] = PropertyValue::Value(value.into());
        Ok(())
    }

    /// Value of a reference property
    ///
    /// # Errors
    ///
    /// Returns an error when `name` is not a reference.
    pub fn reference(&self, name: &str) -> Result<Option<ReferenceByName>> {
        let (index, _) = self.declared_kind(name, PropertyKind::Reference)?;
        Ok(match &self.slots.borrow()[index] {
            PropertyValue::Reference(reference) => Some(reference.clone()),
            _ => None,
        })
    }

    /// Set a reference property
    ///
    /// # Errors
    ///
    /// Returns an error when `name` is not a reference.
    pub fn set_reference(&self, name: &str, reference: ReferenceByName) -> Result<()> {
        let (index, _) = self.declared_kind(name, PropertyKind::Reference)?;
        self.slots.borrow_mut()[index] = PropertyValue::Reference(reference);
        Ok(())
    }

    /// All properties with their current content, in declaration order
    pub fn properties(&self) -> Vec<(PropertyDescriptor, PropertyValue)> {
        let slots = self.slots.borrow();
        self.descriptor
            .properties()
            .cloned()
            .zip(slots.iter().cloned())
            .collect()
    }

    /// Borrow the raw slots, aligned with the descriptor's properties
    pub fn slots(&self) -> Ref<'_, Vec<PropertyValue>> {
        self.slots.borrow()
    }

    fn slot_descriptor(&self, index: usize) -> Option<&PropertyDescriptor> {
        self.descriptor.property_at(index)
    }

    fn declared(&self, name: &str) -> Result<(usize, &PropertyDescriptor)> {
        let index = self
            .descriptor
            .property_index(name)
            .filter(|&i| i < self.slots.borrow().len())
            .ok_or_else(|| Error::unknown_property(self.qualified_name(), name))?;
        let property = self
            .slot_descriptor(index)
            .ok_or_else(|| Error::unknown_property(self.qualified_name(), name))?;
        Ok((index, property))
    }

    fn declared_kind(&self, name: &str, kind: PropertyKind) -> Result<(usize, &PropertyDescriptor)> {
        let (index, property) = self.declared(name)?;
        if property.kind != kind {
            return Err(Error::WrongPropertyKind {
                node_type: self.qualified_name().clone(),
                property: name.to_string(),
                expected: kind,
                actual: property.kind,
            });
        }
        Ok((index, property))
    }
}

impl Source for Node {
    fn type_name(&self) -> String {
        self.qualified_name().to_string()
    }

    fn supertype_names(&self) -> Vec<String> {
        self.descriptor
            .supertypes()
            .map(|d| d.qualified_name().to_string())
            .collect()
    }

    fn position(&self) -> Option<Position> {
        Node::position(self)
    }

    fn source_text(&self) -> Option<String> {
        Node::source_text(self)
    }
}

impl HasPosition for Node {
    fn position(&self) -> Option<Position> {
        Node::position(self)
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug = f.debug_struct(self.descriptor.name());
        if let Some(position) = self.position() {
            debug.field("position", &position);
        }
        for (property, value) in self.properties() {
            if !value.is_absent() {
                debug.field(&property.name, &value);
            }
        }
        debug.finish()
    }
}

/// Package of the built-in node kinds
pub const GENERIC_PACKAGE: &str = "sylva";

/// Package of placeholders generated for unmapped source types, kept apart
/// from [`GENERIC_PACKAGE`] so no source type can collide with a built-in
pub const PLACEHOLDER_PACKAGE: &str = "sylva.unmapped";

/// Base type of placeholder nodes built for unmapped source types
pub struct GenericNode;

impl NodeKind for GenericNode {
    const PACKAGE: &'static str = GENERIC_PACKAGE;
    const NAME: &'static str = "GenericNode";
}

/// Substitute for a node whose construction failed.
///
/// `message` is the full error chain, `cause` its innermost error, and
/// `source_type` the type of the source node that was being transformed.
pub struct ErrorNode;

impl NodeKind for ErrorNode {
    const PACKAGE: &'static str = GENERIC_PACKAGE;
    const NAME: &'static str = "ErrorNode";

    fn define(definition: TypeDefinition) -> TypeDefinition {
        definition
            .attribute("message", "string")
            .attribute("cause", "string")
            .attribute("source_type", "string")
    }
}

impl Node {
    /// Placeholder node for a source type nothing is registered for.
    ///
    /// The placeholder type is `sylva.unmapped.<source type>` and extends
    /// [`GenericNode`]; it is generated once per source type.
    ///
    /// # Errors
    ///
    /// Returns an error when the generic base type cannot be registered.
    pub fn placeholder(registry: &SchemaRegistry, source_type: &str) -> Result<NodeRef> {
        let base = registry.descriptor_for::<GenericNode>()?;
        let descriptor = registry.register_placeholder(
            QualifiedName::new(PLACEHOLDER_PACKAGE, source_type),
            source_type,
            Some(base),
        );
        Ok(Self::new(descriptor))
    }

    /// Error node carrying a failure message and the type of the source
    /// node being built. The cause is left unset; see [`Node::with_cause`].
    ///
    /// # Errors
    ///
    /// Returns an error when the error node type cannot be registered.
    pub fn error(registry: &SchemaRegistry, message: &str, source_type: &str) -> Result<NodeRef> {
        let node = Self::of::<ErrorNode>(registry)?;
        node.set_property("message", message)?;
        node.set_property("source_type", source_type)?;
        Ok(node)
    }

    /// Record the innermost error of an error node's failure
    ///
    /// # Errors
    ///
    /// Returns an error when this is not an error node.
    pub fn with_cause(self: Rc<Self>, cause: &str) -> Result<NodeRef> {
        self.set_property("cause", cause)?;
        Ok(self)
    }

    /// Innermost error recorded on an error node
    pub fn error_cause(&self) -> Option<String> {
        if !self.is_kind::<ErrorNode>() {
            return None;
        }
        self.property("cause").ok().flatten().and_then(|v| v.as_string())
    }

    /// Message of an error node
    pub fn error_message(&self) -> Option<String> {
        if !self.is_kind::<ErrorNode>() {
            return None;
        }
        self.property("message").ok().flatten().and_then(|v| v.as_string())
    }
}
