//! Node-type descriptor model

use crate::registry::SchemaRegistry;
use indexmap::IndexMap;
use std::any::TypeId;
use std::fmt;
use std::sync::Arc;

/// Shared handle to a registered descriptor.
pub type DescriptorRef = Arc<NodeTypeDescriptor>;

/// Package-qualified node type name (e.g. `simple.SetStatement`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QualifiedName {
    package: String,
    name: String,
}

impl QualifiedName {
    /// Create a qualified name from its package and simple name
    pub fn new(package: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            name: name.into(),
        }
    }

    /// Package part
    pub fn package(&self) -> &str {
        &self.package
    }

    /// Simple name part
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.package.is_empty() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{}.{}", self.package, self.name)
        }
    }
}

/// What a property holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertyKind {
    /// Plain value (string, number, flag...)
    Attribute,
    /// Contained child node(s)
    Child,
    /// Reference by name to a node owned elsewhere
    Reference,
}

/// Declared shape of one property of a node type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyDescriptor {
    /// Property name
    pub name: String,

    /// Attribute, child or reference
    pub kind: PropertyKind,

    /// Whether the property holds a collection
    pub multiple: bool,

    /// Declared type, if any (a qualified node type name or a value type)
    pub declared_type: Option<String>,

    /// Set when the entry was merged in from a supertype
    pub inherited: bool,
}

impl PropertyDescriptor {
    /// Create a property of the given kind
    pub fn new(name: impl Into<String>, kind: PropertyKind, multiple: bool) -> Self {
        Self {
            name: name.into(),
            kind,
            multiple,
            declared_type: None,
            inherited: false,
        }
    }

    /// Single plain value
    pub fn attribute(name: impl Into<String>) -> Self {
        Self::new(name, PropertyKind::Attribute, false)
    }

    /// Single contained child
    pub fn child(name: impl Into<String>) -> Self {
        Self::new(name, PropertyKind::Child, false)
    }

    /// Collection of contained children
    pub fn children(name: impl Into<String>) -> Self {
        Self::new(name, PropertyKind::Child, true)
    }

    /// Single reference by name
    pub fn reference(name: impl Into<String>) -> Self {
        Self::new(name, PropertyKind::Reference, false)
    }

    /// Attach a declared type
    #[must_use]
    pub fn with_type(mut self, declared_type: impl Into<String>) -> Self {
        self.declared_type = Some(declared_type.into());
        self
    }

    pub fn is_child(&self) -> bool {
        self.kind == PropertyKind::Child
    }

    pub fn is_multiple(&self) -> bool {
        self.multiple
    }

    pub fn is_reference(&self) -> bool {
        self.kind == PropertyKind::Reference
    }
}

/// The host-side type a descriptor is bound to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeBinding {
    /// A Rust marker type implementing [`NodeKind`]
    Kind {
        type_id: TypeId,
        type_name: &'static str,
    },

    /// A definition created at runtime (e.g. by an importer), identified by key
    Dynamic { key: String },

    /// Generated for an unmapped source type met during transformation
    Placeholder { source_type: String },
}

impl TypeBinding {
    /// Binding for a [`NodeKind`] marker type
    pub fn of<K: NodeKind>() -> Self {
        Self::Kind {
            type_id: TypeId::of::<K>(),
            type_name: std::any::type_name::<K>(),
        }
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self, Self::Placeholder { .. })
    }
}

impl fmt::Display for TypeBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Kind { type_name, .. } => write!(f, "type `{type_name}`"),
            Self::Dynamic { key } => write!(f, "dynamic definition `{key}`"),
            Self::Placeholder { source_type } => {
                write!(f, "placeholder for source type `{source_type}`")
            }
        }
    }
}

/// A Rust marker type standing for one AST node type.
///
/// The descriptor is derived from [`NodeKind::define`] the first time the
/// kind is registered and cached by the registry afterwards.
///
/// ```ignore
/// struct SetStatement;
///
/// impl NodeKind for SetStatement {
///     const PACKAGE: &'static str = "simple";
///     const NAME: &'static str = "SetStatement";
///
///     fn define(definition: TypeDefinition) -> TypeDefinition {
///         definition
///             .extends::<Statement>()
///             .attribute("variable", "string")
///             .child("value", "simple.Expression")
///     }
/// }
/// ```
pub trait NodeKind: 'static {
    const PACKAGE: &'static str;
    const NAME: &'static str;

    /// Declare properties and supertype. Declaration order is child order.
    fn define(definition: TypeDefinition) -> TypeDefinition {
        definition
    }

    fn qualified_name() -> QualifiedName {
        QualifiedName::new(Self::PACKAGE, Self::NAME)
    }
}

pub(crate) type RegisterFn = fn(&SchemaRegistry) -> crate::Result<DescriptorRef>;

#[derive(Clone)]
pub(crate) enum ParentDefinition {
    Kind {
        qualified_name: QualifiedName,
        binding: TypeBinding,
        register: RegisterFn,
    },
    Descriptor(DescriptorRef),
}

/// Static description of a node type, consumed by the registry
#[derive(Clone)]
pub struct TypeDefinition {
    pub(crate) qualified_name: QualifiedName,
    pub(crate) properties: Vec<PropertyDescriptor>,
    pub(crate) parent: Option<ParentDefinition>,
}

impl TypeDefinition {
    /// Start a definition for `package.name`
    pub fn new(package: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            qualified_name: QualifiedName::new(package, name),
            properties: Vec::new(),
            parent: None,
        }
    }

    pub fn qualified_name(&self) -> &QualifiedName {
        &self.qualified_name
    }

    /// Extend the node type of a marker kind
    #[must_use]
    pub fn extends<P: NodeKind>(mut self) -> Self {
        self.parent = Some(ParentDefinition::Kind {
            qualified_name: P::qualified_name(),
            binding: TypeBinding::of::<P>(),
            register: SchemaRegistry::register::<P>,
        });
        self
    }

    /// Extend an already registered descriptor
    #[must_use]
    pub fn extends_descriptor(mut self, parent: DescriptorRef) -> Self {
        self.parent = Some(ParentDefinition::Descriptor(parent));
        self
    }

    #[must_use]
    pub fn property(mut self, property: PropertyDescriptor) -> Self {
        self.properties.push(property);
        self
    }

    #[must_use]
    pub fn attribute(self, name: &str, declared_type: &str) -> Self {
        self.property(PropertyDescriptor::attribute(name).with_type(declared_type))
    }

    #[must_use]
    pub fn child(self, name: &str, declared_type: &str) -> Self {
        self.property(PropertyDescriptor::child(name).with_type(declared_type))
    }

    #[must_use]
    pub fn children(self, name: &str, declared_type: &str) -> Self {
        self.property(PropertyDescriptor::children(name).with_type(declared_type))
    }

    #[must_use]
    pub fn reference(self, name: &str, declared_type: &str) -> Self {
        self.property(PropertyDescriptor::reference(name).with_type(declared_type))
    }
}

impl fmt::Debug for TypeDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeDefinition")
            .field("qualified_name", &self.qualified_name)
            .field("properties", &self.properties)
            .field("has_parent", &self.parent.is_some())
            .finish()
    }
}

/// Registered, immutable description of a node type
#[derive(Debug, Clone)]
pub struct NodeTypeDescriptor {
    qualified_name: QualifiedName,
    properties: IndexMap<String, PropertyDescriptor>,
    extends: Option<DescriptorRef>,
    binding: TypeBinding,
}

impl NodeTypeDescriptor {
    pub(crate) fn new(
        qualified_name: QualifiedName,
        properties: IndexMap<String, PropertyDescriptor>,
        extends: Option<DescriptorRef>,
        binding: TypeBinding,
    ) -> Self {
        Self {
            qualified_name,
            properties,
            extends,
            binding,
        }
    }

    pub fn qualified_name(&self) -> &QualifiedName {
        &self.qualified_name
    }

    pub fn package(&self) -> &str {
        self.qualified_name.package()
    }

    pub fn name(&self) -> &str {
        self.qualified_name.name()
    }

    pub fn binding(&self) -> &TypeBinding {
        &self.binding
    }

    pub fn is_placeholder(&self) -> bool {
        self.binding.is_placeholder()
    }

    /// Properties in declaration order, inherited entries first
    pub fn properties(&self) -> impl Iterator<Item = &PropertyDescriptor> {
        self.properties.values()
    }

    pub fn property(&self, name: &str) -> Option<&PropertyDescriptor> {
        self.properties.get(name)
    }

    /// Slot index of a property, stable for the lifetime of the descriptor
    pub fn property_index(&self, name: &str) -> Option<usize> {
        self.properties.get_index_of(name)
    }

    pub fn property_at(&self, index: usize) -> Option<&PropertyDescriptor> {
        self.properties.get_index(index).map(|(_, p)| p)
    }

    pub fn property_count(&self) -> usize {
        self.properties.len()
    }

    /// Properties marked as holding children
    pub fn child_properties(&self) -> impl Iterator<Item = &PropertyDescriptor> {
        self.properties.values().filter(|p| p.is_child())
    }

    pub fn child_names(&self) -> Vec<&str> {
        self.child_properties().map(|p| p.name.as_str()).collect()
    }

    pub fn is_child(&self, name: &str) -> bool {
        self.property(name).is_some_and(PropertyDescriptor::is_child)
    }

    pub fn extends(&self) -> Option<&DescriptorRef> {
        self.extends.as_ref()
    }

    /// Supertypes from the nearest to the most general
    pub fn supertypes(&self) -> impl Iterator<Item = &NodeTypeDescriptor> {
        std::iter::successors(self.extends.as_deref(), |d| d.extends.as_deref())
    }

    /// True when this type is `name` or extends it, directly or not
    pub fn is_a(&self, name: &QualifiedName) -> bool {
        &self.qualified_name == name || self.supertypes().any(|s| &s.qualified_name == name)
    }

    /// True when this type is the kind `K` or extends it
    pub fn is_kind<K: NodeKind>(&self) -> bool {
        self.is_a(&K::qualified_name())
    }

    pub(crate) fn with_added_property(&self, property: PropertyDescriptor) -> Self {
        let mut updated = self.clone();
        updated.properties.insert(property.name.clone(), property);
        updated
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qualified_name_display() {
        assert_eq!(QualifiedName::new("simple", "Set").to_string(), "simple.Set");
        assert_eq!(QualifiedName::new("", "Set").to_string(), "Set");
    }

    #[test]
    fn test_property_descriptor_flags() {
        let attr = PropertyDescriptor::attribute("name");
        assert!(!attr.is_child());
        assert!(!attr.is_multiple());
        assert!(!attr.is_reference());

        let many = PropertyDescriptor::children("statements").with_type("simple.Statement");
        assert!(many.is_child());
        assert!(many.is_multiple());
        assert_eq!(many.declared_type.as_deref(), Some("simple.Statement"));

        let reference = PropertyDescriptor::reference("target");
        assert!(reference.is_reference());
        assert!(!reference.is_child());
    }

    #[test]
    fn test_type_definition_keeps_declaration_order() {
        let def = TypeDefinition::new("pkg", "Node")
            .attribute("name", "string")
            .child("body", "pkg.Body")
            .children("items", "pkg.Item");

        let names: Vec<&str> = def.properties.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["name", "body", "items"]);
        assert!(def.parent.is_none());
    }

    #[test]
    fn test_binding_display_names_type() {
        struct Marker;
        impl NodeKind for Marker {
            const PACKAGE: &'static str = "pkg";
            const NAME: &'static str = "Marker";
        }

        let binding = TypeBinding::of::<Marker>();
        assert!(binding.to_string().contains("Marker"));
        assert!(!binding.is_placeholder());

        let placeholder = TypeBinding::Placeholder {
            source_type: "FooContext".to_string(),
        };
        assert!(placeholder.is_placeholder());
        assert!(placeholder.to_string().contains("FooContext"));
    }
}
