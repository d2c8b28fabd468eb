//! Schema registry with conflict policies and inheritance support

use crate::inheritance::{InheritanceGraph, merge_properties};
use crate::model::{
    DescriptorRef, NodeKind, NodeTypeDescriptor, ParentDefinition, PropertyDescriptor,
    QualifiedName, TypeBinding, TypeDefinition,
};
use crate::{Error, Result};
use dashmap::DashMap;
use std::any::TypeId;
use std::fmt;
use std::sync::{Arc, Mutex};
use tracing::{debug, trace, warn};

/// Two different types competing for the same qualified name
#[derive(Debug, Clone)]
pub struct RegistrationConflict {
    pub qualified_name: QualifiedName,
    pub existing: TypeBinding,
    pub incoming: TypeBinding,
}

/// Outcome chosen by a conflict policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictResolution {
    /// Reject the incoming registration
    Fail,
    /// Replace the existing binding with the incoming one
    Overwrite,
    /// Keep the existing descriptor and route the incoming type to it
    KeepExisting,
}

/// Custom conflict handler
pub type ConflictResolver = Arc<dyn Fn(&RegistrationConflict) -> ConflictResolution + Send + Sync>;

/// How name conflicts between different types are handled
#[derive(Clone, Default)]
pub enum ConflictPolicy {
    /// Fail fast, naming both types (default)
    #[default]
    Fail,

    /// Log a warning and let the newer registration win
    WarnAndOverwrite,

    /// Delegate to a caller-provided resolver
    Custom(ConflictResolver),
}

impl fmt::Debug for ConflictPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fail => write!(f, "Fail"),
            Self::WarnAndOverwrite => write!(f, "WarnAndOverwrite"),
            Self::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}

/// Configuration for a [`SchemaRegistry`]
#[derive(Debug, Clone, Default)]
pub struct RegistryConfig {
    /// Policy applied when a qualified name is bound twice
    pub conflict_policy: ConflictPolicy,
}

/// Table of node-type descriptors keyed by qualified name.
///
/// Registration is expected to happen once per type, at startup, and reads
/// dominate afterwards. Create one registry and share it (`Arc`) with every
/// component that instantiates or inspects nodes.
pub struct SchemaRegistry {
    by_name: DashMap<QualifiedName, DescriptorRef>,
    by_type: DashMap<TypeId, DescriptorRef>,
    graph: Mutex<InheritanceGraph>,
    config: RegistryConfig,
}

impl SchemaRegistry {
    /// Create an empty registry with the fail-fast conflict policy
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    /// Create an empty registry with the given configuration
    pub fn with_config(config: RegistryConfig) -> Self {
        Self {
            by_name: DashMap::new(),
            by_type: DashMap::new(),
            graph: Mutex::new(InheritanceGraph::new()),
            config,
        }
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Register the node kind `K`, or return its cached descriptor.
    ///
    /// Supertypes declared with [`TypeDefinition::extends`] are registered
    /// first. The descriptor is computed once; later calls are lookups.
    ///
    /// # Errors
    ///
    /// Returns an error when the qualified name is bound to another type and
    /// the policy rejects it, on redefinition, on duplicate properties, or on
    /// circular inheritance.
    pub fn register<K: NodeKind>(&self) -> Result<DescriptorRef> {
        if let Some(cached) = self.by_type.get(&TypeId::of::<K>()) {
            return Ok(Arc::clone(&cached));
        }

        let definition = K::define(TypeDefinition::new(K::PACKAGE, K::NAME));
        self.register_definition(definition, TypeBinding::of::<K>())
    }

    /// Descriptor for `K`, registering it on first use
    ///
    /// # Errors
    ///
    /// Same as [`SchemaRegistry::register`].
    pub fn descriptor_for<K: NodeKind>(&self) -> Result<DescriptorRef> {
        self.register::<K>()
    }

    /// Register a definition under an explicit binding.
    ///
    /// # Errors
    ///
    /// See [`SchemaRegistry::register`].
    pub fn register_definition(
        &self,
        definition: TypeDefinition,
        binding: TypeBinding,
    ) -> Result<DescriptorRef> {
        let TypeDefinition {
            qualified_name,
            properties,
            parent,
        } = definition;

        let parent = self.resolve_parent(&qualified_name, &binding, parent)?;

        let merged = merge_properties(&qualified_name, parent.as_deref(), properties)?;
        let descriptor = Arc::new(NodeTypeDescriptor::new(
            qualified_name,
            merged,
            parent,
            binding,
        ));

        self.bind(descriptor)
    }

    fn resolve_parent(
        &self,
        qualified_name: &QualifiedName,
        binding: &TypeBinding,
        parent: Option<ParentDefinition>,
    ) -> Result<Option<DescriptorRef>> {
        let (parent_name, parent_binding) = match &parent {
            None => return Ok(None),
            Some(ParentDefinition::Kind {
                qualified_name,
                binding,
                ..
            }) => (qualified_name.clone(), binding.clone()),
            Some(ParentDefinition::Descriptor(descriptor)) => (
                descriptor.qualified_name().clone(),
                descriptor.binding().clone(),
            ),
        };

        if &parent_name == qualified_name {
            // Same name as the supertype: only a placeholder may be promoted,
            // and the promoted type extends the supertype it declared
            return match self.get(qualified_name) {
                Some(existing) if existing.is_placeholder() => {
                    debug!(node_type = %qualified_name, "Promoting placeholder through subtype registration");
                    match parent {
                        Some(ParentDefinition::Descriptor(declared)) => Ok(Some(declared)),
                        _ => Ok(Some(existing)),
                    }
                }
                Some(existing) => Err(Error::Redefinition {
                    qualified_name: qualified_name.clone(),
                    existing: existing.binding().clone(),
                    incoming: binding.clone(),
                }),
                None => Err(Error::Redefinition {
                    qualified_name: qualified_name.clone(),
                    existing: parent_binding,
                    incoming: binding.clone(),
                }),
            };
        }

        {
            let mut graph = self
                .graph
                .lock()
                .map_err(|_| Error::Registry("inheritance graph lock poisoned".to_string()))?;
            if graph.would_create_cycle(qualified_name, &parent_name) {
                return Err(Error::CircularInheritance {
                    child: qualified_name.clone(),
                    parent: parent_name,
                });
            }
            graph.add_edge(qualified_name.clone(), parent_name);
        }

        match parent {
            Some(ParentDefinition::Kind { register, .. }) => register(self).map(Some),
            Some(ParentDefinition::Descriptor(descriptor)) => Ok(Some(descriptor)),
            None => Ok(None),
        }
    }

    fn bind(&self, descriptor: DescriptorRef) -> Result<DescriptorRef> {
        let name = descriptor.qualified_name().clone();
        let existing = self.by_name.get(&name).map(|entry| Arc::clone(&entry));

        if let Some(existing) = existing {
            if existing.binding() == descriptor.binding() {
                trace!(node_type = %name, "Type already registered");
                self.index_by_type(&existing);
                return Ok(existing);
            }

            if existing.is_placeholder() {
                debug!(node_type = %name, binding = %descriptor.binding(), "Promoting placeholder");
            } else {
                let conflict = RegistrationConflict {
                    qualified_name: name.clone(),
                    existing: existing.binding().clone(),
                    incoming: descriptor.binding().clone(),
                };

                match self.resolve_conflict(&conflict) {
                    ConflictResolution::Fail => {
                        return Err(Error::conflict(
                            conflict.qualified_name,
                            conflict.existing,
                            conflict.incoming,
                        ));
                    }
                    ConflictResolution::KeepExisting => {
                        warn!(node_type = %name, ignored = %conflict.incoming, "Keeping existing node type binding");
                        if let TypeBinding::Kind { type_id, .. } = descriptor.binding() {
                            self.by_type.insert(*type_id, Arc::clone(&existing));
                        }
                        return Ok(existing);
                    }
                    ConflictResolution::Overwrite => {
                        warn!(node_type = %name, replaced = %conflict.existing, by = %conflict.incoming, "Overwriting node type binding");
                        if let TypeBinding::Kind { type_id, .. } = existing.binding() {
                            self.by_type.remove(type_id);
                        }
                    }
                }
            }
        }

        self.by_name.insert(name.clone(), Arc::clone(&descriptor));
        self.index_by_type(&descriptor);
        debug!(node_type = %name, properties = descriptor.property_count(), "Registered node type");
        Ok(descriptor)
    }

    fn index_by_type(&self, descriptor: &DescriptorRef) {
        if let TypeBinding::Kind { type_id, .. } = descriptor.binding() {
            self.by_type.insert(*type_id, Arc::clone(descriptor));
        }
    }

    fn resolve_conflict(&self, conflict: &RegistrationConflict) -> ConflictResolution {
        match &self.config.conflict_policy {
            ConflictPolicy::Fail => ConflictResolution::Fail,
            ConflictPolicy::WarnAndOverwrite => ConflictResolution::Overwrite,
            ConflictPolicy::Custom(resolver) => resolver(conflict),
        }
    }

    /// Placeholder descriptor for a source type that has no mapping.
    ///
    /// Returns whatever is already bound to the name, so a placeholder is
    /// created at most once per name. It can later be promoted, once, by
    /// registering a real type under the same name.
    pub fn register_placeholder(
        &self,
        qualified_name: QualifiedName,
        source_type: &str,
        extends: Option<DescriptorRef>,
    ) -> DescriptorRef {
        let entry = self.by_name.entry(qualified_name.clone()).or_insert_with(|| {
            debug!(node_type = %qualified_name, source_type, "Generated placeholder node type");
            let properties = extends
                .as_deref()
                .map(|parent| {
                    parent
                        .properties()
                        .map(|p| {
                            let mut inherited = p.clone();
                            inherited.inherited = true;
                            (inherited.name.clone(), inherited)
                        })
                        .collect()
                })
                .unwrap_or_default();
            Arc::new(NodeTypeDescriptor::new(
                qualified_name,
                properties,
                extends,
                TypeBinding::Placeholder {
                    source_type: source_type.to_string(),
                },
            ))
        });
        Arc::clone(&entry)
    }

    /// Add one property to an already registered type.
    ///
    /// Nodes created earlier keep the descriptor they were created with.
    ///
    /// # Errors
    ///
    /// Returns an error when the type is unknown or already declares the name.
    pub fn register_property(
        &self,
        qualified_name: &QualifiedName,
        property: PropertyDescriptor,
    ) -> Result<DescriptorRef> {
        let current = self
            .get(qualified_name)
            .ok_or_else(|| Error::NotFound(qualified_name.clone()))?;

        if current.property(&property.name).is_some() {
            return Err(Error::duplicate_property(
                qualified_name.clone(),
                property.name,
            ));
        }

        trace!(node_type = %qualified_name, property = %property.name, "Registering property");
        let updated = Arc::new(current.with_added_property(property));
        self.by_name
            .insert(qualified_name.clone(), Arc::clone(&updated));
        self.index_by_type(&updated);
        Ok(updated)
    }

    /// Look up a descriptor by package and name
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] when nothing is registered under the name.
    pub fn lookup(&self, package: &str, name: &str) -> Result<DescriptorRef> {
        let qualified_name = QualifiedName::new(package, name);
        self.get(&qualified_name)
            .ok_or(Error::NotFound(qualified_name))
    }

    /// Get a descriptor by qualified name
    pub fn get(&self, qualified_name: &QualifiedName) -> Option<DescriptorRef> {
        self.by_name
            .get(qualified_name)
            .map(|entry| Arc::clone(&entry))
    }

    /// Descriptor registered for `K`, without registering it
    pub fn get_kind<K: NodeKind>(&self) -> Option<DescriptorRef> {
        self.by_type
            .get(&TypeId::of::<K>())
            .map(|entry| Arc::clone(&entry))
    }

    /// Check if a qualified name is bound
    pub fn contains(&self, qualified_name: &QualifiedName) -> bool {
        self.by_name.contains_key(qualified_name)
    }

    /// All descriptors, sorted by qualified name
    pub fn descriptors(&self) -> Vec<DescriptorRef> {
        let mut all: Vec<DescriptorRef> = self
            .by_name
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();
        all.sort_by(|a, b| a.qualified_name().cmp(b.qualified_name()));
        all
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SchemaRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaRegistry")
            .field("types", &self.len())
            .field("config", &self.config)
            .finish()
    }
}
