//! The type registry contract.
//!
//! The engine never stores type definitions itself. It asks a
//! [`TypeRegistry`] three questions: what is this type name
//! ([`TypeRegistry::resolve_type`]), what is this value's type
//! ([`TypeRegistry::type_name_of`]), and which serializers apply to a type
//! ([`TypeRegistry::serializers_for`]).
//!
//! A resolved [`TypeHandle`] is the introspection capability: declared
//! attributes, configuration keys, construction paths and an optional
//! nested document definition.

pub mod memory;

use std::fmt;
use std::sync::Arc;

use crate::document::Mapping;
use crate::error::BoxError;
use crate::serializers::Serializer;
use crate::value::{Object, Value};

pub use memory::InMemoryTypeRegistry;

// ──────────────────────────────────────────────
// Trait
// ──────────────────────────────────────────────

/// Lookup contract the engine consumes. Implementations must be safe for
/// concurrent reads; the engine never mutates a registry.
pub trait TypeRegistry: Send + Sync {
    /// Resolve a type name. `None` is not fatal by itself: serializers that
    /// need a registry type simply decline.
    fn resolve_type(&self, name: &str) -> Option<TypeHandle>;

    /// The type name of a runtime value.
    fn type_name_of(&self, value: &Value) -> String {
        value.type_name().to_string()
    }

    /// Serializers for a type, most specific first, supertypes included,
    /// without duplicates.
    fn serializers_for(&self, name: &str) -> Vec<Arc<dyn Serializer>>;
}

// ──────────────────────────────────────────────
// Introspection types
// ──────────────────────────────────────────────

/// A declared attribute or configuration key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    /// Declared type name, if any; `None` reads whatever the document says.
    pub type_name: Option<String>,
}

impl Attribute {
    pub fn new(name: impl Into<String>) -> Self {
        Attribute {
            name: name.into(),
            type_name: None,
        }
    }

    pub fn typed(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Attribute {
            name: name.into(),
            type_name: Some(type_name.into()),
        }
    }
}

/// How a construction path takes its inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstructorShape {
    /// No arguments; fields are assigned afterwards.
    NoArgs,
    /// A single argument: the fully assembled configuration map.
    Aggregate,
}

impl fmt::Display for ConstructorShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstructorShape::NoArgs => f.write_str("no-args"),
            ConstructorShape::Aggregate => f.write_str("aggregate"),
        }
    }
}

/// Builds a value. Receives the requested type name and the argument list.
pub type Constructor = Arc<dyn Fn(&str, Vec<Value>) -> Result<Value, BoxError> + Send + Sync>;

/// One way of instantiating a type.
#[derive(Clone)]
pub struct ConstructionPath {
    pub shape: ConstructorShape,
    /// For aggregate paths: the object attribute holding the aggregate, so a
    /// write can recover it.
    pub config_field: Option<String>,
    pub constructor: Constructor,
}

impl ConstructionPath {
    /// Builds an empty object of the requested type.
    pub fn no_args() -> Self {
        ConstructionPath {
            shape: ConstructorShape::NoArgs,
            config_field: None,
            constructor: Arc::new(|type_name: &str, _args: Vec<Value>| -> Result<Value, BoxError> {
                Ok(Value::Object(Object::new(type_name)))
            }),
        }
    }

    /// Builds an object keeping the aggregate under `config_field`.
    pub fn aggregate(config_field: impl Into<String>) -> Self {
        let field = config_field.into();
        let stored = field.clone();
        ConstructionPath {
            shape: ConstructorShape::Aggregate,
            config_field: Some(field),
            constructor: Arc::new(move |type_name: &str, args: Vec<Value>| -> Result<Value, BoxError> {
                let config = args.into_iter().next().unwrap_or(Value::Null);
                Ok(Value::Object(Object::new(type_name).with(stored.clone(), config)))
            }),
        }
    }

    pub fn with_constructor(mut self, constructor: Constructor) -> Self {
        self.constructor = constructor;
        self
    }
}

impl fmt::Debug for ConstructionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConstructionPath")
            .field("shape", &self.shape)
            .field("config_field", &self.config_field)
            .finish_non_exhaustive()
    }
}

/// A type defined by a document: `parent` plus preset entries.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeDefinition {
    pub parent: String,
    pub presets: Mapping,
}

// ──────────────────────────────────────────────
// TypeHandle
// ──────────────────────────────────────────────

#[derive(Debug)]
struct TypeShape {
    name: String,
    attributes: Vec<Attribute>,
    config_keys: Vec<Attribute>,
    paths: Vec<ConstructionPath>,
    definition: Option<TypeDefinition>,
}

/// A resolved type. Cheap to clone.
#[derive(Debug, Clone)]
pub struct TypeHandle {
    inner: Arc<TypeShape>,
}

impl TypeHandle {
    pub fn new(
        name: impl Into<String>,
        attributes: Vec<Attribute>,
        config_keys: Vec<Attribute>,
        paths: Vec<ConstructionPath>,
        definition: Option<TypeDefinition>,
    ) -> Self {
        TypeHandle {
            inner: Arc::new(TypeShape {
                name: name.into(),
                attributes,
                config_keys,
                paths,
                definition,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Declared and inherited attributes, supertype attributes first.
    pub fn attributes(&self) -> &[Attribute] {
        &self.inner.attributes
    }

    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.inner.attributes.iter().find(|a| a.name == name)
    }

    pub fn config_keys(&self) -> &[Attribute] {
        &self.inner.config_keys
    }

    pub fn config_key(&self, name: &str) -> Option<&Attribute> {
        self.inner.config_keys.iter().find(|a| a.name == name)
    }

    /// Declared type of a field, looked up among attributes then config keys.
    pub fn field_type(&self, name: &str) -> Option<&str> {
        self.attribute(name)
            .or_else(|| self.config_key(name))
            .and_then(|a| a.type_name.as_deref())
    }

    pub fn construction_paths(&self) -> &[ConstructionPath] {
        &self.inner.paths
    }

    pub fn find_construction_path(&self, shape: ConstructorShape) -> Option<&ConstructionPath> {
        self.inner.paths.iter().find(|p| p.shape == shape)
    }

    /// The single aggregate path, if there is exactly one.
    pub fn sole_aggregate_path(&self) -> Option<&ConstructionPath> {
        let mut aggregates = self
            .inner
            .paths
            .iter()
            .filter(|p| p.shape == ConstructorShape::Aggregate);
        match (aggregates.next(), aggregates.next()) {
            (Some(path), None) => Some(path),
            _ => None,
        }
    }

    pub fn definition(&self) -> Option<&TypeDefinition> {
        self.inner.definition.as_ref()
    }
}

// ──────────────────────────────────────────────
// TypeInfo builder
// ──────────────────────────────────────────────

/// Registration record for [`InMemoryTypeRegistry`].
#[derive(Debug, Clone)]
pub struct TypeInfo {
    pub name: String,
    pub parent: Option<String>,
    pub attributes: Vec<Attribute>,
    pub config_keys: Vec<Attribute>,
    pub paths: Vec<ConstructionPath>,
    pub definition: Option<Mapping>,
    pub serializers: Vec<Arc<dyn Serializer>>,
}

impl TypeInfo {
    pub fn new(name: impl Into<String>) -> Self {
        TypeInfo {
            name: name.into(),
            parent: None,
            attributes: Vec::new(),
            config_keys: Vec::new(),
            paths: Vec::new(),
            definition: None,
            serializers: Vec::new(),
        }
    }

    pub fn extends(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn attribute(mut self, name: &str, type_name: &str) -> Self {
        self.attributes.push(Attribute::typed(name, type_name));
        self
    }

    pub fn untyped_attribute(mut self, name: &str) -> Self {
        self.attributes.push(Attribute::new(name));
        self
    }

    pub fn config_key(mut self, name: &str, type_name: &str) -> Self {
        self.config_keys.push(Attribute::typed(name, type_name));
        self
    }

    pub fn no_args_constructor(mut self) -> Self {
        self.paths.push(ConstructionPath::no_args());
        self
    }

    pub fn aggregate_constructor(mut self, config_field: &str) -> Self {
        self.paths.push(ConstructionPath::aggregate(config_field));
        self
    }

    pub fn construction_path(mut self, path: ConstructionPath) -> Self {
        self.paths.push(path);
        self
    }

    pub fn serializer(mut self, serializer: impl Serializer + 'static) -> Self {
        self.serializers.push(Arc::new(serializer));
        self
    }

    pub fn shared_serializer(mut self, serializer: Arc<dyn Serializer>) -> Self {
        self.serializers.push(serializer);
        self
    }
}
