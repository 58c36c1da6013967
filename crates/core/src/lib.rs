#![allow(clippy::result_large_err)]
//! yoml-core: bidirectional conversion between documents and typed objects.
//!
//! A document is a tree of mappings, sequences and scalars, such as parsed
//! YAML or JSON. Conversion in both directions is driven by pluggable
//! [`Serializer`]s running in phases over a per-node [`Blackboard`], with a
//! [`TypeRegistry`] answering questions about types.
//!
//! # Public API
//!
//! - [`Yoml`] -- the engine: [`Yoml::read`], [`Yoml::write`], [`Yoml::document`]
//! - [`TypeRegistry`] and [`InMemoryTypeRegistry`] with [`TypeInfo`] records
//! - [`DocumentNode`] and [`Value`] -- the two sides of a conversion
//! - [`ConvertError`] -- every failure, with the structural path
//! - builtin serializers: [`ExplicitField`], [`AllFieldsExplicit`],
//!   [`FieldsInMapUnder`] and the instantiators

pub mod blackboard;
pub mod config;
pub mod construction;
pub mod context;
pub mod converter;
pub mod docs;
pub mod document;
pub mod error;
pub mod generics;
pub mod mangle;
pub mod registry;
pub mod serializers;
pub mod value;
pub mod yoml;

// ── Convenience re-exports: key types ────────────────────────────────

pub use blackboard::{Blackboard, SerializerGroup, SerializerId, SlotKey};
pub use config::YomlConfig;
pub use construction::{ConstructionError, ConstructionInstruction};
pub use context::{ConversionContext, Phase, PhaseQueue, ReadContext, WriteContext};
pub use converter::Converter;
pub use docs::{DocFragment, TypeDocumentation};
pub use document::{DocumentNode, Mapping};
pub use error::{BoxError, ConvertError, ConvertErrorKind};
pub use generics::{parse_generic_type, GenericType};
pub use registry::{
    Attribute, ConstructionPath, ConstructorShape, InMemoryTypeRegistry, TypeHandle, TypeInfo,
    TypeRegistry,
};
pub use value::{Object, PrimitiveKind, Value};
pub use yoml::Yoml;

// ── Convenience re-exports: serializers ──────────────────────────────

pub use serializers::{
    AllFieldsExplicit, ExplicitField, ExplicitFieldSpec, FieldsInMapUnder, InstantiateList,
    InstantiateMap, InstantiatePrimitive, InstantiateTypeFromRegistry,
    InstantiateTypeFromRegistryUsingConfigMap, Serializer, Step,
};
