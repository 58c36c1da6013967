//! Serializer plugins.
//!
//! A [`Serializer`] is the unit of conversion behaviour. The converter calls
//! every applicable serializer in turn for the current phase; each one
//! answers with a [`Step`]. Serializers must only report
//! [`Step::Progressed`] when they actually changed something, and must
//! record on the blackboard what they have already handled so that a
//! repeat call degrades to [`Step::NoOp`]. Nothing else bounds the loop.

pub mod all_fields;
pub mod config_map;
pub mod explicit_field;
pub mod fields_bucket;
pub mod list;
pub mod map;
pub mod primitive;
pub mod registry_type;

use indexmap::IndexMap;
use std::fmt;
use std::sync::Arc;

use crate::blackboard::{Blackboard, SlotKey};
use crate::config::YomlConfig;
use crate::context::{ContextCore, ReadContext, WriteContext};
use crate::converter::Converter;
use crate::error::ConvertError;
use crate::registry::TypeHandle;
use crate::value::{PrimitiveKind, Value};

pub use all_fields::AllFieldsExplicit;
pub use config_map::InstantiateTypeFromRegistryUsingConfigMap;
pub use explicit_field::{
    Aliases, ExplicitField, ExplicitFieldRecords, ExplicitFieldSpec, FieldConstraint, FieldRecord,
};
pub use fields_bucket::FieldsInMapUnder;
pub use list::InstantiateList;
pub use map::InstantiateMap;
pub use primitive::InstantiatePrimitive;
pub use registry_type::InstantiateTypeFromRegistry;

// ──────────────────────────────────────────────
// Contract
// ──────────────────────────────────────────────

/// Outcome of one serializer invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// The final value (or document) for this context is in place.
    Done,
    /// State changed; rescan from the first serializer.
    Progressed,
    /// Nothing to do.
    NoOp,
}

pub trait Serializer: Send + Sync + fmt::Debug {
    /// Short name used in logs and diagnostics.
    fn name(&self) -> &str;

    fn read(
        &self,
        ctx: &mut ReadContext,
        converter: &Converter<'_>,
        blackboard: &mut Blackboard,
    ) -> Result<Step, ConvertError>;

    fn write(
        &self,
        ctx: &mut WriteContext<'_>,
        converter: &Converter<'_>,
        blackboard: &mut Blackboard,
    ) -> Result<Step, ConvertError>;

    /// A human-readable fragment describing the syntax this serializer
    /// accepts for `type_name`, if it has anything to say.
    fn document(&self, _type_name: &str, _converter: &Converter<'_>) -> Option<String> {
        None
    }

    /// Called once after the phase queue is finished.
    fn check_completion(
        &self,
        _core: &ContextCore,
        _blackboard: &Blackboard,
    ) -> Result<(), ConvertError> {
        Ok(())
    }
}

/// The engine's builtin serializers, in the order they are consulted.
pub fn builtins(config: &YomlConfig) -> Vec<Arc<dyn Serializer>> {
    vec![
        Arc::new(FieldsInMapUnder::new(config.fields_key.clone())),
        Arc::new(InstantiatePrimitive),
        Arc::new(InstantiateList),
        Arc::new(InstantiateMap),
        Arc::new(InstantiateTypeFromRegistryUsingConfigMap),
        Arc::new(InstantiateTypeFromRegistry),
    ]
}

// ──────────────────────────────────────────────
// Shared blackboard slots
// ──────────────────────────────────────────────

/// The registry type being read into the current context.
#[derive(Debug, Clone)]
pub struct TypeUnderConstruction {
    pub type_name: String,
    pub handle: TypeHandle,
    /// Pending configuration for aggregate construction. While present,
    /// fields are collected here instead of set on the value.
    pub aggregate: Option<IndexMap<String, Value>>,
}

pub const TYPE_UNDER_CONSTRUCTION: SlotKey<TypeUnderConstruction> =
    SlotKey::new("type-under-construction");

/// Object fields not yet written to the output document.
#[derive(Debug, Clone)]
pub struct FieldsToWrite {
    pub handle: TypeHandle,
    pub remaining: IndexMap<String, Value>,
}

pub const FIELDS_TO_WRITE: SlotKey<FieldsToWrite> = SlotKey::new("fields-to-write");

// ──────────────────────────────────────────────
// Helpers
// ──────────────────────────────────────────────

/// The handle of the registry type under conversion in either direction.
pub fn handle_in_progress(blackboard: &Blackboard) -> Option<&TypeHandle> {
    blackboard
        .get(TYPE_UNDER_CONSTRUCTION)
        .map(|t| &t.handle)
        .or_else(|| blackboard.get(FIELDS_TO_WRITE).map(|f| &f.handle))
}

/// True once the read context has a value or a registry type has claimed
/// it. The builtin instantiators stand aside from then on.
pub fn type_claimed(ctx: &ReadContext, blackboard: &Blackboard) -> bool {
    ctx.has_value() || blackboard.contains(TYPE_UNDER_CONSTRUCTION)
}

/// True if a field value can be stored in the current read context.
pub fn has_field_target(ctx: &ReadContext, blackboard: &Blackboard) -> bool {
    blackboard
        .get(TYPE_UNDER_CONSTRUCTION)
        .is_some_and(|t| t.aggregate.is_some())
        || ctx.value.as_ref().and_then(Value::as_object).is_some()
}

/// Store a field: into the pending aggregate if there is one, otherwise on
/// the object under construction.
pub fn store_field(
    ctx: &mut ReadContext,
    blackboard: &mut Blackboard,
    field: &str,
    value: Value,
) -> Result<(), ConvertError> {
    if let Some(aggregate) = blackboard
        .get_mut(TYPE_UNDER_CONSTRUCTION)
        .and_then(|t| t.aggregate.as_mut())
    {
        aggregate.insert(field.to_string(), value);
        return Ok(());
    }
    match ctx.value.as_mut().and_then(Value::as_object_mut) {
        Some(obj) => {
            obj.set_field(field, value);
            Ok(())
        }
        None => Err(ConvertError::invalid(
            ctx.core.path.clone(),
            format!("no object to receive field '{}'", field),
        )),
    }
}

/// True if `name` is handled by the builtin serializers rather than a
/// registry: primitives, `json`, `object`, `list<..>`, `map<..>`.
pub fn is_builtin_type(name: &str) -> bool {
    let base = name.split('<').next().unwrap_or(name).trim();
    PrimitiveKind::from_type_name(base).is_some()
        || matches!(
            base.to_ascii_lowercase().as_str(),
            "json" | "object" | "list" | "map"
        )
}

/// An expected type that imposes nothing: absent, `object`.
pub fn is_open_type(expected: Option<&str>) -> bool {
    match expected {
        None => true,
        Some(t) => t.trim().eq_ignore_ascii_case("object"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_type_names() {
        assert!(is_builtin_type("int"));
        assert!(is_builtin_type("list<shape>"));
        assert!(is_builtin_type("Map<string,int>"));
        assert!(is_builtin_type("json"));
        assert!(!is_builtin_type("shape"));
    }

    #[test]
    fn builtins_in_consultation_order() {
        let names: Vec<String> = builtins(&YomlConfig::default())
            .iter()
            .map(|s| s.name().to_string())
            .collect();
        assert_eq!(
            names,
            vec![
                "fields-in-map-under:fields",
                "instantiate-primitive",
                "instantiate-list",
                "instantiate-map",
                "config-map-constructor",
                "instantiate-type-from-registry",
            ]
        );
    }
}
