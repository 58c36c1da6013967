//! Aggregate construction: types built from one assembled configuration map.
//!
//! Applies to registry types with exactly one aggregate construction path
//! and at least one configuration key. On read:
//!
//! - `handling-type`: open a pending aggregate on the blackboard and add an
//!   explicit field for every configuration key;
//! - `handling-fields`: queue `handling-type-deferred-after-config`;
//! - the deferred phase: build the value once from the complete aggregate,
//!   after checking that every required key was given.
//!
//! Field serializers in between fill the aggregate without knowing how the
//! object will be built. On write the aggregate is recovered from the
//! object's configuration attribute.

use indexmap::IndexMap;
use std::sync::Arc;

use crate::blackboard::{Blackboard, SerializerGroup};
use crate::construction::ConstructionInstruction;
use crate::context::{ConversionContext, Phase, ReadContext, WriteContext};
use crate::converter::Converter;
use crate::error::{ConvertError, ConvertErrorKind};
use crate::registry::TypeHandle;
use crate::serializers::registry_type::{begin_object_write, read_defined, type_to_read};
use crate::serializers::explicit_field::EXPLICIT_FIELDS;
use crate::serializers::{
    ExplicitField, ExplicitFieldRecords, Serializer, Step, TypeUnderConstruction,
    TYPE_UNDER_CONSTRUCTION,
};
use crate::value::Value;

#[derive(Debug, Clone, Copy, Default)]
pub struct InstantiateTypeFromRegistryUsingConfigMap;

fn applies(handle: &TypeHandle) -> bool {
    handle.sole_aggregate_path().is_some() && !handle.config_keys().is_empty()
}

fn config_key_fields(handle: &TypeHandle) -> Vec<Arc<dyn Serializer>> {
    handle
        .config_keys()
        .iter()
        .map(|k| Arc::new(ExplicitField::new(k.name.as_str())) as Arc<dyn Serializer>)
        .collect()
}

fn pending_aggregate(blackboard: &Blackboard) -> bool {
    blackboard
        .get(TYPE_UNDER_CONSTRUCTION)
        .is_some_and(|t| t.aggregate.is_some())
}

impl InstantiateTypeFromRegistryUsingConfigMap {
    fn begin(
        &self,
        ctx: &mut ReadContext,
        converter: &Converter<'_>,
        blackboard: &mut Blackboard,
    ) -> Result<Step, ConvertError> {
        let Some((type_name, handle)) = type_to_read(ctx, converter, blackboard) else {
            return Ok(Step::NoOp);
        };
        if !applies(&handle) {
            return Ok(Step::NoOp);
        }
        ctx.take_key(&converter.config().type_key);
        tracing::debug!(path = %ctx.path(), type_name = %type_name, "collecting configuration");

        let set = blackboard.serializers_mut();
        set.add_all(
            SerializerGroup::InstantiatedType,
            converter.registry().serializers_for(&type_name),
        );
        set.add_all(SerializerGroup::InstantiatedType, config_key_fields(&handle));
        blackboard.insert(
            TYPE_UNDER_CONSTRUCTION,
            TypeUnderConstruction {
                type_name,
                handle,
                aggregate: Some(IndexMap::new()),
            },
        );
        Ok(Step::Progressed)
    }

    fn finish(
        &self,
        ctx: &mut ReadContext,
        converter: &Converter<'_>,
        blackboard: &mut Blackboard,
    ) -> Result<Step, ConvertError> {
        if !pending_aggregate(blackboard) {
            return Ok(Step::NoOp);
        }
        let unmet = blackboard
            .get(EXPLICIT_FIELDS)
            .map(ExplicitFieldRecords::unmet_required)
            .unwrap_or_default();
        if !unmet.is_empty() {
            return Err(ConvertError::new(
                ctx.path(),
                ConvertErrorKind::MissingRequired { fields: unmet },
            ));
        }
        let Some(TypeUnderConstruction {
            type_name,
            handle,
            aggregate: Some(aggregate),
        }) = blackboard.remove(TYPE_UNDER_CONSTRUCTION)
        else {
            return Ok(Step::NoOp);
        };
        let keys: Vec<&String> = aggregate.keys().collect();
        tracing::debug!(path = %ctx.path(), type_name = %type_name, ?keys, "constructing from configuration");

        let instruction = ConstructionInstruction::aggregate(type_name.as_str(), aggregate)
            .wrapped_by(ctx.outer_instruction.take());

        let value = match handle.definition() {
            Some(definition) => {
                read_defined(ctx, converter, &type_name, definition, Some(instruction))?
            }
            None => instruction.resolve(converter.registry()).map_err(|e| {
                ConvertError::new(
                    ctx.path(),
                    ConvertErrorKind::Construction {
                        type_name: type_name.clone(),
                    },
                )
                .with_cause(e)
            })?,
        };
        ctx.value = Some(value);
        Ok(Step::Done)
    }
}

impl Serializer for InstantiateTypeFromRegistryUsingConfigMap {
    fn name(&self) -> &str {
        "config-map-constructor"
    }

    fn read(
        &self,
        ctx: &mut ReadContext,
        converter: &Converter<'_>,
        blackboard: &mut Blackboard,
    ) -> Result<Step, ConvertError> {
        let phases = ctx.phases();
        if phases.is_phase(&Phase::HANDLING_TYPE) {
            return self.begin(ctx, converter, blackboard);
        }
        if phases.is_phase(&Phase::HANDLING_FIELDS) {
            if pending_aggregate(blackboard)
                && !phases.seen(&Phase::HANDLING_TYPE_DEFERRED)
                && !phases.will_do(&Phase::HANDLING_TYPE_DEFERRED)
            {
                ctx.phases_mut()
                    .insert_after_current(Phase::HANDLING_TYPE_DEFERRED);
                return Ok(Step::Progressed);
            }
            return Ok(Step::NoOp);
        }
        if phases.is_phase(&Phase::HANDLING_TYPE_DEFERRED) {
            return self.finish(ctx, converter, blackboard);
        }
        Ok(Step::NoOp)
    }

    fn write(
        &self,
        ctx: &mut WriteContext<'_>,
        converter: &Converter<'_>,
        blackboard: &mut Blackboard,
    ) -> Result<Step, ConvertError> {
        if !ctx.is_phase(&Phase::HANDLING_TYPE) || ctx.output.is_some() {
            return Ok(Step::NoOp);
        }
        let value: &Value = ctx.value;
        let Some(obj) = value.as_object() else {
            return Ok(Step::NoOp);
        };
        let Some(handle) = converter.registry().resolve_type(obj.type_name()) else {
            return Ok(Step::NoOp);
        };
        if !applies(&handle) {
            return Ok(Step::NoOp);
        }
        let config = handle
            .sole_aggregate_path()
            .and_then(|p| p.config_field.as_deref())
            .and_then(|field| obj.field(field))
            .and_then(Value::as_map);
        let Some(config) = config else {
            return Ok(Step::NoOp);
        };
        let remaining = config
            .iter()
            .filter(|(_, v)| !v.is_null())
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        let key_fields = config_key_fields(&handle);
        begin_object_write(ctx, converter, blackboard, handle, remaining);
        blackboard
            .serializers_mut()
            .add_all(SerializerGroup::InstantiatedType, key_fields);
        Ok(Step::Progressed)
    }

    fn document(&self, type_name: &str, converter: &Converter<'_>) -> Option<String> {
        let handle = converter.registry().resolve_type(type_name)?;
        if !applies(&handle) {
            return None;
        }
        let keys: Vec<String> = handle
            .config_keys()
            .iter()
            .map(|k| match &k.type_name {
                Some(t) => format!("`{}` ({})", k.name, t),
                None => format!("`{}`", k.name),
            })
            .collect();
        Some(format!(
            "Built once from its configuration. Configuration keys: {}.",
            keys.join(", ")
        ))
    }
}
