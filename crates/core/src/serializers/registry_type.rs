//! Type-name-driven instantiation from the registry.
//!
//! The type comes from the document's `type` key, else the expected type.
//! A type defined by a document is read by merging its presets with the
//! instance and reading the result as the parent type. Any other type is
//! built through its no-args path and its serializers join the conversion
//! to fill in fields.

use crate::blackboard::{Blackboard, SerializerGroup};
use crate::construction::ConstructionInstruction;
use crate::context::{ConversionContext, Phase, ReadContext, WriteContext};
use crate::converter::Converter;
use crate::document::{DocumentNode, Mapping};
use crate::error::{ConvertError, ConvertErrorKind};
use crate::registry::{ConstructorShape, TypeDefinition, TypeHandle};
use crate::serializers::{
    is_builtin_type, FieldsToWrite, Serializer, Step, TypeUnderConstruction, FIELDS_TO_WRITE,
    TYPE_UNDER_CONSTRUCTION,
};
use crate::value::Value;

#[derive(Debug, Clone, Copy, Default)]
pub struct InstantiateTypeFromRegistry;

/// The registry type a read context names, with its handle. `None` if the
/// context already has a value, names no type, or names a builtin or an
/// unknown type.
pub(crate) fn type_to_read(
    ctx: &ReadContext,
    converter: &Converter<'_>,
    blackboard: &Blackboard,
) -> Option<(String, TypeHandle)> {
    if ctx.has_value() || blackboard.contains(TYPE_UNDER_CONSTRUCTION) {
        return None;
    }
    let node = ctx.node()?;
    if !matches!(node, DocumentNode::Mapping(_)) {
        return None;
    }
    let name = ctx
        .string_entry(&converter.config().type_key)
        .or_else(|| ctx.expected_type())?;
    if is_builtin_type(name) {
        return None;
    }
    let handle = converter.registry().resolve_type(name)?;
    Some((name.to_string(), handle))
}

/// Read a document-defined type: presets overlaid by the instance, read as
/// the parent type.
pub(crate) fn read_defined(
    ctx: &mut ReadContext,
    converter: &Converter<'_>,
    type_name: &str,
    definition: &TypeDefinition,
    outer: Option<ConstructionInstruction>,
) -> Result<Value, ConvertError> {
    let instance = match ctx.take_node() {
        Some(DocumentNode::Mapping(m)) => m,
        _ => Mapping::new(),
    };
    let mut merged = definition.presets.clone();
    for (k, v) in instance {
        merged.insert(k, v);
    }
    let mut value =
        converter.read_definition(merged, &definition.parent, type_name, ctx.path(), outer)?;
    if let Some(obj) = value.as_object_mut() {
        obj.set_type_name(type_name);
    }
    Ok(value)
}

/// Open an object write: output mapping with a `type` key unless the
/// expected type already says it.
pub(crate) fn begin_object_write(
    ctx: &mut WriteContext<'_>,
    converter: &Converter<'_>,
    blackboard: &mut Blackboard,
    handle: TypeHandle,
    remaining: indexmap::IndexMap<String, Value>,
) {
    let type_name = handle.name().to_string();
    let mut output = Mapping::new();
    if ctx.expected_type() != Some(type_name.as_str()) {
        output.insert(
            converter.config().type_key.clone(),
            DocumentNode::from(type_name.as_str()),
        );
    }
    ctx.output = Some(DocumentNode::Mapping(output));
    blackboard.serializers_mut().add_all(
        SerializerGroup::InstantiatedType,
        converter.registry().serializers_for(&type_name),
    );
    blackboard.insert(FIELDS_TO_WRITE, FieldsToWrite { handle, remaining });
}

impl Serializer for InstantiateTypeFromRegistry {
    fn name(&self) -> &str {
        "instantiate-type-from-registry"
    }

    fn read(
        &self,
        ctx: &mut ReadContext,
        converter: &Converter<'_>,
        blackboard: &mut Blackboard,
    ) -> Result<Step, ConvertError> {
        if !ctx.is_phase(&Phase::HANDLING_TYPE) {
            return Ok(Step::NoOp);
        }
        let Some((type_name, handle)) = type_to_read(ctx, converter, blackboard) else {
            return Ok(Step::NoOp);
        };
        let type_key = &converter.config().type_key;

        if let Some(definition) = handle.definition() {
            ctx.take_key(type_key);
            let value = read_defined(ctx, converter, &type_name, definition, None)?;
            ctx.value = Some(value);
            return Ok(Step::Done);
        }

        if handle.find_construction_path(ConstructorShape::NoArgs).is_none() {
            return Ok(Step::NoOp);
        }
        ctx.take_key(type_key);
        let value = ConstructionInstruction::no_args(type_name.as_str())
            .resolve(converter.registry())
            .map_err(|e| {
                ConvertError::new(
                    ctx.path(),
                    ConvertErrorKind::Construction {
                        type_name: type_name.clone(),
                    },
                )
                .with_cause(e)
            })?;
        tracing::debug!(path = %ctx.path(), type_name = %type_name, "instantiated");
        ctx.value = Some(value);

        blackboard.serializers_mut().add_all(
            SerializerGroup::InstantiatedType,
            converter.registry().serializers_for(&type_name),
        );
        blackboard.insert(
            TYPE_UNDER_CONSTRUCTION,
            TypeUnderConstruction {
                type_name,
                handle,
                aggregate: None,
            },
        );
        Ok(Step::Progressed)
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
        let remaining = obj
            .fields()
            .iter()
            .filter(|(_, v)| !v.is_null())
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        begin_object_write(ctx, converter, blackboard, handle, remaining);
        Ok(Step::Progressed)
    }

    fn document(&self, type_name: &str, converter: &Converter<'_>) -> Option<String> {
        let handle = converter.registry().resolve_type(type_name)?;
        let key = &converter.config().type_key;
        Some(match handle.definition() {
            Some(def) => format!(
                "Select with `{key}: {type_name}`. Defined as `{}` with presets: {}.",
                def.parent,
                DocumentNode::Mapping(def.presets.clone())
            ),
            None => format!("Select with `{key}: {type_name}`; the key may be omitted where `{type_name}` is expected."),
        })
    }
}
