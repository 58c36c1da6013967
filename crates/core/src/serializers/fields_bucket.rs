//! Field values grouped under one mapping key, `fields` by default:
//! `{type: shape, fields: {name: diamond, color: black}}`.
//!
//! Runs in `handling-fields`, after explicit fields had their turn. Entries
//! that name no declared field, or a field an explicit key already set, are
//! put back so the leftover check reports them.

use crate::blackboard::{Blackboard, SlotKey};
use crate::context::{child_path, ConversionContext, Phase, ReadContext, WriteContext};
use crate::converter::Converter;
use crate::document::{DocumentNode, Mapping};
use crate::error::ConvertError;
use crate::registry::TypeHandle;
use crate::serializers::explicit_field::EXPLICIT_FIELDS;
use crate::serializers::{
    handle_in_progress, has_field_target, store_field, Serializer, Step, FIELDS_TO_WRITE,
};

const BUCKET_HANDLED: SlotKey<()> = SlotKey::new("fields-bucket");

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldsInMapUnder {
    key: String,
    name: String,
}

impl FieldsInMapUnder {
    pub fn new(key: impl Into<String>) -> Self {
        let key = key.into();
        FieldsInMapUnder {
            name: format!("fields-in-map-under:{}", key),
            key,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

/// Names the bucket may set: configuration keys while an aggregate is
/// pending, attributes otherwise.
fn accepts(handle: &TypeHandle, aggregate: bool, field: &str) -> bool {
    if aggregate {
        handle.config_key(field).is_some()
    } else {
        handle.attribute(field).is_some()
    }
}

impl Serializer for FieldsInMapUnder {
    fn name(&self) -> &str {
        &self.name
    }

    fn read(
        &self,
        ctx: &mut ReadContext,
        converter: &Converter<'_>,
        blackboard: &mut Blackboard,
    ) -> Result<Step, ConvertError> {
        if !ctx.is_phase(&Phase::HANDLING_FIELDS)
            || blackboard.contains(BUCKET_HANDLED)
            || !has_field_target(ctx, blackboard)
        {
            return Ok(Step::NoOp);
        }
        let Some(handle) = handle_in_progress(blackboard).cloned() else {
            return Ok(Step::NoOp);
        };
        if !ctx.mapping().is_some_and(|m| m.contains_key(&self.key)) {
            return Ok(Step::NoOp);
        }
        blackboard.insert(BUCKET_HANDLED, ());

        let entries = match ctx.take_key(&self.key) {
            Some(DocumentNode::Mapping(entries)) => entries,
            Some(DocumentNode::Null) | None => Mapping::new(),
            Some(other) => {
                return Err(ConvertError::invalid(
                    child_path(ctx.path(), &self.key),
                    format!("'{}' must be a mapping, found {}", self.key, other.kind_name()),
                ));
            }
        };
        let aggregate = ctx.value.is_none();
        let bucket_path = child_path(ctx.path(), &self.key);

        let mut leftover = Mapping::new();
        for (field, node) in entries {
            let already_set = blackboard
                .get(EXPLICIT_FIELDS)
                .is_some_and(|r| r.is_done(&field));
            if already_set || !accepts(&handle, aggregate, &field) {
                leftover.insert(field, node);
                continue;
            }
            let path = child_path(&bucket_path, &field);
            let value = converter.read_at(node, handle.field_type(&field), path)?;
            store_field(ctx, blackboard, &field, value)?;
            if let Some(records) = blackboard.get_mut(EXPLICIT_FIELDS) {
                records.set_done(&field);
            }
        }

        if !leftover.is_empty() {
            tracing::debug!(path = %bucket_path, keys = ?leftover.keys().collect::<Vec<_>>(), "fields not taken");
            if let Some(mapping) = ctx.mapping_mut() {
                mapping.insert(self.key.clone(), DocumentNode::Mapping(leftover));
            }
        }
        Ok(Step::Progressed)
    }

    fn write(
        &self,
        ctx: &mut WriteContext<'_>,
        converter: &Converter<'_>,
        blackboard: &mut Blackboard,
    ) -> Result<Step, ConvertError> {
        if !ctx.is_phase(&Phase::HANDLING_FIELDS) || blackboard.contains(BUCKET_HANDLED) {
            return Ok(Step::NoOp);
        }
        let Some(fields) = blackboard.get_mut(FIELDS_TO_WRITE) else {
            return Ok(Step::NoOp);
        };
        if fields.remaining.is_empty() {
            return Ok(Step::NoOp);
        }
        let remaining = std::mem::take(&mut fields.remaining);
        let handle = fields.handle.clone();
        blackboard.insert(BUCKET_HANDLED, ());

        let bucket_path = child_path(ctx.path(), &self.key);
        let mut bucket = Mapping::with_capacity(remaining.len());
        for (field, value) in &remaining {
            let path = child_path(&bucket_path, field);
            bucket.insert(field.clone(), converter.write_at(value, handle.field_type(field), path)?);
        }
        match ctx.output_mapping_mut() {
            Some(output) => {
                output.insert(self.key.clone(), DocumentNode::Mapping(bucket));
                Ok(Step::Progressed)
            }
            None => Err(ConvertError::invalid(
                ctx.path(),
                format!("cannot write '{}' outside a mapping", self.key),
            )),
        }
    }

    fn document(&self, type_name: &str, converter: &Converter<'_>) -> Option<String> {
        let handle = converter.registry().resolve_type(type_name)?;
        let fields = if handle.sole_aggregate_path().is_some() && !handle.config_keys().is_empty() {
            handle.config_keys()
        } else {
            handle.attributes()
        };
        if fields.is_empty() {
            return None;
        }
        let listed: Vec<String> = fields
            .iter()
            .map(|a| match &a.type_name {
                Some(t) => format!("`{}` ({})", a.name, t),
                None => format!("`{}`", a.name),
            })
            .collect();
        Some(format!(
            "Fields may be given under `{}`: {}.",
            self.key,
            listed.join(", ")
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConvertErrorKind;
    use crate::registry::{InMemoryTypeRegistry, TypeInfo};
    use crate::value::{Object, Value};
    use crate::yoml::Yoml;
    use serde_json::json;
    use std::sync::Arc;

    fn yoml() -> Yoml {
        let mut reg = InMemoryTypeRegistry::new();
        reg.register(
            TypeInfo::new("shape")
                .attribute("name", "string")
                .attribute("size", "int")
                .no_args_constructor(),
        );
        Yoml::new(Arc::new(reg))
    }

    #[test]
    fn fields_are_read_with_declared_types() {
        let v = yoml()
            .read(json!({"type": "shape", "fields": {"name": "d", "size": "3"}}).into(), None)
            .unwrap();
        assert_eq!(
            v,
            Value::Object(Object::new("shape").with("name", "d").with("size", 3i64))
        );
    }

    #[test]
    fn undeclared_field_is_left_over() {
        let err = yoml()
            .read(json!({"type": "shape", "fields": {"weight": 1}}).into(), None)
            .unwrap_err();
        match err.kind {
            ConvertErrorKind::UnconsumedKeys { keys, remaining } => {
                assert_eq!(keys, vec!["fields"]);
                assert!(remaining.contains("weight"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn non_mapping_bucket_fails() {
        let err = yoml()
            .read(json!({"type": "shape", "fields": [1]}).into(), None)
            .unwrap_err();
        assert_eq!(err.path, "fields");
    }

    #[test]
    fn field_paths_include_bucket() {
        let err = yoml()
            .read(json!({"type": "shape", "fields": {"size": "big"}}).into(), None)
            .unwrap_err();
        assert_eq!(err.path, "fields.size");
    }

    #[test]
    fn custom_bucket_key() {
        let b = FieldsInMapUnder::new("attrs");
        assert_eq!(b.name(), "fields-in-map-under:attrs");
        assert_eq!(b.key(), "attrs");
    }
}
