//! Mappings with string keys: `map` and `map<K,V>`.
//!
//! With no expected type, a mapping without a `type` key reads as a map.

use indexmap::IndexMap;

use crate::blackboard::Blackboard;
use crate::context::{child_path, ConversionContext, Phase, ReadContext, WriteContext};
use crate::converter::Converter;
use crate::document::{DocumentNode, Mapping};
use crate::error::ConvertError;
use crate::generics::parse_generic_type;
use crate::serializers::{is_open_type, type_claimed, Serializer, Step};
use crate::value::{PrimitiveKind, Value};

#[derive(Debug, Clone, Copy, Default)]
pub struct InstantiateMap;

/// `Some(value type)` if `type_name` is a map type.
fn map_value_type(type_name: &str) -> Option<Option<String>> {
    let generic = parse_generic_type(type_name).ok()?;
    if !generic.base.eq_ignore_ascii_case("map") {
        return None;
    }
    Some(generic.sub_types.get(1).cloned())
}

fn check_key_type(type_name: &str, path: &str) -> Result<(), ConvertError> {
    let key = parse_generic_type(type_name)
        .ok()
        .and_then(|g| g.sub_types.into_iter().next());
    match key {
        Some(k) if PrimitiveKind::from_type_name(&k) != Some(PrimitiveKind::String) => Err(
            ConvertError::invalid(path, format!("map keys must be strings, not '{}'", k)),
        ),
        _ => Ok(()),
    }
}

impl Serializer for InstantiateMap {
    fn name(&self) -> &str {
        "instantiate-map"
    }

    fn read(
        &self,
        ctx: &mut ReadContext,
        converter: &Converter<'_>,
        blackboard: &mut Blackboard,
    ) -> Result<Step, ConvertError> {
        if !ctx.is_phase(&Phase::HANDLING_TYPE) || type_claimed(ctx, blackboard) {
            return Ok(Step::NoOp);
        }
        let config = converter.config();
        let expected = ctx.expected_type().map(str::to_string);
        let expected_map = expected.as_deref().and_then(map_value_type);
        if let Some(t) = &expected {
            if expected_map.is_some() {
                check_key_type(t, ctx.path())?;
            }
        }

        let Some(mapping) = ctx.mapping() else {
            if expected_map.is_some() {
                let found = ctx.node().map(DocumentNode::kind_name).unwrap_or("nothing");
                return Err(ConvertError::invalid(
                    ctx.path(),
                    format!("expected a mapping, found {}", found),
                ));
            }
            return Ok(Step::NoOp);
        };

        let wrapped = mapping
            .get(&config.type_key)
            .and_then(DocumentNode::as_str)
            .and_then(map_value_type)
            .filter(|_| mapping.len() == 2 && mapping.contains_key(&config.value_key));
        let has_type_key = mapping.contains_key(&config.type_key);

        let value_type = if let Some(value_type) = wrapped {
            if expected_map.is_none() && !is_open_type(expected.as_deref()) {
                return Ok(Step::NoOp);
            }
            let inner = ctx.take_key(&config.value_key).unwrap_or_default();
            ctx.take_key(&config.type_key);
            ctx.node = Some(inner);
            value_type.or_else(|| expected_map.clone().flatten())
        } else if let Some(value_type) = &expected_map {
            value_type.clone()
        } else if is_open_type(expected.as_deref()) && !has_type_key {
            None
        } else {
            return Ok(Step::NoOp);
        };

        let entries = match ctx.take_node() {
            Some(DocumentNode::Mapping(entries)) => entries,
            Some(other) => {
                return Err(ConvertError::invalid(
                    ctx.path(),
                    format!("map value must be a mapping, found {}", other.kind_name()),
                ));
            }
            None => Mapping::new(),
        };
        let mut values = IndexMap::with_capacity(entries.len());
        for (key, node) in entries {
            let path = child_path(ctx.path(), &key);
            let value = converter.read_at(node, value_type.as_deref(), path)?;
            values.insert(key, value);
        }
        ctx.value = Some(Value::Map(values));
        Ok(Step::Done)
    }

    fn write(
        &self,
        ctx: &mut WriteContext<'_>,
        converter: &Converter<'_>,
        _blackboard: &mut Blackboard,
    ) -> Result<Step, ConvertError> {
        if !ctx.is_phase(&Phase::HANDLING_TYPE) || ctx.output.is_some() {
            return Ok(Step::NoOp);
        }
        let value: &Value = ctx.value;
        let Value::Map(entries) = value else {
            return Ok(Step::NoOp);
        };
        let config = converter.config();
        let expected = ctx.expected_type();
        let expected_map = expected.and_then(map_value_type);
        let value_type = expected_map.clone().flatten();

        let mut mapping = Mapping::with_capacity(entries.len());
        for (key, item) in entries {
            let path = child_path(ctx.path(), key);
            mapping.insert(key.clone(), converter.write_at(item, value_type.as_deref(), path)?);
        }

        let bare = expected_map.is_some()
            || (is_open_type(expected) && !entries.contains_key(&config.type_key));
        ctx.output = Some(if bare {
            DocumentNode::Mapping(mapping)
        } else {
            let mut wrapped = Mapping::new();
            wrapped.insert(config.type_key.clone(), DocumentNode::from("map"));
            wrapped.insert(config.value_key.clone(), DocumentNode::Mapping(mapping));
            DocumentNode::Mapping(wrapped)
        });
        Ok(Step::Done)
    }

    fn document(&self, type_name: &str, _converter: &Converter<'_>) -> Option<String> {
        let value_type = map_value_type(type_name)?;
        Some(match value_type {
            Some(t) => format!("A mapping from string keys to `{}` values.", t),
            None => "A mapping from string keys to values of any type.".to_string(),
        })
    }
}
