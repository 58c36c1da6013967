//! Sequences: `list` and `list<T>`.

use crate::blackboard::Blackboard;
use crate::context::{index_path, ConversionContext, Phase, ReadContext, WriteContext};
use crate::converter::Converter;
use crate::document::{DocumentNode, Mapping};
use crate::error::ConvertError;
use crate::generics::parse_generic_type;
use crate::serializers::{is_open_type, type_claimed, Serializer, Step};
use crate::value::Value;

#[derive(Debug, Clone, Copy, Default)]
pub struct InstantiateList;

/// `Some(element type)` if `type_name` is a list type.
fn list_element_type(type_name: &str) -> Option<Option<String>> {
    let generic = parse_generic_type(type_name).ok()?;
    if !generic.base.eq_ignore_ascii_case("list") {
        return None;
    }
    Some(generic.sub_types.into_iter().next())
}

impl Serializer for InstantiateList {
    fn name(&self) -> &str {
        "instantiate-list"
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
        let expected = ctx.expected_type();
        let expected_list = expected.and_then(list_element_type);

        let element_type = match (&expected_list, ctx.node()) {
            (Some(elem), Some(DocumentNode::Sequence(_))) => elem.clone(),
            (None, Some(DocumentNode::Sequence(_))) if is_open_type(expected) => None,
            (_, Some(DocumentNode::Mapping(m))) => {
                let wrapped = m
                    .get(&config.type_key)
                    .and_then(DocumentNode::as_str)
                    .and_then(list_element_type);
                match wrapped {
                    Some(elem) if m.contains_key(&config.value_key)
                        && (expected_list.is_some() || is_open_type(expected)) =>
                    {
                        let items = ctx.take_key(&config.value_key).unwrap_or_default();
                        ctx.take_key(&config.type_key);
                        ctx.node = Some(items);
                        elem.or_else(|| expected_list.clone().flatten())
                    }
                    _ if expected_list.is_some() => {
                        return Err(ConvertError::invalid(ctx.path(), "expected a sequence, found mapping"));
                    }
                    _ => return Ok(Step::NoOp),
                }
            }
            (Some(_), Some(other)) => {
                return Err(ConvertError::invalid(
                    ctx.path(),
                    format!("expected a sequence, found {}", other.kind_name()),
                ));
            }
            _ => return Ok(Step::NoOp),
        };

        let items = match ctx.take_node() {
            Some(DocumentNode::Sequence(items)) => items,
            Some(other) => {
                return Err(ConvertError::invalid(
                    ctx.path(),
                    format!("list value must be a sequence, found {}", other.kind_name()),
                ));
            }
            None => Vec::new(),
        };
        let mut values = Vec::with_capacity(items.len());
        for (i, item) in items.into_iter().enumerate() {
            values.push(converter.read_at(item, element_type.as_deref(), index_path(ctx.path(), i))?);
        }
        ctx.value = Some(Value::List(values));
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
        let Value::List(items) = ctx.value else {
            return Ok(Step::NoOp);
        };
        let expected = ctx.expected_type();
        let expected_list = expected.and_then(list_element_type);
        let element_type = expected_list.clone().flatten();

        let mut nodes = Vec::with_capacity(items.len());
        for (i, item) in items.iter().enumerate() {
            nodes.push(converter.write_at(item, element_type.as_deref(), index_path(ctx.path(), i))?);
        }
        let sequence = DocumentNode::Sequence(nodes);

        ctx.output = Some(if expected_list.is_some() || is_open_type(expected) {
            sequence
        } else {
            let config = converter.config();
            let mut wrapped = Mapping::new();
            wrapped.insert(config.type_key.clone(), DocumentNode::from("list"));
            wrapped.insert(config.value_key.clone(), sequence);
            DocumentNode::Mapping(wrapped)
        });
        Ok(Step::Done)
    }

    fn document(&self, type_name: &str, _converter: &Converter<'_>) -> Option<String> {
        let element = list_element_type(type_name)?;
        Some(match element {
            Some(t) => format!("A sequence of `{}` items.", t),
            None => "A sequence of items of any type.".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::InMemoryTypeRegistry;
    use crate::yoml::Yoml;
    use serde_json::json;
    use std::sync::Arc;

    fn yoml() -> Yoml {
        Yoml::new(Arc::new(InMemoryTypeRegistry::new()))
    }

    #[test]
    fn typed_elements() {
        let v = yoml().read(json!(["1", 2]).into(), Some("list<int>")).unwrap();
        assert_eq!(v, Value::List(vec![Value::Int(1), Value::Int(2)]));
    }

    #[test]
    fn untyped_sequence_infers_elements() {
        let v = yoml().read(json!([1, "a"]).into(), None).unwrap();
        assert_eq!(v, Value::List(vec![Value::Int(1), Value::from("a")]));
    }

    #[test]
    fn element_errors_carry_index_path() {
        let err = yoml().read(json!([1, "x"]).into(), Some("list<int>")).unwrap_err();
        assert_eq!(err.path, "[1]");
    }

    #[test]
    fn wrapped_when_expected_type_is_a_registry_type() {
        let y = yoml();
        let list = Value::List(vec![Value::Int(1)]);
        let doc = y.write(&list, Some("thing")).unwrap();
        assert_eq!(serde_json::Value::from(doc.clone()), json!({"type": "list", "value": [1]}));
        assert_eq!(y.read(doc, None).unwrap(), list);
    }
}
