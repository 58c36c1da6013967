//! Primitives, wrapped literals and the `json` type.
//!
//! Bare scalars read according to the expected primitive kind (see the
//! coercion table in [`crate::document`]). Wherever a bare literal would be
//! misread, the wrapped form `{type: int, value: 3}` is used instead. The
//! `json` type takes a document as-is without interpreting `type` keys.

use crate::blackboard::Blackboard;
use crate::context::{ConversionContext, Phase, ReadContext, WriteContext};
use crate::converter::Converter;
use crate::document::{DocumentNode, Mapping};
use crate::error::ConvertError;
use crate::serializers::{is_open_type, type_claimed, Serializer, Step};
use crate::value::{PrimitiveKind, Value};

#[derive(Debug, Clone, Copy, Default)]
pub struct InstantiatePrimitive;

fn is_json(type_name: Option<&str>) -> bool {
    type_name.is_some_and(|t| t.trim().eq_ignore_ascii_case("json"))
}

/// What a wrapped literal names in its type key.
enum Literal {
    Primitive(PrimitiveKind),
    Json,
}

fn literal_kind(type_name: &str) -> Option<Literal> {
    if is_json(Some(type_name)) {
        return Some(Literal::Json);
    }
    PrimitiveKind::from_type_name(type_name).map(Literal::Primitive)
}

impl InstantiatePrimitive {
    /// Recognise `{type: <primitive|json>, value: ...}` and consume it.
    fn take_wrapped(
        &self,
        ctx: &mut ReadContext,
        converter: &Converter<'_>,
    ) -> Result<Option<Value>, ConvertError> {
        let config = converter.config();
        let Some(kind) = ctx.string_entry(&config.type_key).and_then(literal_kind) else {
            return Ok(None);
        };
        if ctx.mapping().and_then(|m| m.get(&config.value_key)).is_none() {
            return Ok(None);
        }
        ctx.take_key(&config.type_key);
        let literal = ctx.take_key(&config.value_key).unwrap_or_default();
        let value = match kind {
            Literal::Json => literal.to_plain_value(),
            Literal::Primitive(kind) => literal
                .coerce(kind)
                .map_err(|e| ConvertError::invalid(ctx.path(), e.to_string()))?,
        };
        Ok(Some(value))
    }
}

impl Serializer for InstantiatePrimitive {
    fn name(&self) -> &str {
        "instantiate-primitive"
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
        let Some(node) = ctx.node() else {
            return Ok(Step::NoOp);
        };
        let expected = ctx.expected_type();

        if is_json(expected) {
            let value = node.to_plain_value();
            ctx.take_node();
            ctx.value = Some(value);
            return Ok(Step::Done);
        }

        let expected_kind = expected.and_then(PrimitiveKind::from_type_name);
        if node.is_scalar() {
            let value = match expected_kind {
                Some(kind) => node
                    .coerce(kind)
                    .map_err(|e| ConvertError::invalid(ctx.path(), e.to_string()))?,
                None if is_open_type(expected) => node.to_plain_value(),
                None => return Ok(Step::NoOp),
            };
            ctx.take_node();
            ctx.value = Some(value);
            return Ok(Step::Done);
        }

        if expected_kind.is_some() || is_open_type(expected) {
            if let Some(value) = self.take_wrapped(ctx, converter)? {
                ctx.value = Some(value);
                return Ok(Step::Done);
            }
        }
        if let Some(kind) = expected_kind {
            let found = ctx.node().map(DocumentNode::kind_name).unwrap_or("nothing");
            return Err(ConvertError::invalid(
                ctx.path(),
                format!("expected {}, found {}", kind, found),
            ));
        }
        Ok(Step::NoOp)
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
        let expected = ctx.expected_type();

        if is_json(expected) {
            let node = DocumentNode::from_plain_value(ctx.value).ok_or_else(|| {
                ConvertError::invalid(ctx.path(), "json values cannot hold objects or non-finite numbers")
            })?;
            ctx.output = Some(node);
            return Ok(Step::Done);
        }

        let Some(kind) = ctx.value.primitive_kind() else {
            return Ok(Step::NoOp);
        };
        let literal = DocumentNode::from_plain_value(ctx.value)
            .ok_or_else(|| ConvertError::invalid(ctx.path(), "cannot write a non-finite number"))?;

        let implied = is_open_type(expected)
            || expected.and_then(PrimitiveKind::from_type_name) == Some(kind);
        ctx.output = Some(if implied {
            literal
        } else {
            let config = converter.config();
            let mut wrapped = Mapping::new();
            wrapped.insert(config.type_key.clone(), DocumentNode::from(kind.type_name()));
            wrapped.insert(config.value_key.clone(), literal);
            DocumentNode::Mapping(wrapped)
        });
        Ok(Step::Done)
    }

    fn document(&self, type_name: &str, _converter: &Converter<'_>) -> Option<String> {
        if is_json(Some(type_name)) {
            return Some("Any document, taken as-is.".to_string());
        }
        PrimitiveKind::from_type_name(type_name).map(|kind| {
            format!(
                "A {kind} literal, or the wrapped form `{{type: {kind}, value: <literal>}}`."
            )
        })
    }
}
