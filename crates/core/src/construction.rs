//! Deferred construction recipes.
//!
//! A [`ConstructionInstruction`] says "build type T through a path of shape
//! S with these arguments", optionally wrapped by an outer instruction. It
//! is consumed by [`ConstructionInstruction::resolve`], so it can be
//! resolved at most once.

use indexmap::IndexMap;

use crate::error::BoxError;
use crate::registry::{ConstructorShape, TypeRegistry};
use crate::value::Value;

#[derive(Debug, thiserror::Error)]
pub enum ConstructionError {
    #[error("unknown type '{0}'")]
    UnknownType(String),

    #[error("type '{type_name}' has no {shape} construction path")]
    NoPath {
        type_name: String,
        shape: ConstructorShape,
    },

    #[error("outer instruction for '{outer}' cannot wrap a {shape} construction")]
    IncompatibleOuter {
        outer: String,
        shape: ConstructorShape,
    },

    #[error("constructor for '{type_name}' failed")]
    Failed {
        type_name: String,
        #[source]
        source: BoxError,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConstructionInstruction {
    pub type_name: String,
    pub shape: ConstructorShape,
    pub args: Vec<Value>,
    pub outer: Option<Box<ConstructionInstruction>>,
}

impl ConstructionInstruction {
    pub fn no_args(type_name: impl Into<String>) -> Self {
        ConstructionInstruction {
            type_name: type_name.into(),
            shape: ConstructorShape::NoArgs,
            args: Vec::new(),
            outer: None,
        }
    }

    pub fn aggregate(type_name: impl Into<String>, config: IndexMap<String, Value>) -> Self {
        ConstructionInstruction {
            type_name: type_name.into(),
            shape: ConstructorShape::Aggregate,
            args: vec![Value::Map(config)],
            outer: None,
        }
    }

    pub fn wrapped_by(mut self, outer: Option<ConstructionInstruction>) -> Self {
        self.outer = outer.map(Box::new);
        self
    }

    /// Build the value.
    ///
    /// Outer aggregates are merged over this one, outermost winning. The
    /// innermost type's constructor runs, and an object result is renamed
    /// to the outermost type.
    pub fn resolve(self, registry: &dyn TypeRegistry) -> Result<Value, ConstructionError> {
        let ConstructionInstruction {
            type_name,
            shape,
            mut args,
            outer,
        } = self;

        let mut outermost = None;
        let mut next = outer;
        while let Some(wrapper) = next {
            let wrapper = *wrapper;
            match (shape, wrapper.shape) {
                (ConstructorShape::Aggregate, ConstructorShape::Aggregate) => {
                    if let (Some(Value::Map(inner)), Some(Value::Map(over))) =
                        (args.first_mut(), wrapper.args.into_iter().next())
                    {
                        for (k, v) in over {
                            inner.insert(k, v);
                        }
                    }
                }
                _ => {
                    return Err(ConstructionError::IncompatibleOuter {
                        outer: wrapper.type_name,
                        shape,
                    })
                }
            }
            outermost = Some(wrapper.type_name);
            next = wrapper.outer;
        }

        let handle = registry
            .resolve_type(&type_name)
            .ok_or_else(|| ConstructionError::UnknownType(type_name.clone()))?;
        let path = handle
            .find_construction_path(shape)
            .ok_or_else(|| ConstructionError::NoPath {
                type_name: type_name.clone(),
                shape,
            })?;
        tracing::debug!(type_name = %type_name, %shape, "constructing");
        let mut value = (path.constructor)(&type_name, args).map_err(|source| {
            ConstructionError::Failed {
                type_name: type_name.clone(),
                source,
            }
        })?;

        if let (Some(name), Some(obj)) = (outermost, value.as_object_mut()) {
            obj.set_type_name(name);
        }
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{ConstructionPath, InMemoryTypeRegistry, TypeInfo};
    use crate::value::Object;
    use std::sync::Arc;

    fn registry() -> InMemoryTypeRegistry {
        let mut reg = InMemoryTypeRegistry::new();
        reg.register(TypeInfo::new("shape").no_args_constructor());
        reg.register(
            TypeInfo::new("server")
                .config_key("port", "int")
                .aggregate_constructor("config"),
        );
        reg.register(TypeInfo::new("broken").construction_path(
            ConstructionPath::no_args().with_constructor(Arc::new(
                |_: &str, _: Vec<Value>| -> Result<Value, BoxError> { Err("boom".into()) },
            )),
        ));
        reg
    }

    #[test]
    fn no_args_builds_empty_object() {
        let v = ConstructionInstruction::no_args("shape").resolve(&registry()).unwrap();
        assert_eq!(v, Value::Object(Object::new("shape")));
    }

    #[test]
    fn outer_aggregate_wins_and_renames() {
        let inner = IndexMap::from([
            ("port".to_string(), Value::Int(80)),
            ("host".to_string(), Value::from("a")),
        ]);
        let outer = IndexMap::from([("port".to_string(), Value::Int(8080))]);
        let ci = ConstructionInstruction::aggregate("server", inner)
            .wrapped_by(Some(ConstructionInstruction::aggregate("web-server", outer)));
        let v = ci.resolve(&registry()).unwrap();
        let obj = v.as_object().unwrap();
        assert_eq!(obj.type_name(), "web-server");
        let config = obj.field("config").and_then(Value::as_map).unwrap();
        assert_eq!(config.get("port"), Some(&Value::Int(8080)));
        assert_eq!(config.get("host"), Some(&Value::from("a")));
    }

    #[test]
    fn missing_path_and_failures_are_reported() {
        let err = ConstructionInstruction::aggregate("shape", IndexMap::new())
            .resolve(&registry())
            .unwrap_err();
        assert!(matches!(err, ConstructionError::NoPath { .. }));

        let err = ConstructionInstruction::no_args("broken").resolve(&registry()).unwrap_err();
        assert_eq!(err.to_string(), "constructor for 'broken' failed");
        assert!(std::error::Error::source(&err).is_some());

        let err = ConstructionInstruction::no_args("ghost").resolve(&registry()).unwrap_err();
        assert!(matches!(err, ConstructionError::UnknownType(_)));
    }
}
