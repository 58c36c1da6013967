//! In-memory [`TypeRegistry`] built from [`TypeInfo`] records.
//!
//! Types may extend a parent. Resolution walks the parent chain: attributes
//! and configuration keys merge supertype-first, construction paths come
//! from the nearest type declaring any, and serializers are collected most
//! specific first without duplicates.

use indexmap::IndexMap;
use std::collections::HashSet;
use std::sync::Arc;

use super::{Attribute, TypeDefinition, TypeHandle, TypeInfo, TypeRegistry};
use crate::document::Mapping;
use crate::serializers::Serializer;

#[derive(Debug, Default)]
pub struct InMemoryTypeRegistry {
    types: IndexMap<String, TypeInfo>,
}

impl InMemoryTypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a type.
    pub fn register(&mut self, info: TypeInfo) {
        self.types.insert(info.name.clone(), info);
    }

    /// Register a type defined as a document: `parent` with preset entries.
    pub fn register_definition(
        &mut self,
        name: impl Into<String>,
        parent: impl Into<String>,
        presets: Mapping,
        serializers: Vec<Arc<dyn Serializer>>,
    ) {
        let mut info = TypeInfo::new(name).extends(parent);
        info.definition = Some(presets);
        info.serializers = serializers;
        self.register(info);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }

    /// The type and its ancestors, most specific first. `None` if any
    /// ancestor is missing or the chain loops.
    fn chain(&self, name: &str) -> Option<Vec<&TypeInfo>> {
        let mut chain = Vec::new();
        let mut seen = HashSet::new();
        let mut next = Some(name);
        while let Some(current) = next {
            if !seen.insert(current) {
                tracing::warn!(type_name = name, "type hierarchy loops at '{}'", current);
                return None;
            }
            let Some(info) = self.types.get(current) else {
                if current != name {
                    tracing::warn!(type_name = name, parent = current, "unknown parent type");
                }
                return None;
            };
            chain.push(info);
            next = info.parent.as_deref();
        }
        Some(chain)
    }
}

fn merge_attributes<'a>(layers: impl Iterator<Item = &'a [Attribute]>) -> Vec<Attribute> {
    let mut merged: Vec<Attribute> = Vec::new();
    for layer in layers {
        for attr in layer {
            match merged.iter_mut().find(|a| a.name == attr.name) {
                Some(existing) => *existing = attr.clone(),
                None => merged.push(attr.clone()),
            }
        }
    }
    merged
}

impl TypeRegistry for InMemoryTypeRegistry {
    fn resolve_type(&self, name: &str) -> Option<TypeHandle> {
        let chain = self.chain(name)?;
        let own = chain[0];

        let attributes = merge_attributes(chain.iter().rev().map(|t| t.attributes.as_slice()));
        let config_keys = merge_attributes(chain.iter().rev().map(|t| t.config_keys.as_slice()));
        let paths = chain
            .iter()
            .find(|t| !t.paths.is_empty())
            .map(|t| t.paths.clone())
            .unwrap_or_default();
        let definition = match (&own.definition, &own.parent) {
            (Some(presets), Some(parent)) => Some(TypeDefinition {
                parent: parent.clone(),
                presets: presets.clone(),
            }),
            _ => None,
        };

        Some(TypeHandle::new(
            own.name.clone(),
            attributes,
            config_keys,
            paths,
            definition,
        ))
    }

    fn serializers_for(&self, name: &str) -> Vec<Arc<dyn Serializer>> {
        let Some(chain) = self.chain(name) else {
            return Vec::new();
        };
        let mut out: Vec<Arc<dyn Serializer>> = Vec::new();
        for info in chain {
            for s in &info.serializers {
                if !out.iter().any(|existing| Arc::ptr_eq(existing, s)) {
                    out.push(Arc::clone(s));
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::DocumentNode;
    use crate::registry::ConstructorShape;
    use crate::serializers::ExplicitField;

    fn shapes() -> InMemoryTypeRegistry {
        let mut reg = InMemoryTypeRegistry::new();
        reg.register(
            TypeInfo::new("shape")
                .attribute("name", "string")
                .attribute("color", "string")
                .no_args_constructor()
                .serializer(ExplicitField::new("name")),
        );
        reg.register(
            TypeInfo::new("shape-with-size")
                .extends("shape")
                .attribute("size", "int")
                .serializer(ExplicitField::new("size")),
        );
        reg
    }

    #[test]
    fn attributes_merge_parent_first() {
        let handle = shapes().resolve_type("shape-with-size").unwrap();
        let names: Vec<&str> = handle.attributes().iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["name", "color", "size"]);
        assert_eq!(handle.field_type("size"), Some("int"));
    }

    #[test]
    fn construction_paths_are_inherited() {
        let handle = shapes().resolve_type("shape-with-size").unwrap();
        assert!(handle.find_construction_path(ConstructorShape::NoArgs).is_some());
        assert!(handle.find_construction_path(ConstructorShape::Aggregate).is_none());
    }

    #[test]
    fn serializers_most_specific_first() {
        let names: Vec<String> = shapes()
            .serializers_for("shape-with-size")
            .iter()
            .map(|s| s.name().to_string())
            .collect();
        assert_eq!(names, vec!["explicit-field:size", "explicit-field:name"]);
    }

    #[test]
    fn shared_serializer_is_not_duplicated() {
        let shared: Arc<dyn Serializer> = Arc::new(ExplicitField::new("name"));
        let mut reg = InMemoryTypeRegistry::new();
        reg.register(TypeInfo::new("a").shared_serializer(Arc::clone(&shared)));
        reg.register(TypeInfo::new("b").extends("a").shared_serializer(shared));
        assert_eq!(reg.serializers_for("b").len(), 1);
    }

    #[test]
    fn definitions_keep_parent_and_presets() {
        let mut reg = shapes();
        let mut presets = Mapping::new();
        presets.insert("color".into(), DocumentNode::from("red"));
        reg.register_definition("red-shape", "shape", presets, Vec::new());

        let handle = reg.resolve_type("red-shape").unwrap();
        let def = handle.definition().unwrap();
        assert_eq!(def.parent, "shape");
        assert_eq!(def.presets.get("color"), Some(&DocumentNode::from("red")));
        assert_eq!(handle.attributes().len(), 2);
    }

    #[test]
    fn unknown_parent_or_loop_does_not_resolve() {
        let mut reg = InMemoryTypeRegistry::new();
        reg.register(TypeInfo::new("orphan").extends("missing"));
        reg.register(TypeInfo::new("x").extends("y"));
        reg.register(TypeInfo::new("y").extends("x"));
        assert!(reg.resolve_type("orphan").is_none());
        assert!(reg.resolve_type("x").is_none());
        assert!(reg.resolve_type("nothing").is_none());
        assert!(reg.serializers_for("nothing").is_empty());
    }
}
