//! Building a type registry from a catalog.
//!
//! The main entry points are [`Catalog::into_registry`] and
//! [`Catalog::into_engine`]. Every type is checked before anything is
//! registered: names must be unique and every supertype must be declared
//! in the same catalog.

use std::collections::HashSet;
use std::sync::Arc;

use yoml_core::{
    AllFieldsExplicit, Attribute, ConstructionPath, DocumentNode, ExplicitField, FieldsInMapUnder,
    InMemoryTypeRegistry, Serializer, TypeInfo, Yoml, YomlConfig,
};

use crate::types::{Catalog, CatalogType, ConstructorSpec, SerializerSpec};

/// Errors loading a catalog.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("invalid document: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("type '{0}' is declared more than once")]
    DuplicateType(String),

    #[error("type '{type_name}' extends unknown type '{parent}'")]
    UnknownParent { type_name: String, parent: String },

    #[error("definition of '{type_name}': {reason}")]
    InvalidDefinition { type_name: String, reason: String },
}

impl Catalog {
    /// Check the catalog and register every type.
    pub fn into_registry(self) -> Result<InMemoryTypeRegistry, CatalogError> {
        self.validate()?;
        let type_key = self.config.type_key.clone();
        let mut registry = InMemoryTypeRegistry::new();
        for entry in self.types {
            let name = entry.name.clone();
            registry.register(type_info(entry, &type_key)?);
            tracing::debug!(type_name = %name, "registered catalog type");
        }
        Ok(registry)
    }

    /// Build an engine over the catalog's types and configuration.
    pub fn into_engine(self) -> Result<Yoml, CatalogError> {
        let config: YomlConfig = self.config.clone();
        let registry = self.into_registry()?;
        Ok(Yoml::with_config(Arc::new(registry), config))
    }

    fn validate(&self) -> Result<(), CatalogError> {
        let mut names = HashSet::new();
        for t in &self.types {
            if !names.insert(t.name.as_str()) {
                return Err(CatalogError::DuplicateType(t.name.clone()));
            }
        }
        for t in &self.types {
            if t.extends.is_some() && t.definition.is_some() {
                return Err(CatalogError::InvalidDefinition {
                    type_name: t.name.clone(),
                    reason: "a defined type takes its parent from the definition".to_string(),
                });
            }
            if let Some(parent) = &t.extends {
                if !names.contains(parent.as_str()) {
                    return Err(CatalogError::UnknownParent {
                        type_name: t.name.clone(),
                        parent: parent.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}

fn type_info(entry: CatalogType, type_key: &str) -> Result<TypeInfo, CatalogError> {
    let CatalogType {
        name,
        extends,
        attributes,
        config_keys,
        constructors,
        serializers,
        definition,
    } = entry;

    let mut info = TypeInfo::new(name.as_str());
    if let Some(parent) = extends {
        info = info.extends(parent);
    }
    for (attr, type_name) in &attributes {
        info = match type_name {
            Some(t) => info.attribute(attr, t),
            None => info.untyped_attribute(attr),
        };
    }
    for (key, type_name) in config_keys {
        info.config_keys.push(match type_name {
            Some(t) => Attribute::typed(key, t),
            None => Attribute::new(key),
        });
    }
    for constructor in constructors {
        info = info.construction_path(match constructor {
            ConstructorSpec::NoArgs => ConstructionPath::no_args(),
            ConstructorSpec::Aggregate { config_field } => ConstructionPath::aggregate(config_field),
        });
    }
    for spec in serializers {
        info = info.shared_serializer(serializer(spec));
    }

    if let Some(mut presets) = definition {
        let parent = match presets.shift_remove(type_key) {
            Some(DocumentNode::String(parent)) => parent,
            Some(other) => {
                return Err(CatalogError::InvalidDefinition {
                    type_name: name,
                    reason: format!("'{}' must be a string, found {}", type_key, other.kind_name()),
                });
            }
            None => {
                return Err(CatalogError::InvalidDefinition {
                    type_name: name,
                    reason: format!("missing '{}' naming the parent type", type_key),
                });
            }
        };
        info = info.extends(parent);
        info.definition = Some(presets);
    }
    Ok(info)
}

fn serializer(spec: SerializerSpec) -> Arc<dyn Serializer> {
    match spec {
        SerializerSpec::ExplicitField(field) => Arc::new(ExplicitField::from(field)),
        SerializerSpec::AllFieldsExplicit => Arc::new(AllFieldsExplicit),
        SerializerSpec::FieldsInMapUnder { key } => Arc::new(FieldsInMapUnder::new(key)),
    }
}
