//! The engine facade: a registry, a configuration and the builtin
//! serializers, shared by any number of reads and writes.

use std::sync::Arc;

use crate::config::YomlConfig;
use crate::converter::Converter;
use crate::docs::{DocFragment, TypeDocumentation};
use crate::document::DocumentNode;
use crate::error::{ConvertError, ConvertErrorKind};
use crate::generics::parse_generic_type;
use crate::registry::TypeRegistry;
use crate::serializers::{builtins, is_builtin_type, Serializer};
use crate::value::Value;

pub struct Yoml {
    registry: Arc<dyn TypeRegistry>,
    config: YomlConfig,
    builtins: Vec<Arc<dyn Serializer>>,
}

impl Yoml {
    pub fn new(registry: Arc<dyn TypeRegistry>) -> Self {
        Self::with_config(registry, YomlConfig::default())
    }

    pub fn with_config(registry: Arc<dyn TypeRegistry>, config: YomlConfig) -> Self {
        let builtins = builtins(&config);
        Yoml {
            registry,
            config,
            builtins,
        }
    }

    pub fn registry(&self) -> &Arc<dyn TypeRegistry> {
        &self.registry
    }

    pub fn config(&self) -> &YomlConfig {
        &self.config
    }

    pub fn converter(&self) -> Converter<'_> {
        Converter::new(self.registry.as_ref(), &self.config, &self.builtins)
    }

    /// Document to value. `expected` constrains the result; without it the
    /// document must say what it is.
    pub fn read(&self, node: DocumentNode, expected: Option<&str>) -> Result<Value, ConvertError> {
        self.converter().read(node, expected)
    }

    /// Value to document, omitting whatever `expected` already implies.
    pub fn write(&self, value: &Value, expected: Option<&str>) -> Result<DocumentNode, ConvertError> {
        self.converter().write(value, expected)
    }

    /// Describe the document syntax accepted for `type_name`.
    pub fn document(&self, type_name: &str) -> Result<TypeDocumentation, ConvertError> {
        parse_generic_type(type_name).map_err(|e| {
            ConvertError::new(
                "",
                ConvertErrorKind::MalformedType {
                    type_name: type_name.to_string(),
                    reason: e.to_string(),
                },
            )
        })?;
        let mut serializers: Vec<Arc<dyn Serializer>> = Vec::new();
        if !is_builtin_type(type_name) {
            if self.registry.resolve_type(type_name).is_none() {
                return Err(ConvertError::new(
                    "",
                    ConvertErrorKind::UnresolvedType {
                        type_name: type_name.to_string(),
                    },
                ));
            }
            serializers.extend(self.registry.serializers_for(type_name));
        }
        serializers.extend(self.builtins.iter().cloned());

        let converter = self.converter();
        let fragments = serializers
            .iter()
            .filter_map(|s| {
                s.document(type_name, &converter).map(|text| DocFragment {
                    serializer: s.name().to_string(),
                    text,
                })
            })
            .collect();
        Ok(TypeDocumentation {
            type_name: type_name.to_string(),
            fragments,
        })
    }
}

impl std::fmt::Debug for Yoml {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Yoml")
            .field("config", &self.config)
            .field("builtins", &self.builtins.len())
            .finish_non_exhaustive()
    }
}
