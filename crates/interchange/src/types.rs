//! Typed structs for the type catalog format.
//!
//! A catalog lists types with their attributes, supertype, construction
//! paths, serializers and optional document definition:
//!
//! ```yaml
//! config: { fieldsKey: fields }
//! types:
//!   - name: shape
//!     attributes: { name: string, color: string }
//!     constructors: [no-args]
//!     serializers:
//!       - explicitField: { fieldName: name, keyName: shape-name, alias: my-name }
//!   - name: shape-with-size
//!     extends: shape
//!     attributes: { size: int }
//!   - name: red-shape
//!     definition: { type: shape, fields: { color: red } }
//! ```

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use yoml_core::{ExplicitFieldSpec, Mapping, YomlConfig};

/// Top-level catalog document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Catalog {
    /// Engine configuration; defaults apply when absent.
    #[serde(default)]
    pub config: YomlConfig,
    #[serde(default)]
    pub types: Vec<CatalogType>,
}

/// One registered type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CatalogType {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extends: Option<String>,
    /// Attribute name to declared type; `null` leaves it untyped.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub attributes: IndexMap<String, Option<String>>,
    /// Configuration keys for aggregate construction.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub config_keys: IndexMap<String, Option<String>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub constructors: Vec<ConstructorSpec>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub serializers: Vec<SerializerSpec>,
    /// A document `{type: <parent>, ...presets}` defining this type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub definition: Option<Mapping>,
}

/// A construction path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConstructorSpec {
    NoArgs,
    Aggregate {
        /// Attribute holding the aggregate on built objects.
        #[serde(rename = "configField")]
        config_field: String,
    },
}

/// A serializer attached to a type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SerializerSpec {
    ExplicitField(ExplicitFieldSpec),
    AllFieldsExplicit,
    FieldsInMapUnder { key: String },
}
