//! The document model: a parser-neutral tree of scalars, sequences and
//! mappings.
//!
//! Documents arrive from an external parser (JSON, YAML, ...) and leave the
//! engine the same way. Mappings preserve insertion order so written output
//! is deterministic. Conversion to and from `serde_json::Value` is lossless.
//!
//! # Scalar coercion table
//!
//! | target    | accepted document scalars                                        |
//! |-----------|------------------------------------------------------------------|
//! | `string`  | string; number (decimal text); boolean (`true`/`false`)          |
//! | `int`     | integral number; float with zero fraction; string parsing as i64 |
//! | `double`  | any number; string parsing as f64                                |
//! | `boolean` | boolean; string `true`/`false` (ASCII case-insensitive)          |
//!
//! `null` reads as `Value::Null` for every kind. Nothing here depends on locale.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Number;
use std::fmt;

use crate::value::{PrimitiveKind, Value};

/// An ordered mapping with unique keys.
pub type Mapping = IndexMap<String, DocumentNode>;

/// One node of a document tree.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "serde_json::Value", into = "serde_json::Value")]
pub enum DocumentNode {
    #[default]
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    Sequence(Vec<DocumentNode>),
    Mapping(Mapping),
}

/// A document scalar could not be read as the requested primitive kind.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("cannot read {found} '{text}' as {expected}")]
pub struct CoercionError {
    pub expected: PrimitiveKind,
    pub found: &'static str,
    pub text: String,
}

impl DocumentNode {
    /// An empty mapping node.
    pub fn mapping() -> Self {
        DocumentNode::Mapping(Mapping::new())
    }

    /// Short name of the node kind, for diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            DocumentNode::Null => "null",
            DocumentNode::Bool(_) => "boolean",
            DocumentNode::Number(_) => "number",
            DocumentNode::String(_) => "string",
            DocumentNode::Sequence(_) => "sequence",
            DocumentNode::Mapping(_) => "mapping",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, DocumentNode::Null)
    }

    pub fn is_scalar(&self) -> bool {
        !matches!(self, DocumentNode::Sequence(_) | DocumentNode::Mapping(_))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            DocumentNode::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_mapping(&self) -> Option<&Mapping> {
        match self {
            DocumentNode::Mapping(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_mapping_mut(&mut self) -> Option<&mut Mapping> {
        match self {
            DocumentNode::Mapping(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&[DocumentNode]> {
        match self {
            DocumentNode::Sequence(items) => Some(items),
            _ => None,
        }
    }

    /// Look up a mapping entry by exact key.
    pub fn get(&self, key: &str) -> Option<&DocumentNode> {
        self.as_mapping().and_then(|m| m.get(key))
    }

    /// Read a scalar as the given primitive kind, following the coercion
    /// table in the module docs.
    pub fn coerce(&self, kind: PrimitiveKind) -> Result<Value, CoercionError> {
        let fail = || CoercionError {
            expected: kind,
            found: self.kind_name(),
            text: self.to_string(),
        };
        if self.is_null() {
            return Ok(Value::Null);
        }
        match kind {
            PrimitiveKind::String => match self {
                DocumentNode::String(s) => Ok(Value::String(s.clone())),
                DocumentNode::Number(n) => Ok(Value::String(n.to_string())),
                DocumentNode::Bool(b) => Ok(Value::String(b.to_string())),
                _ => Err(fail()),
            },
            PrimitiveKind::Int => match self {
                DocumentNode::Number(n) => {
                    if let Some(i) = n.as_i64() {
                        Ok(Value::Int(i))
                    } else {
                        match n.as_f64() {
                            Some(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => {
                                Ok(Value::Int(f as i64))
                            }
                            _ => Err(fail()),
                        }
                    }
                }
                DocumentNode::String(s) => s.trim().parse::<i64>().map(Value::Int).map_err(|_| fail()),
                _ => Err(fail()),
            },
            PrimitiveKind::Double => match self {
                DocumentNode::Number(n) => n.as_f64().map(Value::Float).ok_or_else(fail),
                DocumentNode::String(s) => s.trim().parse::<f64>().map(Value::Float).map_err(|_| fail()),
                _ => Err(fail()),
            },
            PrimitiveKind::Boolean => match self {
                DocumentNode::Bool(b) => Ok(Value::Bool(*b)),
                DocumentNode::String(s) if s.eq_ignore_ascii_case("true") => Ok(Value::Bool(true)),
                DocumentNode::String(s) if s.eq_ignore_ascii_case("false") => Ok(Value::Bool(false)),
                _ => Err(fail()),
            },
        }
    }

    /// The natural runtime value of a document: numbers become `Int` when
    /// integral, mappings become `Map`. No `type` keys are interpreted.
    pub fn to_plain_value(&self) -> Value {
        match self {
            DocumentNode::Null => Value::Null,
            DocumentNode::Bool(b) => Value::Bool(*b),
            DocumentNode::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => n.as_f64().map(Value::Float).unwrap_or(Value::Null),
            },
            DocumentNode::String(s) => Value::String(s.clone()),
            DocumentNode::Sequence(items) => {
                Value::List(items.iter().map(DocumentNode::to_plain_value).collect())
            }
            DocumentNode::Mapping(m) => Value::Map(
                m.iter()
                    .map(|(k, v)| (k.clone(), v.to_plain_value()))
                    .collect(),
            ),
        }
    }

    /// The document form of plain data. Returns `None` if the value holds an
    /// object or a non-finite float.
    pub fn from_plain_value(value: &Value) -> Option<DocumentNode> {
        Some(match value {
            Value::Null => DocumentNode::Null,
            Value::Bool(b) => DocumentNode::Bool(*b),
            Value::Int(i) => DocumentNode::Number(Number::from(*i)),
            Value::Float(f) => DocumentNode::Number(Number::from_f64(*f)?),
            Value::String(s) => DocumentNode::String(s.clone()),
            Value::List(items) => DocumentNode::Sequence(
                items
                    .iter()
                    .map(DocumentNode::from_plain_value)
                    .collect::<Option<Vec<_>>>()?,
            ),
            Value::Map(entries) => {
                let mut m = Mapping::with_capacity(entries.len());
                for (k, v) in entries {
                    m.insert(k.clone(), DocumentNode::from_plain_value(v)?);
                }
                DocumentNode::Mapping(m)
            }
            Value::Object(_) => return None,
        })
    }
}

// ──────────────────────────────────────────────
// Conversions
// ──────────────────────────────────────────────

impl From<serde_json::Value> for DocumentNode {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => DocumentNode::Null,
            serde_json::Value::Bool(b) => DocumentNode::Bool(b),
            serde_json::Value::Number(n) => DocumentNode::Number(n),
            serde_json::Value::String(s) => DocumentNode::String(s),
            serde_json::Value::Array(items) => {
                DocumentNode::Sequence(items.into_iter().map(DocumentNode::from).collect())
            }
            serde_json::Value::Object(m) => DocumentNode::Mapping(
                m.into_iter().map(|(k, v)| (k, DocumentNode::from(v))).collect(),
            ),
        }
    }
}

impl From<DocumentNode> for serde_json::Value {
    fn from(node: DocumentNode) -> Self {
        match node {
            DocumentNode::Null => serde_json::Value::Null,
            DocumentNode::Bool(b) => serde_json::Value::Bool(b),
            DocumentNode::Number(n) => serde_json::Value::Number(n),
            DocumentNode::String(s) => serde_json::Value::String(s),
            DocumentNode::Sequence(items) => {
                serde_json::Value::Array(items.into_iter().map(serde_json::Value::from).collect())
            }
            DocumentNode::Mapping(m) => serde_json::Value::Object(
                m.into_iter()
                    .map(|(k, v)| (k, serde_json::Value::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<&str> for DocumentNode {
    fn from(s: &str) -> Self {
        DocumentNode::String(s.to_string())
    }
}

impl From<String> for DocumentNode {
    fn from(s: String) -> Self {
        DocumentNode::String(s)
    }
}

impl From<bool> for DocumentNode {
    fn from(b: bool) -> Self {
        DocumentNode::Bool(b)
    }
}

impl From<i64> for DocumentNode {
    fn from(i: i64) -> Self {
        DocumentNode::Number(Number::from(i))
    }
}

impl From<Mapping> for DocumentNode {
    fn from(m: Mapping) -> Self {
        DocumentNode::Mapping(m)
    }
}

impl From<Vec<DocumentNode>> for DocumentNode {
    fn from(items: Vec<DocumentNode>) -> Self {
        DocumentNode::Sequence(items)
    }
}

/// Scalars render bare, compound nodes as compact JSON.
impl fmt::Display for DocumentNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentNode::Null => f.write_str("null"),
            DocumentNode::Bool(b) => write!(f, "{}", b),
            DocumentNode::Number(n) => write!(f, "{}", n),
            DocumentNode::String(s) => f.write_str(s),
            compound => {
                let json = serde_json::Value::from(compound.clone());
                write!(f, "{}", json)
            }
        }
    }
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────
