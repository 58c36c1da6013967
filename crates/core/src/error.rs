//! Conversion errors.
//!
//! Every error raised during a read or write carries the structural path of
//! the node being converted (`shape.fields.color`, `items[2]`), so a caller
//! can point at the offending document location.

use std::error::Error as StdError;
use std::fmt;

/// Boxed underlying cause, e.g. a constructor failure.
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// What went wrong.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConvertErrorKind {
    /// Two or more document keys match the same field.
    #[error("ambiguous keys for field '{field}': {} (values {})", .keys.join(", "), .values.join(", "))]
    AmbiguousKeys {
        field: String,
        keys: Vec<String>,
        values: Vec<String>,
    },

    /// Two serializers both claimed to have completed the same node.
    #[error("ambiguous completion: both '{first}' and '{second}' completed the conversion")]
    AmbiguousCompletion { first: String, second: String },

    /// Required fields were never supplied.
    #[error("Missing one or more explicitly required fields: {}", .fields.join(", "))]
    MissingRequired { fields: Vec<String> },

    /// No serializer could resolve the named type.
    #[error("cannot resolve type '{type_name}'")]
    UnresolvedType { type_name: String },

    /// A composite type name is not well formed.
    #[error("malformed type name '{type_name}': {reason}")]
    MalformedType { type_name: String, reason: String },

    /// Mapping entries were left over after every serializer had its turn.
    #[error("unexpected keys {} in {remaining}", .keys.join(", "))]
    UnconsumedKeys { keys: Vec<String>, remaining: String },

    /// Instantiation of a resolved type failed.
    #[error("cannot construct '{type_name}'")]
    Construction { type_name: String },

    /// The document or value does not fit the expected type.
    #[error("{0}")]
    InvalidValue(String),

    /// The phase queue was exhausted without producing a result.
    #[error("cannot convert {what}: no serializer produced a result")]
    Incomplete { what: String },
}

/// A conversion failure with its structural path and optional cause.
#[derive(Debug)]
pub struct ConvertError {
    pub path: String,
    pub kind: ConvertErrorKind,
    pub cause: Option<BoxError>,
}

impl ConvertError {
    pub fn new(path: impl Into<String>, kind: ConvertErrorKind) -> Self {
        ConvertError {
            path: path.into(),
            kind,
            cause: None,
        }
    }

    pub fn with_cause(mut self, cause: impl Into<BoxError>) -> Self {
        self.cause = Some(cause.into());
        self
    }

    pub fn invalid(path: impl Into<String>, message: impl Into<String>) -> Self {
        ConvertError::new(path, ConvertErrorKind::InvalidValue(message.into()))
    }

    pub fn kind(&self) -> &ConvertErrorKind {
        &self.kind
    }
}

impl fmt::Display for ConvertError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "{} (at root)", self.kind)?;
        } else {
            write!(f, "{} (at {})", self.kind, self.path)?;
        }
        if let Some(cause) = &self.cause {
            write!(f, ": {}", cause)?;
        }
        Ok(())
    }
}

impl StdError for ConvertError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.cause
            .as_ref()
            .map(|c| c.as_ref() as &(dyn StdError + 'static))
    }
}
