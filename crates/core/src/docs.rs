//! Type documentation assembled from serializer fragments.

use serde::Serialize;
use std::fmt;

/// What one serializer says about the syntax of a type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocFragment {
    pub serializer: String,
    pub text: String,
}

/// The accepted document syntax for one type, one fragment per serializer
/// that had something to say, in consultation order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypeDocumentation {
    pub type_name: String,
    pub fragments: Vec<DocFragment>,
}

impl TypeDocumentation {
    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }
}

/// Markdown: a heading, then one bullet per fragment.
impl fmt::Display for TypeDocumentation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "# {}", self.type_name)?;
        if self.fragments.is_empty() {
            writeln!(f)?;
            return writeln!(f, "No documented syntax.");
        }
        writeln!(f)?;
        for fragment in &self.fragments {
            writeln!(f, "- **{}**: {}", fragment.serializer, fragment.text)?;
        }
        Ok(())
    }
}
