//! Composite type names: `Base<Sub1,Sub2,...>`.
//!
//! Parsing never panics. Malformed input comes back as a [`GenericsError`]
//! and the caller decides what to do with it.

use std::fmt;

/// A parsed type name: base plus ordered sub-type names.
///
/// Sub-types are kept as strings; nested generics such as
/// `map<string,list<int>>` parse one level at a time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenericType {
    pub base: String,
    pub sub_types: Vec<String>,
}

impl GenericType {
    pub fn is_generic(&self) -> bool {
        !self.sub_types.is_empty()
    }

    pub fn sub_type(&self, index: usize) -> Option<&str> {
        self.sub_types.get(index).map(String::as_str)
    }
}

impl fmt::Display for GenericType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.sub_types.is_empty() {
            f.write_str(&self.base)
        } else {
            write!(f, "{}<{}>", self.base, self.sub_types.join(","))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenericsError {
    #[error("unbalanced angle brackets")]
    Unbalanced,
    #[error("empty type parameter at position {0}")]
    EmptyElement(usize),
    #[error("missing base type")]
    MissingBase,
    #[error("unexpected text after closing bracket: '{0}'")]
    TrailingText(String),
}

/// Parse a possibly-composite type name.
pub fn parse_generic_type(name: &str) -> Result<GenericType, GenericsError> {
    let name = name.trim();
    let Some(open) = name.find('<') else {
        if name.contains('>') {
            return Err(GenericsError::Unbalanced);
        }
        return Ok(GenericType {
            base: name.to_string(),
            sub_types: Vec::new(),
        });
    };

    let base = name[..open].trim();
    if base.is_empty() {
        return Err(GenericsError::MissingBase);
    }

    let mut depth = 0usize;
    let mut close = None;
    for (i, c) in name.char_indices().skip_while(|(i, _)| *i < open) {
        match c {
            '<' => depth += 1,
            '>' => {
                depth = depth.checked_sub(1).ok_or(GenericsError::Unbalanced)?;
                if depth == 0 {
                    close = Some(i);
                    break;
                }
            }
            _ => {}
        }
    }
    let close = close.ok_or(GenericsError::Unbalanced)?;
    let trailing = name[close + 1..].trim();
    if !trailing.is_empty() {
        return Err(GenericsError::TrailingText(trailing.to_string()));
    }

    let sub_types = split_top_level(&name[open + 1..close])?;
    Ok(GenericType {
        base: base.to_string(),
        sub_types,
    })
}

/// Split on commas that are not nested inside brackets.
fn split_top_level(inner: &str) -> Result<Vec<String>, GenericsError> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in inner.char_indices() {
        match c {
            '<' => depth += 1,
            '>' => depth = depth.checked_sub(1).ok_or(GenericsError::Unbalanced)?,
            ',' if depth == 0 => {
                parts.push(element(&inner[start..i], parts.len())?);
                start = i + 1;
            }
            _ => {}
        }
    }
    if depth != 0 {
        return Err(GenericsError::Unbalanced);
    }
    parts.push(element(&inner[start..], parts.len())?);
    Ok(parts)
}

fn element(raw: &str, position: usize) -> Result<String, GenericsError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(GenericsError::EmptyElement(position));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_name_has_no_sub_types() {
        let g = parse_generic_type("shape").unwrap();
        assert_eq!(g.base, "shape");
        assert!(!g.is_generic());
    }

    #[test]
    fn splits_and_trims() {
        let g = parse_generic_type("map< string , int >").unwrap();
        assert_eq!(g.base, "map");
        assert_eq!(g.sub_types, vec!["string", "int"]);
    }

    #[test]
    fn nested_generics_stay_whole() {
        let g = parse_generic_type("map<string,list<map<string,int>>>").unwrap();
        assert_eq!(g.sub_types, vec!["string", "list<map<string,int>>"]);
        let inner = parse_generic_type(g.sub_type(1).unwrap()).unwrap();
        assert_eq!(inner.sub_types, vec!["map<string,int>"]);
    }

    #[test]
    fn malformed_names_are_errors() {
        assert_eq!(parse_generic_type("list<int"), Err(GenericsError::Unbalanced));
        assert_eq!(parse_generic_type("list<int>>"), Err(GenericsError::TrailingText(">".into())));
        assert_eq!(parse_generic_type("int>"), Err(GenericsError::Unbalanced));
        assert_eq!(parse_generic_type("map<string,,int>"), Err(GenericsError::EmptyElement(1)));
        assert_eq!(parse_generic_type("list<>"), Err(GenericsError::EmptyElement(0)));
        assert_eq!(parse_generic_type("<int>"), Err(GenericsError::MissingBase));
    }

    #[test]
    fn display_round_trips() {
        let g = parse_generic_type("map<string, list<int>>").unwrap();
        assert_eq!(g.to_string(), "map<string,list<int>>");
    }
}
