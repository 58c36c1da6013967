//! Key equivalence under name mangling.
//!
//! `shape-name`, `shape_name`, `ShapeName` and `shapeName` are all the same
//! key: separators (`-`, `_`) are dropped and case is ignored.

/// Canonical mangled form of a key.
pub fn mangle(key: &str) -> String {
    key.chars()
        .filter(|c| *c != '-' && *c != '_')
        .flat_map(char::to_lowercase)
        .collect()
}

/// True if two keys are equal after mangling. `None` only matches `None`.
pub fn mangle_match(a: Option<&str>, b: Option<&str>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => a == b || mangle(a) == mangle(b),
        _ => false,
    }
}

/// Convenience for the common case of two present keys.
pub fn keys_match(a: &str, b: &str) -> bool {
    mangle_match(Some(a), Some(b))
}
