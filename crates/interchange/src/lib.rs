//! yoml-interchange: type catalogs for the conversion engine.
//!
//! A catalog is a JSON or YAML file declaring types, their attributes,
//! supertypes, construction paths, serializers and document definitions.
//! [`Catalog::into_engine`] turns one into a ready [`yoml_core::Yoml`].
//!
//! This crate holds everything format-specific so that `yoml-core` only
//! ever sees parsed documents.

pub mod deserialize;
pub mod format;
pub mod types;

pub use deserialize::CatalogError;
pub use format::{parse_document, Format};
pub use types::*;
