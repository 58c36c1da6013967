use std::path::Path;

use super::{fail, load_document, load_engine};
use crate::OutputFormat;

/// Print the value a document reads as, in JSON. Objects carry their type
/// under `$type`.
pub(crate) fn cmd_read(
    catalog: &Path,
    document: &Path,
    type_name: Option<&str>,
    output: OutputFormat,
    quiet: bool,
) {
    let engine = load_engine(catalog, output, quiet);
    let node = load_document(document, output, quiet);

    let value = match engine.read(node, type_name) {
        Ok(v) => v,
        Err(e) => fail(&format!("read failed: {}", e), output, quiet),
    };
    match serde_json::to_string_pretty(&value) {
        Ok(pretty) => println!("{}", pretty),
        Err(e) => fail(&format!("serialization error: {}", e), output, quiet),
    }
}
