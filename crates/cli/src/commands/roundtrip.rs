use std::path::Path;

use yoml_interchange::Format;

use super::{fail, load_document, load_engine};
use crate::OutputFormat;

/// Read a document and write the value back with the same expected type.
/// Text output is YAML, JSON output is JSON.
pub(crate) fn cmd_roundtrip(
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
    let written = match engine.write(&value, type_name) {
        Ok(n) => n,
        Err(e) => fail(&format!("write failed: {}", e), output, quiet),
    };

    let format = match output {
        OutputFormat::Text => Format::Yaml,
        OutputFormat::Json => Format::Json,
    };
    match format.render(&written) {
        Ok(text) => println!("{}", text.trim_end()),
        Err(e) => fail(&format!("serialization error: {}", e), output, quiet),
    }
}
