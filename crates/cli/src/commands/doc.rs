use std::path::Path;

use super::{fail, load_engine};
use crate::OutputFormat;

pub(crate) fn cmd_doc(catalog: &Path, type_name: &str, output: OutputFormat, quiet: bool) {
    let engine = load_engine(catalog, output, quiet);
    let docs = match engine.document(type_name) {
        Ok(d) => d,
        Err(e) => fail(&format!("cannot document '{}': {}", type_name, e), output, quiet),
    };
    match output {
        OutputFormat::Text => print!("{}", docs),
        OutputFormat::Json => match serde_json::to_string_pretty(&docs) {
            Ok(pretty) => println!("{}", pretty),
            Err(e) => fail(&format!("serialization error: {}", e), output, quiet),
        },
    }
}
