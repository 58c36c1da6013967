pub(crate) mod doc;
pub(crate) mod read;
pub(crate) mod roundtrip;

use std::path::Path;
use std::process;

use yoml_core::{DocumentNode, Yoml};
use yoml_interchange::{Catalog, Format};

use crate::{report_error, OutputFormat};

/// Load a catalog and build the engine, exiting with status 1 on failure.
pub(crate) fn load_engine(path: &Path, output: OutputFormat, quiet: bool) -> Yoml {
    let text = read_file(path, output, quiet);
    let catalog: Catalog = match Format::from_path(path).parse(&text) {
        Ok(c) => c,
        Err(e) => fail(&format!("error parsing catalog '{}': {}", path.display(), e), output, quiet),
    };
    let types = catalog.types.len();
    match catalog.into_engine() {
        Ok(engine) => {
            tracing::debug!(catalog = %path.display(), types, "loaded catalog");
            engine
        }
        Err(e) => fail(&format!("invalid catalog '{}': {}", path.display(), e), output, quiet),
    }
}

/// Load a document, exiting with status 1 on failure.
pub(crate) fn load_document(path: &Path, output: OutputFormat, quiet: bool) -> DocumentNode {
    let text = read_file(path, output, quiet);
    match yoml_interchange::parse_document(&text, Format::from_path(path)) {
        Ok(node) => node,
        Err(e) => fail(&format!("error parsing '{}': {}", path.display(), e), output, quiet),
    }
}

fn read_file(path: &Path, output: OutputFormat, quiet: bool) -> String {
    match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => fail(&format!("error reading file '{}': {}", path.display(), e), output, quiet),
    }
}

pub(crate) fn fail(msg: &str, output: OutputFormat, quiet: bool) -> ! {
    report_error(msg, output, quiet);
    process::exit(1);
}
