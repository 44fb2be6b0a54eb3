use brine_nifxml_tree::{read_document, Element};
use tracing::{error, info};

use crate::{
    error::NifError,
    model::Model,
    parser::parse_document,
    types::NativeTypes,
    utils::quote,
    verifier::verify_model,
    version::VersionOrdinal,
};

/// Oldest schema document version that can be loaded.
pub const MIN_SCHEMA_VERSION: &str = "0.9.1.0";

/// Loads a document tree into a validated `Model`.
///
/// `natives` maps basic type names to native types. Returns
/// `Err(NifError::UnsupportedSchemaVersion)` without reading any definition
/// when the root's `version` is missing or older than `MIN_SCHEMA_VERSION`.
pub fn load(root: &Element, natives: &NativeTypes) -> Result<Model, NifError> {
    check_schema_version(root.attribute("version"))?;

    let mut model = parse_document(root, natives)?;
    model.resolve_type_refs();
    verify_model(&model)?;

    info!(
        "Loaded schema {}: {} basics, {} enums, {} bitflags, {} structs, {} blocks",
        model.schema_version(),
        model.basics().len(),
        model.enums().len(),
        model.flags().len(),
        model.structs().len(),
        model.blocks().len()
    );
    Ok(model)
}

/// Reads `text` as XML and loads it.
pub fn load_str(text: &str, natives: &NativeTypes) -> Result<Model, NifError> {
    let root = read_document(text)?;
    load(&root, natives)
}

fn check_schema_version(found: &str) -> Result<(), NifError> {
    let unsupported = || {
        error!("Schema version {} is not supported", quote(found));
        NifError::UnsupportedSchemaVersion {
            found:   quote(found),
            minimum: MIN_SCHEMA_VERSION.to_string(),
        }
    };

    let minimum = VersionOrdinal::pack(MIN_SCHEMA_VERSION)?;
    match VersionOrdinal::pack(found) {
        Ok(version) if version >= minimum => Ok(()),
        _ => Err(unsupported()),
    }
}
