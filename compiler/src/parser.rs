use brine_nifxml_tree::Element;
use tracing::debug;

use crate::{
    composite::{Block, Struct},
    error::NifError,
    model::Model,
    types::{Basic, Enum, FormatVersion, NativeTypes},
};

/// Fills the registries of a new model from the document rooted at `root`.
///
/// Categories are read in dependency order (versions, basics, enums, bitflags,
/// structs, blocks) so that each definition only refers to earlier ones.
pub fn parse_document(root: &Element, natives: &NativeTypes) -> Result<Model, NifError> {
    let mut model = Model {
        schema_version: root.attribute("version").to_string(),
        ..Model::default()
    };

    for element in root.descendants_by_tag("version") {
        model.versions.insert(FormatVersion::from_element(element)?)?;
    }
    debug!("Read {} version entries", model.versions.len());

    for element in root.descendants_by_tag("basic") {
        let basic = Basic::from_element(element, natives)?;
        if let Some(native) = &basic.native_type {
            model.natives.insert(basic.name.clone(), native.clone());
        }
        model.basics.insert(basic)?;
    }
    debug!("Read {} basic types", model.basics.len());

    for element in root.descendants_by_tag("enum") {
        let name = element.attribute("name");
        let e = Enum::from_element(element, natives, &model.basics, model.class_name(name), false)?;
        model.enums.insert(e)?;
        model.register_native(name);
    }
    debug!("Read {} enums", model.enums.len());

    for element in root.descendants_by_tag("bitflags") {
        let name = element.attribute("name");
        let f = Enum::from_element(element, natives, &model.basics, model.class_name(name), true)?;
        model.flags.insert(f)?;
        model.register_native(name);
    }
    debug!("Read {} bitflags", model.flags.len());

    for element in root.descendants_by_tag("struct") {
        let s = Struct::from_element(element, natives, &model)?;
        model.structs.insert(s)?;
    }
    debug!("Read {} structs", model.structs.len());

    for element in root.descendants_by_tag("niobject") {
        let b = Block::from_element(element, natives, &model)?;
        model.blocks.insert(b)?;
    }
    debug!("Read {} blocks", model.blocks.len());

    Ok(model)
}
