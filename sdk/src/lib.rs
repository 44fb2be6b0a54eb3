//! brine-nifxml
//!
//! This crate is the entry point for working with nif.xml schema documents.
//!
//! - `load_file` reads and loads a schema from disk into a `Model`
//! - JSON helpers for the model and for native type tables
//! - Re-exports of the compiler's model, expression and error types

use std::{collections::BTreeMap, fs, path::Path};

pub use brine_nifxml_compiler::{
    load, load_str, Block, Enum, Expr, FieldContext, Member, Model, NativeTypes, NifError, RenderOptions,
    Struct, VersionOrdinal,
};
pub use brine_nifxml_tree::{read_document, Element};

/// Reads the schema at `path` and loads it with the given native types.
pub fn load_file(path: impl AsRef<Path>, natives: &NativeTypes) -> Result<Model, NifError> {
    let text = fs::read_to_string(path)?;
    load_str(&text, natives)
}

/// The model as pretty-printed JSON.
pub fn model_to_json(model: &Model) -> Result<String, NifError> {
    Ok(serde_json::to_string_pretty(model)?)
}

/// Parses a JSON object of `type name -> native type` pairs.
pub fn natives_from_json(text: &str) -> Result<NativeTypes, NifError> {
    let table: BTreeMap<String, String> = serde_json::from_str(text)?;
    Ok(table.into_iter().collect())
}

pub mod expression {
    pub use brine_nifxml_compiler::expression::{classify_terminal, Expr, NameHook, RenderOptions, Terminal};
    pub use brine_nifxml_compiler::tokenizer::{partition, scan_brackets, Operator, Partition};
}

pub mod naming {
    pub use brine_nifxml_compiler::utils::{class_name, define_name, member_name, option_name};
}

pub mod error {
    pub use brine_nifxml_compiler::error::NifError;
}
