use std::collections::HashSet;

use serde::Serialize;

use crate::{
    composite::{Block, Struct},
    expression::{Expr, NameHook, RenderOptions},
    registry::Registry,
    traits::FieldContext,
    types::{Basic, Enum, FormatVersion, NativeTypes},
    utils,
};

/// Everything loaded from one schema document.
///
/// Read-only once `load` returns it.
#[derive(Debug, Clone, Serialize)]
pub struct Model {
    pub(crate) schema_version: String,
    #[serde(skip)]
    pub(crate) natives:        NativeTypes,
    pub(crate) versions:       Registry<FormatVersion>,
    pub(crate) basics:         Registry<Basic>,
    pub(crate) enums:          Registry<Enum>,
    pub(crate) flags:          Registry<Enum>,
    pub(crate) structs:        Registry<Struct>,
    pub(crate) blocks:         Registry<Block>,
}

impl Default for Model {
    fn default() -> Self {
        Model {
            schema_version: String::new(),
            natives:        NativeTypes::from([("TEMPLATE".to_string(), "T".to_string())]),
            versions:       Registry::new("version"),
            basics:         Registry::new("basic"),
            enums:          Registry::new("enum"),
            flags:          Registry::new("bitflags"),
            structs:        Registry::new("struct"),
            blocks:         Registry::new("niobject"),
        }
    }
}

impl Model {
    /// The `version` attribute of the document root.
    pub fn schema_version(&self) -> &str {
        &self.schema_version
    }

    /// Native names: the caller's overrides for basics, every enum and flag,
    /// and `TEMPLATE`.
    pub fn natives(&self) -> &NativeTypes {
        &self.natives
    }

    pub fn versions(&self) -> &Registry<FormatVersion> {
        &self.versions
    }

    pub fn basics(&self) -> &Registry<Basic> {
        &self.basics
    }

    pub fn enums(&self) -> &Registry<Enum> {
        &self.enums
    }

    pub fn flags(&self) -> &Registry<Enum> {
        &self.flags
    }

    pub fn structs(&self) -> &Registry<Struct> {
        &self.structs
    }

    pub fn blocks(&self) -> &Registry<Block> {
        &self.blocks
    }

    pub fn is_block(&self, name: &str) -> bool {
        self.blocks.contains(name)
    }

    /// Class identifier for a type name, honouring native names.
    pub fn class_name(&self, name: &str) -> String {
        match self.natives.get(name) {
            Some(native) => native.clone(),
            None => utils::class_name(name),
        }
    }

    /// Renders `expr` with block names emitted as type checks.
    pub fn render(&self, expr: &Expr, prefix: &str, brackets: bool, name_hook: Option<NameHook>) -> String {
        let is_type = |name: &str| self.is_block(name);
        expr.render(&RenderOptions {
            prefix,
            brackets,
            name_hook,
            is_type: Some(&is_type),
        })
    }

    /// Blocks that directly inherit `name`, in declaration order.
    pub fn children_of(&self, name: &str) -> Vec<&Block> {
        self.blocks
            .iter()
            .filter(|b| b.inherit.as_deref() == Some(name))
            .collect()
    }

    /// Names of the structs and blocks with a member of type `type_name`
    /// (structs first, each in declaration order).
    pub fn used_by(&self, type_name: &str) -> Vec<&str> {
        let uses = |members: &[crate::member::Member]| members.iter().any(|m| m.type_name == type_name);
        let structs = self
            .structs
            .iter()
            .filter(|s| uses(&s.members))
            .map(|s| s.info.name.as_str());
        let blocks = self.blocks.iter().filter(|b| uses(b.members())).map(Block::name);
        structs.chain(blocks).collect()
    }

    /// Evaluation context that answers type checks for an object of `block`.
    pub fn context_for<'a, C: FieldContext + ?Sized>(&'a self, block: &'a str, fields: &'a C) -> BlockContext<'a, C> {
        BlockContext { model: self, block, fields }
    }

    pub(crate) fn register_native(&mut self, name: &str) {
        let native = self.class_name(name);
        self.natives.insert(name.to_string(), native);
    }

    /// Turns field references that name a block into type references.
    pub(crate) fn resolve_type_refs(&mut self) {
        let block_names: HashSet<String> = self.blocks.names().iter().cloned().collect();
        let is_type = |name: &str| block_names.contains(name);

        for s in self.structs.values_mut() {
            for m in &mut s.members {
                m.resolve_type_refs(&is_type);
            }
        }
        for b in self.blocks.values_mut() {
            for m in &mut b.composite.members {
                m.resolve_type_refs(&is_type);
            }
        }
    }
}

/// Field values of one object plus its block type.
pub struct BlockContext<'a, C: ?Sized> {
    model:  &'a Model,
    block:  &'a str,
    fields: &'a C,
}

impl<C: FieldContext + ?Sized> FieldContext for BlockContext<'_, C> {
    fn field_value(&self, name: &str) -> Option<i64> {
        self.fields.field_value(name)
    }

    fn is_derived_type(&self, type_name: &str) -> Option<bool> {
        let block = self.model.blocks.get(self.block)?;
        Some(block.derives_from(type_name, &self.model.blocks))
    }
}
