use std::collections::HashSet;

use brine_nifxml_tree::Element;
use serde::Serialize;
use tracing::warn;

use crate::{
    error::NifError,
    member::{Member, Sibling},
    model::Model,
    registry::Registry,
    traits::Named,
    types::{Basic, NativeTypes},
    utils::quote,
    version::VersionOrdinal,
};

/// A compound type (`<struct>`).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Struct {
    #[serde(flatten)]
    pub info:          Basic,
    pub members:       Vec<Member>,
    pub uses_argument: bool,
}

impl Struct {
    /// Builds the struct and its members from the `<add>` children of
    /// `element`. Member types are looked up in the registries of `model`.
    pub fn from_element(element: &Element, natives: &NativeTypes, model: &Model) -> Result<Self, NifError> {
        let mut composite = Struct {
            info:          Basic::from_element(element, natives)?,
            members:       Vec::new(),
            uses_argument: false,
        };

        let siblings = Sibling::all_of(element)?;
        for (index, child) in element.children().iter().enumerate() {
            if child.tag() != "add" {
                continue;
            }
            let member = Member::from_element(child, &siblings, index, model)?;
            if !composite.add_member(member, model) {
                warn!(
                    "Skipping repeated member {} in {}",
                    quote(child.attribute("name")),
                    quote(&composite.info.name)
                );
            }
        }
        composite.link_duplicates();
        Ok(composite)
    }

    /// Appends `member` unless an identical declaration is already present.
    ///
    /// Returns whether the member was kept. Link and cross reference flags are
    /// inherited from the member's type, looked up as a basic first and then as
    /// a struct.
    pub fn add_member(&mut self, member: Member, model: &Model) -> bool {
        if self.members.iter().any(|m| m.same_declaration(&member)) {
            return false;
        }

        self.uses_argument |= member.uses_argument;

        let member_type = model
            .basics()
            .get(&member.type_name)
            .or_else(|| model.structs().get(&member.type_name).map(|s| &s.info));
        if let Some(t) = member_type {
            self.info.has_links |= t.has_links;
            self.info.has_crossrefs |= t.has_crossrefs;
        }

        self.members.push(member);
        true
    }

    /// Points every member at the next later member with the same name.
    pub fn link_duplicates(&mut self) {
        for i in 0..self.members.len() {
            let name = &self.members[i].name;
            let next = self.members[i + 1..]
                .iter()
                .position(|m| &m.name == name)
                .map(|offset| i + 1 + offset);
            self.members[i].next_duplicate = next;
        }
    }

    pub fn find_member(&self, name: &str) -> Option<&Member> {
        self.members.iter().find(|m| m.name == name)
    }

    /// First member whose length or width is given by the field `name`.
    pub fn find_first_ref(&self, name: &str) -> Option<&Member> {
        let name = Some(name);
        self.members
            .iter()
            .find(|m| m.length.left_name() == name || m.width.left_name() == name)
    }

    /// The member after `members[index]` that shares its name.
    pub fn next_duplicate(&self, index: usize) -> Option<&Member> {
        self.members
            .get(index)
            .and_then(|m| m.next_duplicate)
            .and_then(|next| self.members.get(next))
    }

    /// True if a member is an array or has a struct type that (recursively)
    /// contains one.
    pub fn has_array(&self, structs: &Registry<Struct>) -> bool {
        self.has_array_visiting(structs, &mut HashSet::new())
    }

    fn has_array_visiting<'a>(&'a self, structs: &'a Registry<Struct>, seen: &mut HashSet<&'a str>) -> bool {
        if !seen.insert(&self.info.name) {
            return false;
        }
        self.members.iter().any(|m| {
            m.is_array()
                || structs
                    .get(&m.type_name)
                    .is_some_and(|s| s.has_array_visiting(structs, seen))
        })
    }

    /// Members that can still be present in files of version `min` or later.
    pub fn members_since(&self, min: VersionOrdinal) -> impl Iterator<Item = &Member> {
        self.members
            .iter()
            .filter(move |m| m.until.map_or(true, |until| until >= min))
    }
}

impl Named for Struct {
    fn name(&self) -> &str {
        &self.info.name
    }
}

/// An object type (`<niobject>`), optionally inheriting another block.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Block {
    #[serde(flatten)]
    pub composite:     Struct,
    pub inherit:       Option<String>,
    pub is_ancestor:   bool,
    pub has_interface: bool,
}

impl Block {
    /// The parent named by `inherit` must already be in the block registry.
    pub fn from_element(element: &Element, natives: &NativeTypes, model: &Model) -> Result<Self, NifError> {
        let composite = Struct::from_element(element, natives, model)?;

        let inherit = match element.attribute("inherit") {
            "" => None,
            parent if model.blocks().contains(parent) => Some(parent.to_string()),
            parent => {
                return Err(NifError::UnresolvedType {
                    what: "parent block",
                    name: quote(parent),
                })
            }
        };

        Ok(Block {
            composite,
            inherit,
            is_ancestor: element.attribute("abstract") == "1",
            has_interface: !element.descendants_by_tag("interface").is_empty(),
        })
    }

    pub fn name(&self) -> &str {
        &self.composite.info.name
    }

    pub fn members(&self) -> &[Member] {
        &self.composite.members
    }

    pub fn parent<'a>(&self, blocks: &'a Registry<Block>) -> Option<&'a Block> {
        self.inherit.as_deref().and_then(|name| blocks.get(name))
    }

    /// Looks in this block and, with `inherited`, up the parent chain.
    pub fn find_member<'a>(&'a self, name: &str, inherited: bool, blocks: &'a Registry<Block>) -> Option<&'a Member> {
        if !inherited {
            return self.composite.find_member(name);
        }
        self.ancestors(blocks)
            .into_iter()
            .find_map(|b| b.composite.find_member(name))
    }

    /// Like `Struct::find_first_ref`, but a match in a parent wins.
    pub fn find_first_ref<'a>(&'a self, name: &str, blocks: &'a Registry<Block>) -> Option<&'a Member> {
        self.ancestors(blocks)
            .into_iter()
            .rev()
            .find_map(|b| b.composite.find_first_ref(name))
    }

    /// This block followed by its parent, grandparent and so on up to the root.
    pub fn ancestors<'a>(&'a self, blocks: &'a Registry<Block>) -> Vec<&'a Block> {
        let mut chain = vec![self];
        let mut current = self;
        while let Some(parent) = current.parent(blocks) {
            // Parents are registered before children, so this only guards
            // against a hand-built registry.
            if chain.iter().any(|b| b.name() == parent.name()) {
                break;
            }
            chain.push(parent);
            current = parent;
        }
        chain
    }

    /// Whether this block is `type_name` or inherits from it.
    pub fn derives_from(&self, type_name: &str, blocks: &Registry<Block>) -> bool {
        self.ancestors(blocks).iter().any(|b| b.name() == type_name)
    }
}

impl Named for Block {
    fn name(&self) -> &str {
        Block::name(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NATIVE_LINK;
    use pretty_assertions::assert_eq;

    fn add(name: &str, type_name: &str) -> Element {
        Element::new("add").with_attribute("name", name).with_attribute("type", type_name)
    }

    fn model() -> Model {
        let natives = NativeTypes::from([("Ref".to_string(), NATIVE_LINK.to_string())]);
        let mut model = Model::default();
        for name in ["int", "Ref"] {
            let basic = Basic::from_element(&Element::new("basic").with_attribute("name", name), &natives).unwrap();
            model.basics.insert(basic).unwrap();
        }
        model
    }

    fn block(name: &str, inherit: &str, members: &[&str]) -> Element {
        let el = Element::new("niobject").with_attribute("name", name).with_attribute("inherit", inherit);
        members.iter().fold(el, |el, m| el.with_child(add(m, "int")))
    }

    #[test]
    fn test_identical_members_are_kept_once() {
        let model = model();
        let element = Element::new("struct")
            .with_attribute("name", "Pair")
            .with_child(add("A", "int"))
            .with_child(add("A", "int"));
        let s = Struct::from_element(&element, &NativeTypes::new(), &model).unwrap();
        assert_eq!(s.members.len(), 1);
    }

    #[test]
    fn test_duplicate_chain() {
        let model = model();
        let element = Element::new("struct")
            .with_attribute("name", "S")
            .with_child(add("A", "int").with_attribute("until", "4.0.0.2"))
            .with_child(add("B", "int"))
            .with_child(add("A", "int").with_attribute("since", "4.1.0.0"))
            .with_child(add("A", "int").with_attribute("since", "10.0.0.0"));
        let s = Struct::from_element(&element, &NativeTypes::new(), &model).unwrap();
        let chain: Vec<_> = s.members.iter().map(|m| m.next_duplicate).collect();
        assert_eq!(chain, vec![Some(2), None, Some(3), None]);
        assert_eq!(s.next_duplicate(0).map(|m| m.since_text.as_str()), Some("4.1.0.0"));

        let recent: Vec<_> = s
            .members_since(VersionOrdinal::pack("10.0.0.0").unwrap())
            .map(|m| m.name.as_str())
            .collect();
        assert_eq!(recent, vec!["B", "A", "A"]);
    }

    #[test]
    fn test_links_argument_and_refs() {
        let mut model = model();
        let inner = Element::new("struct")
            .with_attribute("name", "Inner")
            .with_child(add("Target", "Ref"))
            .with_child(add("Data", "int").with_attribute("length", "3"));
        let inner = Struct::from_element(&inner, &NativeTypes::new(), &model).unwrap();
        assert!(inner.info.has_links);
        model.structs.insert(inner).unwrap();

        let outer = Element::new("struct")
            .with_attribute("name", "Outer")
            .with_child(add("Num", "int"))
            .with_child(add("Items", "Inner").with_attribute("length", "Num"))
            .with_child(add("Extra", "int").with_attribute("cond", "ARG"));
        let outer = Struct::from_element(&outer, &NativeTypes::new(), &model).unwrap();
        assert!(outer.info.has_links);
        assert!(outer.uses_argument);
        assert_eq!(outer.find_first_ref("Num").map(|m| m.name.as_str()), Some("Items"));
        assert!(outer.find_first_ref("Extra").is_none());
        assert!(outer.has_array(model.structs()));

        let flat = Element::new("struct").with_attribute("name", "Flat").with_child(add("X", "int"));
        let flat = Struct::from_element(&flat, &NativeTypes::new(), &model).unwrap();
        assert!(!flat.has_array(model.structs()));
        assert!(!flat.uses_argument);
    }

    #[test]
    fn test_has_array_through_nested_struct() {
        let mut model = model();
        let leaf = Element::new("struct")
            .with_attribute("name", "Leaf")
            .with_child(add("V", "int").with_attribute("length", "2"));
        model.structs.insert(Struct::from_element(&leaf, &NativeTypes::new(), &model).unwrap()).unwrap();
        let mid = Element::new("struct").with_attribute("name", "Mid").with_child(add("L", "Leaf"));
        let mid = Struct::from_element(&mid, &NativeTypes::new(), &model).unwrap();
        assert!(mid.has_array(model.structs()));
    }

    #[test]
    fn test_block_inheritance() {
        let mut model = model();
        let root = Block::from_element(&block("Root", "", &["f"]).with_attribute("abstract", "1"), &NativeTypes::new(), &model).unwrap();
        model.blocks.insert(root).unwrap();
        let mid = Block::from_element(&block("Mid", "Root", &["g"]), &NativeTypes::new(), &model).unwrap();
        model.blocks.insert(mid).unwrap();
        let leaf = Block::from_element(
            &block("Leaf", "Mid", &["h"]).with_child(Element::new("interface").with_attribute("name", "I")),
            &NativeTypes::new(),
            &model,
        )
        .unwrap();
        model.blocks.insert(leaf).unwrap();

        let blocks = model.blocks();
        let leaf = blocks.get("Leaf").unwrap();
        let names: Vec<_> = leaf.ancestors(blocks).iter().map(|b| b.name()).collect();
        assert_eq!(names, vec!["Leaf", "Mid", "Root"]);
        assert!(leaf.find_member("f", true, blocks).is_some());
        assert!(leaf.find_member("f", false, blocks).is_none());
        assert!(leaf.has_interface);
        assert!(blocks.get("Root").unwrap().is_ancestor);
        assert!(leaf.derives_from("Root", blocks));
        assert!(!blocks.get("Mid").unwrap().derives_from("Leaf", blocks));
    }

    #[test]
    fn test_parent_ref_wins() {
        let mut model = model();
        let root = Element::new("niobject")
            .with_attribute("name", "Root")
            .with_child(add("N", "int"))
            .with_child(add("RootData", "int").with_attribute("length", "N"));
        model.blocks.insert(Block::from_element(&root, &NativeTypes::new(), &model).unwrap()).unwrap();
        let child = Element::new("niobject")
            .with_attribute("name", "Child")
            .with_attribute("inherit", "Root")
            .with_child(add("N", "int"))
            .with_child(add("ChildData", "int").with_attribute("width", "N"));
        let child = Block::from_element(&child, &NativeTypes::new(), &model).unwrap();
        let found = child.find_first_ref("N", model.blocks()).map(|m| m.name.as_str());
        assert_eq!(found, Some("RootData"));
    }

    #[test]
    fn test_unknown_parent_is_an_error() {
        let model = model();
        let err = Block::from_element(&block("Orphan", "Missing", &[]), &NativeTypes::new(), &model).unwrap_err();
        assert!(matches!(err, NifError::UnresolvedType { what: "parent block", .. }));
    }

    #[test]
    fn test_lookups_stop_on_inheritance_cycle() {
        let model = model();
        let mut blocks = Registry::new("niobject");
        for (name, parent) in [("A", "B"), ("B", "A")] {
            let mut b = Block::from_element(&block(name, "", &["x"]), &NativeTypes::new(), &model).unwrap();
            b.composite.members[0].name = format!("{}_field", name);
            b.inherit = Some(parent.to_string());
            blocks.insert(b).unwrap();
        }
        let a = blocks.get("A").unwrap();
        let names: Vec<_> = a.ancestors(&blocks).iter().map(|b| b.name()).collect();
        assert_eq!(names, vec!["A", "B"]);
        assert!(a.find_member("B_field", true, &blocks).is_some());
        assert!(a.find_member("missing", true, &blocks).is_none());
        assert!(a.find_first_ref("missing", &blocks).is_none());
    }
}
