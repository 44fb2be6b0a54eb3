use std::collections::HashMap;

use brine_nifxml_tree::Element;
use serde::Serialize;

use crate::{
    error::NifError,
    registry::Registry,
    traits::Named,
    utils::{option_name, quote},
    version::VersionOrdinal,
};

/// Caller supplied native type for a type name. `"Ref"` marks a link and `"*"`
/// a cross reference.
pub type NativeTypes = HashMap<String, String>;

pub const NATIVE_LINK: &str = "Ref";
pub const NATIVE_CROSSREF: &str = "*";

/// Text of the element, or `"Unknown."` for unnamed-looking `unk*` names.
pub(crate) fn describe(element: &Element, name: &str) -> String {
    match element.text() {
        Some(text) => text.trim().to_string(),
        None if name.to_lowercase().starts_with("unk") => "Unknown.".to_string(),
        None => String::new(),
    }
}

/// Parses a decimal or `0x` hexadecimal integer attribute.
pub(crate) fn parse_int(text: &str, what: &'static str) -> Result<i64, NifError> {
    let text = text.trim();
    let invalid = || NifError::InvalidValue { what, value: quote(text) };
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    let value = match digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
        Some(hex) => i64::from_str_radix(hex, 16).map_err(|_| invalid())?,
        None => digits.parse::<i64>().map_err(|_| invalid())?,
    };
    Ok(if negative { -value } else { value })
}

/// An entry of the format version table (`<version>`).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormatVersion {
    pub id:          String,
    pub num:         String,
    pub ordinal:     Option<VersionOrdinal>,
    pub description: String,
}

impl FormatVersion {
    pub fn from_element(element: &Element) -> Result<Self, NifError> {
        let num = element.attribute("num").to_string();
        Ok(FormatVersion {
            id: element.attribute("id").to_string(),
            ordinal: VersionOrdinal::pack_optional(&num)?,
            num,
            description: element.text().map(|t| t.trim().to_string()).unwrap_or_default(),
        })
    }
}

impl Named for FormatVersion {
    fn name(&self) -> &str {
        &self.id
    }
}

/// A primitive type (`<basic>`). Also the common header of every other type.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Basic {
    pub name:          String,
    pub description:   String,
    pub count:         String,
    pub is_template:   bool,
    pub native_type:   Option<String>,
    pub is_link:       bool,
    pub is_crossref:   bool,
    pub has_links:     bool,
    pub has_crossrefs: bool,
}

impl Basic {
    pub fn from_element(element: &Element, natives: &NativeTypes) -> Result<Self, NifError> {
        let name = element.attribute("name").to_string();
        let native_type = natives.get(&name).cloned();
        let is_link = native_type.as_deref() == Some(NATIVE_LINK);
        let is_crossref = native_type.as_deref() == Some(NATIVE_CROSSREF);
        Ok(Basic {
            description: describe(element, &name),
            count: element.attribute("count").to_string(),
            is_template: element.attribute("istemplate") == "1",
            native_type,
            is_link,
            is_crossref,
            has_links: is_link,
            has_crossrefs: is_crossref,
            name,
        })
    }
}

impl Named for Basic {
    fn name(&self) -> &str {
        &self.name
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnumOption {
    pub name:        String,
    /// Upper-case constant form of `name`.
    pub cname:       String,
    pub value:       i64,
    /// Bit position, set for bitflag options only.
    pub bit:         Option<i64>,
    pub description: String,
}

impl EnumOption {
    fn from_element(element: &Element, prefix: &str) -> Result<Self, NifError> {
        let mut name = element.attribute("name").to_string();
        if !prefix.is_empty() && element.has_attribute("name") {
            name = format!("{}_{}", prefix, name);
        }
        let raw = if element.has_attribute("bit") {
            element.attribute("bit")
        } else {
            element.attribute("value")
        };
        let description = match element.text() {
            Some(text) => text.trim().to_string(),
            None => name.clone(),
        };
        Ok(EnumOption {
            cname: option_name(&name),
            value: parse_int(raw, "option value")?,
            bit: None,
            description,
            name,
        })
    }
}

/// An enumeration (`<enum>`) or, with `is_flag`, a bitflag set (`<bitflags>`).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Enum {
    #[serde(flatten)]
    pub info:    Basic,
    /// Native name of the storage type.
    pub storage: String,
    pub prefix:  String,
    pub options: Vec<EnumOption>,
    pub is_flag: bool,
}

impl Enum {
    /// Builds an enum whose storage type must already be in `basics`.
    ///
    /// For bitflags every option's value becomes `1 << value` and the original
    /// value is kept in `bit`.
    pub fn from_element(
        element: &Element,
        natives: &NativeTypes,
        basics: &Registry<Basic>,
        native_name: String,
        is_flag: bool,
    ) -> Result<Self, NifError> {
        let mut info = Basic::from_element(element, natives)?;
        info.native_type = Some(native_name);

        let storage_name = element.attribute("storage");
        let storage = basics.get(storage_name).ok_or_else(|| NifError::UnresolvedType {
            what: "storage type",
            name: quote(storage_name),
        })?;
        let storage = storage.native_type.clone().unwrap_or_else(|| storage.name.clone());

        let prefix = element.attribute("prefix").to_string();
        let mut options = element
            .descendants_by_tag("option")
            .into_iter()
            .map(|o| EnumOption::from_element(o, &prefix))
            .collect::<Result<Vec<_>, _>>()?;

        if is_flag {
            for option in &mut options {
                let bit = option.value;
                if !(0..64).contains(&bit) {
                    return Err(NifError::InvalidValue {
                        what:  "flag bit",
                        value: quote(&bit.to_string()),
                    });
                }
                option.bit = Some(bit);
                option.value = 1 << bit;
            }
        }

        Ok(Enum { info, storage, prefix, options, is_flag })
    }

    pub fn option(&self, name: &str) -> Option<&EnumOption> {
        self.options.iter().find(|o| o.name == name)
    }
}

impl Named for Enum {
    fn name(&self) -> &str {
        &self.info.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn basics() -> Registry<Basic> {
        let mut reg = Registry::new("basic");
        let natives = NativeTypes::from([("uint".to_string(), "unsigned int".to_string())]);
        for name in ["uint", "ushort"] {
            reg.insert(Basic::from_element(&Element::new("basic").with_attribute("name", name), &natives).unwrap())
                .unwrap();
        }
        reg
    }

    #[test]
    fn test_basic_native_overrides() {
        let natives = NativeTypes::from([
            ("Ref".to_string(), NATIVE_LINK.to_string()),
            ("Ptr".to_string(), NATIVE_CROSSREF.to_string()),
        ]);
        let r = Basic::from_element(&Element::new("basic").with_attribute("name", "Ref").with_attribute("istemplate", "1"), &natives).unwrap();
        assert!(r.is_link && r.has_links && r.is_template);
        assert!(!r.is_crossref);

        let p = Basic::from_element(&Element::new("basic").with_attribute("name", "Ptr"), &natives).unwrap();
        assert!(p.is_crossref && p.has_crossrefs);

        let plain = Basic::from_element(&Element::new("basic").with_attribute("name", "unknown int"), &natives).unwrap();
        assert_eq!(plain.native_type, None);
        assert_eq!(plain.description, "Unknown.");
    }

    #[test]
    fn test_enum_storage_and_prefix() {
        let element = Element::new("enum")
            .with_attribute("name", "AlphaFormat")
            .with_attribute("storage", "uint")
            .with_attribute("prefix", "ALPHA")
            .with_text("How alpha is stored.")
            .with_child(Element::new("option").with_attribute("name", "NONE").with_attribute("value", "0"))
            .with_child(
                Element::new("option")
                    .with_attribute("name", "BINARY")
                    .with_attribute("value", "0x1")
                    .with_text("One bit alpha."),
            );
        let e = Enum::from_element(&element, &NativeTypes::new(), &basics(), "AlphaFormat".into(), false).unwrap();
        assert_eq!(e.storage, "unsigned int");
        assert_eq!(e.info.description, "How alpha is stored.");
        let names: Vec<_> = e.options.iter().map(|o| (o.name.as_str(), o.value)).collect();
        assert_eq!(names, vec![("ALPHA_NONE", 0), ("ALPHA_BINARY", 1)]);
        assert_eq!(e.options[0].description, "ALPHA_NONE");
        assert_eq!(e.options[1].description, "One bit alpha.");
        assert_eq!(e.options[1].cname, "ALPHA_BINARY");
    }

    #[test]
    fn test_flags_store_shifted_values() {
        let element = Element::new("bitflags")
            .with_attribute("name", "VertexAttribute")
            .with_attribute("storage", "ushort")
            .with_child(Element::new("option").with_attribute("name", "Vertex").with_attribute("bit", "0"))
            .with_child(Element::new("option").with_attribute("name", "UVs").with_attribute("bit", "1"))
            .with_child(Element::new("option").with_attribute("name", "Normals").with_attribute("value", "3"));
        let f = Enum::from_element(&element, &NativeTypes::new(), &basics(), "VertexAttribute".into(), true).unwrap();
        assert_eq!(f.storage, "ushort");
        let values: Vec<_> = f.options.iter().map(|o| (o.value, o.bit)).collect();
        assert_eq!(values, vec![(1, Some(0)), (2, Some(1)), (8, Some(3))]);
        assert_eq!(f.option("UVs").map(|o| o.value), Some(2));
    }

    #[test]
    fn test_flag_bit_range() {
        let flags = |bit: &str| {
            Element::new("bitflags")
                .with_attribute("name", "Wide")
                .with_attribute("storage", "uint")
                .with_child(Element::new("option").with_attribute("name", "Top").with_attribute("bit", bit))
        };
        let top = Enum::from_element(&flags("63"), &NativeTypes::new(), &basics(), "Wide".into(), true).unwrap();
        assert_eq!(top.options[0].value, i64::MIN);
        assert_eq!(top.options[0].bit, Some(63));

        for bit in ["64", "-1"] {
            let err = Enum::from_element(&flags(bit), &NativeTypes::new(), &basics(), "Wide".into(), true).unwrap_err();
            assert!(matches!(err, NifError::InvalidValue { what: "flag bit", .. }), "{:?}", err);
        }
    }

    #[test]
    fn test_unknown_storage_is_an_error() {
        let element = Element::new("enum").with_attribute("name", "E").with_attribute("storage", "float");
        let err = Enum::from_element(&element, &NativeTypes::new(), &basics(), "E".into(), false).unwrap_err();
        assert!(matches!(err, NifError::UnresolvedType { what: "storage type", .. }));
    }

    #[test]
    fn test_parse_int() {
        assert_eq!(parse_int("42", "x").unwrap(), 42);
        assert_eq!(parse_int("0x10", "x").unwrap(), 16);
        assert_eq!(parse_int("-3", "x").unwrap(), -3);
        assert!(parse_int("nope", "x").is_err());
    }

    #[test]
    fn test_version_entry() {
        let element = Element::new("version")
            .with_attribute("id", "V10_0_1_0")
            .with_attribute("num", "10.0.1.0")
            .with_text(" Morrowind ");
        let v = FormatVersion::from_element(&element).unwrap();
        assert_eq!(v.ordinal, Some(VersionOrdinal(0x0A00_0100)));
        assert_eq!(v.description, "Morrowind");
        assert_eq!(v.name(), "V10_0_1_0");
    }
}
