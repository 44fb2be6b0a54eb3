use brine_nifxml_tree::Element;
use serde::Serialize;

use crate::{
    error::NifError,
    expression::Expr,
    model::Model,
    types::describe,
    utils::{member_name, quote, ARGUMENT},
    version::VersionOrdinal,
};

const INTEGER_TYPES: [&str; 6] = ["unsigned int", "unsigned short", "byte", "int", "short", "char"];
const REFERENCE_TYPES: [&str; 2] = ["Ref", "Ptr"];
const STRING_TYPES: [&str; 2] = ["string", "IndexString"];
const VERBATIM_DEFAULT_TYPES: [&str; 4] = ["Ref", "Ptr", "bool", "Vector3"];

/// The parts of a sibling element that dependency analysis looks at.
///
/// Built once per composite for every element child, in document order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sibling {
    pub name:   String,
    pub suffix: String,
    pub length: Expr,
    pub width:  Expr,
    pub cond:   Expr,
}

impl Sibling {
    pub fn from_element(element: &Element) -> Result<Self, NifError> {
        Ok(Sibling {
            name:   element.attribute("name").to_string(),
            suffix: element.attribute("suffix").to_string(),
            length: Expr::parse(element.attribute("length"))?,
            width:  Expr::parse(element.attribute("width"))?,
            cond:   Expr::parse(element.attribute("cond"))?,
        })
    }

    /// Siblings for every element child of `parent`.
    pub fn all_of(parent: &Element) -> Result<Vec<Sibling>, NifError> {
        parent.children().iter().map(Sibling::from_element).collect()
    }
}

/// One field of a struct or block (`<add>`).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Member {
    pub name:             String,
    /// Tells apart fields that legally share a name.
    pub suffix:           String,
    pub type_name:        String,
    pub template:         String,
    pub arg:              String,
    pub length:           Expr,
    pub width:            Expr,
    pub cond:             Expr,
    pub vercond:          Expr,
    pub function:         String,
    /// Target-syntax initializer, if the field has one.
    pub default:          Option<String>,
    pub since:            Option<VersionOrdinal>,
    pub until:            Option<VersionOrdinal>,
    pub since_text:       String,
    pub until_text:       String,
    pub user_version:     Option<u32>,
    pub user_version2:    Option<u32>,
    pub is_public:        bool,
    pub is_abstract:      bool,
    pub is_calculated:    bool,
    pub description:      String,
    pub uses_argument:    bool,
    /// An earlier sibling has the same name and this field has no suffix.
    pub is_duplicate:     bool,
    /// The width names an earlier sibling that is itself an array.
    pub width_is_dynamic: bool,
    /// Later siblings whose length is this field's value.
    pub length_refs:      Vec<String>,
    /// Later siblings whose width is this field's value.
    pub width_refs:       Vec<String>,
    /// Later siblings whose condition tests this field.
    pub cond_refs:        Vec<String>,
    /// Index of the next same-named member in the owning composite.
    pub next_duplicate:   Option<usize>,
}

impl Member {
    /// Builds the member for `siblings[index]`, whose element is `element`.
    ///
    /// `model` must already hold the basic, enum and flag registries.
    pub fn from_element(
        element: &Element,
        siblings: &[Sibling],
        index: usize,
        model: &Model,
    ) -> Result<Self, NifError> {
        let name = element.attribute("name").to_string();
        let type_name = element.attribute("type").to_string();
        let since_text = element.attribute("since").to_string();
        let until_text = element.attribute("until").to_string();

        let length = Expr::parse(element.attribute("length"))?;
        let width = Expr::parse(element.attribute("width"))?;
        let cond = Expr::parse(element.attribute("cond"))?;
        let vercond = Expr::parse(element.attribute("vercond"))?;

        let since = VersionOrdinal::pack_optional(&since_text)?;
        let until = VersionOrdinal::pack_optional(&until_text)?;

        let declared = element.attribute("default");
        let default = if !declared.is_empty() {
            Some(normalize_default(declared, &type_name, &length, model)?)
        } else if length.is_empty() && width.is_empty() {
            synthesize_default(&type_name, model)
        } else {
            None
        };

        let uses_argument = [&cond, &length, &width]
            .iter()
            .any(|e| e.left_name() == Some(ARGUMENT));

        let mut member = Member {
            suffix: element.attribute("suffix").to_string(),
            template: element.attribute("template").to_string(),
            arg: element.attribute("arg").to_string(),
            function: element.attribute("function").to_string(),
            user_version: user_version(element.attribute("userver"))?,
            user_version2: user_version(element.attribute("userver2"))?,
            is_public: element.attribute("public") == "1",
            is_abstract: element.attribute("abstract") == "1",
            is_calculated: element.attribute("calculated") == "1",
            description: describe(element, &name),
            name,
            type_name,
            length,
            width,
            cond,
            vercond,
            default,
            since,
            until,
            since_text,
            until_text,
            uses_argument,
            is_duplicate: false,
            width_is_dynamic: false,
            length_refs: Vec::new(),
            width_refs: Vec::new(),
            cond_refs: Vec::new(),
            next_duplicate: None,
        };
        member.scan_siblings(siblings, index);
        Ok(member)
    }

    fn scan_siblings(&mut self, siblings: &[Sibling], index: usize) {
        let (before, after) = siblings.split_at(index.min(siblings.len()));

        for sib in before {
            if sib.name == self.name && self.suffix.is_empty() {
                self.is_duplicate = true;
            }
            if self.width.left_name() == Some(sib.name.as_str()) && !sib.length.is_empty() {
                self.width_is_dynamic = true;
            }
        }

        let me = Some(self.name.as_str());
        for sib in after.iter().skip(1) {
            if sib.length.left_name() == me && sib.length.right_is_numeric_or_absent() {
                self.length_refs.push(sib.name.clone());
            }
            if sib.width.left_name() == me && sib.width.right_is_numeric_or_absent() {
                self.width_refs.push(sib.name.clone());
            }
            if sib.cond.left_name() == me {
                self.cond_refs.push(sib.name.clone());
            }
        }
    }

    /// True when both members come from the same declaration, ignoring what
    /// was derived from their position among siblings.
    pub fn same_declaration(&self, other: &Member) -> bool {
        self.name == other.name
            && self.suffix == other.suffix
            && self.type_name == other.type_name
            && self.template == other.template
            && self.arg == other.arg
            && self.length == other.length
            && self.width == other.width
            && self.cond == other.cond
            && self.vercond == other.vercond
            && self.function == other.function
            && self.default == other.default
            && self.since == other.since
            && self.until == other.until
            && self.user_version == other.user_version
            && self.user_version2 == other.user_version2
            && self.is_public == other.is_public
            && self.is_abstract == other.is_abstract
            && self.is_calculated == other.is_calculated
            && self.description == other.description
    }

    /// Whether the field is present in files of `version` (`since` and `until`
    /// are inclusive).
    pub fn exists_in(&self, version: VersionOrdinal) -> bool {
        self.since.map_or(true, |since| since <= version) && self.until.map_or(true, |until| version <= until)
    }

    /// Member identifier for generated code, `suffix` included
    /// (`"Data"` + `"New"` -> `"data_new"`).
    pub fn identifier(&self) -> String {
        if self.suffix.is_empty() {
            member_name(&self.name)
        } else {
            member_name(&format!("{}_{}", self.name, self.suffix))
        }
    }

    pub fn is_array(&self) -> bool {
        !self.length.is_empty()
    }

    pub(crate) fn resolve_type_refs(&mut self, is_type: &dyn Fn(&str) -> bool) {
        for expr in [&mut self.length, &mut self.width, &mut self.cond, &mut self.vercond] {
            *expr = expr.resolve_type_refs(is_type);
        }
    }
}

fn user_version(text: &str) -> Result<Option<u32>, NifError> {
    if text.is_empty() {
        return Ok(None);
    }
    text.trim()
        .parse::<u32>()
        .map(Some)
        .map_err(|_| NifError::InvalidValue { what: "user version", value: quote(text) })
}

/// Initializer for a scalar field declared without one.
fn synthesize_default(type_name: &str, model: &Model) -> Option<String> {
    let literal = match type_name {
        t if INTEGER_TYPES.contains(&t) => "0",
        "bool" => "false",
        t if REFERENCE_TYPES.contains(&t) => "NULL",
        "float" => "0.0",
        "HeaderString" | "Char8String" => return None,
        "StringOffset" => "-1",
        t if model.basics().contains(t) || model.enums().contains(t) || model.flags().contains(t) => "0",
        _ => return None,
    };
    Some(literal.to_string())
}

/// Formats a declared default as a target-syntax initializer.
fn normalize_default(declared: &str, type_name: &str, length: &Expr, model: &Model) -> Result<String, NifError> {
    let value = declared
        .strip_prefix('(')
        .and_then(|v| v.strip_suffix(')'))
        .unwrap_or(declared);

    if !length.is_empty() {
        // Static arrays: "<count>,(T)a,(T)b..."
        return Ok(match length.as_integer().filter(|n| *n >= 0) {
            Some(count) => {
                let sep = format!(",({})", model.class_name(type_name));
                let parts: Vec<&str> = value.splitn(count as usize + 1, ' ').collect();
                format!("{}{}{}", count, sep, parts.join(&sep))
            }
            None => value.to_string(),
        });
    }

    if STRING_TYPES.contains(&type_name) {
        return Ok(format!("\"{}\"", value));
    }
    if type_name == "float" {
        let parsed: f64 = value.trim().parse().map_err(|_| NifError::InvalidValue {
            what:  "float default",
            value: quote(value),
        })?;
        return Ok(format!("{:?}f", parsed));
    }
    if VERBATIM_DEFAULT_TYPES.contains(&type_name) || value.contains(',') {
        return Ok(value.to_string());
    }
    Ok(format!("({}){}", model.class_name(type_name), value))
}
