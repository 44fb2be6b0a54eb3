/// One element of a parsed document.
///
/// Attributes keep document order. Only element nodes are kept as children;
/// `text` holds the text node that appears before the first child element, if any.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    tag:        String,
    attributes: Vec<(String, String)>,
    children:   Vec<Element>,
    text:       Option<String>,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Element {
            tag: tag.into(),
            ..Default::default()
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attribute(name, value);
        self
    }

    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Replaces an existing attribute in place, or appends a new one.
    pub fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|(k, _)| *k == name) {
            Some(slot) => slot.1 = value,
            None => self.attributes.push((name, value)),
        }
    }

    pub fn push_child(&mut self, child: Element) {
        self.children.push(child);
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Returns the attribute value, or `""` when the attribute is absent.
    pub fn attribute(&self, name: &str) -> &str {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
            .unwrap_or("")
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.iter().any(|(k, _)| k == name)
    }

    pub fn attributes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn children(&self) -> &[Element] {
        &self.children
    }

    /// Direct children with the given tag, in document order.
    pub fn children_by_tag<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.children.iter().filter(move |c| c.tag == tag)
    }

    /// All descendants (not including `self`) with the given tag, in document order.
    pub fn descendants_by_tag<'a>(&'a self, tag: &str) -> Vec<&'a Element> {
        fn walk<'a>(el: &'a Element, tag: &str, out: &mut Vec<&'a Element>) {
            for child in &el.children {
                if child.tag == tag {
                    out.push(child);
                }
                walk(child, tag, out);
            }
        }

        let mut out = Vec::new();
        walk(self, tag, &mut out);
        out
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub(crate) fn set_text(&mut self, text: String) {
        self.text = Some(text);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Element {
        Element::new("root")
            .with_attribute("version", "0.9.1.0")
            .with_child(
                Element::new("struct")
                    .with_attribute("name", "Outer")
                    .with_child(Element::new("add").with_attribute("name", "a"))
                    .with_child(
                        Element::new("group").with_child(Element::new("add").with_attribute("name", "b")),
                    ),
            )
            .with_child(Element::new("add").with_attribute("name", "c"))
    }

    #[test]
    fn test_missing_attribute_is_empty() {
        let root = sample();
        assert_eq!(root.attribute("version"), "0.9.1.0");
        assert_eq!(root.attribute("nope"), "");
        assert!(!root.has_attribute("nope"));
    }

    #[test]
    fn test_set_attribute_replaces_in_place() {
        let mut el = Element::new("option").with_attribute("name", "A").with_attribute("value", "1");
        el.set_attribute("name", "P_A");
        let attrs: Vec<_> = el.attributes().collect();
        assert_eq!(attrs, vec![("name", "P_A"), ("value", "1")]);
    }

    #[test]
    fn test_descendants_are_preorder() {
        let root = sample();
        let names: Vec<_> = root
            .descendants_by_tag("add")
            .iter()
            .map(|e| e.attribute("name"))
            .collect();
        assert_eq!(names, vec!["a", "b", "c"]);

        let direct: Vec<_> = root.children_by_tag("add").map(|e| e.attribute("name")).collect();
        assert_eq!(direct, vec!["c"]);
    }
}
