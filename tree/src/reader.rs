use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::{element::Element, error::TreeError};

/// Parses XML text into an `Element` tree and returns the root element.
///
/// Comments, processing instructions and the declaration are dropped. Text is
/// kept only when it is the first node inside an element.
pub fn read_document(text: &str) -> Result<Element, TreeError> {
    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(true);

    // Open elements, innermost last. Each entry also records whether a child
    // node has been seen, so later text is not mistaken for the leading text.
    let mut stack: Vec<(Element, bool)> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        match reader.read_event().map_err(|e| TreeError::Xml(e.to_string()))? {
            Event::Start(start) => {
                if let Some((_, seen_child)) = stack.last_mut() {
                    *seen_child = true;
                }
                stack.push((start_element(&start)?, false));
            }
            Event::Empty(start) => {
                let element = start_element(&start)?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::End(end) => {
                let (element, _) = stack.pop().ok_or_else(|| {
                    TreeError::Unbalanced(format!(
                        "closing tag </{}> without an open element",
                        String::from_utf8_lossy(end.name().as_ref())
                    ))
                })?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::Text(t) => {
                let text = t.unescape().map_err(|e| TreeError::Xml(e.to_string()))?;
                leading_text(&mut stack, text.into_owned());
            }
            Event::CData(c) => {
                leading_text(&mut stack, String::from_utf8_lossy(&c).into_owned());
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some((element, _)) = stack.pop() {
        return Err(TreeError::Unbalanced(format!("element <{}> is never closed", element.tag())));
    }
    root.ok_or(TreeError::Empty)
}

fn start_element(start: &BytesStart) -> Result<Element, TreeError> {
    let mut element = Element::new(String::from_utf8_lossy(start.name().as_ref()).into_owned());
    for attr in start.attributes() {
        let attr = attr.map_err(|e| TreeError::Xml(e.to_string()))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value().map_err(|e| TreeError::Xml(e.to_string()))?;
        element.set_attribute(key, value.into_owned());
    }
    Ok(element)
}

fn attach(stack: &mut [(Element, bool)], root: &mut Option<Element>, element: Element) -> Result<(), TreeError> {
    match stack.last_mut() {
        Some((parent, seen_child)) => {
            *seen_child = true;
            parent.push_child(element);
            Ok(())
        }
        None if root.is_none() => {
            *root = Some(element);
            Ok(())
        }
        None => Err(TreeError::Unbalanced(format!(
            "second root element <{}>",
            element.tag()
        ))),
    }
}

fn leading_text(stack: &mut [(Element, bool)], text: String) {
    if let Some((element, seen_child)) = stack.last_mut() {
        if !*seen_child && element.text().is_none() {
            element.set_text(text);
        }
        *seen_child = true;
    }
}
