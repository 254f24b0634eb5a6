//! Minimal namespace-agnostic XML tree.
//!
//! WS-Discovery and ONVIF payloads use whatever namespace prefixes the
//! device firmware likes (`d:`, `wsdd:`, `tds:`, none at all...), so
//! elements are matched by local name only. The tree is built with
//! `quick-xml` events and is only meant for the small SOAP documents
//! cameras send back.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::borrow::Cow;

/// Error raised for payloads that are not well-formed XML.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct XmlError(String);

/// One element with its local name, attributes, text and children.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    name: String,
    attributes: Vec<(String, String)>,
    text: String,
    children: Vec<Element>,
}

impl Element {
    /// Local name of the element (prefix stripped).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Trimmed text content directly inside this element.
    pub fn text(&self) -> &str {
        self.text.trim()
    }

    /// Value of an attribute, matched by local name.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Direct children.
    pub fn children(&self) -> &[Element] {
        &self.children
    }

    /// First direct child with the given local name.
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }

    /// All elements below this one, depth first, in document order.
    pub fn descendants(&self) -> impl Iterator<Item = &Element> + '_ {
        let mut stack: Vec<&Element> = self.children.iter().rev().collect();
        std::iter::from_fn(move || {
            let next = stack.pop()?;
            stack.extend(next.children.iter().rev());
            Some(next)
        })
    }

    /// First descendant with the given local name.
    pub fn find(&self, name: &str) -> Option<&Element> {
        self.descendants().find(|e| e.name == name)
    }

    /// All descendants with the given local name.
    pub fn find_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.descendants().filter(move |e| e.name == name)
    }

    /// Trimmed text of the first descendant with the given name, if non-empty.
    pub fn find_text(&self, name: &str) -> Option<String> {
        self.find(name)
            .map(Element::text)
            .filter(|t| !t.is_empty())
            .map(str::to_owned)
    }

    fn from_start(start: &BytesStart<'_>) -> Result<Self, XmlError> {
        let name = String::from_utf8_lossy(start.local_name().as_ref()).into_owned();
        let mut attributes = Vec::new();

        for attr in start.attributes() {
            let attr = attr.map_err(|e| XmlError(e.to_string()))?;
            let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
            let value = attr
                .unescape_value()
                .map_err(|e| XmlError(e.to_string()))?
                .into_owned();
            attributes.push((key, value));
        }

        Ok(Self {
            name,
            attributes,
            ..Self::default()
        })
    }
}

/// Parse a document into a synthetic root whose children are the
/// top-level elements.
pub fn parse(xml: &str) -> Result<Element, XmlError> {
    let mut reader = Reader::from_str(xml);
    let mut stack = vec![Element::default()];

    loop {
        match reader.read_event().map_err(|e| XmlError(e.to_string()))? {
            Event::Start(start) => stack.push(Element::from_start(&start)?),
            Event::Empty(start) => {
                let element = Element::from_start(&start)?;
                push_child(&mut stack, element);
            }
            Event::End(_) => {
                if stack.len() > 1 {
                    if let Some(element) = stack.pop() {
                        push_child(&mut stack, element);
                    }
                }
            }
            Event::Text(text) => {
                let text = text.unescape().map_err(|e| XmlError(e.to_string()))?;
                append_text(&mut stack, text);
            }
            Event::CData(data) => {
                let bytes = data.into_inner();
                append_text(&mut stack, String::from_utf8_lossy(&bytes));
            }
            Event::Eof => break,
            _ => {}
        }
    }

    // Unclosed elements at EOF are folded into their parents.
    while stack.len() > 1 {
        if let Some(element) = stack.pop() {
            push_child(&mut stack, element);
        }
    }
    stack.pop().ok_or_else(|| XmlError("empty document".to_string()))
}

fn push_child(stack: &mut [Element], element: Element) {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(element);
    }
}

fn append_text(stack: &mut [Element], text: Cow<'_, str>) {
    if let Some(current) = stack.last_mut() {
        current.text.push_str(&text);
    }
}
