//! XML document abstraction used by the matrix persistence code.
//!
//! The matrix only needs "an ordered tree of tagged records with text
//! leaves", so this module parses a whole file into an [`Element`]
//! tree up front and offers small child/descendant lookups on it,
//! rather than exposing quick-xml's event stream to callers. Tags are
//! XML local names: namespace prefixes are stripped on read, so a
//! file using `pcwg:Cell` resolves the same as one using `Cell`.

use std::fs;
use std::path::{Path, PathBuf};

use quick_xml::Reader;
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};

use crate::error::DocumentError;

/// One tagged record: attributes, text content, ordered children.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Element {
    tag: String,
    attributes: Vec<(String, String)>,
    text: String,
    children: Vec<Element>,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Default::default()
        }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Concatenated text content of this element.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn set_attribute(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.attributes.push((key.into(), value.into()));
    }

    /// Append a child record and return a handle to fill it in.
    pub fn add_element(&mut self, tag: impl Into<String>) -> &mut Element {
        self.children.push(Element::new(tag));
        self.children.last_mut().unwrap()
    }

    /// Append a text leaf `<tag>value</tag>`.
    pub fn add_text(&mut self, tag: impl Into<String>, value: impl Into<String>) {
        self.add_element(tag).text = value.into();
    }

    pub fn add_float(&mut self, tag: impl Into<String>, value: f64) {
        self.add_text(tag, value.to_string());
    }

    pub fn add_int(&mut self, tag: impl Into<String>, value: i64) {
        self.add_text(tag, value.to_string());
    }

    /// First direct child with the given tag.
    pub fn child(&self, tag: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.tag == tag)
    }

    /// All direct children with the given tag, in document order.
    pub fn children<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a Element> {
        self.children.iter().filter(move |c| c.tag == tag)
    }

    /// Depth-first descendant search, self included.
    pub fn find(&self, tag: &str) -> Option<&Element> {
        if self.tag == tag {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(tag))
    }

    /// Text of the first direct child with the given tag.
    pub fn text_of(&self, tag: &str) -> Result<&str, DocumentError> {
        self.child(tag)
            .map(|c| c.text.trim())
            .ok_or_else(|| DocumentError::MissingElement { tag: tag.into() })
    }

    /// Text of the first direct child with the given tag, parsed as a float.
    pub fn float_of(&self, tag: &str) -> Result<f64, DocumentError> {
        let text = self.text_of(tag)?;
        text.parse().map_err(|_| DocumentError::InvalidNumber {
            tag: tag.into(),
            text: text.into(),
        })
    }

    fn write_into<W: std::io::Write>(&self, writer: &mut Writer<W>) -> Result<(), DocumentError> {
        let mut start = BytesStart::new(&self.tag);
        for (key, value) in &self.attributes {
            start.push_attribute((key.as_str(), value.as_str()));
        }
        if self.children.is_empty() && self.text.is_empty() {
            writer.write_event(Event::Empty(start))?;
            return Ok(());
        }
        writer.write_event(Event::Start(start))?;
        if !self.text.is_empty() {
            writer.write_event(Event::Text(BytesText::new(&self.text)))?;
        }
        for child in &self.children {
            child.write_into(writer)?;
        }
        writer.write_event(Event::End(BytesEnd::new(&self.tag)))?;
        Ok(())
    }
}

/// A parsed or under-construction XML document.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    root: Element,
}

impl Document {
    /// New document with a namespace-scoped root element.
    pub fn with_root(tag: impl Into<String>, namespace: impl Into<String>) -> Self {
        let mut root = Element::new(tag);
        root.set_attribute("xmlns", namespace);
        Self { root }
    }

    pub fn root(&self) -> &Element {
        &self.root
    }

    pub fn root_mut(&mut self) -> &mut Element {
        &mut self.root
    }

    /// Parse a document from markup text.
    pub fn parse(text: &str) -> Result<Self, DocumentError> {
        let mut reader = Reader::from_str(text);
        reader.config_mut().trim_text(true);

        let mut stack: Vec<Element> = Vec::new();
        let mut root: Option<Element> = None;

        loop {
            let event = reader
                .read_event()
                .map_err(|e| DocumentError::Xml(e.to_string()))?;
            match event {
                Event::Start(start) => {
                    stack.push(element_from_start(&start)?);
                }
                Event::Empty(start) => {
                    let element = element_from_start(&start)?;
                    attach(&mut stack, &mut root, element);
                }
                Event::Text(text) => {
                    let unescaped = text
                        .unescape()
                        .map_err(|e| DocumentError::Xml(e.to_string()))?;
                    if let Some(open) = stack.last_mut() {
                        open.text.push_str(&unescaped);
                    }
                }
                Event::CData(data) => {
                    if let Some(open) = stack.last_mut() {
                        open.text.push_str(&String::from_utf8_lossy(&data));
                    }
                }
                Event::End(_) => {
                    let element = stack
                        .pop()
                        .ok_or_else(|| DocumentError::Xml("unbalanced end tag".into()))?;
                    attach(&mut stack, &mut root, element);
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if !stack.is_empty() {
            return Err(DocumentError::Xml("unclosed element".into()));
        }
        let root = root.ok_or_else(|| DocumentError::Xml("document has no root element".into()))?;
        Ok(Self { root })
    }

    /// Load a document from a file.
    pub fn load(path: &Path) -> Result<Self, DocumentError> {
        let text = fs::read_to_string(path)?;
        Self::parse(&text)
    }

    /// Render the document as indented markup with an XML declaration.
    pub fn to_xml_string(&self) -> Result<String, DocumentError> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;
        self.root.write_into(&mut writer)?;
        let mut bytes = writer.into_inner();
        bytes.push(b'\n');
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Persist the document using the write-then-rename pattern, so an
    /// interrupted write never leaves a truncated file at `path`.
    pub fn save(&self, path: &Path) -> Result<(), DocumentError> {
        let markup = self.to_xml_string()?;
        let temp_path = temp_sibling(path);
        fs::write(&temp_path, markup.as_bytes())?;
        fs::rename(&temp_path, path)?;
        Ok(())
    }
}

fn temp_sibling(path: &Path) -> PathBuf {
    path.with_extension("tmp")
}

fn element_from_start(start: &BytesStart<'_>) -> Result<Element, DocumentError> {
    let tag = String::from_utf8_lossy(start.local_name().as_ref()).into_owned();
    let mut element = Element::new(tag);
    for attribute in start.attributes() {
        let attribute = attribute.map_err(|e| DocumentError::Xml(e.to_string()))?;
        element.set_attribute(
            String::from_utf8_lossy(attribute.key.as_ref()).into_owned(),
            String::from_utf8_lossy(&attribute.value).into_owned(),
        );
    }
    Ok(element)
}

fn attach(stack: &mut Vec<Element>, root: &mut Option<Element>, element: Element) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None => {
            if root.is_none() {
                *root = Some(element);
            }
        }
    }
}
