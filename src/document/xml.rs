//! Minimal owned XML tree for OOXML parts
//!
//! Office parts are small enough to hold in memory, and filling a template
//! needs random mutable access to paragraphs and table cells, so parts are
//! parsed into a plain element tree with `quick-xml` and written back out
//! with the same crate. Names are kept fully qualified (`w:p`); lookups go
//! through the local name so documents using an unusual prefix still work.

use std::borrow::Cow;

use quick_xml::events::attributes::AttrError;
use quick_xml::events::{BytesCData, BytesDecl, BytesEnd, BytesPI, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum XmlError {
    #[error("xml parse error: {0}")]
    Parse(#[from] quick_xml::Error),

    #[error("invalid attribute: {0}")]
    Attribute(#[from] AttrError),

    #[error("xml write error: {0}")]
    Write(#[from] std::io::Error),

    #[error("part is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("malformed xml: {0}")]
    Malformed(&'static str),
}

/// A node inside an element
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmlNode {
    Element(XmlElement),
    /// Unescaped character data
    Text(String),
    CData(String),
    /// Raw comment body
    Comment(String),
    /// Processing instruction body, target included
    Instruction(String),
}

/// An element with its qualified name, attributes in document order and children
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlElement {
    pub name: String,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<XmlNode>,
}

/// The `<?xml ...?>` declaration of a part
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlDecl {
    pub version: String,
    pub encoding: Option<String>,
    pub standalone: Option<String>,
}

/// A parsed XML part
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlDocument {
    pub decl: Option<XmlDecl>,
    /// Processing instructions between the declaration and the root
    pub prolog: Vec<String>,
    pub root: XmlElement,
}

/// Strip the namespace prefix from a qualified name
pub fn local_name(name: &str) -> &str {
    name.rsplit_once(':').map_or(name, |(_, local)| local)
}

impl XmlElement {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.push((name.into(), value.into()));
        self
    }

    pub fn with_child(mut self, child: XmlElement) -> Self {
        self.children.push(XmlNode::Element(child));
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.children.push(XmlNode::Text(text.into()));
        self
    }

    pub fn local_name(&self) -> &str {
        local_name(&self.name)
    }

    pub fn prefix(&self) -> Option<&str> {
        self.name.split_once(':').map(|(prefix, _)| prefix)
    }

    /// Qualify `local` with this element's namespace prefix
    pub fn qualify(&self, local: &str) -> String {
        match self.prefix() {
            Some(prefix) => format!("{prefix}:{local}"),
            None => local.to_string(),
        }
    }

    /// Whether this element has the given local name
    pub fn is(&self, local: &str) -> bool {
        self.local_name() == local
    }

    /// Attribute value looked up by local name (`w:val` matches `val`)
    pub fn attr(&self, local: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(name, _)| local_name(name) == local)
            .map(|(_, value)| value.as_str())
    }

    pub fn elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(|node| match node {
            XmlNode::Element(e) => Some(e),
            _ => None,
        })
    }

    pub fn elements_mut(&mut self) -> impl Iterator<Item = &mut XmlElement> {
        self.children.iter_mut().filter_map(|node| match node {
            XmlNode::Element(e) => Some(e),
            _ => None,
        })
    }

    /// Direct child elements with the given local name
    pub fn children_named<'a>(&'a self, local: &'a str) -> impl Iterator<Item = &'a XmlElement> {
        self.elements().filter(move |e| e.is(local))
    }

    pub fn children_named_mut<'a>(
        &'a mut self,
        local: &'a str,
    ) -> impl Iterator<Item = &'a mut XmlElement> {
        self.elements_mut().filter(move |e| e.is(local))
    }

    pub fn child(&self, local: &str) -> Option<&XmlElement> {
        self.elements().find(|e| e.is(local))
    }

    pub fn child_mut(&mut self, local: &str) -> Option<&mut XmlElement> {
        self.elements_mut().find(|e| e.is(local))
    }

    /// Follow a path of local names through first matching children
    pub fn find(&self, path: &[&str]) -> Option<&XmlElement> {
        path.iter().try_fold(self, |el, local| el.child(local))
    }

    /// Concatenated text of every descendant text node
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        for node in &self.children {
            match node {
                XmlNode::Element(e) => e.collect_text(out),
                XmlNode::Text(t) | XmlNode::CData(t) => out.push_str(t),
                XmlNode::Comment(_) | XmlNode::Instruction(_) => {}
            }
        }
    }

    /// Remove every child except elements with the given local names
    pub fn retain_elements(&mut self, keep: &[&str]) {
        self.children.retain(|node| match node {
            XmlNode::Element(e) => keep.contains(&e.local_name()),
            _ => false,
        });
    }

    fn from_start(start: &BytesStart<'_>) -> Result<Self, XmlError> {
        let name = std::str::from_utf8(start.name().as_ref())?.to_string();
        let mut attrs = Vec::new();
        for attr in start.attributes() {
            let attr = attr?;
            let key = std::str::from_utf8(attr.key.as_ref())?.to_string();
            let value = attr.unescape_value()?.into_owned();
            attrs.push((key, value));
        }
        Ok(Self {
            name,
            attrs,
            children: Vec::new(),
        })
    }

    fn write_to(&self, writer: &mut Writer<Vec<u8>>) -> Result<(), XmlError> {
        let mut start = BytesStart::new(self.name.as_str());
        for (key, value) in &self.attrs {
            start.push_attribute((key.as_str(), value.as_str()));
        }

        if self.children.is_empty() {
            writer.write_event(Event::Empty(start))?;
            return Ok(());
        }

        writer.write_event(Event::Start(start))?;
        for node in &self.children {
            match node {
                XmlNode::Element(e) => e.write_to(writer)?,
                XmlNode::Text(t) => writer.write_event(Event::Text(BytesText::new(t)))?,
                XmlNode::CData(t) => writer.write_event(Event::CData(BytesCData::new(t.as_str())))?,
                XmlNode::Comment(t) => {
                    writer.write_event(Event::Comment(BytesText::from_escaped(t.as_str())))?
                }
                XmlNode::Instruction(t) => writer.write_event(Event::PI(BytesPI::new(t.as_str())))?,
            }
        }
        writer.write_event(Event::End(BytesEnd::new(self.name.as_str())))?;
        Ok(())
    }
}

impl XmlDecl {
    fn from_event(decl: &BytesDecl<'_>) -> Result<Self, XmlError> {
        let version = bytes_to_string(decl.version()?)?;
        let encoding = decl
            .encoding()
            .transpose()?
            .map(bytes_to_string)
            .transpose()?;
        let standalone = decl
            .standalone()
            .transpose()?
            .map(bytes_to_string)
            .transpose()?;
        Ok(Self {
            version,
            encoding,
            standalone,
        })
    }
}

fn bytes_to_string(bytes: Cow<'_, [u8]>) -> Result<String, XmlError> {
    Ok(std::str::from_utf8(&bytes)?.to_string())
}

impl XmlDocument {
    /// Parse a part from raw bytes, tolerating a UTF-8 byte order mark
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, XmlError> {
        let text = std::str::from_utf8(bytes)?;
        Self::parse(text.strip_prefix('\u{feff}').unwrap_or(text))
    }

    pub fn parse(xml: &str) -> Result<Self, XmlError> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(false);

        let mut decl = None;
        let mut prolog = Vec::new();
        let mut root = None;
        let mut stack: Vec<XmlElement> = Vec::new();

        loop {
            match reader.read_event()? {
                Event::Decl(e) => decl = Some(XmlDecl::from_event(&e)?),
                Event::Start(e) => stack.push(XmlElement::from_start(&e)?),
                Event::Empty(e) => {
                    let element = XmlElement::from_start(&e)?;
                    attach(&mut stack, &mut root, XmlNode::Element(element));
                }
                Event::End(_) => {
                    let element = stack
                        .pop()
                        .ok_or(XmlError::Malformed("unbalanced end tag"))?;
                    attach(&mut stack, &mut root, XmlNode::Element(element));
                }
                Event::Text(e) => {
                    if let Some(parent) = stack.last_mut() {
                        parent.children.push(XmlNode::Text(e.unescape()?.into_owned()));
                    }
                }
                Event::CData(e) => {
                    if let Some(parent) = stack.last_mut() {
                        let text = std::str::from_utf8(&e)?.to_string();
                        parent.children.push(XmlNode::CData(text));
                    }
                }
                Event::Comment(e) => {
                    if let Some(parent) = stack.last_mut() {
                        let text = std::str::from_utf8(&e)?.to_string();
                        parent.children.push(XmlNode::Comment(text));
                    }
                }
                Event::PI(e) => {
                    let text = std::str::from_utf8(&e)?.to_string();
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(XmlNode::Instruction(text)),
                        None if root.is_none() => prolog.push(text),
                        None => {}
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if !stack.is_empty() {
            return Err(XmlError::Malformed("unclosed element"));
        }
        let root = root.ok_or(XmlError::Malformed("missing root element"))?;
        Ok(Self { decl, prolog, root })
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, XmlError> {
        let mut writer = Writer::new(Vec::new());
        if let Some(decl) = &self.decl {
            writer.write_event(Event::Decl(BytesDecl::new(
                &decl.version,
                decl.encoding.as_deref(),
                decl.standalone.as_deref(),
            )))?;
            // Office writes the root on its own line after the declaration
            writer.write_event(Event::Text(BytesText::from_escaped("\r\n")))?;
        }
        for instruction in &self.prolog {
            writer.write_event(Event::PI(BytesPI::new(instruction.as_str())))?;
            writer.write_event(Event::Text(BytesText::from_escaped("\r\n")))?;
        }
        self.root.write_to(&mut writer)?;
        Ok(writer.into_inner())
    }
}

fn attach(stack: &mut [XmlElement], root: &mut Option<XmlElement>, node: XmlNode) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(node),
        None => {
            if let (None, XmlNode::Element(element)) = (root.as_ref(), node) {
                *root = Some(element);
            }
        }
    }
}
