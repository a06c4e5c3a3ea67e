use quick_xml::events::{BytesCData, BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::io::Write;

use crate::feed::error::XmlError;

pub type Attributes<'a> = [(&'a str, &'a str)];

/// XML writer that tracks open elements so a document can always be closed
/// in reverse order of opening.
pub struct XmlWriter<W: Write> {
    writer: Writer<W>,
    open: Vec<String>,
}

impl<W: Write> XmlWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            writer: Writer::new(inner),
            open: Vec::new(),
        }
    }

    pub fn declaration(&mut self) -> Result<(), XmlError> {
        self.writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;
        self.raw(b"\n")
    }

    pub fn start(&mut self, name: &str, attrs: &Attributes<'_>) -> Result<(), XmlError> {
        let element = BytesStart::new(name).with_attributes(attrs.iter().copied());
        self.writer.write_event(Event::Start(element))?;
        self.open.push(name.to_string());
        Ok(())
    }

    pub fn end(&mut self, name: &str) -> Result<(), XmlError> {
        match self.open.last() {
            Some(expected) if expected == name => {}
            Some(expected) => {
                return Err(XmlError::Unbalanced {
                    expected: expected.clone(),
                    found: name.to_string(),
                })
            }
            None => {
                return Err(XmlError::Unbalanced {
                    expected: String::new(),
                    found: name.to_string(),
                })
            }
        }
        self.open.pop();
        self.writer.write_event(Event::End(BytesEnd::new(name)))?;
        Ok(())
    }

    /// Escaped character data. Rejects control characters XML 1.0 cannot carry.
    pub fn text(&mut self, text: &str) -> Result<(), XmlError> {
        if text.is_empty() {
            return Ok(());
        }
        if has_control_characters(text) {
            return Err(XmlError::ControlCharacters);
        }
        self.writer.write_event(Event::Text(BytesText::new(text)))?;
        Ok(())
    }

    /// Element with optional text and no children.
    pub fn quick_element(
        &mut self,
        name: &str,
        text: Option<&str>,
        attrs: &Attributes<'_>,
    ) -> Result<(), XmlError> {
        self.start(name, attrs)?;
        if let Some(text) = text {
            self.text(text)?;
        }
        self.end(name)
    }

    /// Element whose content is written verbatim inside CDATA sections.
    /// Control characters are rejected here too.
    pub fn cdata_element(&mut self, name: &str, content: Option<&str>) -> Result<(), XmlError> {
        if content.is_some_and(has_control_characters) {
            return Err(XmlError::ControlCharacters);
        }
        self.start(name, &[])?;
        if let Some(content) = content {
            for section in cdata_sections(content) {
                self.writer
                    .write_event(Event::CData(BytesCData::new(section)))?;
            }
        }
        self.end(name)
    }

    /// Bytes that are already well-formed XML, e.g. a cached item fragment.
    pub fn raw(&mut self, bytes: &[u8]) -> Result<(), XmlError> {
        self.writer.get_mut().write_all(bytes)?;
        Ok(())
    }

    pub fn depth(&self) -> usize {
        self.open.len()
    }

    /// Closes every open element, innermost first.
    pub fn close_all(&mut self) -> Result<(), XmlError> {
        while let Some(name) = self.open.pop() {
            self.writer.write_event(Event::End(BytesEnd::new(name)))?;
        }
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

pub(crate) fn has_control_characters(text: &str) -> bool {
    text.chars()
        .any(|c| c < '\u{20}' && !matches!(c, '\t' | '\n' | '\r'))
}

/// Splits content so that no section contains `]]>`.
///
/// `a]]>b` becomes `a]]` and `>b`, which serialize as
/// `<![CDATA[a]]]]><![CDATA[>b]]>`.
pub fn cdata_sections(content: &str) -> Vec<&str> {
    let mut sections = Vec::new();
    let mut rest = content;
    while let Some(pos) = rest.find("]]>") {
        sections.push(&rest[..pos + 2]);
        rest = &rest[pos + 2..];
    }
    sections.push(rest);
    sections
}
