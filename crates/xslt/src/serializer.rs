//! Serializes markup events back into XML text.

use folio_traits::{Attribute, MarkupHandler, QName, SinkError};
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use std::io::Write;

/// A [`MarkupHandler`] that writes UTF-8 XML.
///
/// Namespace declarations are derived from the element names: a binding is
/// declared on the first element that needs it and inherited by descendants.
pub struct XmlTextWriter<W: Write> {
    writer: Writer<W>,
    /// Bindings declared by each open element, innermost last.
    scopes: Vec<Vec<(Option<String>, String)>>,
}

impl<W: Write> XmlTextWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { writer: Writer::new(inner), scopes: Vec::new() }
    }

    pub fn indented(inner: W) -> Self {
        Self { writer: Writer::new_with_indent(inner, b' ', 2), scopes: Vec::new() }
    }

    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }

    fn in_scope(&self, prefix: Option<&str>) -> Option<&str> {
        self.scopes
            .iter()
            .rev()
            .flat_map(|scope| scope.iter())
            .find(|(p, _)| p.as_deref() == prefix)
            .map(|(_, ns)| ns.as_str())
    }

    fn write(&mut self, event: Event<'_>) -> Result<(), SinkError> {
        self.writer.write_event(event).map_err(write_failed)
    }
}

fn write_failed(e: impl std::fmt::Display) -> SinkError {
    SinkError::Io(std::io::Error::other(e.to_string()))
}

impl<W: Write> MarkupHandler for XmlTextWriter<W> {
    fn start_document(&mut self) -> Result<(), SinkError> {
        self.write(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
    }

    fn start_element(&mut self, name: &QName, attributes: &[Attribute]) -> Result<(), SinkError> {
        let mut declared = Vec::new();
        let wanted = name.namespace.as_deref().unwrap_or("");
        let current = self.in_scope(name.prefix.as_deref()).unwrap_or("");
        if wanted != current {
            declared.push((name.prefix.clone(), wanted.to_string()));
        }

        let qualified = name.qualified();
        let mut start = BytesStart::new(qualified.as_str());
        for (prefix, ns) in &declared {
            match prefix {
                Some(p) => start.push_attribute((format!("xmlns:{}", p).as_str(), ns.as_str())),
                None => start.push_attribute(("xmlns", ns.as_str())),
            }
        }
        for attr in attributes {
            start.push_attribute((attr.name.as_str(), attr.value.as_str()));
        }
        self.scopes.push(declared);
        self.write(Event::Start(start))
    }

    fn end_element(&mut self, name: &QName) -> Result<(), SinkError> {
        self.scopes.pop();
        let qualified = name.qualified();
        self.write(Event::End(BytesEnd::new(qualified.as_str())))
    }

    fn text(&mut self, text: &str) -> Result<(), SinkError> {
        self.write(Event::Text(BytesText::new(text)))
    }

    fn end_document(&mut self) -> Result<(), SinkError> {
        self.writer.get_mut().flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FO: &str = "http://www.w3.org/1999/XSL/Format";

    fn render(events: impl FnOnce(&mut XmlTextWriter<Vec<u8>>)) -> String {
        let mut w = XmlTextWriter::new(Vec::new());
        events(&mut w);
        String::from_utf8(w.into_inner()).unwrap()
    }

    #[test]
    fn declares_namespaces_once() {
        let out = render(|w| {
            let root = QName::with_namespace(Some("fo"), "root", FO);
            let block = QName::with_namespace(Some("fo"), "block", FO);
            w.start_element(&root, &[]).unwrap();
            w.start_element(&block, &[Attribute::new("font-size", "10pt")]).unwrap();
            w.text("a < b & c").unwrap();
            w.end_element(&block).unwrap();
            w.end_element(&root).unwrap();
        });
        assert_eq!(
            out,
            format!(
                r#"<fo:root xmlns:fo="{}"><fo:block font-size="10pt">a &lt; b &amp; c</fo:block></fo:root>"#,
                FO
            )
        );
    }

    #[test]
    fn unprefixed_names_reset_a_default_namespace() {
        let out = render(|w| {
            let outer = QName::with_namespace(None, "a", "urn:x");
            let inner = QName::local("b");
            w.start_element(&outer, &[]).unwrap();
            w.start_element(&inner, &[]).unwrap();
            w.end_element(&inner).unwrap();
            w.end_element(&outer).unwrap();
        });
        assert_eq!(out, r#"<a xmlns="urn:x"><b xmlns=""></b></a>"#);
    }

    #[test]
    fn attribute_values_are_escaped() {
        let out = render(|w| {
            let e = QName::local("e");
            w.start_element(&e, &[Attribute::new("v", "\"q\" & <x>")]).unwrap();
            w.end_element(&e).unwrap();
        });
        assert!(out.starts_with("<e v=\"&quot;q&quot; &amp; &lt;x&gt;\">"), "{}", out);
    }
}
