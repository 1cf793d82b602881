//! A PDF writer that emits each object as soon as it is complete.
//!
//! Pages go straight to the output; only the page list, the cross-reference
//! offsets and the catalog objects are held until [`StreamingPdfWriter::finish`].

use lopdf::content::Content;
use lopdf::{Dictionary, Object, ObjectId, Stream, StringFormat, dictionary};
use std::collections::BTreeMap;
use std::io::{self, Write};

/// Tracks the byte offset of everything written, since the sink is not seekable.
struct CountingWriter<'w> {
    inner: &'w mut dyn Write,
    offset: u64,
}

impl Write for CountingWriter<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.offset += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

pub struct StreamingPdfWriter<'w> {
    writer: CountingWriter<'w>,
    /// Object number to byte offset.
    xref: BTreeMap<u32, u64>,
    max_id: u32,
    pub catalog_id: ObjectId,
    pub pages_id: ObjectId,
    pub resources_id: ObjectId,
    page_ids: Vec<ObjectId>,
}

impl<'w> StreamingPdfWriter<'w> {
    pub fn new(output: &'w mut dyn Write, version: &str) -> io::Result<Self> {
        let mut writer = CountingWriter { inner: output, offset: 0 };
        writer.write_all(format!("%PDF-{}\n", version).as_bytes())?;
        writer.write_all(b"%\xE2\xE3\xCF\xD3\n")?;

        Ok(Self {
            writer,
            xref: BTreeMap::new(),
            max_id: 3,
            resources_id: (1, 0),
            pages_id: (2, 0),
            catalog_id: (3, 0),
            page_ids: Vec::new(),
        })
    }

    pub fn new_object_id(&mut self) -> ObjectId {
        self.max_id += 1;
        (self.max_id, 0)
    }

    pub fn write_object(&mut self, object: &Object) -> io::Result<ObjectId> {
        let id = self.new_object_id();
        self.write_object_at_id(id, object)?;
        Ok(id)
    }

    pub fn write_object_at_id(&mut self, id: ObjectId, object: &Object) -> io::Result<()> {
        self.max_id = self.max_id.max(id.0);
        self.xref.insert(id.0, self.writer.offset);
        writeln!(self.writer, "{} {} obj", id.0, id.1)?;
        write_object(&mut self.writer, object)?;
        self.writer.write_all(b"\nendobj\n")
    }

    pub fn write_content_stream(&mut self, content: Content) -> io::Result<ObjectId> {
        let bytes = content.encode().map_err(|e| io::Error::other(e.to_string()))?;
        self.write_object(&Object::Stream(Stream::new(Dictionary::new(), bytes)))
    }

    /// Writes a page dictionary immediately and records it for the page tree.
    pub fn write_page(&mut self, content_id: ObjectId, width: f32, height: f32) -> io::Result<ObjectId> {
        let page = dictionary! {
            "Type" => "Page",
            "Parent" => self.pages_id,
            "MediaBox" => vec![0.0f32.into(), 0.0f32.into(), width.into(), height.into()],
            "Contents" => content_id,
            "Resources" => self.resources_id,
        };
        let id = self.write_object(&page.into())?;
        self.page_ids.push(id);
        Ok(id)
    }

    pub fn page_count(&self) -> usize {
        self.page_ids.len()
    }

    pub fn bytes_written(&self) -> u64 {
        self.writer.offset
    }

    /// Writes the resources, page tree, info and catalog objects, then the
    /// cross-reference table and trailer.
    pub fn finish(mut self, fonts: Dictionary, info: Option<Dictionary>) -> io::Result<()> {
        self.write_object_at_id(self.resources_id, &dictionary! { "Font" => fonts }.into())?;

        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => self.page_ids.iter().map(|id| Object::Reference(*id)).collect::<Vec<Object>>(),
            "Count" => self.page_ids.len() as i64,
        };
        self.write_object_at_id(self.pages_id, &pages.into())?;

        let info_id = match info {
            Some(info) => Some(self.write_object(&info.into())?),
            None => None,
        };

        let catalog = dictionary! { "Type" => "Catalog", "Pages" => self.pages_id };
        self.write_object_at_id(self.catalog_id, &catalog.into())?;

        let xref_start = self.writer.offset;
        let size = self.max_id + 1;
        writeln!(self.writer, "xref")?;
        writeln!(self.writer, "0 {}", size)?;
        writeln!(self.writer, "0000000000 65535 f ")?;
        for id in 1..size {
            match self.xref.get(&id) {
                Some(offset) => writeln!(self.writer, "{:010} 00000 n ", offset)?,
                None => writeln!(self.writer, "0000000000 65535 f ")?,
            }
        }

        let mut trailer = dictionary! { "Size" => size as i64, "Root" => self.catalog_id };
        if let Some(id) = info_id {
            trailer.set("Info", id);
        }
        writeln!(self.writer, "trailer")?;
        write_dictionary(&mut self.writer, &trailer)?;
        writeln!(self.writer, "\nstartxref")?;
        writeln!(self.writer, "{}", xref_start)?;
        write!(self.writer, "%%EOF")?;
        self.writer.flush()
    }
}

/// A PDF text string: plain bytes when printable ASCII, otherwise UTF-16BE
/// with a byte order mark.
pub fn text_string(s: &str) -> Object {
    if s.chars().all(|c| (' '..='~').contains(&c)) {
        Object::String(s.as_bytes().to_vec(), StringFormat::Literal)
    } else {
        let mut bytes = vec![0xFE, 0xFF];
        for unit in s.encode_utf16() {
            bytes.extend_from_slice(&unit.to_be_bytes());
        }
        Object::String(bytes, StringFormat::Hexadecimal)
    }
}

fn write_object(writer: &mut dyn Write, object: &Object) -> io::Result<()> {
    match object {
        Object::Null => writer.write_all(b"null"),
        Object::Boolean(b) => writer.write_all(if *b { b"true" } else { b"false" }),
        Object::Integer(i) => write!(writer, "{}", i),
        Object::Real(r) => write!(writer, "{:.3}", r),
        Object::Name(n) => {
            writer.write_all(b"/")?;
            writer.write_all(n)
        }
        Object::String(s, format) => match format {
            StringFormat::Literal => {
                writer.write_all(b"(")?;
                for &byte in s {
                    if byte == b'(' || byte == b')' || byte == b'\\' {
                        writer.write_all(b"\\")?;
                    }
                    writer.write_all(&[byte])?;
                }
                writer.write_all(b")")
            }
            StringFormat::Hexadecimal => {
                writer.write_all(b"<")?;
                for byte in s {
                    write!(writer, "{:02X}", byte)?;
                }
                writer.write_all(b">")
            }
        },
        Object::Array(arr) => {
            writer.write_all(b"[")?;
            for (i, obj) in arr.iter().enumerate() {
                if i > 0 {
                    writer.write_all(b" ")?;
                }
                write_object(writer, obj)?;
            }
            writer.write_all(b"]")
        }
        Object::Dictionary(dict) => write_dictionary(writer, dict),
        Object::Stream(stream) => {
            let mut dict = stream.dict.clone();
            dict.set("Length", stream.content.len() as i64);
            write_dictionary(writer, &dict)?;
            writer.write_all(b"\nstream\n")?;
            writer.write_all(&stream.content)?;
            writer.write_all(b"\nendstream")
        }
        Object::Reference(id) => write!(writer, "{} {} R", id.0, id.1),
    }
}

fn write_dictionary(writer: &mut dyn Write, dict: &Dictionary) -> io::Result<()> {
    writer.write_all(b"<<")?;
    let sorted: BTreeMap<_, _> = dict.iter().collect();
    for (key, value) in sorted {
        writer.write_all(b"/")?;
        writer.write_all(key)?;
        writer.write_all(b" ")?;
        write_object(writer, value)?;
        writer.write_all(b" ")?;
    }
    writer.write_all(b">>")
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::content::Operation;

    #[test]
    fn writes_a_loadable_document() {
        let mut out = Vec::new();
        {
            let mut writer = StreamingPdfWriter::new(&mut out, "1.7").unwrap();
            let content = Content { operations: vec![Operation::new("re", vec![Object::Integer(0), Object::Integer(0), Object::Integer(10), Object::Integer(10)])] };
            let content_id = writer.write_content_stream(content).unwrap();
            writer.write_page(content_id, 200.0, 100.0).unwrap();
            assert_eq!(writer.page_count(), 1);
            let info = dictionary! { "Title" => text_string("Report") };
            writer.finish(Dictionary::new(), Some(info)).unwrap();
        }
        assert!(out.starts_with(b"%PDF-1.7"));
        let doc = lopdf::Document::load_mem(&out).unwrap();
        assert_eq!(doc.get_pages().len(), 1);
    }

    #[test]
    fn pages_are_written_before_finish() {
        let mut out = Vec::new();
        let mut writer = StreamingPdfWriter::new(&mut out, "1.7").unwrap();
        let before = writer.bytes_written();
        let content_id = writer.write_content_stream(Content { operations: vec![] }).unwrap();
        writer.write_page(content_id, 10.0, 10.0).unwrap();
        assert!(writer.bytes_written() > before);
    }

    #[test]
    fn literal_strings_are_escaped() {
        let mut out = Vec::new();
        write_object(&mut out, &Object::String(b"a(b)\\".to_vec(), StringFormat::Literal)).unwrap();
        assert_eq!(out, b"(a\\(b\\)\\\\)");
        assert!(matches!(text_string("Año"), Object::String(_, StringFormat::Hexadecimal)));
    }
}
