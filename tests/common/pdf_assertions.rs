use lopdf::Document as LopdfDocument;

/// The decoded content stream of each page, in page order
pub fn page_contents(doc: &LopdfDocument) -> Vec<String> {
    doc.get_pages()
        .into_values()
        .map(|id| doc.get_page_content(id).map(|c| String::from_utf8_lossy(&c).into_owned()).unwrap_or_default())
        .collect()
}

/// A string entry of the trailer's `/Info` dictionary
pub fn info_entry(doc: &LopdfDocument, key: &[u8]) -> Option<String> {
    let info = doc.trailer.get(b"Info").ok()?.as_reference().ok()?;
    let value = doc.get_dictionary(info).ok()?.get(key).ok()?.as_str().ok()?;
    Some(String::from_utf8_lossy(value).into_owned())
}

/// Whether `text` was drawn as a single string operand on some page
pub fn shows_text(doc: &LopdfDocument, text: &str) -> bool {
    let operand = format!("({})", text);
    page_contents(doc).iter().any(|page| page.contains(&operand))
}

#[macro_export]
macro_rules! assert_pdf_contains_text {
    ($pdf:expr, $text:expr) => {
        assert!(
            $crate::common::pdf_assertions::shows_text(&$pdf.doc, $text),
            "expected the PDF to show {:?}",
            $text
        )
    };
}
