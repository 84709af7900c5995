use std::collections::BTreeMap;

use anyhow::{anyhow, Context, Result};
use lopdf::{content::Content, Dictionary, Document, Object};

use super::{text::clean_text, PdfToken};
use crate::log_warn;

const ENABLE_LOGS: bool = true;

/// Default leading applied by `T*`, `'` and `"` when no `TL` was seen.
const DEFAULT_LEADING: f32 = 12.0;

fn load(bytes: &[u8]) -> Result<Document> {
    Document::load_mem(bytes).context("failed to parse PDF document")
}

/// Plain text of every page, pages separated by a newline.
pub fn extract_pdf_text(bytes: &[u8]) -> Result<String> {
    let doc = load(bytes)?;
    let mut pages = Vec::new();

    for page_no in doc.get_pages().keys() {
        match doc.extract_text(&[*page_no]) {
            Ok(text) => pages.push(text),
            Err(err) => log_warn!("Skipping text of page {page_no}: {err}"),
        }
    }

    Ok(clean_text(&pages.join("\n")))
}

/// Walks each page's content stream and emits one token per shown string,
/// positioned by the current text matrix.
pub fn extract_pdf_tokens(bytes: &[u8]) -> Result<Vec<PdfToken>> {
    let doc = load(bytes)?;
    let mut tokens = Vec::new();

    for (page_no, page_id) in doc.get_pages() {
        let fonts = doc
            .get_page_fonts(page_id)
            .map_err(|err| anyhow!("failed to read fonts of page {page_no}: {err}"))?;
        let content = doc
            .get_page_content(page_id)
            .with_context(|| format!("failed to read content of page {page_no}"))?;
        let content = Content::decode(&content)
            .with_context(|| format!("failed to decode content of page {page_no}"))?;

        walk_operations(&doc, page_no, &content, &fonts, &mut tokens);
    }

    Ok(tokens)
}

fn walk_operations(
    doc: &Document,
    page_no: u32,
    content: &Content,
    fonts: &BTreeMap<Vec<u8>, &Dictionary>,
    out: &mut Vec<PdfToken>,
) {
    let mut matrix = TextMatrix::default();
    let mut font_name: Vec<u8> = Vec::new();
    let mut in_text = false;

    for op in &content.operations {
        match op.operator.as_str() {
            "BT" => {
                in_text = true;
                matrix = TextMatrix::default();
            }
            "ET" => in_text = false,
            "Tf" => {
                if let Some(Object::Name(name)) = op.operands.first() {
                    font_name = name.clone();
                }
            }
            "TL" => {
                if let Some(leading) = op.operands.first().and_then(number) {
                    matrix.leading = leading;
                }
            }
            "Td" => {
                if let (Some(tx), Some(ty)) = (
                    op.operands.first().and_then(number),
                    op.operands.get(1).and_then(number),
                ) {
                    matrix.translate(tx, ty);
                }
            }
            "TD" => {
                if let (Some(tx), Some(ty)) = (
                    op.operands.first().and_then(number),
                    op.operands.get(1).and_then(number),
                ) {
                    matrix.leading = -ty;
                    matrix.translate(tx, ty);
                }
            }
            "Tm" => {
                let values: Vec<f32> = op.operands.iter().filter_map(number).collect();
                if let &[a, b, c, d, e, f] = values.as_slice() {
                    matrix.set(a, b, c, d, e, f);
                }
            }
            "T*" => matrix.next_line(),
            "Tj" | "TJ" | "'" | "\"" => {
                if op.operator == "'" || op.operator == "\"" {
                    matrix.next_line();
                }
                if !in_text {
                    continue;
                }

                let operand = match op.operator.as_str() {
                    "\"" => op.operands.get(2),
                    _ => op.operands.first(),
                };
                let Some(operand) = operand else {
                    continue;
                };

                let text = decode_operand(doc, fonts.get(&font_name).copied(), operand);
                let text = text.trim();
                if !text.is_empty() {
                    let (x, y) = matrix.position();
                    out.push(PdfToken {
                        page: page_no,
                        x,
                        y,
                        text: text.to_string(),
                    });
                }
            }
            _ => {}
        }
    }
}

fn decode_operand(doc: &Document, font: Option<&Dictionary>, operand: &Object) -> String {
    let encoding = font.and_then(|f| f.get_font_encoding(doc).ok());
    let decode = |bytes: &[u8]| match &encoding {
        Some(enc) => Document::decode_text(enc, bytes).unwrap_or_default(),
        None => decode_text_simple(bytes),
    };

    match operand {
        Object::String(bytes, _) => decode(bytes),
        // TJ arrays interleave strings with kerning; a large negative
        // adjustment is a word gap.
        Object::Array(items) => {
            let mut combined = String::new();
            for item in items {
                match item {
                    Object::String(bytes, _) => combined.push_str(&decode(bytes)),
                    other => {
                        if let Some(adjust) = number(other) {
                            if -adjust > 200.0 && !combined.is_empty() && !combined.ends_with(' ') {
                                combined.push(' ');
                            }
                        }
                    }
                }
            }
            combined
        }
        _ => String::new(),
    }
}

fn number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}

fn decode_text_simple(bytes: &[u8]) -> String {
    if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
        let utf16: Vec<u16> = bytes[2..]
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return String::from_utf16_lossy(&utf16);
    }

    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        // Latin-1
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}

struct TextMatrix {
    a: f32,
    b: f32,
    c: f32,
    d: f32,
    e: f32,
    f: f32,
    line_e: f32,
    line_f: f32,
    leading: f32,
}

impl Default for TextMatrix {
    fn default() -> Self {
        Self {
            a: 1.0,
            b: 0.0,
            c: 0.0,
            d: 1.0,
            e: 0.0,
            f: 0.0,
            line_e: 0.0,
            line_f: 0.0,
            leading: DEFAULT_LEADING,
        }
    }
}

impl TextMatrix {
    fn set(&mut self, a: f32, b: f32, c: f32, d: f32, e: f32, f: f32) {
        self.a = a;
        self.b = b;
        self.c = c;
        self.d = d;
        self.e = e;
        self.f = f;
        self.line_e = e;
        self.line_f = f;
    }

    /// Offsets are relative to the start of the current line.
    fn translate(&mut self, tx: f32, ty: f32) {
        self.line_e += tx * self.a + ty * self.c;
        self.line_f += tx * self.b + ty * self.d;
        self.e = self.line_e;
        self.f = self.line_f;
    }

    fn next_line(&mut self) {
        self.translate(0.0, -self.leading);
    }

    fn position(&self) -> (f32, f32) {
        (self.e, self.f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::{content::Operation, dictionary, Stream};

    fn one_page_pdf(operations: Vec<Operation>) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });
        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page_id.into()],
                "Count" => 1,
                "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        bytes
    }

    #[test]
    fn tokens_follow_text_positioning() {
        let bytes = one_page_pdf(vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), 10.into()]),
            Operation::new("Td", vec![100.into(), 700.into()]),
            Operation::new("Tj", vec![Object::string_literal("MON")]),
            Operation::new("Td", vec![80.into(), 0.into()]),
            Operation::new("Tj", vec![Object::string_literal("TUE")]),
            Operation::new("ET", vec![]),
        ]);

        let tokens = extract_pdf_tokens(&bytes).unwrap();
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].text, "MON");
        assert_eq!((tokens[0].x, tokens[0].y), (100.0, 700.0));
        assert_eq!(tokens[1].text, "TUE");
        assert_eq!((tokens[1].x, tokens[1].y), (180.0, 700.0));
        assert!(tokens.iter().all(|t| t.page == 1));
    }

    #[test]
    fn garbage_bytes_are_an_error() {
        assert!(extract_pdf_tokens(b"%PDF-1.4 not really").is_err());
    }

    #[test]
    fn utf16_strings_decode_without_font() {
        assert_eq!(decode_text_simple(&[0xFE, 0xFF, 0x00, 0x41, 0x00, 0x42]), "AB");
        assert_eq!(decode_text_simple(b"Wk1-13"), "Wk1-13");
    }
}
