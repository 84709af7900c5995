use lazy_static::lazy_static;
use regex::Regex;

use super::PdfToken;

lazy_static! {
    static ref TRAILING_WS_RE: Regex = Regex::new(r"[ \t]+\n").unwrap();
    static ref WORD_RE: Regex = Regex::new(r"\S+").unwrap();
}

/// Horizontal layout units per character column of a text export.
const COLUMN_WIDTH: f32 = 5.0;
/// Vertical layout units between consecutive text lines.
const LINE_HEIGHT: f32 = 10.0;
const PAGE_TOP: f32 = 10_000.0;

pub fn clean_text(raw: &str) -> String {
    let without_cr = raw.replace('\r', "");
    TRAILING_WS_RE
        .replace_all(&without_cr, "\n")
        .trim()
        .to_string()
}

/// Synthesizes positioned tokens for a plain-text export so it can go through
/// the same layout pipeline as a PDF. A form feed starts a new page.
pub fn tokens_from_text(text: &str) -> Vec<PdfToken> {
    let mut tokens = Vec::new();

    for (page_idx, page) in text.split('\x0c').enumerate() {
        let page_no = page_idx as u32 + 1;
        for (line_idx, line) in page.lines().enumerate() {
            let y = PAGE_TOP - line_idx as f32 * LINE_HEIGHT;
            for word in WORD_RE.find_iter(line) {
                let column = line[..word.start()].chars().count();
                tokens.push(PdfToken {
                    page: page_no,
                    x: column as f32 * COLUMN_WIDTH,
                    y,
                    text: word.as_str().to_string(),
                });
            }
        }
    }

    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_trailing_blanks_and_carriage_returns() {
        assert_eq!(clean_text("  a  \t\r\nb\r\n\n"), "a\nb");
    }

    #[test]
    fn columns_and_lines_map_to_coordinates() {
        let tokens = tokens_from_text("MON   TUE\nSC2006\x0cWED");
        assert_eq!(tokens.len(), 4);
        assert_eq!((tokens[0].x, tokens[0].y), (0.0, PAGE_TOP));
        assert_eq!(tokens[1].x, 30.0);
        assert_eq!(tokens[2].y, PAGE_TOP - LINE_HEIGHT);
        assert_eq!(tokens[3].page, 2);
        assert_eq!(tokens[3].y, PAGE_TOP);
    }
}
