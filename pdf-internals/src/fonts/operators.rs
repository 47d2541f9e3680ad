//! Font-selection operator scanner.
//!
//! Finds `/<name> <size> Tf` in raw page content without interpreting the
//! rest of the stream.

use once_cell::sync::Lazy;
use regex::bytes::Regex;

/// A name token, a numeric size, then the `Tf` operator.
///
/// Matched over raw bytes with the PDF whitespace set (space, tab, CR, LF,
/// form feed, NUL). Bytes above 0x7F are regular name characters.
static FONT_SELECT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?-u)/([^ \t\r\n\x0c\x00/\[\]()<>{}%]+)[ \t\r\n\x0c\x00]+[-+]?(?:[0-9]+\.?[0-9]*|\.[0-9]+)[ \t\r\n\x0c\x00]+Tf\b",
    )
    .expect("font-select pattern is valid")
});

/// Every font resource name selected in `content`, in source order.
///
/// Name bytes are decoded as Latin-1, so any input decodes. Duplicates are
/// kept.
pub fn scan_font_operators(content: &[u8]) -> Vec<String> {
    FONT_SELECT
        .captures_iter(content)
        .filter_map(|caps| caps.get(1))
        .map(|name| {
            let latin1: String = name.as_bytes().iter().map(|&b| b as char).collect();
            decode_name_escapes(&latin1)
        })
        .collect()
}

/// Expand `#xx` hex escapes in a PDF name.
fn decode_name_escapes(name: &str) -> String {
    if !name.contains('#') {
        return name.to_string();
    }

    let mut decoded = String::with_capacity(name.len());
    let mut chars = name.chars();
    while let Some(c) = chars.next() {
        if c == '#' {
            let hex: String = chars.clone().take(2).collect();
            if hex.len() == 2
                && let Ok(byte) = u8::from_str_radix(&hex, 16)
            {
                decoded.push(byte as char);
                chars.nth(1);
                continue;
            }
        }
        decoded.push(c);
    }
    decoded
}
