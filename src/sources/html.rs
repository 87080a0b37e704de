//! Post text extraction from profile page markup.
//!
//! Posts on the monitored profile pages render their body inside a
//! `<div lang="..">` element. Each such block becomes one text fragment.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref POST_BLOCK: Regex =
        Regex::new(r#"(?is)<div\b[^>]*\blang\s*=\s*["'][^"']*["'][^>]*>(.*?)</div>"#)
            .expect("valid post block pattern");
    static ref SCRIPT_OR_STYLE: Regex =
        Regex::new(r"(?is)<(script|style|noscript)\b[^>]*>.*?</(script|style|noscript)>")
            .expect("valid script pattern");
    static ref TAG: Regex =
        Regex::new(r"(?s)<[^>]*>").expect("valid tag pattern");
    static ref ENTITY: Regex = Regex::new(r"&(#[0-9]+|#[xX][0-9a-fA-F]+|[a-zA-Z]+);")
        .expect("valid entity pattern");
}

/// Text of every post block, in document order. Empty blocks are skipped.
pub fn post_fragments(html: &str) -> Vec<String> {
    POST_BLOCK
        .captures_iter(html)
        .filter_map(|caps| caps.get(1))
        .map(|inner| to_text(inner.as_str()))
        .filter(|text| !text.is_empty())
        .collect()
}

/// Visible text of a whole document with scripts and styles removed.
pub fn document_text(html: &str) -> String {
    to_text(&SCRIPT_OR_STYLE.replace_all(html, " "))
}

fn to_text(markup: &str) -> String {
    let stripped = TAG.replace_all(markup, " ");
    let decoded = decode_entities(&stripped);
    decoded.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn decode_entities(text: &str) -> String {
    ENTITY
        .replace_all(text, |caps: &regex::Captures| {
            let name = &caps[1];
            decode_entity(name).unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

fn decode_entity(name: &str) -> Option<String> {
    if let Some(num) = name.strip_prefix('#') {
        let code = match num.strip_prefix(|c: char| c == 'x' || c == 'X') {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => num.parse::<u32>().ok()?,
        };
        return char::from_u32(code).map(String::from);
    }

    let ch = match name {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "nbsp" => ' ',
        "dollar" => '$',
        _ => return None,
    };
    Some(ch.to_string())
}
