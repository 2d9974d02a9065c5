//! Identifier and media-type helpers shared by loading, synthesis and
//! rendering.

use std::collections::HashSet;

use crate::ir::BodyContentType;

/// Words a generated identifier may not be, sorted for binary search.
const RESERVED: &[&str] = &[
    "async", "await", "break", "case", "catch", "class", "const", "continue", "debugger",
    "default", "delete", "do", "else", "enum", "export", "extends", "false", "finally", "for",
    "function", "if", "implements", "import", "in", "instanceof", "interface", "let", "new",
    "null", "package", "private", "protected", "public", "return", "static", "super", "switch",
    "this", "throw", "true", "try", "typeof", "var", "void", "while", "with", "yield",
];

pub fn is_reserved(word: &str) -> bool {
    RESERVED.binary_search(&word).is_ok()
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || c == '$'
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '$'
}

/// `true` when `name` can't be written as a bare property key.
pub fn needs_bracket_notation(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => !is_ident_start(first) || !chars.all(is_ident_char),
        None => true,
    }
}

/// Backslashes and double quotes escaped for a double-quoted literal.
pub fn escape_js_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '\\' | '"') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Property key as written in a type literal.
pub fn quote_if_needed(name: &str) -> String {
    if needs_bracket_notation(name) {
        format!("\"{}\"", escape_js_string(name))
    } else {
        name.to_string()
    }
}

/// Identifier from a document name. `-`, `.` and spaces start a new
/// capitalized word; the first word keeps its case.
pub fn sanitize_ts_identifier(name: &str) -> String {
    let mut words = name.split(['-', '.', ' ']);
    let mut result = words.next().unwrap_or_default().to_string();
    for word in words {
        result.push_str(&capitalize_first(word));
    }
    finish_identifier(result)
}

pub fn capitalize_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn lowercase_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        None => String::new(),
        Some(first) => first.to_lowercase().chain(chars).collect(),
    }
}

/// camelCase over any non-alphanumeric separator: `pet_owner` → `petOwner`,
/// `Order` → `order`.
pub fn to_camel_case(s: &str) -> String {
    let mut result = String::new();
    for part in s.split(|c: char| !c.is_ascii_alphanumeric()) {
        if part.is_empty() {
            continue;
        }
        if result.is_empty() {
            result.push_str(&lowercase_first(part));
        } else {
            result.push_str(&capitalize_first(part));
        }
    }
    result
}

/// PascalCase over any non-alphanumeric separator.
pub fn to_pascal_case(s: &str) -> String {
    capitalize_first(&to_camel_case(s))
}

/// Declaration name for a Named Schema.
pub fn model_identifier(schema_name: &str) -> String {
    finish_identifier(to_pascal_case(schema_name))
}

/// camelCase identifier safe for use as a field or argument name.
pub fn field_identifier(name: &str) -> String {
    finish_identifier(to_camel_case(name))
}

fn finish_identifier(mut result: String) -> String {
    if result.is_empty() {
        return "_empty".to_string();
    }
    if result.starts_with(|c: char| c.is_ascii_digit()) {
        result.insert(0, '_');
    }
    if is_reserved(&result) {
        result.insert(0, '_');
    }
    result
}

/// Media type without parameters, lowercased: `application/json; charset=utf-8`
/// → `application/json`.
pub fn essence(media_type: &str) -> String {
    media_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// `application/json` and `+json` structured syntax suffixes.
pub fn is_json_media_type(media_type: &str) -> bool {
    let essence = essence(media_type);
    essence == "application/json" || essence.ends_with("+json")
}

/// Argument name for a request body variant.
pub fn media_type_argument(media_type: &str) -> String {
    if is_json_media_type(media_type) {
        return "json".to_string();
    }
    let essence = essence(media_type);
    let subtype = essence.split_once('/').map_or(essence.as_str(), |(_, s)| s);
    let subtype = subtype.strip_prefix("x-").unwrap_or(subtype);
    let name = to_camel_case(subtype);
    if name.is_empty() {
        "body".to_string()
    } else {
        field_identifier(&name)
    }
}

/// `base`, then `base2`, `base3`, ... until unused. The chosen name is
/// recorded in `taken`.
pub fn unique_name(base: &str, taken: &mut HashSet<String>) -> String {
    let mut candidate = base.to_string();
    let mut n = 2;
    while taken.contains(&candidate) {
        candidate = format!("{base}{n}");
        n += 1;
    }
    taken.insert(candidate.clone());
    candidate
}

/// How a request body of the given media type is serialized.
pub fn body_content_type(media_type: &str) -> BodyContentType {
    let essence = essence(media_type);
    if is_json_media_type(&essence) {
        BodyContentType::Json
    } else if essence == "multipart/form-data" {
        BodyContentType::FormData
    } else if essence == "application/x-www-form-urlencoded" {
        BodyContentType::UrlEncoded
    } else if essence.starts_with("text/") {
        BodyContentType::Text
    } else {
        BodyContentType::Binary
    }
}
