//! Content negotiation and body serialization.
//!
//! Accept entries are scanned in the order the client listed them, with any
//! `;q=` parameter stripped and ignored. The first JSON or XML media type
//! decides; JSON is the fallback.

use serde_json::{Map, Value};
use thiserror::Error;

use crate::ajax::headers::ResponseHeaderSet;

const XML_ROOT: &str = "response";
const XML_DECLARATION: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n";
const INDENT: &str = "  ";

#[derive(Debug, Error)]
pub enum SerializeError {
    #[error("JSON encoding failed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("illegal XML element name '{0}'")]
    InvalidXmlName(String),
    #[error("character {0:?} cannot appear in XML")]
    InvalidXmlChar(char),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Json,
    Xml,
}

impl Format {
    pub fn content_type(&self) -> &'static str {
        match self {
            Format::Json => "text/json",
            Format::Xml => "text/xml",
        }
    }
}

pub fn negotiate(accept: &str) -> Format {
    for entry in accept.split(',') {
        let media_type = entry.split(';').next().unwrap_or_default().trim();
        match media_type {
            "text/json" | "application/json" => return Format::Json,
            "text/xml" | "application/xml" => return Format::Xml,
            _ => {}
        }
    }
    Format::Json
}

/// Serializes `body` for `accept` and records the matching Content-Type.
///
/// Non-object bodies are wrapped as `{"message": body}` first.
pub fn generate_response(
    body: Value,
    accept: &str,
    headers: &mut ResponseHeaderSet,
) -> Result<Vec<u8>, SerializeError> {
    let body = match body {
        Value::Object(map) => map,
        other => {
            let mut map = Map::new();
            map.insert("message".to_string(), other);
            map
        }
    };

    let format = negotiate(accept);
    let bytes = render(&body, format)?;
    headers.add_header("Content-Type", format.content_type());
    Ok(bytes)
}

pub fn render(body: &Map<String, Value>, format: Format) -> Result<Vec<u8>, SerializeError> {
    match format {
        Format::Json => Ok(serde_json::to_vec(body)?),
        Format::Xml => to_xml(body).map(String::into_bytes),
    }
}

/// Pretty-printed XML document rooted at `<response>`.
pub fn to_xml(body: &Map<String, Value>) -> Result<String, SerializeError> {
    let mut out = String::from(XML_DECLARATION);
    write_map(&mut out, XML_ROOT, body, 0)?;
    Ok(out)
}

fn write_element(out: &mut String, name: &str, value: &Value, depth: usize) -> Result<(), SerializeError> {
    if !is_valid_name(name) {
        return Err(SerializeError::InvalidXmlName(name.to_string()));
    }

    match value {
        // Arrays repeat the parent element once per item.
        Value::Array(items) => {
            for item in items {
                write_element(out, name, item, depth)?;
            }
        }
        Value::Object(map) => write_map(out, name, map, depth)?,
        Value::Null => {
            indent(out, depth);
            out.push_str(&format!("<{name}/>\n"));
        }
        Value::Bool(b) => write_text(out, name, if *b { "true" } else { "false" }, depth),
        Value::Number(n) => write_text(out, name, &n.to_string(), depth),
        Value::String(s) => write_text(out, name, &escape(s)?, depth),
    }
    Ok(())
}

fn write_map(
    out: &mut String,
    name: &str,
    map: &Map<String, Value>,
    depth: usize,
) -> Result<(), SerializeError> {
    indent(out, depth);
    if map.is_empty() {
        out.push_str(&format!("<{name}/>\n"));
        return Ok(());
    }

    out.push_str(&format!("<{name}>\n"));
    for (key, value) in map {
        write_element(out, key, value, depth + 1)?;
    }
    indent(out, depth);
    out.push_str(&format!("</{name}>\n"));
    Ok(())
}

fn write_text(out: &mut String, name: &str, text: &str, depth: usize) {
    indent(out, depth);
    out.push_str(&format!("<{name}>{text}</{name}>\n"));
}

fn indent(out: &mut String, depth: usize) {
    for _ in 0..depth {
        out.push_str(INDENT);
    }
}

fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    (first.is_ascii_alphabetic() || first == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | ':'))
        && !name.ends_with(':')
}

/// XML 1.0 `Char` production. Surrogates cannot occur in a `char`.
fn is_xml_char(c: char) -> bool {
    matches!(c, '\t' | '\n' | '\r') || (c >= ' ' && !matches!(c, '\u{FFFE}' | '\u{FFFF}'))
}

fn escape(text: &str) -> Result<String, SerializeError> {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '\r' => escaped.push_str("&#13;"),
            _ if !is_xml_char(c) => return Err(SerializeError::InvalidXmlChar(c)),
            _ => escaped.push(c),
        }
    }
    Ok(escaped)
}
