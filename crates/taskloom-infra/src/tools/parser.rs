//! `parser.*` tools: turn generator text into structured values.
//!
//! Generator output often wraps the payload in prose or a fenced code
//! block; `parser.json_parser` extracts the first balanced object or
//! array and parses it. `parser.xml_parser` parses a well-formed XML
//! document into a nested `{tag, attributes, text, children}` object.

use serde_json::{Map, Value};
use taskloom_core::error::EngineError;
use taskloom_types::param::ParamType;
use taskloom_types::template::{ParamSpec, ToolMetadata};

use super::required_str;

pub(super) const JSON_PARSER_ID: &str = "parser.json_parser";

pub(super) fn json_parser_metadata() -> ToolMetadata {
    ToolMetadata {
        id: JSON_PARSER_ID.to_string(),
        name: "json_parser".to_string(),
        description: "extract and parse the first JSON object or array embedded in text"
            .to_string(),
        inputs: vec![ParamSpec {
            name: "text".to_string(),
            description: "text containing a JSON document".to_string(),
            ty: ParamType::String,
            default: None,
        }],
        outputs: vec![ParamSpec {
            name: "parsed".to_string(),
            description: "the parsed document".to_string(),
            ty: ParamType::Object,
            default: None,
        }],
    }
}

pub(super) fn json_parser(inputs: &Map<String, Value>) -> Result<Map<String, Value>, EngineError> {
    let text = required_str(inputs, "text")?;
    let candidate = extract_document(text).ok_or_else(|| {
        EngineError::Runtime("no JSON object or array found in text".to_string())
    })?;
    let parsed: Value = serde_json::from_str(candidate)?;

    let mut outputs = Map::new();
    outputs.insert("parsed".to_string(), normalize(parsed));
    Ok(outputs)
}

/// Arrays are wrapped so the output always satisfies the declared
/// `object` type.
fn normalize(parsed: Value) -> Value {
    match parsed {
        Value::Object(_) => parsed,
        other => {
            let mut wrapper = Map::new();
            wrapper.insert("items".to_string(), other);
            Value::Object(wrapper)
        }
    }
}

/// The first balanced `{...}` or `[...]` span, respecting strings.
fn extract_document(text: &str) -> Option<&str> {
    let start = text.find(['{', '['])?;
    let bytes = text.as_bytes();
    let open = bytes[start];
    let close = if open == b'{' { b'}' } else { b']' };

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (offset, &byte) in bytes[start..].iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if byte == b'\\' {
                escaped = true;
            } else if byte == b'"' {
                in_string = false;
            }
            continue;
        }
        match byte {
            b'"' => in_string = true,
            b if b == open => depth += 1,
            b if b == close => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..=start + offset]);
                }
            }
            _ => {}
        }
    }
    None
}

// ---------------------------------------------------------------------------
// parser.xml_parser
// ---------------------------------------------------------------------------

pub(super) const XML_PARSER_ID: &str = "parser.xml_parser";

pub(super) fn xml_parser_metadata() -> ToolMetadata {
    ToolMetadata {
        id: XML_PARSER_ID.to_string(),
        name: "xml_parser".to_string(),
        description: "parse an XML document string into a nested object".to_string(),
        inputs: vec![ParamSpec {
            name: "xml_string".to_string(),
            description: "XML document string".to_string(),
            ty: ParamType::String,
            default: None,
        }],
        outputs: vec![ParamSpec {
            name: "data".to_string(),
            description: "the parsed document: tag, attributes, text, children".to_string(),
            ty: ParamType::Object,
            default: None,
        }],
    }
}

pub(super) fn xml_parser(inputs: &Map<String, Value>) -> Result<Map<String, Value>, EngineError> {
    let xml = required_str(inputs, "xml_string")?.trim();
    if xml.is_empty() {
        return Err(EngineError::Parameter(
            "tool input 'xml_string' must not be empty".to_string(),
        ));
    }
    let root = XmlCursor::new(xml)
        .parse_document()
        .map_err(|err| EngineError::Runtime(format!("invalid XML string: {err}")))?;

    let mut outputs = Map::new();
    outputs.insert("data".to_string(), root);
    Ok(outputs)
}

/// Byte cursor over one XML document.
///
/// Handles elements, attributes, nested children, self-closing tags,
/// comments, the XML declaration, and the five predefined entities.
/// Delimiters are all ASCII, so byte offsets always land on character
/// boundaries.
struct XmlCursor<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> XmlCursor<'a> {
    fn new(text: &'a str) -> Self {
        Self { text, pos: 0 }
    }

    fn parse_document(mut self) -> Result<Value, String> {
        self.skip_prolog();
        let root = self.parse_element()?;
        self.skip_prolog();
        if self.pos < self.text.len() {
            return Err("trailing content after the root element".to_string());
        }
        Ok(root)
    }

    /// One element, cursor at its `<`.
    fn parse_element(&mut self) -> Result<Value, String> {
        self.expect(b'<')?;
        let tag = self.read_name()?;
        let mut attributes = Map::new();

        loop {
            self.skip_whitespace();
            match self.peek() {
                Some(b'/') => {
                    self.pos += 1;
                    self.expect(b'>')?;
                    return Ok(element_node(&tag, attributes, "", Vec::new()));
                }
                Some(b'>') => {
                    self.pos += 1;
                    break;
                }
                Some(_) => {
                    let (key, value) = self.read_attribute(&tag)?;
                    attributes.insert(key, Value::String(value));
                }
                None => return Err(format!("unclosed start tag '<{tag}'")),
            }
        }

        let mut text = String::new();
        let mut children = Vec::new();
        loop {
            if self.starts_with("</") {
                self.pos += 2;
                let closing = self.read_name()?;
                if closing != tag {
                    return Err(format!("expected '</{tag}>', found '</{closing}>'"));
                }
                self.skip_whitespace();
                self.expect(b'>')?;
                return Ok(element_node(&tag, attributes, text.trim(), children));
            } else if self.starts_with("<!--") {
                self.skip_past("-->")?;
            } else if self.peek() == Some(b'<') {
                children.push(self.parse_element()?);
            } else if self.peek().is_none() {
                return Err(format!("unclosed element '<{tag}>'"));
            } else {
                let end = self.text[self.pos..]
                    .find('<')
                    .map_or(self.text.len(), |idx| self.pos + idx);
                text.push_str(&decode_entities(&self.text[self.pos..end]));
                self.pos = end;
            }
        }
    }

    fn read_attribute(&mut self, tag: &str) -> Result<(String, String), String> {
        let key = self.read_name()?;
        self.skip_whitespace();
        self.expect(b'=')?;
        self.skip_whitespace();
        let quote = match self.peek() {
            Some(q @ (b'"' | b'\'')) => q,
            _ => return Err(format!("attribute '{key}' of '<{tag}>' has an unquoted value")),
        };
        self.pos += 1;
        let end = self.text[self.pos..]
            .find(quote as char)
            .map(|idx| self.pos + idx)
            .ok_or_else(|| format!("attribute '{key}' of '<{tag}>' is missing a closing quote"))?;
        let value = decode_entities(&self.text[self.pos..end]);
        self.pos = end + 1;
        Ok((key, value))
    }

    fn read_name(&mut self) -> Result<String, String> {
        let start = self.pos;
        while let Some(byte) = self.peek() {
            if byte.is_ascii_alphanumeric() || matches!(byte, b'_' | b'-' | b'.' | b':') {
                self.pos += 1;
            } else {
                break;
            }
        }
        if self.pos == start {
            return Err(format!("expected a name at offset {start}"));
        }
        Ok(self.text[start..self.pos].to_string())
    }

    /// Whitespace, the XML declaration, comments, and a DOCTYPE.
    fn skip_prolog(&mut self) {
        loop {
            self.skip_whitespace();
            if self.starts_with("<?") {
                if self.skip_past("?>").is_err() {
                    return;
                }
            } else if self.starts_with("<!--") {
                if self.skip_past("-->").is_err() {
                    return;
                }
            } else if self.starts_with("<!") {
                if self.skip_past(">").is_err() {
                    return;
                }
            } else {
                return;
            }
        }
    }

    fn skip_past(&mut self, marker: &str) -> Result<(), String> {
        match self.text[self.pos..].find(marker) {
            Some(idx) => {
                self.pos += idx + marker.len();
                Ok(())
            }
            None => Err(format!("unterminated construct, expected '{marker}'")),
        }
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(byte) if byte.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    fn starts_with(&self, prefix: &str) -> bool {
        self.text[self.pos..].starts_with(prefix)
    }

    fn peek(&self) -> Option<u8> {
        self.text.as_bytes().get(self.pos).copied()
    }

    fn expect(&mut self, byte: u8) -> Result<(), String> {
        if self.peek() == Some(byte) {
            self.pos += 1;
            Ok(())
        } else {
            Err(format!("expected '{}' at offset {}", byte as char, self.pos))
        }
    }
}

fn element_node(tag: &str, attributes: Map<String, Value>, text: &str, children: Vec<Value>) -> Value {
    let mut node = Map::new();
    node.insert("tag".to_string(), Value::String(tag.to_string()));
    node.insert("attributes".to_string(), Value::Object(attributes));
    node.insert("text".to_string(), Value::String(text.to_string()));
    node.insert("children".to_string(), Value::Array(children));
    Value::Object(node)
}

/// The five predefined XML entities; an unknown entity passes through.
fn decode_entities(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(idx) = rest.find('&') {
        out.push_str(&rest[..idx]);
        rest = &rest[idx..];
        let decoded = [
            ("&lt;", '<'),
            ("&gt;", '>'),
            ("&amp;", '&'),
            ("&quot;", '"'),
            ("&apos;", '\''),
        ]
        .iter()
        .find(|(entity, _)| rest.starts_with(entity));
        match decoded {
            Some((entity, ch)) => {
                out.push(*ch);
                rest = &rest[entity.len()..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}
