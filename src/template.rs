//! Page templates with `{{ field }}` placeholders.
//!
//! A template is parsed once and rendered against any value that serializes to
//! a flat object. String values are HTML-escaped on output.

use std::{fs, path::Path};

use serde::Serialize;
use serde_json::Value;

use crate::error::TemplateError;

const OPEN: &str = "{{";
const CLOSE: &str = "}}";

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Text(String),
    Field(String),
}

#[derive(Debug, Clone)]
pub struct Template {
    segments: Vec<Segment>,
}

impl Template {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, TemplateError> {
        let path = path.as_ref();
        let source = fs::read_to_string(path).map_err(|source| TemplateError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        Self::parse(&source)
    }

    pub fn parse(source: &str) -> Result<Self, TemplateError> {
        let mut segments = Vec::new();
        let mut offset = 0;

        while let Some(start) = source[offset..].find(OPEN) {
            let start = offset + start;
            if start > offset {
                segments.push(Segment::Text(source[offset..start].to_owned()));
            }

            let name_start = start + OPEN.len();
            let end = source[name_start..]
                .find(CLOSE)
                .map(|end| name_start + end)
                .ok_or(TemplateError::Unterminated(start))?;

            let name = source[name_start..end].trim();
            if name.is_empty() {
                return Err(TemplateError::EmptyPlaceholder(start));
            }
            segments.push(Segment::Field(name.to_owned()));

            offset = end + CLOSE.len();
        }

        if offset < source.len() {
            segments.push(Segment::Text(source[offset..].to_owned()));
        }

        Ok(Self { segments })
    }

    pub fn render<T: Serialize>(&self, data: &T) -> Result<String, TemplateError> {
        let value = serde_json::to_value(data)?;
        let fields = value.as_object().ok_or(TemplateError::NotAnObject)?;

        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Field(name) => {
                    let value = fields
                        .get(name)
                        .ok_or_else(|| TemplateError::MissingField(name.clone()))?;
                    match value {
                        Value::Null => {}
                        Value::String(s) => escape_html(s, &mut out),
                        other => escape_html(&other.to_string(), &mut out),
                    }
                }
            }
        }

        Ok(out)
    }
}

fn escape_html(s: &str, out: &mut String) {
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
}
