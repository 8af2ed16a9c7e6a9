//! Strict parsing of the completion response.

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

use super::{FieldKind, PACKAGING, Stage, TRANSPORTATION, expected_field};
use crate::error::ParseError;

/// Result type for response parsing.
pub type Result<T> = std::result::Result<T, ParseError>;

/// Field values keyed by display name, in the order the model emitted them.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ExtractionResult(Map<String, Value>);

impl ExtractionResult {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Stage implied by the keys present.
    pub fn stage(&self) -> Stage {
        if TRANSPORTATION.fields.iter().any(|f| self.contains_key(f.name)) {
            Stage::Transportation
        } else if PACKAGING.fields.iter().any(|f| self.contains_key(f.name)) {
            Stage::Packaging
        } else {
            Stage::Unknown
        }
    }
}

impl From<Map<String, Value>> for ExtractionResult {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// Parses completion responses into extraction results.
#[derive(Debug, Clone)]
pub struct ResponseParser {
    strict_types: bool,
}

impl Default for ResponseParser {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseParser {
    pub fn new() -> Self {
        Self { strict_types: true }
    }

    /// Check values of known fields against their declared kind.
    pub fn with_strict_types(mut self, strict: bool) -> Self {
        self.strict_types = strict;
        self
    }

    /// Parse the raw response text in a single attempt.
    pub fn parse(&self, text: &str) -> Result<ExtractionResult> {
        let value: Value = serde_json::from_str(text)?;
        let Value::Object(map) = value else {
            return Err(ParseError::NotAnObject(json_type(&value)));
        };

        if self.strict_types {
            for (key, value) in &map {
                if let Some(spec) = expected_field(key) {
                    check_kind(key, spec.kind, value)?;
                }
            }
        }

        debug!(keys = map.len(), "Parsed extraction result");
        Ok(ExtractionResult(map))
    }
}

/// Parse with strict type checking.
pub fn parse_response(text: &str) -> Result<ExtractionResult> {
    ResponseParser::new().parse(text)
}

fn check_kind(field: &str, kind: FieldKind, value: &Value) -> Result<()> {
    let ok = match (kind, value) {
        (_, Value::Null) => true,
        (FieldKind::String, Value::String(_)) => true,
        (FieldKind::Number, Value::Number(_)) => true,
        (FieldKind::YesNo, Value::String(s)) => {
            s.eq_ignore_ascii_case("yes") || s.eq_ignore_ascii_case("no")
        }
        _ => false,
    };

    if ok {
        Ok(())
    } else {
        Err(ParseError::TypeMismatch {
            field: field.to_string(),
            expected: kind.describe(),
            found: json_type(value),
        })
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
