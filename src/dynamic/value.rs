//! Document decoding, dotted-path lookup and permissive coercion.
//!
//! # Coercion Rules
//! ```text
//! string: string as-is | number → decimal text | bool → "true"/"false" | else ""
//! int:    int as-is | float → truncated toward zero | string → parsed i64 | bool → 1/0 | else 0
//! bool:   bool as-is | string → true/1/yes/on/t/y (any case) | number → != 0 | else false
//! float:  number widened | string → parsed f64 | bool → 1.0/0.0 | else 0.0
//! ```
//!
//! # Design Decisions
//! - Getters never fail: absent paths and impossible coercions yield the zero value
//! - Path segments match exactly first, then ASCII-case-insensitively
//! - A numeric segment indexes into a sequence

use serde_yaml::{Mapping, Value};
use thiserror::Error;

const TRUTHY: &[&str] = &["true", "1", "yes", "on", "t", "y"];

/// A stored document that cannot become a snapshot.
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("top-level document must be a mapping, found {0}")]
    NotAMapping(&'static str),
}

/// An empty snapshot.
pub fn empty() -> Value {
    Value::Mapping(Mapping::new())
}

/// Whether `value` is an empty snapshot (no keys at all).
pub fn is_empty(value: &Value) -> bool {
    match value {
        Value::Mapping(map) => map.is_empty(),
        Value::Null => true,
        _ => false,
    }
}

/// Decode raw store bytes into a snapshot tree.
///
/// Blank documents decode to an empty mapping.
pub fn parse_document(bytes: &[u8]) -> Result<Value, DocumentError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(empty());
    }
    match serde_yaml::from_slice::<Value>(bytes)? {
        Value::Null => Ok(empty()),
        doc @ Value::Mapping(_) => Ok(doc),
        other => Err(DocumentError::NotAMapping(kind_name(&other))),
    }
}

fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Sequence(_) => "sequence",
        Value::Mapping(_) => "mapping",
        Value::Tagged(_) => "tagged value",
    }
}

/// Resolve a dotted path. Explicit nulls count as absent.
pub fn lookup<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = root;
    if !path.is_empty() {
        for segment in path.split('.') {
            current = step(current, segment)?;
        }
    }
    match current {
        Value::Null => None,
        other => Some(other),
    }
}

fn step<'a>(value: &'a Value, segment: &str) -> Option<&'a Value> {
    match value {
        Value::Mapping(map) => lookup_key(map, segment),
        Value::Sequence(seq) => seq.get(segment.parse::<usize>().ok()?),
        Value::Tagged(tagged) => step(&tagged.value, segment),
        _ => None,
    }
}

fn lookup_key<'a>(map: &'a Mapping, segment: &str) -> Option<&'a Value> {
    if let Some(v) = map.get(segment) {
        return Some(v);
    }
    map.iter()
        .find(|(k, _)| match k {
            Value::String(s) => s.eq_ignore_ascii_case(segment),
            Value::Number(n) => n.to_string() == segment,
            Value::Bool(b) => b.to_string().eq_ignore_ascii_case(segment),
            _ => false,
        })
        .map(|(_, v)| v)
}

pub fn to_string(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(Value::Tagged(t)) => to_string(Some(&t.value)),
        _ => String::new(),
    }
}

pub fn to_int(value: Option<&Value>) -> i64 {
    match value {
        Some(Value::Number(n)) => {
            if let Some(i) = n.as_i64() {
                i
            } else if n.is_u64() {
                // Larger than i64::MAX: not representable.
                0
            } else {
                n.as_f64().map(truncate).unwrap_or(0)
            }
        }
        Some(Value::String(s)) => s.trim().parse::<i64>().unwrap_or(0),
        Some(Value::Bool(b)) => i64::from(*b),
        Some(Value::Tagged(t)) => to_int(Some(&t.value)),
        _ => 0,
    }
}

fn truncate(f: f64) -> i64 {
    if f.is_finite() {
        f.trunc() as i64
    } else {
        0
    }
}

pub fn to_bool(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => {
            let token = s.trim().to_ascii_lowercase();
            TRUTHY.contains(&token.as_str())
        }
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
        Some(Value::Tagged(t)) => to_bool(Some(&t.value)),
        _ => false,
    }
}

pub fn to_float(value: Option<&Value>) -> f64 {
    match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse::<f64>().unwrap_or(0.0),
        Some(Value::Bool(b)) => {
            if *b {
                1.0
            } else {
                0.0
            }
        }
        Some(Value::Tagged(t)) => to_float(Some(&t.value)),
        _ => 0.0,
    }
}

/// Sequences yield their scalar items as strings; a string splits on whitespace.
pub fn to_string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Sequence(items)) => items
            .iter()
            .filter(|v| matches!(v, Value::String(_) | Value::Number(_) | Value::Bool(_)))
            .map(|v| to_string(Some(v)))
            .collect(),
        Some(Value::String(s)) => s.split_whitespace().map(str::to_string).collect(),
        _ => Vec::new(),
    }
}
