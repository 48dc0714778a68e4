//! JSON Schema check for untyped policy documents.
//!
//! The policy schema (draft 2020-12, `assets/policy.schema.json`) is compiled
//! once per process. Every violation is reported as a [`FieldError`] with a
//! dotted path (`destinations.video.allow.1`), ordered as the offending fields
//! appear in the document.
//!
//! Optional fields accept `null` as absent, including the string lists under
//! `dom` and `filterModes`.

use std::sync::LazyLock;

use jsonschema::error::{TypeKind, ValidationErrorKind};
use serde_json::Value;

use crate::error::FieldError;

/// The policy document schema.
pub const POLICY_SCHEMA_JSON: &str = include_str!("../../assets/policy.schema.json");

static VALIDATOR: LazyLock<Result<jsonschema::Validator, String>> = LazyLock::new(build);

fn build() -> Result<jsonschema::Validator, String> {
    let schema: Value = serde_json::from_str(POLICY_SCHEMA_JSON).map_err(|e| e.to_string())?;
    jsonschema::options()
        .should_validate_formats(true)
        .build(&schema)
        .map_err(|e| e.to_string())
}

/// Every schema violation in `raw`, in document order.
pub(crate) fn check(raw: &Value) -> Vec<FieldError> {
    let validator = match VALIDATOR.as_ref() {
        Ok(validator) => validator,
        Err(e) => {
            tracing::error!(error = %e, "policy schema failed to compile");
            return vec![FieldError::root(format!("invalid policy schema: {e}"))];
        }
    };

    let mut located: Vec<(Vec<usize>, FieldError)> = validator
        .iter_errors(raw)
        .map(|error| {
            let mut segments = pointer_segments(&error.instance_path().to_string());
            let message = match error.kind() {
                ValidationErrorKind::Required { property } => {
                    segments.push(property.as_str().unwrap_or_default().to_string());
                    "Required".to_string()
                }
                ValidationErrorKind::Type {
                    kind: TypeKind::Single(expected),
                } => format!("Expected {expected}, received {}", type_name(error.instance())),
                ValidationErrorKind::Enum { options } => {
                    enum_message(options, error.instance())
                }
                ValidationErrorKind::Format { format } if format == "uri" => {
                    format!("Invalid url ({error})")
                }
                _ => error.to_string(),
            };
            let position = document_position(raw, &segments);
            (position, FieldError::new(segments.join("."), message))
        })
        .collect();

    located.sort_by(|(a, _), (b, _)| a.cmp(b));
    located.into_iter().map(|(_, error)| error).collect()
}

/// Split a JSON pointer (`/destinations/a~1b/allow/0`) into unescaped keys.
fn pointer_segments(pointer: &str) -> Vec<String> {
    pointer
        .split('/')
        .skip(1)
        .map(|segment| segment.replace("~1", "/").replace("~0", "~"))
        .collect()
}

/// Index of each path segment within its parent, so errors sort the way the
/// fields are written. Missing keys sort after the keys that are present.
fn document_position(raw: &Value, segments: &[String]) -> Vec<usize> {
    let mut position = Vec::with_capacity(segments.len());
    let mut node = Some(raw);
    for segment in segments {
        let (index, child) = match node {
            Some(Value::Object(map)) => (
                map.keys().position(|key| key == segment).unwrap_or(map.len()),
                map.get(segment),
            ),
            Some(Value::Array(items)) => {
                let index = segment.parse().unwrap_or(items.len());
                (index, items.get(index))
            }
            _ => (0, None),
        };
        position.push(index);
        node = child;
    }
    position
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn enum_message(options: &Value, received: &Value) -> String {
    let expected = options
        .as_array()
        .map(|options| {
            options
                .iter()
                .filter_map(Value::as_str)
                .map(|option| format!("'{option}'"))
                .collect::<Vec<_>>()
                .join(" | ")
        })
        .unwrap_or_default();
    let received = match received {
        Value::String(s) => format!("'{s}'"),
        other => type_name(other).to_string(),
    };
    format!("Invalid enum value. Expected {expected}, received {received}")
}
