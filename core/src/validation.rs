//! Input validation for create and update requests.
//!
//! Rules run in a fixed order and the first failure wins. Length is checked
//! against the untrimmed text, emptiness against the trimmed text. Length is
//! measured in UTF-16 code units, the unit browser clients count in.

use serde_json::Value;

use crate::error::{ValidationError, MAX_TEXT_LEN};
use crate::types::{NewTodo, TodoInput, TodoPatch};

pub fn validate_create(input: &TodoInput) -> Result<NewTodo, ValidationError> {
    let text = input
        .text
        .as_ref()
        .filter(|value| !value.is_null())
        .ok_or(ValidationError::MissingField("text"))?;
    Ok(NewTodo {
        text: validate_text(text)?,
        completed: input.completed.as_ref().is_some_and(is_truthy),
    })
}

pub fn validate_update(id: &str, input: &TodoInput) -> Result<TodoPatch, ValidationError> {
    if id.trim().is_empty() {
        return Err(ValidationError::MissingId);
    }
    let text = input.text.as_ref().map(validate_text).transpose()?;
    Ok(TodoPatch {
        text,
        completed: input.completed.as_ref().map(is_truthy),
    })
}

fn validate_text(value: &Value) -> Result<String, ValidationError> {
    let Value::String(raw) = value else {
        return Err(ValidationError::InvalidType {
            field: "text",
            expected: "string",
        });
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyText);
    }
    let len = raw.encode_utf16().count();
    if len > MAX_TEXT_LEN {
        return Err(ValidationError::TooLong(len));
    }
    Ok(trimmed.to_string())
}

/// JSON truthiness: `false`, `0`, `""` and `null` are false.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
