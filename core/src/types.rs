//! Domain types for the todo service.
//!
//! # Design
//! `Todo` is the stored record and the wire shape, serialized with camelCase
//! keys so the JSON file document and the REST responses share one layout.
//! `TodoInput` is the raw request body: its fields stay as JSON values until
//! the validation layer turns them into a `NewTodo` or a `TodoPatch`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// A single persisted todo item.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Todo {
    pub id: Uuid,
    pub text: String,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Unvalidated request body shared by create and update.
///
/// An absent key is `None`; a key set to JSON `null` is `Some(Value::Null)`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TodoInput {
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub text: Option<Value>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub completed: Option<Value>,
}

/// Only called for keys that exist, so `null` stays distinguishable from absent.
fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

/// A create payload that has passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTodo {
    pub text: String,
    pub completed: bool,
}

/// A validated partial update. `None` fields are left untouched by the store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TodoPatch {
    pub text: Option<String>,
    pub completed: Option<bool>,
}

impl TodoPatch {
    /// True when the update only refreshes `updated_at`.
    pub fn is_empty(&self) -> bool {
        self.text.is_none() && self.completed.is_none()
    }
}
