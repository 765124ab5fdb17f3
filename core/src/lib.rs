//! Core of the todo service: data model, validation and persistence.
//!
//! # Overview
//! A request flows through `TodoService`, which validates the input and then
//! calls a `TodoStore`. The store is either a JSON file (`FileStore`) or a
//! PostgreSQL table (`PgStore`), picked once by `open_store` from `Config`.
//! Database credentials come from `SecretsProvider`, which caches them for a
//! fixed TTL and falls back to environment defaults when the secret source
//! is unavailable.
//!
//! # Design
//! - All store access goes through the `TodoStore` trait; call sites never
//!   branch on the backend.
//! - Mutable state (the JSON document, the secrets cache) is owned by the
//!   store or provider object and only changed through its methods.
//! - Errors are typed (`TodoError`) so the HTTP layer can map validation,
//!   not-found and store failures to distinct statuses.

pub mod config;
pub mod error;
pub mod secrets;
pub mod service;
pub mod store;
pub mod types;
pub mod validation;

pub use config::{Config, Environment};
pub use error::{StoreError, TodoError, ValidationError};
pub use secrets::{DatabaseConfig, SecretsProvider, SslMode};
pub use service::TodoService;
pub use store::{open_store, FileStore, PgStore, TodoStore};
pub use types::{NewTodo, Todo, TodoInput, TodoPatch};
