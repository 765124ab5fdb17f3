use async_trait::async_trait;
use chrono::NaiveDateTime;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions, PgSslMode};
use sqlx::{FromRow, Postgres, QueryBuilder};
use uuid::Uuid;

use super::TodoStore;
use crate::error::{Result, TodoError};
use crate::secrets::{DatabaseConfig, SslMode};
use crate::types::{NewTodo, Todo, TodoPatch};

const COLUMNS: &str = "id, text, completed, created_at, updated_at";

const CREATE_TABLE: &str = "CREATE TABLE IF NOT EXISTS todos (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    text TEXT NOT NULL,
    completed BOOLEAN DEFAULT FALSE,
    created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
    updated_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
)";

#[derive(Debug, FromRow)]
struct TodoRow {
    id: Uuid,
    text: String,
    completed: Option<bool>,
    created_at: Option<NaiveDateTime>,
    updated_at: Option<NaiveDateTime>,
}

impl From<TodoRow> for Todo {
    fn from(row: TodoRow) -> Self {
        // TIMESTAMP columns carry no zone; the server writes them in UTC.
        let created_at = row.created_at.unwrap_or_default().and_utc();
        let updated_at = row
            .updated_at
            .map(|t| t.and_utc())
            .unwrap_or(created_at);
        Todo {
            id: row.id,
            text: row.text,
            completed: row.completed.unwrap_or(false),
            created_at,
            updated_at,
        }
    }
}

/// PostgreSQL backend over a single `todos` table.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connect, verify the connection and create the table if missing.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect_with(connect_options(config))
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Database connection failed"))?;

        sqlx::query("SELECT NOW()").execute(&pool).await?;
        tracing::info!(
            host = %config.host,
            port = config.port,
            database = %config.database,
            ssl_mode = config.ssl_mode.as_str(),
            "Connected to PostgreSQL database"
        );

        let store = Self::from_pool(pool);
        store.initialize_schema().await?;
        Ok(store)
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn initialize_schema(&self) -> Result<()> {
        sqlx::query(CREATE_TABLE)
            .execute(&self.pool)
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Failed to initialize database schema"))?;
        tracing::info!("Database schema initialized");
        Ok(())
    }
}

fn connect_options(config: &DatabaseConfig) -> PgConnectOptions {
    let ssl_mode = match config.ssl_mode {
        SslMode::Disable => PgSslMode::Disable,
        SslMode::Prefer => PgSslMode::Prefer,
        SslMode::Require => PgSslMode::Require,
    };
    PgConnectOptions::new()
        .host(&config.host)
        .port(config.port)
        .database(&config.database)
        .username(&config.user)
        .password(&config.password)
        .ssl_mode(ssl_mode)
}

/// `UPDATE` touching only the supplied columns; `updated_at` is always set.
fn update_query(id: Uuid, patch: TodoPatch) -> QueryBuilder<'static, Postgres> {
    let mut query = QueryBuilder::new("UPDATE todos SET ");
    {
        let mut set = query.separated(", ");
        if let Some(text) = patch.text {
            set.push("text = ").push_bind_unseparated(text);
        }
        if let Some(completed) = patch.completed {
            set.push("completed = ").push_bind_unseparated(completed);
        }
        set.push("updated_at = CURRENT_TIMESTAMP");
    }
    query
        .push(" WHERE id = ")
        .push_bind(id)
        .push(" RETURNING ")
        .push(COLUMNS);
    query
}

#[async_trait]
impl TodoStore for PgStore {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn list(&self) -> Result<Vec<Todo>> {
        let rows: Vec<TodoRow> = sqlx::query_as(&format!(
            "SELECT {COLUMNS} FROM todos ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Todo::from).collect())
    }

    async fn create(&self, todo: NewTodo) -> Result<Todo> {
        let row: TodoRow = sqlx::query_as(&format!(
            "INSERT INTO todos (text, completed) VALUES ($1, $2) RETURNING {COLUMNS}"
        ))
        .bind(todo.text)
        .bind(todo.completed)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    async fn update(&self, id: Uuid, patch: TodoPatch) -> Result<Todo> {
        let mut query = update_query(id, patch);
        let row: Option<TodoRow> = query
            .build_query_as::<TodoRow>()
            .fetch_optional(&self.pool)
            .await?;
        row.map(Todo::from).ok_or_else(|| TodoError::not_found(id))
    }

    async fn delete(&self, id: Uuid) -> Result<Todo> {
        let row: Option<TodoRow> = sqlx::query_as(&format!(
            "DELETE FROM todos WHERE id = $1 RETURNING {COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Todo::from).ok_or_else(|| TodoError::not_found(id))
    }

    async fn close(&self) {
        self.pool.close().await;
        tracing::info!("Database connection closed");
    }
}
