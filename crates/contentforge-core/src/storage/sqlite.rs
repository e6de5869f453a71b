//! Local generation store on SQLite

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::SecondsFormat;
use sqlx::Row;
use tracing::debug;

use super::database::{Database, DatabaseConfig};
use super::{Generation, GenerationKind, GenerationQuery, GenerationStore, NewGeneration};
use crate::error::Result;

const SELECT_COLUMNS: &str =
    "SELECT id, type, prompt, output, template, style, complexity, created_at FROM generations";

/// Generation store for development and tests
#[derive(Debug, Clone)]
pub struct SqliteGenerationStore {
    db: Database,
}

impl SqliteGenerationStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Open (and migrate) the database file at `path`
    pub async fn open(path: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let db = Database::new(DatabaseConfig::with_path(path)).await?;
        Ok(Self::new(db))
    }

    pub async fn in_memory() -> anyhow::Result<Self> {
        Ok(Self::new(Database::in_memory().await?))
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    fn row_to_generation(row: sqlx::sqlite::SqliteRow) -> Generation {
        let kind: String = row.get("type");
        Generation {
            id: row.get("id"),
            kind: GenerationKind::parse(&kind).unwrap_or(GenerationKind::Text),
            prompt: row.get("prompt"),
            output: row.get("output"),
            template: row.get("template"),
            style: row.get("style"),
            complexity: row.get("complexity"),
            created_at: row.get("created_at"),
        }
    }
}

#[async_trait]
impl GenerationStore for SqliteGenerationStore {
    fn backend(&self) -> &'static str {
        "sqlite"
    }

    async fn insert(&self, new: NewGeneration) -> Result<Generation> {
        new.validate()?;
        let generation = new.into_generation();

        sqlx::query(
            r#"
            INSERT INTO generations (id, type, prompt, output, template, style, complexity, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&generation.id)
        .bind(generation.kind.as_str())
        .bind(&generation.prompt)
        .bind(&generation.output)
        .bind(&generation.template)
        .bind(&generation.style)
        .bind(generation.complexity)
        .bind(
            generation
                .created_at
                .to_rfc3339_opts(SecondsFormat::Micros, true),
        )
        .execute(self.db.pool())
        .await?;

        debug!(id = %generation.id, kind = %generation.kind, "Saved generation");
        Ok(generation)
    }

    async fn list(&self, query: &GenerationQuery) -> Result<Vec<Generation>> {
        let limit = i64::from(query.effective_limit());
        let offset = i64::from(query.effective_offset());

        let rows = if let Some(kind) = query.kind {
            sqlx::query(&format!(
                "{} WHERE type = ? ORDER BY created_at DESC, rowid DESC LIMIT ? OFFSET ?",
                SELECT_COLUMNS
            ))
            .bind(kind.as_str())
            .bind(limit)
            .bind(offset)
            .fetch_all(self.db.pool())
            .await?
        } else {
            sqlx::query(&format!(
                "{} ORDER BY created_at DESC, rowid DESC LIMIT ? OFFSET ?",
                SELECT_COLUMNS
            ))
            .bind(limit)
            .bind(offset)
            .fetch_all(self.db.pool())
            .await?
        };

        Ok(rows.into_iter().map(Self::row_to_generation).collect())
    }

    async fn get(&self, id: &str) -> Result<Option<Generation>> {
        let row = sqlx::query(&format!("{} WHERE id = ?", SELECT_COLUMNS))
            .bind(id)
            .fetch_optional(self.db.pool())
            .await?;

        Ok(row.map(Self::row_to_generation))
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM generations WHERE id = ?")
            .bind(id)
            .execute(self.db.pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    fn with_access_token(self: Arc<Self>, _access_token: &str) -> Arc<dyn GenerationStore> {
        self
    }
}
