//! Storage layer for saved generations
//!
//! # Architecture
//!
//! - `database`: SQLite connection pool management and initialization
//! - `migrations`: Schema versioning and automatic migration
//! - `sqlite`: [`GenerationStore`] over the local database
//! - `supabase`: [`GenerationStore`] over the hosted row REST API
//!
//! # Usage
//!
//! ```ignore
//! use contentforge_core::storage::{GenerationQuery, GenerationStore, NewGeneration, SqliteGenerationStore};
//!
//! let store = SqliteGenerationStore::in_memory().await?;
//! store.insert(NewGeneration::text("prompt", "output")).await?;
//! let recent = store.list(&GenerationQuery::default()).await?;
//! ```

pub mod database;
pub mod generation;
pub mod migrations;
pub mod sqlite;
pub mod supabase;

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use crate::config::{Config, Credentials, StorageBackend};
use crate::error::Result;

pub use database::{Database, DatabaseConfig};
pub use generation::{Generation, GenerationKind, NewGeneration};
pub use migrations::{CURRENT_VERSION, MigrationStatus, migration_status, run_migrations};
pub use sqlite::SqliteGenerationStore;
pub use supabase::SupabaseGenerationStore;

/// Page size when the caller gives none
pub const DEFAULT_LIST_LIMIT: u32 = 50;

/// Largest page a caller may request
pub const MAX_LIST_LIMIT: u32 = 200;

/// Filter and page for listing generations
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GenerationQuery {
    #[serde(default, rename = "type")]
    pub kind: Option<GenerationKind>,
    #[serde(default)]
    pub limit: Option<u32>,
    #[serde(default)]
    pub offset: Option<u32>,
}

impl GenerationQuery {
    pub fn of_kind(kind: GenerationKind) -> Self {
        Self {
            kind: Some(kind),
            ..Default::default()
        }
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Limit clamped to `1..=MAX_LIST_LIMIT`
    pub fn effective_limit(&self) -> u32 {
        self.limit
            .unwrap_or(DEFAULT_LIST_LIMIT)
            .clamp(1, MAX_LIST_LIMIT)
    }

    pub fn effective_offset(&self) -> u32 {
        self.offset.unwrap_or(0)
    }
}

/// Persistence for generation records
#[async_trait]
pub trait GenerationStore: Send + Sync {
    /// Short backend name for health output
    fn backend(&self) -> &'static str;

    /// Validate and save a record
    async fn insert(&self, new: NewGeneration) -> Result<Generation>;

    /// Newest first
    async fn list(&self, query: &GenerationQuery) -> Result<Vec<Generation>>;

    async fn get(&self, id: &str) -> Result<Option<Generation>>;

    /// Returns whether a record was removed
    async fn delete(&self, id: &str) -> Result<bool>;

    /// A view of this store acting with a signed-in user's token
    fn with_access_token(self: Arc<Self>, access_token: &str) -> Arc<dyn GenerationStore>;
}

/// Open the store selected in config
pub async fn open_store(
    config: &Config,
    credentials: &Credentials,
) -> anyhow::Result<Arc<dyn GenerationStore>> {
    match config.storage.backend {
        StorageBackend::Sqlite => {
            let path = config.sqlite_path()?;
            let store = SqliteGenerationStore::open(path).await?;
            Ok(Arc::new(store))
        }
        StorageBackend::Supabase => {
            let supabase = credentials.supabase.as_ref().ok_or_else(|| {
                anyhow::anyhow!("Missing Supabase environment variables")
            })?;
            Ok(Arc::new(SupabaseGenerationStore::new(supabase)?))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_limit() {
        assert_eq!(GenerationQuery::default().effective_limit(), DEFAULT_LIST_LIMIT);
        assert_eq!(GenerationQuery::default().with_limit(0).effective_limit(), 1);
        assert_eq!(GenerationQuery::default().with_limit(10_000).effective_limit(), MAX_LIST_LIMIT);
    }

    #[tokio::test]
    async fn test_open_store_requires_supabase_credentials() {
        let mut config = Config::default();
        config.storage.backend = StorageBackend::Supabase;
        let result = open_store(&config, &Credentials::default()).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_open_store_sqlite_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.storage.sqlite_path = dir.path().join("gallery.db").display().to_string();

        let store = open_store(&config, &Credentials::default()).await.unwrap();
        assert_eq!(store.backend(), "sqlite");
        assert!(dir.path().join("gallery.db").exists());
    }
}
