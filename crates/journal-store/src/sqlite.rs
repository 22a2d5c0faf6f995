use async_trait::async_trait;
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;

use crate::document::{split_document_path, validate_collection_path, DocumentStore};
use crate::error::StoreError;

/// Document store backed by a single SQLite table of JSON bodies.
#[derive(Clone)]
pub struct SqliteDocumentStore {
    pool: SqlitePool,
}

impl SqliteDocumentStore {
    /// Open (creating if missing) the database and ensure the schema exists.
    pub async fn new(database_url: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);

        // In-memory databases are per-connection, so keep exactly one.
        let max_connections = if database_url.contains(":memory:") { 1 } else { 5 };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.init_tables().await?;
        Ok(store)
    }

    async fn init_tables(&self) -> Result<(), StoreError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS documents (
                collection TEXT NOT NULL,
                doc_id TEXT NOT NULL,
                body TEXT NOT NULL,
                updated_at TEXT NOT NULL DEFAULT (datetime('now')),
                PRIMARY KEY (collection, doc_id)
            )",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl DocumentStore for SqliteDocumentStore {
    async fn get(&self, path: &str) -> Result<Option<Value>, StoreError> {
        let (collection, doc_id) = split_document_path(path)?;
        let row: Option<(String,)> =
            sqlx::query_as("SELECT body FROM documents WHERE collection = ? AND doc_id = ?")
                .bind(collection)
                .bind(doc_id)
                .fetch_optional(&self.pool)
                .await?;

        row.map(|(body,)| serde_json::from_str(&body))
            .transpose()
            .map_err(StoreError::from)
    }

    async fn set(&self, path: &str, body: &Value) -> Result<(), StoreError> {
        let (collection, doc_id) = split_document_path(path)?;
        sqlx::query(
            "INSERT INTO documents (collection, doc_id, body) VALUES (?, ?, ?)
             ON CONFLICT(collection, doc_id)
             DO UPDATE SET body = excluded.body, updated_at = datetime('now')",
        )
        .bind(collection)
        .bind(doc_id)
        .bind(serde_json::to_string(body)?)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn add(&self, collection: &str, body: &Value) -> Result<String, StoreError> {
        let collection = validate_collection_path(collection)?;
        let doc_id = uuid::Uuid::new_v4().to_string();
        self.set(&format!("{collection}/{doc_id}"), body).await?;
        Ok(doc_id)
    }

    async fn list(&self, collection: &str) -> Result<Vec<(String, Value)>, StoreError> {
        let collection = validate_collection_path(collection)?;
        let rows: Vec<(String, String)> = sqlx::query_as(
            "SELECT doc_id, body FROM documents WHERE collection = ? ORDER BY doc_id",
        )
        .bind(collection)
        .fetch_all(&self.pool)
        .await?;

        let mut docs = Vec::with_capacity(rows.len());
        for (doc_id, body) in rows {
            match serde_json::from_str(&body) {
                Ok(value) => docs.push((doc_id, value)),
                Err(e) => {
                    tracing::warn!("Skipping unreadable document {}/{}: {}", collection, doc_id, e)
                }
            }
        }
        Ok(docs)
    }
}
