use async_trait::async_trait;
use serde_json::Value;

use crate::error::StoreError;

/// Minimal get/set/query surface of a hierarchical document database.
///
/// Paths alternate collection and document ids: `users/u1` is a document,
/// `users/u1/notifications` is a collection.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, path: &str) -> Result<Option<Value>, StoreError>;

    async fn set(&self, path: &str, body: &Value) -> Result<(), StoreError>;

    /// Insert under a generated id and return that id.
    async fn add(&self, collection: &str, body: &Value) -> Result<String, StoreError>;

    /// All documents directly inside `collection`, ordered by id.
    async fn list(&self, collection: &str) -> Result<Vec<(String, Value)>, StoreError>;
}

/// Split `a/b/c/d` into (`a/b/c`, `d`). Document paths have an even number
/// of segments.
pub(crate) fn split_document_path(path: &str) -> Result<(&str, &str), StoreError> {
    let trimmed = path.trim_matches('/');
    let segments = trimmed.split('/').count();
    if trimmed.is_empty() || segments % 2 != 0 || trimmed.split('/').any(str::is_empty) {
        return Err(StoreError::InvalidPath(path.to_string()));
    }
    trimmed
        .rsplit_once('/')
        .ok_or_else(|| StoreError::InvalidPath(path.to_string()))
}

pub(crate) fn validate_collection_path(collection: &str) -> Result<&str, StoreError> {
    let trimmed = collection.trim_matches('/');
    let segments = trimmed.split('/').count();
    if trimmed.is_empty() || segments % 2 != 1 || trimmed.split('/').any(str::is_empty) {
        return Err(StoreError::InvalidPath(collection.to_string()));
    }
    Ok(trimmed)
}
