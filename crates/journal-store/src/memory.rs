use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::document::{split_document_path, validate_collection_path, DocumentStore};
use crate::error::StoreError;

/// Process-local document store.
#[derive(Default)]
pub struct MemoryDocumentStore {
    // collection -> doc_id -> body
    docs: RwLock<BTreeMap<String, BTreeMap<String, Value>>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn get(&self, path: &str) -> Result<Option<Value>, StoreError> {
        let (collection, doc_id) = split_document_path(path)?;
        let docs = self.docs.read().await;
        Ok(docs.get(collection).and_then(|c| c.get(doc_id)).cloned())
    }

    async fn set(&self, path: &str, body: &Value) -> Result<(), StoreError> {
        let (collection, doc_id) = split_document_path(path)?;
        self.docs
            .write()
            .await
            .entry(collection.to_string())
            .or_default()
            .insert(doc_id.to_string(), body.clone());
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
        let docs = self.docs.read().await;
        Ok(docs
            .get(collection)
            .map(|c| c.iter().map(|(id, v)| (id.clone(), v.clone())).collect())
            .unwrap_or_default())
    }
}
