//! # File Backend
//!
//! Keeps every user in a single JSON document, `{ "<username>": { ...record } }`.
//! The whole file is read for each operation and rewritten through a
//! temporary file plus rename, so a crash never leaves half a document.
//! A process-wide mutex serializes access; the file is not safe to share
//! between several server processes.

use super::{KvStore, StoreError};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::PathBuf;
use tokio::sync::Mutex;

type Document = BTreeMap<String, Value>;

pub struct FileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            lock: Mutex::new(()),
        }
    }

    async fn load(&self) -> Result<Document, StoreError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) if contents.trim().is_empty() => Ok(Document::new()),
            Ok(contents) => Ok(serde_json::from_str(&contents)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Document::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, document: &Document) -> Result<(), StoreError> {
        let contents = serde_json::to_vec_pretty(document)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, contents).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl KvStore for FileStore {
    fn backend(&self) -> &'static str {
        "file"
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let _guard = self.lock.lock().await;
        let document = self.load().await?;
        document
            .get(key)
            .map(serde_json::to_string)
            .transpose()
            .map_err(StoreError::from)
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let _guard = self.lock.lock().await;
        let mut document = self.load().await?;
        document.insert(key.to_string(), serde_json::from_str(value)?);
        self.save(&document).await
    }

    async fn compare_and_swap(
        &self,
        key: &str,
        expected: Option<&str>,
        new: &str,
    ) -> Result<bool, StoreError> {
        let _guard = self.lock.lock().await;
        let mut document = self.load().await?;

        // Compare parsed documents: what `get` hands out is a re-serialization
        // of the stored value, not the original bytes.
        let matches = match (document.get(key), expected) {
            (None, None) => true,
            (Some(current), Some(expected)) => *current == serde_json::from_str::<Value>(expected)?,
            _ => false,
        };
        if !matches {
            return Ok(false);
        }

        document.insert(key.to_string(), serde_json::from_str(new)?);
        self.save(&document).await?;
        Ok(true)
    }
}
