use std::io::ErrorKind;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::warn;

/// JSON-file-backed collection of records with exclusive access.
///
/// Every public operation takes the store's mutex, so two logical
/// operations against the same store can never interleave their
/// read-modify-write cycles into a lost update. Clones share the lock.
pub struct JsonStore<T> {
    path: PathBuf,
    lock: Arc<Mutex<()>>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for JsonStore<T> {
    fn clone(&self) -> Self {
        Self {
            path: self.path.clone(),
            lock: Arc::clone(&self.lock),
            _marker: PhantomData,
        }
    }
}

impl<T> JsonStore<T>
where
    T: Serialize + DeserializeOwned + Send,
{
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Arc::new(Mutex::new(())),
            _marker: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn read_all(&self) -> Result<Vec<T>> {
        let _guard = self.lock.lock().await;
        self.load().await
    }

    pub async fn write_all(&self, records: &[T]) -> Result<()> {
        let _guard = self.lock.lock().await;
        self.persist(records).await
    }

    /// Atomic read-modify-write: the lock is held across the whole
    /// load / mutate / persist cycle.
    pub async fn modify<R, F>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&mut Vec<T>) -> R + Send,
        R: Send,
    {
        let _guard = self.lock.lock().await;
        let mut records = self.load().await?;
        let out = f(&mut records);
        self.persist(&records).await?;
        Ok(out)
    }

    async fn load(&self) -> Result<Vec<T>> {
        let bytes = match fs::read(&self.path).await {
            Ok(bytes) => bytes,
            // Missing file means the store was never written: empty.
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(e).with_context(|| format!("failed to read {}", self.path.display()))
            }
        };

        // A corrupt or non-array document is recovered as an empty
        // collection instead of failing the caller.
        match serde_json::from_slice::<Vec<T>>(&bytes) {
            Ok(records) => Ok(records),
            Err(e) => {
                warn!(
                    "store {} holds invalid data ({}), treating as empty",
                    self.path.display(),
                    e
                );
                Ok(Vec::new())
            }
        }
    }

    async fn persist(&self, records: &[T]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .await
                    .with_context(|| format!("failed to create {}", parent.display()))?;
            }
        }
        let data = serde_json::to_vec_pretty(records).context("failed to encode records")?;
        fs::write(&self.path, data)
            .await
            .with_context(|| format!("failed to write {}", self.path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Entry {
        name: String,
        value: i64,
    }

    fn store_at(dir: &tempfile::TempDir, file: &str) -> JsonStore<Entry> {
        JsonStore::new(dir.path().join(file))
    }

    #[tokio::test]
    async fn missing_file_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_at(&dir, "missing.json");
        assert!(store.read_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn corrupt_file_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, b"{not json at all").unwrap();

        let store: JsonStore<Entry> = JsonStore::new(&path);
        assert!(store.read_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn non_array_document_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("object.json");
        std::fs::write(&path, br#"{"name": "x", "value": 1}"#).unwrap();

        let store: JsonStore<Entry> = JsonStore::new(&path);
        assert!(store.read_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn write_then_read_preserves_order() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_at(&dir, "entries.json");

        let records = vec![
            Entry {
                name: "b".into(),
                value: 2,
            },
            Entry {
                name: "a".into(),
                value: 1,
            },
        ];
        store.write_all(&records).await.unwrap();
        assert_eq!(store.read_all().await.unwrap(), records);
    }

    #[tokio::test]
    async fn modify_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let store: JsonStore<Entry> = JsonStore::new(dir.path().join("data/nested/e.json"));

        let len = store
            .modify(|records| {
                records.push(Entry {
                    name: "x".into(),
                    value: 7,
                });
                records.len()
            })
            .await
            .unwrap();
        assert_eq!(len, 1);
        assert_eq!(store.read_all().await.unwrap().len(), 1);
    }
}
