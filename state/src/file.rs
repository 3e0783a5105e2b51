use crate::StateStore;
use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Stores readings in a small JSON object on disk, one entry per key.
///
/// Writes go to a sibling temporary file that is then renamed over the
/// original, so a crash never leaves a half-written state file behind.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<BTreeMap<String, String>> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("reading state file {}", self.path.display()));
            }
        };
        if raw.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&raw)
            .with_context(|| format!("parsing state file {}", self.path.display()))
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl StateStore for FileStore {
    fn backend(&self) -> &'static str {
        "file"
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.load().await?.remove(key))
    }

    async fn put(&self, key: &str, value: &str) -> Result<()> {
        let mut values = self.load().await?;
        values.insert(key.to_string(), value.to_string());
        let payload = serde_json::to_string_pretty(&values)?;

        let temp = self.temp_path();
        tokio::fs::write(&temp, payload)
            .await
            .with_context(|| format!("writing {}", temp.display()))?;
        tokio::fs::rename(&temp, &self.path)
            .await
            .with_context(|| format!("replacing state file {}", self.path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_file_is_first_run() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("last_level.json"));
        assert_eq!(store.get("อินทร์บุรี").await.unwrap(), None);
    }

    #[tokio::test]
    async fn put_then_get_returns_latest_value() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("last_level.json"));

        store.put("อินทร์บุรี", "14.00").await.unwrap();
        store.put("อินทร์บุรี", "14.21").await.unwrap();

        assert_eq!(
            store.get("อินทร์บุรี").await.unwrap().as_deref(),
            Some("14.21")
        );
        assert!(!store.temp_path().exists());
    }

    #[tokio::test]
    async fn put_keeps_other_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("state.json"));

        store.put("a", "1.00").await.unwrap();
        store.put("b", "2.00").await.unwrap();

        assert_eq!(store.get("a").await.unwrap().as_deref(), Some("1.00"));
        assert_eq!(store.get("b").await.unwrap().as_deref(), Some("2.00"));
    }

    #[tokio::test]
    async fn corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, "14.21").unwrap();
        let store = FileStore::new(path);
        assert!(store.get("a").await.is_err());
    }

    #[tokio::test]
    async fn empty_file_is_first_run() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, "\n").unwrap();
        let store = FileStore::new(path);
        assert_eq!(store.get("a").await.unwrap(), None);
    }
}
