use reqwest::Client;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

use super::Dictionary;
use crate::error::{PacklingoError, Result};

const FETCH_TIMEOUT: Duration = Duration::from_secs(60);

/// Fetches the dictionary snapshot once and serves it from a local cache
/// afterwards. Every failure mode degrades to an empty dictionary: the
/// matcher then simply finds nothing and the LLM phase carries the load.
pub struct DictionaryCache {
    url: String,
    cache_path: PathBuf,
    client: Client,
}

impl DictionaryCache {
    pub fn new<P: AsRef<Path>>(url: &str, work_dir: P) -> Self {
        let client = Client::builder()
            .timeout(FETCH_TIMEOUT)
            .build()
            .unwrap_or_default();

        Self {
            url: url.to_string(),
            cache_path: work_dir.as_ref().join("dict-mini.json"),
            client,
        }
    }

    pub fn cache_path(&self) -> &Path {
        &self.cache_path
    }

    /// Load the dictionary, fetching the snapshot on first use. Never
    /// fails; fetch and parse problems log a warning and return an empty
    /// dictionary.
    pub async fn load(&self) -> Dictionary {
        if !self.cache_path.exists() {
            if let Err(e) = self.fetch().await {
                warn!("Failed to download dictionary: {}", e);
                return Dictionary::empty();
            }
        } else {
            info!("Using cached dictionary at {}", self.cache_path.display());
        }

        match self.parse_cached().await {
            Ok(dict) => {
                info!("Dictionary loaded: {} entries", dict.len());
                dict
            }
            Err(e) => {
                warn!("Failed to parse cached dictionary: {}", e);
                Dictionary::empty()
            }
        }
    }

    /// Download the snapshot and persist it verbatim to the cache path.
    pub async fn fetch(&self) -> Result<u64> {
        info!("Downloading dictionary from {}", self.url);

        let response = self.client.get(&self.url).send().await?;
        if !response.status().is_success() {
            return Err(PacklingoError::Dictionary(format!(
                "Dictionary fetch failed with status {}",
                response.status()
            )));
        }
        let body = response.bytes().await?;

        if let Some(parent) = self.cache_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&self.cache_path, &body).await?;

        info!("Dictionary downloaded ({} bytes)", body.len());
        Ok(body.len() as u64)
    }

    async fn parse_cached(&self) -> Result<Dictionary> {
        let content = tokio::fs::read_to_string(&self.cache_path).await?;
        let value: serde_json::Value = serde_json::from_str(&content)?;
        Dictionary::from_value(value).ok_or_else(|| {
            PacklingoError::Dictionary("Cached dictionary is not a JSON object".to_string())
        })
    }

    /// Remove the cached snapshot, forcing a re-fetch on the next load.
    pub async fn clear(&self) -> Result<bool> {
        if self.cache_path.exists() {
            tokio::fs::remove_file(&self.cache_path).await?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Cache file size in bytes, if the cache exists.
    pub async fn cached_size(&self) -> Option<u64> {
        tokio::fs::metadata(&self.cache_path)
            .await
            .ok()
            .map(|m| m.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_cached_file_is_served_without_fetch() {
        let dir = TempDir::new().unwrap();
        // Unroutable URL: a network attempt would fail, a cache hit won't.
        let cache = DictionaryCache::new("http://127.0.0.1:1/dict.json", dir.path());

        tokio::fs::write(cache.cache_path(), r#"{"Hello": ["你好"]}"#)
            .await
            .unwrap();

        let dict = cache.load().await;
        assert_eq!(dict.first_candidate("Hello"), Some("你好"));
    }

    #[tokio::test]
    async fn test_invalid_cache_degrades_to_empty() {
        let dir = TempDir::new().unwrap();
        let cache = DictionaryCache::new("http://127.0.0.1:1/dict.json", dir.path());

        tokio::fs::write(cache.cache_path(), "not json at all")
            .await
            .unwrap();

        let dict = cache.load().await;
        assert!(dict.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_failure_degrades_to_empty() {
        let dir = TempDir::new().unwrap();
        let cache = DictionaryCache::new("http://127.0.0.1:1/dict.json", dir.path());

        let dict = cache.load().await;
        assert!(dict.is_empty());
        assert!(!cache.cache_path().exists());
    }

    #[tokio::test]
    async fn test_clear_removes_cache() {
        let dir = TempDir::new().unwrap();
        let cache = DictionaryCache::new("http://127.0.0.1:1/dict.json", dir.path());

        tokio::fs::write(cache.cache_path(), "{}").await.unwrap();
        assert!(cache.clear().await.unwrap());
        assert!(!cache.clear().await.unwrap());
    }
}
