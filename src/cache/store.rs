use std::future::Future;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

use dashmap::DashMap;
use metrics::counter;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tempfile::NamedTempFile;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::{CacheKey, METRIC_CACHE_HIT, METRIC_CACHE_MISS};

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache io error at `{path}`: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to encode cache entry `{path}`: {source}")]
    Encode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Memory-then-disk store for one kind of record.
///
/// Concurrent misses for the same key are collapsed: the first caller fetches
/// while the rest wait on a per-key lock and then read what it stored.
pub struct RecordStore<T> {
    kind: &'static str,
    directory: PathBuf,
    memory: DashMap<CacheKey, T>,
    flights: DashMap<CacheKey, Arc<Mutex<()>>>,
}

impl<T> RecordStore<T>
where
    T: Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    /// Open a store rooted at `directory`, creating the directory if needed.
    pub fn open(directory: impl Into<PathBuf>, kind: &'static str) -> Result<Self, CacheError> {
        let directory = directory.into();
        std::fs::create_dir_all(&directory).map_err(|source| CacheError::Io {
            path: directory.clone(),
            source,
        })?;

        Ok(Self {
            kind,
            directory,
            memory: DashMap::new(),
            flights: DashMap::new(),
        })
    }

    pub fn path_for(&self, key: &CacheKey) -> PathBuf {
        self.directory
            .join(format!("{}_{}.json", key.as_str(), self.kind))
    }

    /// Look a key up in memory, then on disk. A disk hit is promoted to memory.
    /// Unreadable files count as misses and are overwritten by the next fetch.
    pub async fn peek(&self, key: &CacheKey) -> Result<Option<T>, CacheError> {
        if let Some(hit) = self.memory.get(key) {
            counter!(METRIC_CACHE_HIT, "kind" => self.kind, "tier" => "memory").increment(1);
            return Ok(Some(hit.value().clone()));
        }

        let path = self.path_for(key);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(CacheError::Io { path, source }),
        };

        let value: T = match serde_json::from_slice(&bytes) {
            Ok(value) => value,
            Err(err) => {
                warn!(
                    target = "rxlens::cache",
                    path = %path.display(),
                    error = %err,
                    "ignoring unreadable cache entry"
                );
                return Ok(None);
            }
        };

        counter!(METRIC_CACHE_HIT, "kind" => self.kind, "tier" => "disk").increment(1);
        self.memory.insert(key.clone(), value.clone());
        Ok(Some(value))
    }

    /// Return the cached record for `key`, or run `fetch` and store its result.
    ///
    /// A failed fetch stores nothing. Cache I/O errors are converted into the
    /// caller's error type.
    pub async fn get_or_fetch<F, Fut, E>(&self, key: &CacheKey, fetch: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: From<CacheError>,
    {
        if let Some(value) = self.peek(key).await? {
            return Ok(value);
        }

        let flight = Arc::clone(self.flights.entry(key.clone()).or_default().value());
        let result = {
            let _guard = flight.lock().await;
            self.fetch_locked(key, fetch).await
        };
        drop(flight);
        self.flights
            .remove_if(key, |_, lock| Arc::strong_count(lock) == 1);
        result
    }

    async fn fetch_locked<F, Fut, E>(&self, key: &CacheKey, fetch: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: From<CacheError>,
    {
        // The previous lock holder may have filled the entry.
        if let Some(value) = self.peek(key).await? {
            return Ok(value);
        }

        counter!(METRIC_CACHE_MISS, "kind" => self.kind).increment(1);
        debug!(target = "rxlens::cache", kind = self.kind, key = %key, "cache miss");

        let value = fetch().await?;
        self.persist(key, &value).await?;
        self.memory.insert(key.clone(), value.clone());
        Ok(value)
    }

    async fn persist(&self, key: &CacheKey, value: &T) -> Result<(), CacheError> {
        let path = self.path_for(key);
        let bytes = serde_json::to_vec(value).map_err(|source| CacheError::Encode {
            path: path.clone(),
            source,
        })?;

        let directory = self.directory.clone();
        let target = path.clone();
        let written = tokio::task::spawn_blocking(move || -> io::Result<()> {
            let mut staged = NamedTempFile::new_in(&directory)?;
            staged.write_all(&bytes)?;
            staged.flush()?;
            staged.persist(&target).map_err(|err| err.error)?;
            Ok(())
        })
        .await
        .map_err(|err| CacheError::Io {
            path: path.clone(),
            source: io::Error::other(err),
        })?;

        written.map_err(|source| CacheError::Io { path, source })
    }
}
