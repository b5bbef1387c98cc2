//! Pluggable key-value cache for item listings.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

/// Byte-oriented cache for listing payloads. Misses are cheap; a backend
/// never fabricates hits.
pub trait KvCache {
    fn get(&self, key: &str) -> std::io::Result<Option<Vec<u8>>>;
    fn put(&self, key: &str, value: &[u8]) -> std::io::Result<()>;
}

/// `None` is the cache that never hits, so callers can make caching
/// optional without branching.
impl<C: KvCache> KvCache for Option<C> {
    fn get(&self, key: &str) -> std::io::Result<Option<Vec<u8>>> {
        match self {
            Some(cache) => cache.get(key),
            None => Ok(None),
        }
    }

    fn put(&self, key: &str, value: &[u8]) -> std::io::Result<()> {
        match self {
            Some(cache) => cache.put(key, value),
            None => Ok(()),
        }
    }
}

/// One file per key inside a directory, written atomically so a crashed
/// run never leaves a truncated payload behind.
#[derive(Debug)]
pub struct FsCache {
    dir: PathBuf,
}

impl FsCache {
    /// Opens (creating if needed) a cache rooted at `dir`.
    pub fn open(dir: impl Into<PathBuf>) -> std::io::Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        // Keys may carry characters that are meaningful in paths.
        let safe: String = key
            .chars()
            .map(|c| match c {
                'a'..='z' | 'A'..='Z' | '0'..='9' | '.' | '-' | '_' => c,
                _ => '_',
            })
            .collect();
        self.dir.join(safe)
    }
}

impl KvCache for FsCache {
    fn get(&self, key: &str) -> std::io::Result<Option<Vec<u8>>> {
        match fs::read(self.path_for(key)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn put(&self, key: &str, value: &[u8]) -> std::io::Result<()> {
        let path = self.path_for(key);
        let mut temp = path.clone().into_os_string();
        temp.push(".tmp");
        fs::write(&temp, value)?;
        fs::rename(&temp, &path)
    }
}

/// In-memory cache, mostly for tests.
#[derive(Debug, Default)]
pub struct MemCache {
    entries: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KvCache for MemCache {
    fn get(&self, key: &str) -> std::io::Result<Option<Vec<u8>>> {
        Ok(self
            .entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .cloned())
    }

    fn put(&self, key: &str, value: &[u8]) -> std::io::Result<()> {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.to_owned(), value.to_vec());
        Ok(())
    }
}
