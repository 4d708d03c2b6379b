use crate::{common::*, key::STAMP_EXTENSION, CacheError, CacheKey, PresenceOnly, ValidityPolicy};

/// A directory of serialized cache entries.
///
/// Concurrent writers of the same key are not coordinated. An entry is
/// written to a temporary file and renamed into place, so readers never see
/// a partially written entry, but the last writer wins.
#[derive(Debug)]
pub struct DiskCache {
    dir: PathBuf,
    policy: Box<dyn ValidityPolicy>,
}

impl DiskCache {
    /// Opens a cache directory, creating it when absent.
    pub fn new<P, V>(dir: P, policy: V) -> Result<Self, CacheError>
    where
        P: AsRef<Path>,
        V: 'static + ValidityPolicy,
    {
        let dir = dir.as_ref().to_owned();
        fs::create_dir_all(&dir).map_err(CacheError::io(&dir))?;
        Ok(Self {
            dir,
            policy: Box::new(policy),
        })
    }

    pub fn presence_only<P>(dir: P) -> Result<Self, CacheError>
    where
        P: AsRef<Path>,
    {
        Self::new(dir, PresenceOnly)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_of(&self, key: &CacheKey) -> PathBuf {
        self.dir.join(key.file_name())
    }

    fn stamp_path_of(&self, key: &CacheKey) -> PathBuf {
        self.dir
            .join(format!("{}.{}", key.file_name(), STAMP_EXTENSION))
    }

    /// Loads an entry. Returns `None` on a miss or when the policy rejects
    /// the present entry, and fails if a valid entry cannot be parsed.
    pub fn get<T>(&self, key: &CacheKey, inputs: &[PathBuf]) -> Result<Option<T>, CacheError>
    where
        T: DeserializeOwned,
    {
        let path = self.path_of(key);
        if !path.is_file() {
            debug!("cache miss for {} at '{}'", key, path.display());
            return Ok(None);
        }

        let stamp_path = self.stamp_path_of(key);
        let stored = if stamp_path.is_file() {
            let stamp = fs::read_to_string(&stamp_path).map_err(CacheError::io(&stamp_path))?;
            Some(stamp)
        } else {
            None
        };

        if !self.policy.is_valid(stored.as_deref(), inputs)? {
            warn!("ignore stale cache entry '{}'", path.display());
            return Ok(None);
        }

        let bytes = fs::read(&path).map_err(CacheError::io(&path))?;
        let value = bincode::deserialize(&bytes)
            .map_err(|source| CacheError::Deserialization {
                path: path.clone(),
                source,
            })?;
        info!("{} loaded from '{}'", key, path.display());

        Ok(Some(value))
    }

    /// Stores an entry, replacing any existing one.
    pub fn put<T>(&self, key: &CacheKey, value: &T, inputs: &[PathBuf]) -> Result<PathBuf, CacheError>
    where
        T: Serialize,
    {
        let path = self.path_of(key);
        let bytes = bincode::serialize(value).map_err(|source| CacheError::Serialization {
            path: path.clone(),
            source,
        })?;

        // the old stamp must not outlive a failed write
        let stamp_path = self.stamp_path_of(key);
        if stamp_path.is_file() {
            fs::remove_file(&stamp_path).map_err(CacheError::io(&stamp_path))?;
        }

        let tmp_path = self.dir.join(format!(
            ".{}.{}.tmp",
            key.file_name(),
            std::process::id()
        ));
        fs::write(&tmp_path, bytes).map_err(CacheError::io(&tmp_path))?;
        fs::rename(&tmp_path, &path).map_err(CacheError::io(&path))?;

        if let Some(stamp) = self.policy.stamp(inputs)? {
            fs::write(&stamp_path, stamp).map_err(CacheError::io(&stamp_path))?;
        }
        info!("wrote {} to '{}'", key, path.display());

        Ok(path)
    }

    /// Loads an entry, or computes and stores it on a miss.
    pub fn get_or_insert_with<T, F>(&self, key: &CacheKey, inputs: &[PathBuf], f: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Result<T>,
    {
        if let Some(value) = self.get(key, inputs)? {
            return Ok(value);
        }
        let value = f()?;
        self.put(key, &value, inputs)?;
        Ok(value)
    }

    /// Removes an entry. Returns whether an entry existed.
    pub fn remove(&self, key: &CacheKey) -> Result<bool, CacheError> {
        let stamp_path = self.stamp_path_of(key);
        if stamp_path.is_file() {
            fs::remove_file(&stamp_path).map_err(CacheError::io(&stamp_path))?;
        }

        let path = self.path_of(key);
        if !path.is_file() {
            return Ok(false);
        }
        fs::remove_file(&path).map_err(CacheError::io(&path))?;
        info!("removed cache entry '{}'", path.display());
        Ok(true)
    }

    /// Removes every entry in the cache directory. Returns the number of
    /// removed entries.
    pub fn clear(&self) -> Result<usize, CacheError> {
        let entries = fs::read_dir(&self.dir).map_err(CacheError::io(&self.dir))?;
        let mut count = 0;

        for entry in entries {
            let path = entry.map_err(CacheError::io(&self.dir))?.path();
            let extension = path.extension().and_then(|ext| ext.to_str());
            let is_entry = match extension {
                Some(crate::key::ENTRY_EXTENSION) => true,
                Some(STAMP_EXTENSION) => false,
                _ => continue,
            };
            fs::remove_file(&path).map_err(CacheError::io(&path))?;
            if is_entry {
                count += 1;
            }
        }

        info!("removed {} cache entries in '{}'", count, self.dir.display());
        Ok(count)
    }
}
