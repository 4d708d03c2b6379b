use crate::{common::*, CacheError};

/// Decides whether a present cache entry may be reused.
pub trait ValidityPolicy
where
    Self: Debug + Send + Sync,
{
    /// Computes the stamp stored beside a newly written entry. `None` means
    /// the policy keeps no stamp.
    fn stamp(&self, inputs: &[PathBuf]) -> Result<Option<String>, CacheError>;

    /// Checks a present entry, given the stamp stored with it.
    fn is_valid(&self, stored: Option<&str>, inputs: &[PathBuf]) -> Result<bool, CacheError>;
}

/// Treats every present entry as valid, regardless of its inputs.
#[derive(Debug, Clone, Copy, Default)]
pub struct PresenceOnly;

impl ValidityPolicy for PresenceOnly {
    fn stamp(&self, _inputs: &[PathBuf]) -> Result<Option<String>, CacheError> {
        Ok(None)
    }

    fn is_valid(&self, _stored: Option<&str>, _inputs: &[PathBuf]) -> Result<bool, CacheError> {
        Ok(true)
    }
}

/// Accepts an entry only if the inputs hash to the stamp stored with it.
///
/// The hash covers the path, length and contents of every input file in the
/// given order.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContentHash;

impl ContentHash {
    pub fn digest(inputs: &[PathBuf]) -> Result<String, CacheError> {
        let mut hasher = blake3::Hasher::new();
        let mut buf = vec![];

        for path in inputs {
            buf.clear();
            fs::File::open(path)
                .and_then(|mut file| file.read_to_end(&mut buf))
                .map_err(CacheError::io(path))?;

            hasher.update(path.to_string_lossy().as_bytes());
            hasher.update(&[0]);
            hasher.update(&(buf.len() as u64).to_le_bytes());
            hasher.update(&buf);
        }

        Ok(hasher.finalize().to_hex().to_string())
    }
}

impl ValidityPolicy for ContentHash {
    fn stamp(&self, inputs: &[PathBuf]) -> Result<Option<String>, CacheError> {
        Ok(Some(Self::digest(inputs)?))
    }

    /// An unreadable input makes the entry stale.
    fn is_valid(&self, stored: Option<&str>, inputs: &[PathBuf]) -> Result<bool, CacheError> {
        let stored = match stored {
            Some(stored) => stored,
            None => return Ok(false),
        };
        match Self::digest(inputs) {
            Ok(digest) => Ok(stored == digest),
            Err(err) => {
                debug!("treat entry as stale: {}", err);
                Ok(false)
            }
        }
    }
}
