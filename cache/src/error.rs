use crate::common::*;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("I/O error on '{}'", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to serialize cache entry '{}'", path.display())]
    Serialization {
        path: PathBuf,
        #[source]
        source: bincode::Error,
    },
    #[error("cache file '{}' cannot be parsed as the expected record type", path.display())]
    Deserialization {
        path: PathBuf,
        #[source]
        source: bincode::Error,
    },
}

impl CacheError {
    pub(crate) fn io(path: &Path) -> impl FnOnce(io::Error) -> Self + '_ {
        move |source| Self::Io {
            path: path.to_owned(),
            source,
        }
    }
}
