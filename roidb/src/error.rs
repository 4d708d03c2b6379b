use crate::common::*;
use thiserror::Error;

/// Failures of the database build. None of them is transient.
#[derive(Debug, Error)]
pub enum RoidbError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("required file '{}' does not exist", path.display())]
    FileNotFound { path: PathBuf },
    #[error("expect exactly one proposal entry for image '{id}', but found {matches}")]
    Alignment { id: String, matches: usize },
    #[error("expect {expected} per-image records, but found {found}")]
    RecordCount { expected: usize, found: usize },
    #[error("expect records over {expected} classes, but found {found}")]
    ClassCount { expected: usize, found: usize },
    #[error("malformed box in {context}")]
    Shape {
        context: String,
        #[source]
        source: ShapeError,
    },
    #[error("malformed record in '{}': {reason}", path.display())]
    MalformedRecord { path: PathBuf, reason: String },
}

impl RoidbError {
    pub(crate) fn malformed<S>(path: &Path, reason: S) -> Self
    where
        S: fmt::Display,
    {
        Self::MalformedRecord {
            path: path.to_owned(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn shape<S>(context: S) -> impl FnOnce(ShapeError) -> Self
    where
        S: fmt::Display,
    {
        move |source| Self::Shape {
            context: context.to_string(),
            source,
        }
    }
}

/// Fails with [RoidbError::FileNotFound] unless `path` is an existing file.
pub(crate) fn require_file(path: &Path) -> Result<(), RoidbError> {
    if path.is_file() {
        Ok(())
    } else {
        Err(RoidbError::FileNotFound {
            path: path.to_owned(),
        })
    }
}
