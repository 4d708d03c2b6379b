use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use std::fmt;

const FILE_NAME_SET: &AsciiSet = &NON_ALPHANUMERIC.remove(b'_').remove(b'-').remove(b'.');

pub(crate) const ENTRY_EXTENSION: &str = "bincode";
pub(crate) const STAMP_EXTENSION: &str = "stamp";

/// Identifies one cache entry by dataset name and record kind.
///
/// The dataset name must encode everything that distinguishes one dataset
/// configuration from another, since it is the only thing the entry file
/// name is derived from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub dataset_name: String,
    pub kind: String,
}

impl CacheKey {
    pub fn new<N, K>(dataset_name: N, kind: K) -> Self
    where
        N: Into<String>,
        K: Into<String>,
    {
        Self {
            dataset_name: dataset_name.into(),
            kind: kind.into(),
        }
    }

    pub fn file_name(&self) -> String {
        format!(
            "{}_{}.{}",
            utf8_percent_encode(&self.dataset_name, FILE_NAME_SET),
            utf8_percent_encode(&self.kind, FILE_NAME_SET),
            ENTRY_EXTENSION
        )
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.dataset_name, self.kind)
    }
}
