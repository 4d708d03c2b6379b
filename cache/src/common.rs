pub use anyhow::Result;
pub use log::{debug, info, warn};
pub use serde::{de::DeserializeOwned, Serialize};
pub use std::{
    fmt::Debug,
    fs,
    io::{self, Read as _},
    path::{Path, PathBuf},
};
