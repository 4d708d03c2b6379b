//! Common imports from external crates.

pub use anyhow::{bail, ensure, format_err, Context as _, Error, Result};
pub use bbox::{prelude::*, CornerOrder, ShapeError, TLBR};
pub use cache::{CacheKey, DiskCache};
pub use indexmap::IndexSet;
pub use itertools::Itertools as _;
pub use label::{ClassVocabulary, Label};
pub use log::{debug, info, warn};
pub use mat_file::{MatFile, MatValue, NumericArray, NumericClass};
pub use noisy_float::prelude::*;
pub use rayon::prelude::*;
pub use serde::{Deserialize, Serialize};
pub use std::{
    collections::HashMap,
    fmt,
    fs,
    io::{BufWriter, Write as _},
    path::{Path, PathBuf},
    str::FromStr,
};
