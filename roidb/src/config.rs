//! Database builder configuration format.

use crate::common::*;

pub use cache_config::*;
pub use dataset::*;
pub use proposals::*;
pub use results::*;

/// The main configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub dataset: DatasetConfig,
    pub cache: CacheConfig,
    #[serde(default)]
    pub proposals: ProposalConfig,
    #[serde(default)]
    pub results: ResultsConfig,
}

impl Config {
    pub fn open<P>(path: P) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file '{}'", path.display()))?;
        let config = text
            .parse()
            .with_context(|| format!("failed to parse config file '{}'", path.display()))?;
        Ok(config)
    }
}

impl FromStr for Config {
    type Err = Error;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let config = json5::from_str(text)?;
        Ok(config)
    }
}

mod dataset {
    use super::*;

    /// Dataset options.
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct DatasetConfig {
        /// The NYUD2 devkit directory.
        pub devkit_dir: PathBuf,
        /// The split name, such as `trainval` or `test`.
        pub image_set: String,
        pub year: String,
        /// The image subdirectory under `<devkit>/data`.
        #[serde(default = "default_image_type")]
        pub image_type: String,
        /// Optional file of object class names, one per line.
        pub classes_file: Option<PathBuf>,
        /// Whether per-image annotations are merged into the database.
        #[serde(default = "default_true")]
        pub use_ground_truth: bool,
    }

    fn default_image_type() -> String {
        "images".into()
    }
}

mod cache_config {
    use super::*;

    /// Cache options.
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct CacheConfig {
        pub dir: PathBuf,
        #[serde(default)]
        pub validity: CacheValidity,
    }

    /// Decides when a present cache entry is reused.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(tag = "type")]
    pub enum CacheValidity {
        /// Any present entry is reused.
        PresenceOnly,
        /// An entry is reused only if its input files are unchanged.
        ContentHash,
    }

    impl Default for CacheValidity {
        fn default() -> Self {
            Self::PresenceOnly
        }
    }
}

mod proposals {
    use super::*;

    /// Region proposal options.
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct ProposalConfig {
        /// The proposal method name, which names the merged cache entry.
        #[serde(default = "default_method")]
        pub method: String,
        /// Overrides the default `<cache>/../mcg_data/nyud2_2015.mat` location.
        pub file: Option<PathBuf>,
    }

    impl Default for ProposalConfig {
        fn default() -> Self {
            Self {
                method: default_method(),
                file: None,
            }
        }
    }

    fn default_method() -> String {
        "mcg".into()
    }
}

mod results {
    use super::*;

    /// Detection results options.
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct ResultsConfig {
        /// Defaults to `<devkit>/results`.
        pub dir: Option<PathBuf>,
        /// Appends a random suffix to the competition id.
        #[serde(default = "default_true")]
        pub use_salt: bool,
        /// Deletes results files after evaluation.
        #[serde(default = "default_true")]
        pub cleanup: bool,
        pub evaluator: Option<EvaluatorConfig>,
    }

    impl Default for ResultsConfig {
        fn default() -> Self {
            Self {
                dir: None,
                use_salt: true,
                cleanup: true,
                evaluator: None,
            }
        }
    }

    /// An external evaluation program.
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct EvaluatorConfig {
        pub program: PathBuf,
        #[serde(default)]
        pub args: Vec<String>,
    }
}

fn default_true() -> bool {
    true
}
