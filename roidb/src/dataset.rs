//! The NYUD2 dataset and its memoized ROI databases.

use crate::{
    annotation::AnnotationLoader,
    common::*,
    config::{CacheValidity, Config},
    error::{require_file, RoidbError},
    image_set::ImageIndex,
    merge::merge_roidbs,
    proposal::load_proposals,
    record::{RoiDatabase, RoiRecord},
    results::{
        comp_id, Detection, DetectionEvaluator, EvaluationRequest, ExternalEvaluator, ResultsWriter,
    },
};
use cache::{ContentHash, PresenceOnly};

/// The object classes of NYUD2, without background.
pub const NYUD2_CLASSES: [&str; 19] = [
    "bathtub",
    "bed",
    "bookshelf",
    "box",
    "chair",
    "counter",
    "desk",
    "door",
    "dresser",
    "garbage-bin",
    "lamp",
    "monitor",
    "night-stand",
    "pillow",
    "sink",
    "sofa",
    "table",
    "television",
    "toilet",
];

/// The number of hex digits of a digest kept in a cache key.
const KEY_DIGEST_LEN: usize = 8;

/// A split of the NYUD2 devkit together with its database cache.
#[derive(Debug)]
pub struct Nyud2Dataset {
    config: Config,
    classes: ClassVocabulary,
    image_index: ImageIndex,
    cache: DiskCache,
}

impl Nyud2Dataset {
    /// Checks the devkit layout and loads the class table and the split.
    pub fn open(config: Config) -> Result<Self> {
        let devkit_dir = &config.dataset.devkit_dir;
        ensure_dir(devkit_dir, "devkit")?;
        ensure_dir(&devkit_dir.join("data"), "image data")?;

        let classes = match &config.dataset.classes_file {
            Some(path) => ClassVocabulary::load(path)?,
            None => ClassVocabulary::with_background(NYUD2_CLASSES)?,
        };

        let split_file = split_file_path(devkit_dir);
        if !split_file.is_file() {
            return Err(RoidbError::Configuration(format!(
                "split file '{}' does not exist",
                split_file.display()
            ))
            .into());
        }
        let image_index = ImageIndex::from_split_file(&split_file, &config.dataset.image_set)?;

        Self::new(config, classes, image_index)
    }

    /// Builds a dataset over a given class table and split.
    pub fn new(config: Config, classes: ClassVocabulary, image_index: ImageIndex) -> Result<Self> {
        let cache_dir = &config.cache.dir;
        let cache = match config.cache.validity {
            CacheValidity::PresenceOnly => DiskCache::new(cache_dir, PresenceOnly)?,
            CacheValidity::ContentHash => DiskCache::new(cache_dir, ContentHash)?,
        };

        let dataset = Self {
            config,
            classes,
            image_index,
            cache,
        };
        info!(
            "opened dataset {} with {} images and {} classes",
            dataset.name(),
            dataset.num_images(),
            dataset.num_classes()
        );
        Ok(dataset)
    }

    /// The dataset name, which identifies the image type, year and split.
    pub fn name(&self) -> String {
        let dataset = &self.config.dataset;
        format!(
            "nyud2_{}_{}_{}",
            dataset.image_type, dataset.year, dataset.image_set
        )
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn classes(&self) -> &ClassVocabulary {
        &self.classes
    }

    pub fn image_index(&self) -> &ImageIndex {
        &self.image_index
    }

    pub fn cache(&self) -> &DiskCache {
        &self.cache
    }

    pub fn num_classes(&self) -> usize {
        self.classes.len()
    }

    pub fn num_images(&self) -> usize {
        self.image_index.len()
    }

    /// The image file of the `index`-th image.
    pub fn image_path_at(&self, index: usize) -> Result<PathBuf> {
        let id = self.image_index.get(index).ok_or_else(|| {
            format_err!(
                "image index {} is out of range for {} images",
                index,
                self.num_images()
            )
        })?;
        self.image_path_from_index(id)
    }

    /// The image file of an image identifier.
    pub fn image_path_from_index(&self, id: &str) -> Result<PathBuf> {
        let dataset = &self.config.dataset;
        let path = dataset
            .devkit_dir
            .join("data")
            .join(&dataset.image_type)
            .join(format!("{}.png", id));
        require_file(&path)?;
        Ok(path)
    }

    pub fn annotation_dir(&self) -> PathBuf {
        self.config
            .dataset
            .devkit_dir
            .join("benchmarkData")
            .join("gt_box_cache_dir")
    }

    pub fn proposal_path(&self) -> PathBuf {
        match &self.config.proposals.file {
            Some(path) => path.clone(),
            None => self
                .config
                .cache
                .dir
                .join("..")
                .join("mcg_data")
                .join("nyud2_2015.mat"),
        }
    }

    pub fn results_dir(&self) -> PathBuf {
        match &self.config.results.dir {
            Some(dir) => dir.clone(),
            None => self.config.dataset.devkit_dir.join("results"),
        }
    }

    /// The cache key of [Self::gt_roidb]. A custom class table adds a
    /// digest of its class names.
    pub fn gt_key(&self) -> CacheKey {
        let mut kind = vec!["gt".to_owned()];
        kind.extend(self.classes_tag());
        kind.push("roidb".to_owned());
        CacheKey::new(self.name(), kind.join("_"))
    }

    /// The cache key of [Self::roidb]. Besides the proposal method, it marks
    /// a build without ground truth, a custom class table and a custom
    /// proposal file.
    pub fn roidb_key(&self) -> CacheKey {
        let proposals = &self.config.proposals;
        let mut kind = vec![proposals.method.clone()];
        if !self.config.dataset.use_ground_truth {
            kind.push("nogt".to_owned());
        }
        kind.extend(self.classes_tag());
        if let Some(path) = &proposals.file {
            let digest = blake3::hash(path.to_string_lossy().as_bytes());
            kind.push(short_digest(&digest));
        }
        kind.push("roidb".to_owned());
        CacheKey::new(self.name(), kind.join("_"))
    }

    fn classes_tag(&self) -> Option<String> {
        if self.config.dataset.classes_file.is_none() {
            return None;
        }

        let mut hasher = blake3::Hasher::new();
        for name in self.classes.iter() {
            hasher.update(name.as_bytes());
            hasher.update(&[0]);
        }
        Some(format!("c{}", short_digest(&hasher.finalize())))
    }

    fn gt_inputs(&self) -> Vec<PathBuf> {
        let loader = AnnotationLoader::new(self.annotation_dir(), &self.classes);
        self.image_index.iter().map(|id| loader.path_of(id)).collect()
    }

    fn roidb_inputs(&self) -> Vec<PathBuf> {
        let mut inputs = if self.config.dataset.use_ground_truth {
            self.gt_inputs()
        } else {
            vec![]
        };
        inputs.push(self.proposal_path());
        inputs
    }

    /// The ground-truth database, loaded from the cache or from the
    /// annotation files.
    pub fn gt_roidb(&self) -> Result<RoiDatabase> {
        let key = self.gt_key();
        let roidb = self
            .cache
            .get_or_insert_with(&key, &self.gt_inputs(), || {
                AnnotationLoader::new(self.annotation_dir(), &self.classes)
                    .load_all(&self.image_index)
            })
            .with_context(|| format!("failed to build {}", key))?;
        self.check_roidb(&roidb)?;
        Ok(roidb)
    }

    /// The merged ground-truth and proposal database, loaded from the cache
    /// or built on top of [Self::gt_roidb].
    pub fn roidb(&self) -> Result<RoiDatabase> {
        let key = self.roidb_key();
        let roidb = self
            .cache
            .get_or_insert_with(&key, &self.roidb_inputs(), || {
                let gt = if self.config.dataset.use_ground_truth {
                    Some(self.gt_roidb()?)
                } else {
                    info!("ground truth is disabled, building {} from proposals only", key);
                    None
                };
                let proposals = load_proposals(self.proposal_path(), &self.image_index)?;
                merge_roidbs(gt.as_deref(), &proposals, self.num_classes())
            })
            .with_context(|| format!("failed to build {}", key))?;
        self.check_roidb(&roidb)?;
        Ok(roidb)
    }

    /// Removes the cached databases of this dataset. Returns the number of
    /// removed entries.
    pub fn clear_cache(&self) -> Result<usize> {
        let mut count = 0;
        for key in [self.gt_key(), self.roidb_key()] {
            if self.cache.remove(&key)? {
                count += 1;
            }
        }
        Ok(count)
    }

    /// The configured external evaluator, if any.
    pub fn external_evaluator(&self) -> Option<ExternalEvaluator> {
        self.config
            .results
            .evaluator
            .as_ref()
            .map(ExternalEvaluator::from)
    }

    /// Writes results files for `all_boxes[class][image]`, scores them with
    /// `evaluator` and returns the score.
    pub fn evaluate_detections(
        &self,
        all_boxes: &[Vec<Vec<Detection>>],
        output_dir: &Path,
        evaluator: &dyn DetectionEvaluator,
    ) -> Result<f64> {
        let results = &self.config.results;
        let comp_id = comp_id(results.use_salt);
        let results_dir = self.results_dir();
        let image_set = &self.config.dataset.image_set;

        let writer = ResultsWriter {
            dir: &results_dir,
            comp_id: &comp_id,
            image_set,
        };
        let paths = writer.write(&self.classes, &self.image_index, all_boxes)?;

        let score = evaluator.evaluate(&EvaluationRequest {
            results_dir: &results_dir,
            comp_id: &comp_id,
            image_set,
            output_dir,
        });

        if results.cleanup {
            for path in &paths {
                fs::remove_file(path)
                    .with_context(|| format!("failed to remove '{}'", path.display()))?;
            }
            debug!("removed {} results files", paths.len());
        }

        let score = score?;
        info!("{} scored {:.4} on {}", comp_id, score, self.name());
        Ok(score)
    }

    fn check_roidb(&self, roidb: &[RoiRecord]) -> Result<(), RoidbError> {
        if roidb.len() != self.num_images() {
            return Err(RoidbError::RecordCount {
                expected: self.num_images(),
                found: roidb.len(),
            });
        }
        if let Some(record) = roidb
            .iter()
            .find(|record| record.num_classes() != self.num_classes())
        {
            return Err(RoidbError::ClassCount {
                expected: self.num_classes(),
                found: record.num_classes(),
            });
        }
        Ok(())
    }
}

fn short_digest(hash: &blake3::Hash) -> String {
    hash.to_hex()[..KEY_DIGEST_LEN].to_owned()
}

fn split_file_path(devkit_dir: &Path) -> PathBuf {
    devkit_dir
        .join("benchmarkData")
        .join("metadata")
        .join("nyusplits.mat")
}

fn ensure_dir(dir: &Path, what: &str) -> Result<(), RoidbError> {
    if dir.is_dir() {
        Ok(())
    } else {
        Err(RoidbError::Configuration(format!(
            "{} directory '{}' does not exist",
            what,
            dir.display()
        )))
    }
}
