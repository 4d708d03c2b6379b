//! Ground-truth loading from per-image annotation files.

use crate::{
    common::*,
    error::{require_file, RoidbError},
    image_set::ImageIndex,
    record::{one_based_box, PixelTLBR, RoiRecord},
};

/// Reads per-image annotation files from a directory.
///
/// The file of image `<id>` is `<dir>/<id>.mat`. Its `rec` variable is a
/// struct whose `objects` field lists the objects, each with a `class` name
/// and a 1-based `bbox` in TLBR order.
#[derive(Debug, Clone)]
pub struct AnnotationLoader<'a> {
    dir: PathBuf,
    classes: &'a ClassVocabulary,
}

impl<'a> AnnotationLoader<'a> {
    pub fn new<P>(dir: P, classes: &'a ClassVocabulary) -> Self
    where
        P: AsRef<Path>,
    {
        Self {
            dir: dir.as_ref().to_owned(),
            classes,
        }
    }

    pub fn path_of(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{}.mat", id))
    }

    /// Loads the ground truth of one image. Objects of classes outside the
    /// vocabulary are dropped.
    pub fn load(&self, id: &str) -> Result<RoiRecord> {
        let path = self.path_of(id);
        require_file(&path)?;
        debug!("loading annotation '{}'", path.display());

        let file = MatFile::open(&path)
            .with_context(|| format!("failed to load annotation file '{}'", path.display()))?;
        let labels = self.parse_labels(&file, &path)?;
        RoiRecord::from_labels(labels, self.classes.len())
    }

    /// Loads the ground truth of every image, in index order.
    pub fn load_all(&self, image_index: &ImageIndex) -> Result<Vec<RoiRecord>> {
        let ids: Vec<_> = image_index.iter().collect();
        let records: Vec<_> = ids
            .par_iter()
            .map(|id| {
                self.load(id)
                    .with_context(|| format!("failed to load ground truth of image '{}'", id))
            })
            .collect::<Result<_>>()?;

        let num_boxes: usize = records.iter().map(RoiRecord::num_boxes).sum();
        info!(
            "loaded {} ground truth boxes of {} images",
            num_boxes,
            records.len()
        );
        Ok(records)
    }

    fn parse_labels(&self, file: &MatFile, path: &Path) -> Result<Vec<Label<PixelTLBR, usize>>> {
        let malformed = |err: Error| RoidbError::malformed(path, err);

        let rec = file
            .variable("rec")
            .and_then(MatValue::as_struct)
            .map_err(malformed)?;
        if rec.is_empty() {
            return Err(RoidbError::malformed(path, "the 'rec' struct is empty").into());
        }
        let objects = match rec.field(0, "objects") {
            Some(objects) => objects,
            None => return Err(RoidbError::malformed(path, "no 'objects' field in 'rec'").into()),
        };

        let objects = match objects {
            MatValue::Struct(objects) => objects,
            // an image without objects stores an empty array
            other if other.dims().iter().any(|&dim| dim == 0) => return Ok(vec![]),
            other => {
                return Err(RoidbError::malformed(
                    path,
                    format!("expect 'objects' to be a struct, but found a {} array", other.kind()),
                )
                .into())
            }
        };

        let mut labels = Vec::with_capacity(objects.len());
        for index in 0..objects.len() {
            let field = |name: &str| {
                objects.field(index, name).ok_or_else(|| {
                    RoidbError::malformed(path, format!("object {} has no '{}' field", index, name))
                })
            };

            let class_name = field("class")?
                .as_char()
                .and_then(|array| array.text())
                .map_err(malformed)?;
            let class = match self.classes.index_of(&class_name) {
                Some(class) => class,
                None => {
                    debug!(
                        "drop object {} of class '{}' in '{}'",
                        index,
                        class_name,
                        path.display()
                    );
                    continue;
                }
            };

            let bbox = field("bbox")?.as_numeric().map_err(malformed)?;
            let rect = one_based_box(bbox.data(), CornerOrder::Tlbr).map_err(RoidbError::shape(
                format!("object {} of '{}'", index, path.display()),
            ))?;
            labels.push(Label { rect, class });
        }

        Ok(labels)
    }
}
