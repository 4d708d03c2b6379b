//! Region proposals from an aggregate proposal file.

use crate::{
    common::*,
    error::{require_file, RoidbError},
    image_set::ImageIndex,
    record::{one_based_box, PixelTLBR},
};

/// Joins `keys` against `names` one to one.
///
/// Returns, for each key in order, the position of its only match in
/// `names`. Fails with [RoidbError::Alignment] when a key matches no name or
/// more than one.
pub fn join_one_to_one<'a, K, N>(keys: K, names: &[N]) -> Result<Vec<usize>, RoidbError>
where
    K: IntoIterator<Item = &'a str>,
    N: AsRef<str>,
{
    let positions: HashMap<&str, Vec<usize>> = names
        .iter()
        .enumerate()
        .map(|(position, name)| (name.as_ref(), position))
        .into_group_map();

    keys.into_iter()
        .map(|key| match positions.get(key).map(Vec::as_slice) {
            Some(&[position]) => Ok(position),
            other => Err(RoidbError::Alignment {
                id: key.to_owned(),
                matches: other.map_or(0, |matches| matches.len()),
            }),
        })
        .collect()
}

/// The contents of an aggregate proposal file.
///
/// The `imnames` cell array names the images and the `bboxes` cell array
/// holds the corresponding N×4 box arrays, 1-based in LTRB order. The file
/// order is unrelated to any image index.
#[derive(Debug, Clone)]
pub struct ProposalFile {
    path: PathBuf,
    names: Vec<String>,
    boxes: Vec<NumericArray>,
}

impl ProposalFile {
    pub fn open<P>(path: P) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        require_file(path)?;
        info!("loading proposals from '{}'", path.display());

        let file = MatFile::open(path)
            .with_context(|| format!("failed to load proposal file '{}'", path.display()))?;
        let malformed = |err: Error| RoidbError::malformed(path, err);

        let names: Vec<String> = file
            .variable("imnames")
            .and_then(MatValue::as_cell)
            .map_err(malformed)?
            .cells()
            .iter()
            .map(|cell| cell.as_char().and_then(|array| array.text()))
            .try_collect()
            .map_err(malformed)?;
        let boxes: Vec<NumericArray> = file
            .variable("bboxes")
            .and_then(MatValue::as_cell)
            .map_err(malformed)?
            .cells()
            .iter()
            .map(|cell| cell.as_numeric().map(Clone::clone))
            .try_collect()
            .map_err(malformed)?;

        if names.len() != boxes.len() {
            return Err(RoidbError::malformed(
                path,
                format!(
                    "{} image names but {} box arrays",
                    names.len(),
                    boxes.len()
                ),
            )
            .into());
        }

        Ok(Self {
            path: path.to_owned(),
            names,
            boxes,
        })
    }

    /// Picks the proposals of every image by identifier, in index order, and
    /// converts them to 0-based TLBR boxes.
    pub fn align(&self, image_index: &ImageIndex) -> Result<Vec<Vec<PixelTLBR>>> {
        let positions = join_one_to_one(image_index.iter(), &self.names)?;

        let proposals: Vec<_> = positions
            .par_iter()
            .map(|&position| {
                let name = &self.names[position];
                convert_boxes(&self.boxes[position]).with_context(|| {
                    format!(
                        "invalid proposals of image '{}' in '{}'",
                        name,
                        self.path.display()
                    )
                })
            })
            .collect::<Result<_>>()?;

        let num_boxes: usize = proposals.iter().map(Vec::len).sum();
        info!(
            "aligned {} proposals of {} images",
            num_boxes,
            proposals.len()
        );
        Ok(proposals)
    }
}

/// Loads the proposals of every image in `image_index` from an aggregate
/// proposal file.
pub fn load_proposals<P>(path: P, image_index: &ImageIndex) -> Result<Vec<Vec<PixelTLBR>>>
where
    P: AsRef<Path>,
{
    ProposalFile::open(path)?.align(image_index)
}

fn convert_boxes(array: &NumericArray) -> Result<Vec<PixelTLBR>, RoidbError> {
    if array.is_empty() {
        return Ok(vec![]);
    }
    if array.ncols() != 4 {
        return Err(RoidbError::Shape {
            context: format!("a {:?} proposal array", array.dims()),
            source: ShapeError::Length(array.ncols()),
        });
    }

    array
        .rows()
        .enumerate()
        .map(|(index, row)| {
            one_based_box(&row, CornerOrder::Ltrb)
                .map_err(RoidbError::shape(format!("proposal {}", index)))
        })
        .collect()
}
