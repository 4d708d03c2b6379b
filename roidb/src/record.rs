use crate::{common::*, sparse::CsrMatrix};

/// The pixel coordinate type of stored boxes.
pub type Coord = u16;

/// A box in 0-based, inclusive pixel coordinates.
pub type PixelTLBR = TLBR<Coord>;

/// Per-image ROI records in image index order.
pub type RoiDatabase = Vec<RoiRecord>;

/// A record holding ground-truth boxes only.
pub type GroundTruthRecord = RoiRecord;

/// The boxes of one image, their class labels and their class relevance.
///
/// Row `i` of `gt_overlaps` scores box `i` against every class. Ground-truth
/// rows are one-hot, proposal rows are empty and labeled background.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RoiRecordParts", into = "RoiRecordParts")]
pub struct RoiRecord {
    pub boxes: Vec<PixelTLBR>,
    pub gt_classes: Vec<usize>,
    pub gt_overlaps: CsrMatrix,
    pub flipped: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RoiRecordParts {
    boxes: Vec<PixelTLBR>,
    gt_classes: Vec<usize>,
    gt_overlaps: CsrMatrix,
    flipped: bool,
}

impl RoiRecord {
    pub fn new(
        boxes: Vec<PixelTLBR>,
        gt_classes: Vec<usize>,
        gt_overlaps: CsrMatrix,
        flipped: bool,
    ) -> Result<Self> {
        ensure!(
            boxes.len() == gt_classes.len() && boxes.len() == gt_overlaps.nrows(),
            "inconsistent record lengths: {} boxes, {} labels, {} relevance rows",
            boxes.len(),
            gt_classes.len(),
            gt_overlaps.nrows()
        );
        if let Some(&class) = gt_classes
            .iter()
            .find(|&&class| class >= gt_overlaps.ncols())
        {
            bail!(
                "class label {} is out of range for {} classes",
                class,
                gt_overlaps.ncols()
            );
        }
        Ok(Self {
            boxes,
            gt_classes,
            gt_overlaps,
            flipped,
        })
    }

    /// A ground-truth record with one-hot relevance rows.
    pub fn from_labels(labels: Vec<Label<PixelTLBR, usize>>, num_classes: usize) -> Result<Self> {
        let (boxes, gt_classes): (Vec<_>, Vec<_>) = labels
            .into_iter()
            .map(|label| (label.rect, label.class))
            .unzip();
        let gt_overlaps = CsrMatrix::one_hot(&gt_classes, num_classes)?;
        Self::new(boxes, gt_classes, gt_overlaps, false)
    }

    /// A record of proposals only, all labeled background.
    pub fn from_proposals(boxes: Vec<PixelTLBR>, num_classes: usize) -> Self {
        let num_boxes = boxes.len();
        Self {
            boxes,
            gt_classes: vec![0; num_boxes],
            gt_overlaps: CsrMatrix::zeros(num_boxes, num_classes),
            flipped: false,
        }
    }

    pub fn num_boxes(&self) -> usize {
        self.boxes.len()
    }

    pub fn num_classes(&self) -> usize {
        self.gt_overlaps.ncols()
    }

    pub fn labels(&self) -> impl Iterator<Item = Label<PixelTLBR, usize>> + '_ {
        self.boxes
            .iter()
            .zip(&self.gt_classes)
            .map(|(&rect, &class)| Label { rect, class })
    }
}

impl TryFrom<RoiRecordParts> for RoiRecord {
    type Error = Error;

    fn try_from(from: RoiRecordParts) -> Result<Self, Self::Error> {
        let RoiRecordParts {
            boxes,
            gt_classes,
            gt_overlaps,
            flipped,
        } = from;
        Self::new(boxes, gt_classes, gt_overlaps, flipped)
    }
}

impl From<RoiRecord> for RoiRecordParts {
    fn from(from: RoiRecord) -> Self {
        let RoiRecord {
            boxes,
            gt_classes,
            gt_overlaps,
            flipped,
        } = from;
        Self {
            boxes,
            gt_classes,
            gt_overlaps,
            flipped,
        }
    }
}

/// Converts pixel indices stored as floating point values.
pub(crate) fn pixel_coords(values: &[f64]) -> Result<Vec<Coord>, ShapeError> {
    values
        .iter()
        .map(|&value| {
            let in_range = value.fract() == 0.0 && (0.0..=Coord::MAX as f64).contains(&value);
            if in_range {
                Ok(value as Coord)
            } else {
                Err(ShapeError::NotPixelIndex(value))
            }
        })
        .collect()
}

/// Parses a 1-based box laid out in `order` into 0-based TLBR.
pub(crate) fn one_based_box(values: &[f64], order: CornerOrder) -> Result<PixelTLBR, ShapeError> {
    let coords = pixel_coords(values)?;
    let zero_based = bbox::to_zero_based(&coords)?;
    PixelTLBR::try_from_corners(&zero_based, order)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_become_one_hot_rows() -> Result<()> {
        let rect = PixelTLBR::try_from_tlbr([10, 20, 50, 60])?;
        let record = RoiRecord::from_labels(vec![Label { rect, class: 5 }], 20)?;

        assert_eq!(record.num_boxes(), 1);
        assert_eq!(record.num_classes(), 20);
        assert_eq!(record.gt_classes, vec![5]);
        assert_eq!(record.gt_overlaps.get(0, 5), Some(r32(1.0)));
        assert_eq!(record.gt_overlaps.nnz(), 1);
        assert!(!record.flipped);
        assert_eq!(record.labels().next(), Some(Label { rect, class: 5 }));
        Ok(())
    }

    #[test]
    fn empty_labels() -> Result<()> {
        let record = RoiRecord::from_labels(vec![], 20)?;
        assert_eq!(record.num_boxes(), 0);
        assert_eq!(record.gt_overlaps.shape(), (0, 20));
        Ok(())
    }

    #[test]
    fn reject_inconsistent_lengths() -> Result<()> {
        let rect = PixelTLBR::try_from_tlbr([0, 0, 1, 1])?;
        let result = RoiRecord::new(vec![rect], vec![], CsrMatrix::zeros(1, 3), false);
        assert!(result.is_err());
        Ok(())
    }

    #[test]
    fn reject_out_of_range_label() -> Result<()> {
        let rect = PixelTLBR::try_from_tlbr([0, 0, 1, 1])?;
        let result = RoiRecord::new(vec![rect], vec![3], CsrMatrix::zeros(1, 3), false);
        assert!(result.is_err());
        Ok(())
    }

    #[test]
    fn invalid_record_fails_to_deserialize() -> Result<()> {
        let rect = PixelTLBR::try_from_tlbr([10, 20, 50, 60])?;
        let record = RoiRecord::from_labels(vec![Label { rect, class: 2 }], 3)?;
        let bytes = bincode::serialize(&record)?;
        let decoded: RoiRecord = bincode::deserialize(&bytes)?;
        assert_eq!(decoded, record);

        // two boxes against a single relevance row
        let parts = RoiRecordParts {
            boxes: vec![rect, rect],
            gt_classes: vec![2, 0],
            gt_overlaps: CsrMatrix::one_hot(&[2], 3)?,
            flipped: false,
        };
        let bytes = bincode::serialize(&parts)?;
        assert!(bincode::deserialize::<RoiRecord>(&bytes).is_err());

        let parts = RoiRecordParts {
            boxes: vec![rect],
            gt_classes: vec![7],
            gt_overlaps: CsrMatrix::zeros(1, 3),
            flipped: false,
        };
        let bytes = bincode::serialize(&parts)?;
        assert!(bincode::deserialize::<RoiRecord>(&bytes).is_err());
        Ok(())
    }

    #[test]
    fn parse_one_based_box() -> Result<()> {
        let rect = one_based_box(&[11.0, 21.0, 51.0, 61.0], CornerOrder::Tlbr)?;
        assert_eq!(rect.tlbr(), [10, 20, 50, 60]);

        let rect = one_based_box(&[21.0, 11.0, 61.0, 51.0], CornerOrder::Ltrb)?;
        assert_eq!(rect.tlbr(), [10, 20, 50, 60]);
        Ok(())
    }

    #[test]
    fn reject_bad_coordinates() {
        assert_eq!(
            one_based_box(&[0.0, 1.0, 2.0, 3.0], CornerOrder::Tlbr),
            Err(ShapeError::Underflow)
        );
        assert_eq!(
            one_based_box(&[1.5, 1.0, 2.0, 3.0], CornerOrder::Tlbr),
            Err(ShapeError::NotPixelIndex(1.5))
        );
        assert_eq!(
            one_based_box(&[1.0, 1.0, 2.0], CornerOrder::Tlbr),
            Err(ShapeError::Length(3))
        );
        assert_eq!(
            one_based_box(&[-1.0, 1.0, 2.0, 3.0], CornerOrder::Tlbr),
            Err(ShapeError::NotPixelIndex(-1.0))
        );
    }
}
