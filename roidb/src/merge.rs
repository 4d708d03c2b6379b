//! Concatenation of ground truth and proposals into ROI records.

use crate::{
    common::*,
    error::RoidbError,
    record::{PixelTLBR, RoiRecord},
    sparse::CsrMatrix,
};

/// Appends proposal boxes after the ground truth of one image.
///
/// Proposal rows are labeled background and carry empty relevance rows. The
/// leading rows of the output equal the ground truth record. Without ground
/// truth the record holds the proposals alone.
pub fn merge_record(
    gt: Option<&RoiRecord>,
    proposals: &[PixelTLBR],
    num_classes: usize,
) -> Result<RoiRecord> {
    let gt = match gt {
        Some(gt) => gt,
        None => return Ok(RoiRecord::from_proposals(proposals.to_vec(), num_classes)),
    };
    ensure!(
        gt.num_classes() == num_classes,
        "expect {} classes in ground truth, but found {}",
        num_classes,
        gt.num_classes()
    );

    let boxes: Vec<_> = gt.boxes.iter().chain(proposals).copied().collect();
    let gt_classes: Vec<_> = gt
        .gt_classes
        .iter()
        .copied()
        .chain(std::iter::repeat(0).take(proposals.len()))
        .collect();
    let gt_overlaps = gt
        .gt_overlaps
        .vstack(&CsrMatrix::zeros(proposals.len(), num_classes))?;

    RoiRecord::new(boxes, gt_classes, gt_overlaps, gt.flipped)
}

/// Merges per-image ground truth and aligned proposals, in index order.
pub fn merge_roidbs(
    gt: Option<&[RoiRecord]>,
    proposals: &[Vec<PixelTLBR>],
    num_classes: usize,
) -> Result<Vec<RoiRecord>> {
    if let Some(gt) = gt {
        if gt.len() != proposals.len() {
            return Err(RoidbError::RecordCount {
                expected: gt.len(),
                found: proposals.len(),
            }
            .into());
        }
    }

    proposals
        .par_iter()
        .enumerate()
        .map(|(index, boxes)| {
            let gt = gt.map(|gt| &gt[index]);
            merge_record(gt, boxes, num_classes)
        })
        .collect()
}
