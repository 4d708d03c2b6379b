//! Conversion of a database to a MAT file for inspection.

use crate::{common::*, image_set::ImageIndex, record::RoiRecord};
use mat_file::CellArray;

/// Lays out a database as MAT variables.
///
/// `images` names the images. `boxes`, `gt_classes` and `gt_overlaps` are
/// cell arrays with one N×4, N×1 and dense N×C array per image, and
/// `flipped` is a column of flags. Boxes are 0-based TLBR.
pub fn roidb_to_mat(image_index: &ImageIndex, roidb: &[RoiRecord]) -> Result<MatFile> {
    ensure!(
        image_index.len() == roidb.len(),
        "{} images but {} records",
        image_index.len(),
        roidb.len()
    );

    let images: Vec<_> = image_index.iter().map(MatValue::text).collect();
    let mut boxes = Vec::with_capacity(roidb.len());
    let mut gt_classes = Vec::with_capacity(roidb.len());
    let mut gt_overlaps = Vec::with_capacity(roidb.len());

    for record in roidb {
        let rows: Vec<_> = record
            .boxes
            .iter()
            .map(|rect| rect.tlbr().map(f64::from))
            .collect();
        boxes.push(matrix(NumericClass::UInt16, &rows, 4)?);

        let rows: Vec<_> = record.gt_classes.iter().map(|&class| [class as f64]).collect();
        gt_classes.push(matrix(NumericClass::Double, &rows, 1)?);

        let rows: Vec<Vec<f64>> = record
            .gt_overlaps
            .to_dense()
            .into_iter()
            .map(|row| row.into_iter().map(f64::from).collect())
            .collect();
        gt_overlaps.push(matrix(NumericClass::Single, &rows, record.num_classes())?);
    }

    let flipped: Vec<_> = roidb
        .iter()
        .map(|record| if record.flipped { 1.0 } else { 0.0 })
        .collect();

    let mut file = MatFile::new();
    file.insert("images", CellArray::column(images).into());
    file.insert("boxes", CellArray::column(boxes).into());
    file.insert("gt_classes", CellArray::column(gt_classes).into());
    file.insert("gt_overlaps", CellArray::column(gt_overlaps).into());
    file.insert(
        "flipped",
        NumericArray::new(NumericClass::UInt8, vec![roidb.len(), 1], flipped)?.into(),
    );
    Ok(file)
}

fn matrix<R>(class: NumericClass, rows: &[R], ncols: usize) -> Result<MatValue>
where
    R: AsRef<[f64]>,
{
    let array = if rows.is_empty() {
        NumericArray::new(class, vec![0, ncols], vec![])?
    } else {
        NumericArray::from_rows(class, rows)?
    };
    Ok(array.into())
}
