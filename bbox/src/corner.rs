//! Conversions between box corner conventions and pixel index bases.

use crate::{common::*, ShapeError};

/// The layout of the four corner coordinates of a box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CornerOrder {
    /// (min-row, min-col, max-row, max-col)
    Tlbr,
    /// (min-col, min-row, max-col, max-row)
    Ltrb,
}

impl CornerOrder {
    /// Positions of the t, l, b and r coordinates in this layout.
    const fn positions(self) -> [usize; 4] {
        match self {
            Self::Tlbr => [0, 1, 2, 3],
            Self::Ltrb => [1, 0, 3, 2],
        }
    }
}

fn four<T>(coords: &[T]) -> Result<[T; 4], ShapeError>
where
    T: Copy,
{
    coords
        .try_into()
        .map_err(|_| ShapeError::Length(coords.len()))
}

/// Permutes the coordinates of a box from one corner layout to another.
pub fn reorder_corners<T>(
    coords: &[T],
    from: CornerOrder,
    to: CornerOrder,
) -> Result<[T; 4], ShapeError>
where
    T: Copy,
{
    let input = four(coords)?;
    let mut output = input;
    from.positions()
        .into_iter()
        .zip(to.positions())
        .for_each(|(src, tgt)| output[tgt] = input[src]);
    Ok(output)
}

/// Converts 1-based inclusive pixel coordinates to 0-based ones.
pub fn to_zero_based<T>(coords: &[T]) -> Result<[T; 4], ShapeError>
where
    T: Copy + CheckedSub + One,
{
    let [a, b, c, d] = four(coords)?;
    let one = T::one();
    let sub = |value: T| value.checked_sub(&one).ok_or(ShapeError::Underflow);
    Ok([sub(a)?, sub(b)?, sub(c)?, sub(d)?])
}

/// Converts 0-based pixel coordinates to the 1-based convention.
pub fn to_one_based<T>(coords: &[T]) -> Result<[T; 4], ShapeError>
where
    T: Copy + Num,
{
    let one = T::one();
    Ok(four(coords)?.map(|value| value + one))
}
