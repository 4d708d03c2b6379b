use crate::{corner::reorder_corners, CornerOrder, ShapeError, TLBR};

/// The generic rectangle.
pub trait Rect {
    type Type;

    fn t(&self) -> Self::Type;
    fn l(&self) -> Self::Type;
    fn b(&self) -> Self::Type;
    fn r(&self) -> Self::Type;

    fn try_from_tlbr(tlbr: [Self::Type; 4]) -> Result<Self, ShapeError>
    where
        Self: Sized;
}

pub trait RectNum: Rect
where
    Self::Type: Copy + PartialOrd,
{
    /// Builds a rectangle from coordinates laid out in `order`.
    fn try_from_corners(coords: &[Self::Type], order: CornerOrder) -> Result<Self, ShapeError>
    where
        Self: Sized,
    {
        let tlbr = reorder_corners(coords, order, CornerOrder::Tlbr)?;
        Self::try_from_tlbr(tlbr)
    }

    fn tlbr(&self) -> [Self::Type; 4] {
        [self.t(), self.l(), self.b(), self.r()]
    }

    /// The coordinates laid out in `order`.
    fn corners(&self, order: CornerOrder) -> [Self::Type; 4] {
        let tlbr = self.tlbr();
        match reorder_corners(&tlbr, CornerOrder::Tlbr, order) {
            Ok(corners) => corners,
            Err(_) => unreachable!("a four-element array always reorders"),
        }
    }

    fn to_tlbr(&self) -> TLBR<Self::Type> {
        TLBR {
            t: self.t(),
            l: self.l(),
            b: self.b(),
            r: self.r(),
        }
    }
}

impl<T> RectNum for T
where
    T: Rect,
    T::Type: Copy + PartialOrd,
{
}
