use crate::{common::*, Rect, ShapeError};

/// Bounding box in TLBR format, that is (min-row, min-col, max-row, max-col).
///
/// The max corner never lies before the min corner on either axis. The
/// serialized form is the plain coordinate array, and deserialization checks
/// the same invariant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(
    try_from = "[T; 4]",
    into = "[T; 4]",
    bound(
        serialize = "T: Serialize + Copy",
        deserialize = "T: Deserialize<'de> + Copy + PartialOrd"
    )
)]
pub struct TLBR<T> {
    pub(crate) t: T,
    pub(crate) l: T,
    pub(crate) b: T,
    pub(crate) r: T,
}

impl<T> Rect for TLBR<T>
where
    T: Copy + PartialOrd,
{
    type Type = T;

    fn t(&self) -> Self::Type {
        self.t
    }

    fn l(&self) -> Self::Type {
        self.l
    }

    fn b(&self) -> Self::Type {
        self.b
    }

    fn r(&self) -> Self::Type {
        self.r
    }

    fn try_from_tlbr(tlbr: [Self::Type; 4]) -> Result<Self, ShapeError> {
        let [t, l, b, r] = tlbr;
        if !(b >= t && r >= l) {
            return Err(ShapeError::Inverted);
        }
        Ok(Self { t, l, b, r })
    }
}

impl<T> TryFrom<[T; 4]> for TLBR<T>
where
    T: Copy + PartialOrd,
{
    type Error = ShapeError;

    fn try_from(from: [T; 4]) -> Result<Self, Self::Error> {
        Self::try_from_tlbr(from)
    }
}

impl<T> From<TLBR<T>> for [T; 4] {
    fn from(from: TLBR<T>) -> Self {
        let TLBR { t, l, b, r } = from;
        [t, l, b, r]
    }
}
