//! Safe bounding box types and coordinate normalization.

mod common;

pub use corner::*;
pub mod corner;

pub use error::*;
pub mod error;

pub use rect::*;
pub mod rect;

pub use tlbr::*;
pub mod tlbr;

pub mod prelude {
    pub use crate::rect::{Rect, RectNum};
}
