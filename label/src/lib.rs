//! Labeled boxes and class vocabularies.

mod vocabulary;
pub use vocabulary::*;

use bbox::Rect;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Label<R, C>
where
    R: Rect,
{
    pub rect: R,
    pub class: C,
}
