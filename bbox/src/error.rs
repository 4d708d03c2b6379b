use thiserror::Error;

/// The error raised by a malformed box coordinate array.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ShapeError {
    #[error("expect 4 box coordinates, but found {0}")]
    Length(usize),
    #[error("box coordinate underflows when converted to 0-based")]
    Underflow,
    #[error("the max corner of the box lies before its min corner")]
    Inverted,
    #[error("box coordinate {0} is not a valid pixel index")]
    NotPixelIndex(f64),
}
