//! Reader and writer of MAT level-5 matrix-array files.
//!
//! The value model covers numeric, char, cell and struct arrays, which is
//! what annotation, split and proposal files are made of. Sparse, complex and
//! object arrays are rejected on load.

mod common;
mod element;
mod reader;
mod value;
mod writer;

pub use reader::*;
pub use value::*;
