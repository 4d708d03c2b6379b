//! Region-of-interest database builder for detector training.
//!
//! For every image of a dataset split, the ground-truth boxes from the
//! per-image annotation files are concatenated with externally computed
//! region proposals into one [RoiRecord]. Both the ground-truth database and
//! the merged database are memoized in a [cache::DiskCache].

pub mod annotation;
pub mod common;
pub mod config;
pub mod dataset;
pub mod error;
pub mod export;
pub mod image_set;
pub mod merge;
pub mod proposal;
pub mod record;
pub mod results;
pub mod sparse;

pub use config::Config;
pub use dataset::{Nyud2Dataset, NYUD2_CLASSES};
pub use error::RoidbError;
pub use image_set::ImageIndex;
pub use record::{Coord, GroundTruthRecord, PixelTLBR, RoiDatabase, RoiRecord};
pub use sparse::CsrMatrix;
