pub use num_traits::{CheckedSub, Num, One};
pub use serde::{Deserialize, Serialize};
