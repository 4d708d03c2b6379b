//! On-disk memoization of serialized records keyed by dataset identity.
//!
//! An entry is a single file named after its [CacheKey]. Whether a present
//! entry may be reused is decided by a [ValidityPolicy]: the default
//! [PresenceOnly] policy trusts any present file, so stale entries must be
//! removed explicitly when the underlying inputs change.

mod common;
mod disk;
mod error;
mod key;
mod policy;

pub use disk::*;
pub use error::*;
pub use key::*;
pub use policy::*;
