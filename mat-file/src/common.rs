pub use anyhow::{bail, ensure, format_err, Context as _, Result};
pub use byteorder::{BigEndian, ByteOrder, LittleEndian, WriteBytesExt as _};
pub use indexmap::{IndexMap, IndexSet};
pub use itertools::Itertools as _;
pub use log::debug;
pub use std::{borrow::Cow, marker::PhantomData, path::Path};
