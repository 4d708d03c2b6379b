use crate::{common::*, error::RoidbError};

/// Formats a numeric split index as an image identifier.
pub fn image_id(index: u64) -> String {
    format!("img_{:04}", index)
}

/// The ordered, duplicate-free image identifiers of a dataset split.
///
/// The position of an identifier is the position of its record in every
/// database built from this index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageIndex {
    ids: IndexSet<String>,
}

impl ImageIndex {
    pub fn new<I, S>(ids: I) -> Result<Self, RoidbError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut set = IndexSet::new();
        for id in ids {
            let id = id.into();
            if set.contains(&id) {
                return Err(RoidbError::Configuration(format!(
                    "duplicated image identifier '{}'",
                    id
                )));
            }
            set.insert(id);
        }
        Ok(Self { ids: set })
    }

    /// Loads the split named `image_set` from a split file, whose variable of
    /// that name lists the numeric image indices.
    pub fn from_split_file<P>(path: P, image_set: &str) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        crate::error::require_file(path)?;
        let file = MatFile::open(path)
            .with_context(|| format!("failed to load split file '{}'", path.display()))?;

        let indices = file
            .variable(image_set)
            .and_then(MatValue::as_numeric)
            .map_err(|err| RoidbError::malformed(path, err))?;

        let ids: Vec<_> = indices
            .data()
            .iter()
            .map(|&value| {
                let valid = value.fract() == 0.0 && value >= 0.0 && value <= u32::MAX as f64;
                if valid {
                    Ok(image_id(value as u64))
                } else {
                    Err(RoidbError::malformed(
                        path,
                        format!("'{}' is not an image index", value),
                    ))
                }
            })
            .try_collect()?;

        let index = Self::new(ids)?;
        info!(
            "loaded {} images of split '{}' from '{}'",
            index.len(),
            image_set,
            path.display()
        );
        Ok(index)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.ids.get_index(index).map(String::as_str)
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.ids.get_index_of(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.ids.iter().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifiers_are_zero_padded() {
        assert_eq!(image_id(1), "img_0001");
        assert_eq!(image_id(5001), "img_5001");
        assert_eq!(image_id(12345), "img_12345");
    }

    #[test]
    fn reject_duplicates() {
        let err = ImageIndex::new(["img_0001", "img_0002", "img_0001"]).unwrap_err();
        assert!(matches!(err, RoidbError::Configuration(_)));
    }

    #[test]
    fn load_split_file() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("nyusplits.mat");

        let mut file = MatFile::new();
        file.insert(
            "trainval",
            NumericArray::new(NumericClass::Double, vec![3, 1], vec![5003.0, 1.0, 12.0])?.into(),
        );
        file.insert("test", MatValue::row_vector(&[2.0, 2.0]));
        file.insert("broken", MatValue::row_vector(&[1.5]));
        file.write(&path)?;

        let index = ImageIndex::from_split_file(&path, "trainval")?;
        assert_eq!(
            index.iter().collect::<Vec<_>>(),
            vec!["img_5003", "img_0001", "img_0012"]
        );
        assert_eq!(index.position("img_0001"), Some(1));
        assert_eq!(index.get(2), Some("img_0012"));

        let err = ImageIndex::from_split_file(&path, "test").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<RoidbError>(),
            Some(RoidbError::Configuration(_))
        ));

        let err = ImageIndex::from_split_file(&path, "broken").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<RoidbError>(),
            Some(RoidbError::MalformedRecord { .. })
        ));

        let err = ImageIndex::from_split_file(&path, "missing").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<RoidbError>(),
            Some(RoidbError::MalformedRecord { .. })
        ));

        let err = ImageIndex::from_split_file(dir.path().join("none.mat"), "trainval").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<RoidbError>(),
            Some(RoidbError::FileNotFound { .. })
        ));
        Ok(())
    }
}
