use anyhow::{ensure, Context as _, Result};
use indexmap::IndexSet;
use std::path::Path;

/// The reserved name of the class at index 0.
pub const BACKGROUND_CLASS: &str = "__background__";

/// An ordered class table whose index 0 is always the background class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassVocabulary {
    classes: IndexSet<String>,
}

impl ClassVocabulary {
    /// Builds a vocabulary from object class names. The background class is
    /// prepended and must not appear in `names`.
    pub fn with_background<I, S>(names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut classes = IndexSet::new();
        classes.insert(BACKGROUND_CLASS.to_owned());

        for name in names {
            let name = name.into();
            ensure!(
                name != BACKGROUND_CLASS,
                "'{}' is reserved for the background class",
                BACKGROUND_CLASS
            );
            ensure!(!name.is_empty(), "empty class name");
            let inserted = classes.insert(name.clone());
            ensure!(inserted, "duplicated class name '{}'", name);
        }

        ensure!(classes.len() > 1, "no object classes given");
        Ok(Self { classes })
    }

    /// Loads object class names from a text file with one name per line.
    pub fn load<P>(path: P) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read classes file '{}'", path.display()))?;
        let names = content.lines().map(str::trim).filter(|line| !line.is_empty());
        Self::with_background(names)
            .with_context(|| format!("invalid classes file '{}'", path.display()))
    }

    /// The number of classes including background.
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.classes.get_index_of(name)
    }

    pub fn name_of(&self, index: usize) -> Option<&str> {
        self.classes.get_index(index).map(String::as_str)
    }

    /// Iterates over (index, name) pairs of the object classes, skipping background.
    pub fn object_classes(&self) -> impl Iterator<Item = (usize, &str)> {
        self.classes
            .iter()
            .enumerate()
            .skip(1)
            .map(|(index, name)| (index, name.as_str()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.classes.iter().map(String::as_str)
    }
}
