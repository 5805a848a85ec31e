use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde_yaml::{Mapping, Value};

/// One-time setup configuration declared for the controllers.
///
/// The document is opaque to the pipeline; only appliers look inside it.
#[derive(Debug, Clone, PartialEq)]
pub struct SetupResource {
    origin: PathBuf,
    sections: Mapping,
}

impl SetupResource {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read setup resources {}", path.display()))?;

        Self::from_yaml(path, &raw)
            .with_context(|| format!("failed to parse setup resources {}", path.display()))
    }

    pub fn from_yaml(origin: impl Into<PathBuf>, raw: &str) -> Result<Self> {
        let document: Value = serde_yaml::from_str(raw)?;

        let sections = match document {
            Value::Mapping(sections) => sections,
            Value::Null => Mapping::new(),
            other => bail!("setup resources must be a mapping, found {other:?}"),
        };

        Ok(Self {
            origin: origin.into(),
            sections,
        })
    }

    pub fn origin(&self) -> &Path {
        &self.origin
    }

    /// Top-level section names, in document order.
    pub fn section_names(&self) -> Vec<String> {
        self.sections
            .keys()
            .filter_map(|key| key.as_str().map(str::to_string))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
}
