use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::Deserialize;

use crate::dora::dora_config::DoraConfig;
use crate::pipeline::dispatcher::DEFAULT_QUEUE_CAPACITY;
use crate::scenario::sources::SourceKind;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default = "default_butlers_to_spawn")]
    pub butlers_to_spawn: usize,

    /// Capacity of the queue between the dispatcher and the butlers.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Sites this instance is responsible for. Empty means all of them.
    #[serde(default)]
    pub locations: Vec<String>,

    #[serde(default)]
    pub inventory: InventorySettings,

    pub resources: ResourceSettings,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InventorySettings {
    #[serde(default)]
    pub setup: InventorySetup,

    #[serde(default)]
    pub dora: DoraConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InventorySetup {
    #[serde(default)]
    pub source: Option<SourceKind>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResourceSettings {
    /// YAML document holding the one-time setup configuration.
    pub setup: PathBuf,
}

impl Settings {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read settings {}", path.display()))?;

        let mut settings = Self::from_yaml(&raw)
            .with_context(|| format!("failed to parse settings {}", path.display()))?;

        settings.inventory.dora = settings.inventory.dora.with_env_overrides();

        settings
            .validate()
            .with_context(|| format!("invalid settings {}", path.display()))?;

        Ok(settings)
    }

    pub fn from_yaml(raw: &str) -> Result<Self> {
        Ok(serde_yaml::from_str::<Settings>(raw)?)
    }

    fn validate(&self) -> Result<()> {
        if self.butlers_to_spawn == 0 {
            bail!("butlers_to_spawn must be > 0");
        }
        if self.queue_capacity == 0 {
            bail!("queue_capacity must be > 0");
        }
        if self.resources.setup.as_os_str().is_empty() {
            bail!("resources.setup must name a file");
        }
        Ok(())
    }
}

fn default_butlers_to_spawn() -> usize {
    5
}

fn default_queue_capacity() -> usize {
    DEFAULT_QUEUE_CAPACITY
}
