pub mod butler_pool;
pub mod dry_run;

use anyhow::Result;
use async_trait::async_trait;

use crate::resource::setup_resource::SetupResource;
use crate::types::asset::Asset;

pub type DynamicApplier = std::sync::Arc<dyn ConfigApplier>;

/// Applies the one-time setup to a single controller.
#[async_trait]
pub trait ConfigApplier: Send + Sync {
    async fn apply(&self, asset: &Asset, setup: &SetupResource) -> Result<()>;
}
