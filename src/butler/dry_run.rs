use anyhow::Result;
use async_trait::async_trait;
use tracing::info;

use crate::butler::ConfigApplier;
use crate::resource::setup_resource::SetupResource;
use crate::types::asset::Asset;

/// Logs what would be applied without touching the controller.
#[derive(Debug, Default)]
pub struct DryRunApplier;

#[async_trait]
impl ConfigApplier for DryRunApplier {
    async fn apply(&self, asset: &Asset, setup: &SetupResource) -> Result<()> {
        info!(
            address = %asset.address,
            serial = asset.serial.as_deref().unwrap_or_default(),
            vendor = asset.vendor.as_deref().unwrap_or_default(),
            location = %asset.location,
            location_known = asset.has_location(),
            sections = ?setup.section_names(),
            origin = %setup.origin().display(),
            "dry run: would apply setup"
        );

        /* NOTE: nothing is sent to the controller in a dry run */
        Ok(())
    }
}
