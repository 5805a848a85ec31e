use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::warn;

use crate::inventory::{BatchSender, InventorySource};
use crate::types::asset::{Asset, Batch};

/// Inventory given up front as a comma separated list of addresses.
#[derive(Debug, Clone)]
pub struct IpListSource {
    ip_list: String,
}

impl IpListSource {
    pub fn new(ip_list: impl Into<String>) -> Self {
        Self {
            ip_list: ip_list.into(),
        }
    }

    fn batch(&self) -> Batch {
        if self.ip_list.trim().is_empty() {
            return Batch::new();
        }

        self.ip_list
            .split(',')
            .map(str::trim)
            .filter(|address| {
                if address.is_empty() {
                    warn!(ip_list = %self.ip_list, "skipping empty address in ip list");
                    return false;
                }
                true
            })
            .map(Asset::with_address)
            .collect()
    }
}

#[async_trait]
impl InventorySource for IpListSource {
    fn name(&self) -> &'static str {
        "iplist"
    }

    async fn produce_batches(&self, channel: BatchSender) -> Result<()> {
        channel
            .send(self.batch())
            .await
            .context("inventory consumer hung up")?;

        Ok(())
    }
}
