use std::collections::HashMap;
use std::sync::Arc;

use crate::dora::dora_client::CatalogTransport;
use crate::dora::dora_types::{ScannedPortAttributes, decode};
use crate::dora::error::CatalogError;
use crate::types::asset::Asset;

/// Fills in `Asset::location` from the scanned ports catalog.
#[derive(Clone)]
pub struct LocationResolver {
    transport: Arc<dyn CatalogTransport>,
    base_url: String,
}

impl LocationResolver {
    pub fn new(transport: Arc<dyn CatalogTransport>, base_url: impl Into<String>) -> Self {
        Self {
            transport,
            base_url: base_url.into(),
        }
    }

    pub fn query_url(&self, assets: &[Asset]) -> String {
        let addresses: Vec<&str> = assets.iter().map(|a| a.address.as_str()).collect();

        format!(
            "{}/v1/scanned_ports?filter[port]=22&filter[ip]={}",
            self.base_url,
            addresses.join(",")
        )
    }

    /// On error no asset is touched.
    pub async fn resolve(&self, assets: &mut [Asset]) -> Result<(), CatalogError> {
        if assets.is_empty() {
            return Ok(());
        }

        let url = self.query_url(assets);
        let text = self.transport.get(&url).await?;
        let scanned = decode::<ScannedPortAttributes>(&url, &text)?;

        let sites: HashMap<String, String> = scanned
            .data
            .into_iter()
            .map(|item| (item.attributes.ip, item.attributes.site))
            .collect();

        for asset in assets.iter_mut() {
            if let Some(site) = sites.get(&asset.address) {
                asset.location = site.clone();
            }
        }

        tracing::debug!(%url, matched = sites.len(), "resolved asset locations");

        Ok(())
    }
}
