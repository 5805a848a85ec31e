use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::{Instrument, Span, info, warn};

use crate::dora::dora_client::CatalogTransport;
use crate::dora::dora_types::{AssetAttributes, DoraItem, DoraResponse, decode};
use crate::dora::location_resolver::LocationResolver;
use crate::inventory::{BatchSender, InventorySource};
use crate::types::asset::{Asset, Batch};
use crate::types::asset_type::AssetType;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DoraQuery {
    /// Page through every blade, chassis and discrete in the catalog.
    All,
    /// Look up specific serials of a single asset type.
    BySerial {
        serials: String,
        asset_type: AssetType,
    },
}

pub struct DoraInventory {
    transport: Arc<dyn CatalogTransport>,
    resolver: LocationResolver,
    base_url: String,
    page_size: usize,
    query: DoraQuery,
    span: Span,
}

impl DoraInventory {
    pub fn new(
        transport: Arc<dyn CatalogTransport>,
        base_url: impl Into<String>,
        page_size: usize,
        query: DoraQuery,
        span: Span,
    ) -> Self {
        let base_url = base_url.into();

        Self {
            resolver: LocationResolver::new(transport.clone(), base_url.clone()),
            transport,
            base_url,
            page_size,
            query,
            span,
        }
    }

    fn first_page_url(&self, asset_type: &AssetType) -> String {
        format!(
            "{}/v1/{}?page[offset]=0&page[limit]={}",
            self.base_url,
            asset_type.plural(),
            self.page_size
        )
    }

    fn serial_url(&self, serials: &str, asset_type: &AssetType) -> String {
        format!(
            "{}/v1/{}?filter[serial]={}",
            self.base_url,
            asset_type.plural(),
            serials.to_lowercase()
        )
    }

    async fn fetch_page(&self, url: &str) -> Result<DoraResponse<AssetAttributes>> {
        let text = self
            .transport
            .get(url)
            .await
            .with_context(|| format!("error querying dora for assets: {url}"))?;

        let page = decode::<AssetAttributes>(url, &text)
            .with_context(|| format!("unable to decode assets returned by dora: {url}"))?;

        Ok(page)
    }

    /// Location failures are reported but the batch goes out regardless.
    async fn resolve_locations(&self, asset_type: &AssetType, batch: &mut Batch) {
        if let Err(error) = self.resolver.resolve(batch).await {
            warn!(
                %asset_type,
                url = error.url(),
                %error,
                assets = batch.len(),
                "asset location could not be determined, continuing without it"
            );
        }
    }

    async fn scan_all(&self, channel: &BatchSender) -> Result<()> {
        for asset_type in AssetType::SCAN_ORDER {
            let mut url = self.first_page_url(&asset_type);

            loop {
                let page = self.fetch_page(&url).await?;
                let mut batch = to_batch(&page.data, &asset_type, &url);

                self.resolve_locations(&asset_type, &mut batch).await;

                channel
                    .send(batch)
                    .await
                    .context("inventory consumer hung up")?;

                match page.links.next_page() {
                    Some(next) => url = format!("{}{}", self.base_url, next),
                    None => {
                        info!(%asset_type, %url, "reached end of assets in dora");
                        break;
                    }
                }
            }
        }

        Ok(())
    }

    async fn lookup_serials(
        &self,
        serials: &str,
        asset_type: &AssetType,
        channel: &BatchSender,
    ) -> Result<()> {
        let url = self.serial_url(serials, asset_type);
        let page = self.fetch_page(&url).await?;

        if page.data.is_empty() {
            warn!(%asset_type, %url, serials, "no data for serial(s) in dora");
            return Ok(());
        }

        let mut batch = to_batch(&page.data, asset_type, &url);
        self.resolve_locations(asset_type, &mut batch).await;

        channel
            .send(batch)
            .await
            .context("inventory consumer hung up")?;

        Ok(())
    }
}

#[async_trait]
impl InventorySource for DoraInventory {
    fn name(&self) -> &'static str {
        "dora"
    }

    async fn produce_batches(&self, channel: BatchSender) -> Result<()> {
        let run = async {
            match &self.query {
                DoraQuery::All => self.scan_all(&channel).await,
                DoraQuery::BySerial {
                    serials,
                    asset_type,
                } => self.lookup_serials(serials, asset_type, &channel).await,
            }
        };

        run.instrument(self.span.clone()).await
    }
}

/// Items without a bmc address cannot be reached and stop here.
fn to_batch(items: &[DoraItem<AssetAttributes>], asset_type: &AssetType, url: &str) -> Batch {
    items
        .iter()
        .filter_map(|item| {
            let Some(address) = item.attributes.address() else {
                warn!(
                    %asset_type,
                    %url,
                    item = ?item,
                    "asset has no bmc address, skipping it"
                );
                return None;
            };

            Some(Asset {
                address: address.to_string(),
                serial: item.attributes.serial.clone(),
                vendor: item.attributes.vendor.clone(),
                asset_type: Some(asset_type.clone()),
                location: String::new(),
            })
        })
        .collect()
}
