use std::sync::Arc;

use anyhow::{Context, Result, bail};
use tracing::Span;

use crate::{
    config::settings::Settings,
    dora::{
        dora_client::DoraClient,
        dora_inventory::{DoraInventory, DoraQuery},
    },
    inventory::{DynamicInventorySource, ip_list::IpListSource},
    scenario::sources::SourceKind,
    types::asset_type::AssetType,
};

/// What the operator asked to be set up on this run.
#[derive(Debug, Clone, Default)]
pub struct InventoryRequest {
    pub ip_list: Option<String>,
    pub serials: Option<String>,
    pub asset_type: Option<AssetType>,
}

impl InventoryRequest {
    pub fn is_serial_lookup(&self) -> bool {
        self.serials.as_deref().is_some_and(|s| !s.trim().is_empty())
    }
}

pub struct Scenario;

impl Scenario {
    /// Source named on the command line wins over the settings file. An ip
    /// list on the command line implies the iplist source.
    pub fn source_kind(
        cli: Option<SourceKind>,
        settings: &Settings,
        request: &InventoryRequest,
    ) -> Result<SourceKind> {
        if let Some(kind) = cli.or(settings.inventory.setup.source) {
            return Ok(kind);
        }
        if request.ip_list.is_some() {
            return Ok(SourceKind::IpList);
        }

        bail!("no inventory source given; set inventory.setup.source or pass --source")
    }

    pub fn inventory_source(
        kind: SourceKind,
        settings: &Settings,
        request: &InventoryRequest,
        run_span: &Span,
    ) -> Result<DynamicInventorySource> {
        tracing::info!(source = %kind, "creating inventory source");

        let source: DynamicInventorySource = match kind {
            SourceKind::IpList => {
                let Some(ip_list) = &request.ip_list else {
                    bail!("the iplist source needs --iplist");
                };

                Box::new(IpListSource::new(ip_list.clone()))
            }
            SourceKind::Dora => {
                let config = &settings.inventory.dora;
                config.validate().context("dora is not configured")?;

                let client = Arc::new(DoraClient::with_retries(config)?);
                let query = match &request.serials {
                    Some(serials) if request.is_serial_lookup() => DoraQuery::BySerial {
                        serials: serials.clone(),
                        asset_type: request
                            .asset_type
                            .clone()
                            .context("--serial needs --asset-type")?,
                    },
                    _ => DoraQuery::All,
                };

                Box::new(DoraInventory::new(
                    client,
                    config.base_url(),
                    config.page_size,
                    query,
                    Self::dora_span(run_span, config.base_url()),
                ))
            }
        };

        Ok(source)
    }

    /// Location filtering is bypassed when explicitly asked for or when
    /// specific serials were requested.
    pub fn ignore_location(ignore_flag: bool, request: &InventoryRequest) -> bool {
        ignore_flag || request.is_serial_lookup()
    }

    pub fn run_span() -> Span {
        let run_id = uuid::Uuid::new_v4();
        tracing::info_span!("setup", %run_id)
    }

    fn dora_span(run_span: &Span, api_url: &str) -> Span {
        tracing::info_span!(parent: run_span, "dora", %api_url)
    }
}
