use std::sync::Arc;

use crate::resource::setup_resource::SetupResource;
use crate::types::asset::Asset;

/// Unit of work on the butler queue.
#[derive(Debug, Clone)]
pub struct DispatchMessage {
    pub asset: Asset,
    pub setup: Arc<SetupResource>,
}

impl DispatchMessage {
    pub fn new(asset: Asset, setup: Arc<SetupResource>) -> Self {
        Self { asset, setup }
    }
}
