use std::fmt;

use crate::types::asset_type::AssetType;

/// One manageable controller endpoint flowing through the pipeline.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Asset {
    /// Network address of the controller. Never empty once past a source.
    pub address: String,
    pub serial: Option<String>,
    pub vendor: Option<String>,
    pub asset_type: Option<AssetType>,
    /// Physical site, empty until the location resolver has run.
    pub location: String,
}

/// One fetch cycle's worth of assets, in upstream order.
pub type Batch = Vec<Asset>;

impl Asset {
    pub fn with_address(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            ..Self::default()
        }
    }

    pub fn is_dispatchable(&self) -> bool {
        !self.address.trim().is_empty()
    }

    pub fn has_location(&self) -> bool {
        !self.location.is_empty()
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.address)?;
        if let Some(serial) = &self.serial {
            write!(f, " ({serial})")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Asset")
            .field("address", &self.address)
            .field("serial", &self.serial)
            .field("vendor", &self.vendor)
            .field("asset_type", &self.asset_type.as_ref().map(|t| t.to_string()))
            .field("location", &self.location)
            .finish()
    }
}
