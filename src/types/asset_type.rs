use std::fmt;
use std::str::FromStr;

use anyhow::{Result, bail};

/// Category of a management controller as the catalog names it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AssetType {
    Blade,
    Chassis,
    Discrete,
    /// Any other catalog collection, used verbatim.
    Other(String),
}

impl AssetType {
    /// Order in which a full catalog scan walks the asset types.
    pub const SCAN_ORDER: [AssetType; 3] = [Self::Blade, Self::Chassis, Self::Discrete];

    /// Collection name of this asset type in the catalog API.
    pub fn plural(&self) -> &str {
        match self {
            Self::Blade => "blades",
            Self::Chassis => "chassis",
            Self::Discrete => "discretes",
            Self::Other(name) => name,
        }
    }
}

impl fmt::Display for AssetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Blade => write!(f, "blade"),
            Self::Chassis => write!(f, "chassis"),
            Self::Discrete => write!(f, "discrete"),
            Self::Other(name) => write!(f, "{name}"),
        }
    }
}

impl FromStr for AssetType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let name = s.trim().to_lowercase();

        match name.as_str() {
            "" => bail!("asset type must not be empty"),
            "blade" | "blades" => Ok(Self::Blade),
            "chassis" => Ok(Self::Chassis),
            "discrete" | "discretes" => Ok(Self::Discrete),
            _ => Ok(Self::Other(name)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plural_paths_match_catalog_collections() {
        assert_eq!(AssetType::Blade.plural(), "blades");
        assert_eq!(AssetType::Chassis.plural(), "chassis");
        assert_eq!(AssetType::Discrete.plural(), "discretes");
    }

    #[test]
    fn parses_singular_and_plural_names() {
        assert_eq!("Blade".parse::<AssetType>().unwrap(), AssetType::Blade);
        assert_eq!("discretes".parse::<AssetType>().unwrap(), AssetType::Discrete);
        assert!("  ".parse::<AssetType>().is_err());
    }

    #[test]
    fn unknown_names_pass_through_unchanged() {
        let asset_type = "Server".parse::<AssetType>().unwrap();

        assert_eq!(asset_type, AssetType::Other("server".to_string()));
        assert_eq!(asset_type.plural(), "server");
        assert_eq!(asset_type.to_string(), "server");
    }
}
