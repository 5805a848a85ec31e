use serde::Deserialize;

use crate::dora::error::CatalogError;

/// Envelope shared by every catalog collection response.
#[derive(Debug, Deserialize)]
pub struct DoraResponse<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<DoraItem<T>>,

    #[serde(default)]
    pub links: DoraLinks,
}

#[derive(Debug, Deserialize)]
pub struct DoraItem<T> {
    pub attributes: T,
}

#[derive(Debug, Default, Deserialize)]
pub struct DoraLinks {
    #[serde(default)]
    pub next: Option<String>,
}

impl DoraLinks {
    /// Relative locator of the next page, if the server handed one out.
    pub fn next_page(&self) -> Option<&str> {
        self.next.as_deref().filter(|next| !next.is_empty())
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct AssetAttributes {
    #[serde(default)]
    pub serial: Option<String>,

    #[serde(default)]
    pub bmc_address: Option<String>,

    #[serde(default)]
    pub vendor: Option<String>,
}

impl AssetAttributes {
    pub fn address(&self) -> Option<&str> {
        self.bmc_address
            .as_deref()
            .map(str::trim)
            .filter(|address| !address.is_empty())
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ScannedPortAttributes {
    #[serde(default)]
    pub ip: String,

    #[serde(default)]
    pub site: String,
}

pub fn decode<T: for<'de> Deserialize<'de>>(
    url: &str,
    text: &str,
) -> Result<DoraResponse<T>, CatalogError> {
    serde_json::from_str(text).map_err(|source| CatalogError::Decode {
        url: url.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_asset_page_with_next_link() {
        let text = r#"{
            "data": [
                {"attributes": {"serial": "abc123", "bmc_address": "10.1.1.1", "vendor": "Dell"}},
                {"attributes": {"serial": "def456", "bmc_address": null}}
            ],
            "links": {"first": "/v1/blades", "next": "/v1/blades?page[offset]=10&page[limit]=10"}
        }"#;

        let page: DoraResponse<AssetAttributes> = decode("http://dora/v1/blades", text).unwrap();

        assert_eq!(page.data.len(), 2);
        assert_eq!(page.data[0].attributes.address(), Some("10.1.1.1"));
        assert_eq!(page.data[1].attributes.address(), None);
        assert_eq!(
            page.links.next_page(),
            Some("/v1/blades?page[offset]=10&page[limit]=10")
        );
    }

    #[test]
    fn empty_next_link_ends_pagination() {
        let text = r#"{"data": [], "links": {"next": ""}}"#;
        let page: DoraResponse<AssetAttributes> = decode("u", text).unwrap();
        assert_eq!(page.links.next_page(), None);

        let text = r#"{"data": []}"#;
        let page: DoraResponse<AssetAttributes> = decode("u", text).unwrap();
        assert_eq!(page.links.next_page(), None);
    }

    #[test]
    fn malformed_body_is_a_decode_error() {
        let err = decode::<AssetAttributes>("http://dora/v1/blades", "<html>").unwrap_err();
        assert!(matches!(err, CatalogError::Decode { .. }));
        assert_eq!(err.url(), "http://dora/v1/blades");
    }
}
