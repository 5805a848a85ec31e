pub mod asset;
pub mod asset_type;
pub mod dispatch_message;
