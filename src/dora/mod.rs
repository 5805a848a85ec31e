pub mod dora_client;
pub mod dora_config;
pub mod dora_inventory;
pub mod dora_types;
pub mod error;
pub mod location_resolver;

#[cfg(test)]
pub mod fake_transport;
