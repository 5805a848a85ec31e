pub mod setup_resource;
