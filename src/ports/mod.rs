//! Port traits: the boundaries between the domain and its data sources.

pub mod allocation_port;
pub mod config_port;
pub mod price_port;
pub mod snapshot_port;
