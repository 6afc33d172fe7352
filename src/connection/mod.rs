pub mod config;

pub use config::{DriverConfig, EndpointConfig, ShardMapping};
