pub mod auth;
mod cli;
pub mod config;
pub mod events;
pub mod graphql_api;
pub mod http;
pub mod permissions;
mod prometheus_metrics;

#[cfg(feature = "tests")]
pub mod test_utils;

pub use cli::{AppEnv, CliOptions};
pub use prometheus_metrics::{metrics, PrometheusExporter, PrometheusMetrics};

pub const PHRASEBOOK_VERSION: &str = env!("CARGO_PKG_VERSION");
