use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// The environment the server runs in. Development enables the GraphiQL
/// playground and logs why access tokens were rejected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum AppEnv {
    #[default]
    Development,
    Production,
}

impl AppEnv {
    pub fn is_production(self) -> bool {
        self == AppEnv::Production
    }
}

#[derive(Parser, Debug)]
#[clap(author, about, version)]
pub struct CliOptions {
    /// The URL of the PostgreSQL database to use.
    #[clap(long, env = "DATABASE_URL")]
    pub database_url: String,
    /// The port on which the GraphQL API server should listen.
    #[clap(long, env = "APP_PORT", default_value_t = 4000)]
    pub port: u16,
    /// The HS256 secret access tokens are signed with. Without it, every
    /// request is anonymous.
    #[clap(long, env = "APP_JWT_SECRET", hide_env_values = true)]
    pub jwt_secret: Option<String>,
    #[clap(long, env = "APP_ENV", value_enum, default_value_t = AppEnv::Development)]
    pub env: AppEnv,
    /// The port on which the Prometheus exporter should listen. Set it to 0 to
    /// disable the exporter.
    #[clap(long, default_value_t = 9184)]
    pub prometheus_port: u16,
    /// Path to an optional YAML configuration file.
    #[clap(long, env = "APP_CONFIG")]
    pub config: Option<PathBuf>,
}
