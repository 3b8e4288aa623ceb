//! Phrasebook configuration parsing.
//!
//! Everything has a default, so a configuration file is optional and may be
//! partial.

use std::collections::BTreeMap;
use std::fs::File;
use std::path::Path;

use anyhow::Context;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::permissions::Rule;

/// A [`serde`]-compatible representation of Phrasebook's YAML configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    /// GraphQL API configuration.
    pub graphql: GraphQlConfig,
    /// Limits of multipart file uploads.
    pub uploads: UploadsConfig,
    pub cors: CorsConfig,
    /// Authorization rules of root fields.
    pub permissions: PermissionsConfig,
}

impl Config {
    pub fn read(path: &Path) -> anyhow::Result<Self> {
        let file = File::open(path)?;
        serde_yaml::from_reader(file).context("invalid config file")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct GraphQlConfig {
    /// Whether the schema can be introspected.
    pub introspection: bool,
    /// The path of the HTTP endpoint.
    pub path: String,
    /// The path of the WebSocket endpoint for subscriptions.
    pub subscriptions_path: String,
}

impl Default for GraphQlConfig {
    fn default() -> Self {
        Self {
            introspection: true,
            path: "/graphql".to_string(),
            subscriptions_path: "/subscriptions".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct UploadsConfig {
    /// In bytes.
    pub max_file_size: usize,
    pub max_files: usize,
}

impl Default for UploadsConfig {
    fn default() -> Self {
        Self {
            max_file_size: 1000 * 1024 * 100,
            max_files: 20,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct CorsConfig {
    /// Origins allowed to make cross-origin requests. When absent, any
    /// origin is allowed.
    pub allowed_origins: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct PermissionsConfig {
    /// The rule of operations without a rule of their own.
    pub fallback_rule: Rule,
    /// Rules by root field name, e.g. `deleteOneComment: admin`. They take
    /// precedence over the built-in rules.
    pub rules: BTreeMap<String, Rule>,
}

impl Default for PermissionsConfig {
    fn default() -> Self {
        Self {
            fallback_rule: Rule::Allow,
            rules: BTreeMap::new(),
        }
    }
}
