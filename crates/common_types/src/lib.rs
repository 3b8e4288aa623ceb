//! GraphQL API types that are shared between the store and the API server.

pub mod filters;
pub mod inputs;
mod pagination;

use async_graphql::*;
use serde::{Deserialize, Serialize};

pub use pagination::{Window, WindowError};

/// Direction of an `orderBy` entry.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, Enum)]
#[graphql(rename_items = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn reversed(self) -> Self {
        match self {
            SortOrder::Asc => SortOrder::Desc,
            SortOrder::Desc => SortOrder::Asc,
        }
    }
}

/// How string filters compare values.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Enum)]
#[graphql(rename_items = "lowercase")]
pub enum QueryMode {
    #[default]
    Default,
    Insensitive,
}

/// The kind of write a subscription event reports.
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, Hash, Enum, Serialize, Deserialize, strum::IntoStaticStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum MutationType {
    Created,
    Updated,
    Deleted,
}

/// Roles carried by access tokens. Later variants include the privileges of
/// earlier ones.
#[derive(
    Debug,
    Copy,
    Clone,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Enum,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

/// Result of a bulk mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, SimpleObject)]
pub struct BatchPayload {
    /// The number of affected records.
    pub count: i64,
}
