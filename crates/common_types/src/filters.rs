//! Scalar filters usable inside `where` inputs.
//!
//! Every filter is a conjunction: a row matches when it satisfies all the
//! fields that are set. `not` negates a nested filter of the same kind.

use async_graphql::{InputObject, MaybeUndefined};
use chrono::{DateTime, Utc};

use crate::QueryMode;

#[derive(Debug, Clone, Default, InputObject)]
pub struct IntFilter {
    pub equals: Option<i32>,
    #[graphql(name = "in")]
    pub in_: Option<Vec<i32>>,
    pub not_in: Option<Vec<i32>>,
    pub lt: Option<i32>,
    pub lte: Option<i32>,
    pub gt: Option<i32>,
    pub gte: Option<i32>,
    pub not: Option<Box<IntFilter>>,
}

impl IntFilter {
    pub fn equals(value: i32) -> Self {
        Self {
            equals: Some(value),
            ..Default::default()
        }
    }
}

/// Like [`IntFilter`], for columns that may be `NULL`. An explicit
/// `equals: null` matches rows where the column is `NULL`.
#[derive(Debug, Clone, Default, InputObject)]
pub struct IntNullableFilter {
    pub equals: MaybeUndefined<i32>,
    #[graphql(name = "in")]
    pub in_: Option<Vec<i32>>,
    pub not_in: Option<Vec<i32>>,
    pub lt: Option<i32>,
    pub lte: Option<i32>,
    pub gt: Option<i32>,
    pub gte: Option<i32>,
    pub not: Option<Box<IntNullableFilter>>,
}

impl IntNullableFilter {
    pub fn equals(value: Option<i32>) -> Self {
        Self {
            equals: match value {
                Some(value) => MaybeUndefined::Value(value),
                None => MaybeUndefined::Null,
            },
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, InputObject)]
pub struct StringFilter {
    pub equals: Option<String>,
    #[graphql(name = "in")]
    pub in_: Option<Vec<String>>,
    pub not_in: Option<Vec<String>>,
    pub lt: Option<String>,
    pub lte: Option<String>,
    pub gt: Option<String>,
    pub gte: Option<String>,
    pub contains: Option<String>,
    pub starts_with: Option<String>,
    pub ends_with: Option<String>,
    /// Applies to `equals`, `contains`, `startsWith` and `endsWith`.
    pub mode: Option<QueryMode>,
    pub not: Option<Box<StringFilter>>,
}

impl StringFilter {
    pub fn is_insensitive(&self) -> bool {
        self.mode == Some(QueryMode::Insensitive)
    }
}

#[derive(Debug, Clone, Default, InputObject)]
pub struct DateTimeFilter {
    pub equals: Option<DateTime<Utc>>,
    #[graphql(name = "in")]
    pub in_: Option<Vec<DateTime<Utc>>>,
    pub not_in: Option<Vec<DateTime<Utc>>>,
    pub lt: Option<DateTime<Utc>>,
    pub lte: Option<DateTime<Utc>>,
    pub gt: Option<DateTime<Utc>>,
    pub gte: Option<DateTime<Utc>>,
    pub not: Option<Box<DateTimeFilter>>,
}
