use async_graphql::{MaybeUndefined, SimpleObject};
use chrono::{DateTime, Utc};
use diesel::{AsChangeset, Insertable, Queryable, Selectable};
use phrasebook_common_types::inputs;
use serde::Serialize;

use super::schema::*;

pub type IntId = i32;

#[derive(Debug, Clone, PartialEq, Eq, Queryable, Selectable, Serialize)]
#[diesel(table_name = phrases)]
pub struct Phrase {
    pub id: IntId,
    pub create_at: DateTime<Utc>,
    pub content: String,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = phrases)]
pub struct NewPhrase {
    /// `None` lets the database fill in the current time.
    pub create_at: Option<DateTime<Utc>>,
    pub content: String,
}

impl From<inputs::PhraseCreateInput> for NewPhrase {
    fn from(data: inputs::PhraseCreateInput) -> Self {
        Self {
            create_at: data.create_at,
            content: data.content,
        }
    }
}

#[derive(Debug, Default, AsChangeset)]
#[diesel(table_name = phrases)]
pub struct PhraseChangeset {
    pub create_at: Option<DateTime<Utc>>,
    pub content: Option<String>,
}

impl PhraseChangeset {
    pub fn is_empty(&self) -> bool {
        self.create_at.is_none() && self.content.is_none()
    }
}

impl From<inputs::PhraseUpdateInput> for PhraseChangeset {
    fn from(data: inputs::PhraseUpdateInput) -> Self {
        Self {
            create_at: data.create_at,
            content: data.content,
        }
    }
}

impl From<inputs::PhraseUpdateManyMutationInput> for PhraseChangeset {
    fn from(data: inputs::PhraseUpdateManyMutationInput) -> Self {
        Self {
            create_at: data.create_at,
            content: data.content,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Queryable, Selectable, Serialize)]
#[diesel(table_name = comments)]
pub struct Comment {
    pub id: IntId,
    pub create_at: DateTime<Utc>,
    pub content: String,
    pub phrase_id: Option<IntId>,
    /// The comment this one replies to, if any.
    pub comment_id: Option<IntId>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = comments)]
pub struct NewComment {
    pub create_at: Option<DateTime<Utc>>,
    pub content: String,
    pub phrase_id: Option<IntId>,
    pub comment_id: Option<IntId>,
}

impl From<inputs::CommentCreateInput> for NewComment {
    fn from(data: inputs::CommentCreateInput) -> Self {
        Self {
            create_at: data.create_at,
            content: data.content,
            phrase_id: data.phrase_id,
            comment_id: data.comment_id,
        }
    }
}

/// `Some(None)` in a nullable column sets it to `NULL`, `None` leaves it
/// untouched.
#[derive(Debug, Default, AsChangeset)]
#[diesel(table_name = comments)]
pub struct CommentChangeset {
    pub create_at: Option<DateTime<Utc>>,
    pub content: Option<String>,
    pub phrase_id: Option<Option<IntId>>,
    pub comment_id: Option<Option<IntId>>,
}

impl CommentChangeset {
    pub fn is_empty(&self) -> bool {
        self.create_at.is_none()
            && self.content.is_none()
            && self.phrase_id.is_none()
            && self.comment_id.is_none()
    }
}

fn nullable_change(value: MaybeUndefined<IntId>) -> Option<Option<IntId>> {
    match value {
        MaybeUndefined::Undefined => None,
        MaybeUndefined::Null => Some(None),
        MaybeUndefined::Value(id) => Some(Some(id)),
    }
}

impl From<inputs::CommentUpdateInput> for CommentChangeset {
    fn from(data: inputs::CommentUpdateInput) -> Self {
        Self {
            create_at: data.create_at,
            content: data.content,
            phrase_id: nullable_change(data.phrase_id),
            comment_id: nullable_change(data.comment_id),
        }
    }
}

impl From<inputs::CommentUpdateManyMutationInput> for CommentChangeset {
    fn from(data: inputs::CommentUpdateManyMutationInput) -> Self {
        Self {
            create_at: data.create_at,
            content: data.content,
            ..Default::default()
        }
    }
}

// Aggregates
// ----------

#[derive(Debug, Clone, Copy, PartialEq, Eq, SimpleObject)]
#[graphql(name = "AggregateCount")]
pub struct AggregateCount {
    /// Number of records matching the filter.
    #[graphql(name = "_all")]
    pub all: i64,
}

#[derive(Debug, Clone, PartialEq, SimpleObject)]
#[graphql(name = "AggregatePhrase")]
pub struct PhraseAggregate {
    #[graphql(name = "_count")]
    pub count: AggregateCount,
    #[graphql(name = "_avg")]
    pub avg: PhraseAvgAggregate,
    #[graphql(name = "_sum")]
    pub sum: PhraseSumAggregate,
    #[graphql(name = "_min")]
    pub min: PhraseScalarAggregate,
    #[graphql(name = "_max")]
    pub max: PhraseScalarAggregate,
}

#[derive(Debug, Clone, PartialEq, SimpleObject)]
pub struct PhraseAvgAggregate {
    pub id: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq, SimpleObject)]
pub struct PhraseSumAggregate {
    pub id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, SimpleObject)]
pub struct PhraseScalarAggregate {
    pub id: Option<IntId>,
    pub create_at: Option<DateTime<Utc>>,
    pub content: Option<String>,
}

#[derive(Debug, Clone, PartialEq, SimpleObject)]
#[graphql(name = "AggregateComment")]
pub struct CommentAggregate {
    #[graphql(name = "_count")]
    pub count: AggregateCount,
    #[graphql(name = "_avg")]
    pub avg: CommentAvgAggregate,
    #[graphql(name = "_sum")]
    pub sum: CommentSumAggregate,
    #[graphql(name = "_min")]
    pub min: CommentScalarAggregate,
    #[graphql(name = "_max")]
    pub max: CommentScalarAggregate,
}

#[derive(Debug, Clone, PartialEq, SimpleObject)]
pub struct CommentAvgAggregate {
    pub id: Option<f64>,
    pub phrase_id: Option<f64>,
    pub comment_id: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq, SimpleObject)]
pub struct CommentSumAggregate {
    pub id: Option<i64>,
    pub phrase_id: Option<i64>,
    pub comment_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, SimpleObject)]
pub struct CommentScalarAggregate {
    pub id: Option<IntId>,
    pub create_at: Option<DateTime<Utc>>,
    pub content: Option<String>,
    pub phrase_id: Option<IntId>,
    pub comment_id: Option<IntId>,
}

/// The mean of a column, given its sum and the number of non-`NULL` values.
pub(crate) fn average(sum: Option<i64>, count: i64) -> Option<f64> {
    match sum {
        Some(sum) if count > 0 => Some(sum as f64 / count as f64),
        _ => None,
    }
}
