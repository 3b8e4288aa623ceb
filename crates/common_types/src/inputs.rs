//! Structs and complex datatypes that may serve as inputs, filters, or requests
//! for the GraphQL API.

use async_graphql::{Enum, InputObject, MaybeUndefined};
use chrono::{DateTime, Utc};

use crate::filters::{DateTimeFilter, IntFilter, IntNullableFilter, StringFilter};
use crate::SortOrder;

/// The arguments shared by `findMany*`, `findFirst*`, `findMany*Count` and the
/// list fields of object types.
#[derive(Debug, Clone)]
pub struct FindManyArgs<W, O, F> {
    pub filter: Option<W>,
    pub order_by: Vec<O>,
    /// ID of the record the page starts at (inclusive).
    pub cursor: Option<i32>,
    pub take: Option<i32>,
    pub skip: Option<i32>,
    pub distinct: Vec<F>,
}

impl<W, O, F> Default for FindManyArgs<W, O, F> {
    fn default() -> Self {
        Self {
            filter: None,
            order_by: vec![],
            cursor: None,
            take: None,
            skip: None,
            distinct: vec![],
        }
    }
}

impl<W, O, F> FindManyArgs<W, O, F> {
    pub fn filtered(filter: W) -> Self {
        Self {
            filter: Some(filter),
            ..Default::default()
        }
    }
}

pub type CommentFindMany =
    FindManyArgs<CommentWhereInput, CommentOrderByInput, CommentScalarFieldEnum>;
pub type PhraseFindMany = FindManyArgs<PhraseWhereInput, PhraseOrderByInput, PhraseScalarFieldEnum>;

/// Identifies a single record.
#[derive(Debug, Clone, Copy, InputObject)]
pub struct CommentWhereUniqueInput {
    pub id: i32,
}

#[derive(Debug, Clone, Copy, InputObject)]
pub struct PhraseWhereUniqueInput {
    pub id: i32,
}

// Comments
// --------

/// A filter for comments.
#[derive(Debug, Clone, Default, InputObject)]
pub struct CommentWhereInput {
    /// All of these filters must match.
    #[graphql(name = "AND")]
    pub and: Option<Vec<CommentWhereInput>>,
    /// At least one of these filters must match.
    #[graphql(name = "OR")]
    pub or: Option<Vec<CommentWhereInput>>,
    /// None of these filters may match.
    #[graphql(name = "NOT")]
    pub not: Option<Vec<CommentWhereInput>>,
    pub id: Option<IntFilter>,
    pub create_at: Option<DateTimeFilter>,
    pub content: Option<StringFilter>,
    pub phrase_id: Option<IntNullableFilter>,
    pub comment_id: Option<IntNullableFilter>,
}

impl CommentWhereInput {
    /// Comments replying to the comment with the given ID.
    pub fn replies_to(comment_id: i32) -> Self {
        Self {
            comment_id: Some(IntNullableFilter::equals(Some(comment_id))),
            ..Default::default()
        }
    }

    /// Comments attached to the phrase with the given ID.
    pub fn attached_to(phrase_id: i32) -> Self {
        Self {
            phrase_id: Some(IntNullableFilter::equals(Some(phrase_id))),
            ..Default::default()
        }
    }

    /// Combines two filters so that both must match.
    pub fn combined_with(self, other: CommentWhereInput) -> Self {
        Self {
            and: Some(vec![self, other]),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, InputObject)]
#[graphql(name = "CommentOrderByWithRelationAndSearchRelevanceInput")]
pub struct CommentOrderByInput {
    pub id: Option<SortOrder>,
    pub create_at: Option<SortOrder>,
    pub content: Option<SortOrder>,
    pub phrase_id: Option<SortOrder>,
    pub comment_id: Option<SortOrder>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Enum)]
#[graphql(rename_items = "camelCase")]
pub enum CommentScalarFieldEnum {
    Id,
    CreateAt,
    Content,
    PhraseId,
    CommentId,
}

#[derive(Debug, Clone, InputObject)]
pub struct CommentCreateInput {
    /// Defaults to the time of insertion.
    pub create_at: Option<DateTime<Utc>>,
    pub content: String,
    pub phrase_id: Option<i32>,
    /// The comment this one replies to.
    pub comment_id: Option<i32>,
}

#[derive(Debug, Clone, Default, InputObject)]
pub struct CommentUpdateInput {
    pub create_at: Option<DateTime<Utc>>,
    pub content: Option<String>,
    /// `null` detaches the comment from its phrase.
    pub phrase_id: MaybeUndefined<i32>,
    /// `null` turns a reply into a top-level comment.
    pub comment_id: MaybeUndefined<i32>,
}

#[derive(Debug, Clone, Default, InputObject)]
pub struct CommentUpdateManyMutationInput {
    pub create_at: Option<DateTime<Utc>>,
    pub content: Option<String>,
}

// Phrases
// -------

/// A filter for phrases.
#[derive(Debug, Clone, Default, InputObject)]
pub struct PhraseWhereInput {
    #[graphql(name = "AND")]
    pub and: Option<Vec<PhraseWhereInput>>,
    #[graphql(name = "OR")]
    pub or: Option<Vec<PhraseWhereInput>>,
    #[graphql(name = "NOT")]
    pub not: Option<Vec<PhraseWhereInput>>,
    pub id: Option<IntFilter>,
    pub create_at: Option<DateTimeFilter>,
    pub content: Option<StringFilter>,
}

#[derive(Debug, Clone, Default, InputObject)]
#[graphql(name = "PhraseOrderByWithRelationAndSearchRelevanceInput")]
pub struct PhraseOrderByInput {
    pub id: Option<SortOrder>,
    pub create_at: Option<SortOrder>,
    pub content: Option<SortOrder>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Enum)]
#[graphql(rename_items = "camelCase")]
pub enum PhraseScalarFieldEnum {
    Id,
    CreateAt,
    Content,
}

#[derive(Debug, Clone, InputObject)]
pub struct PhraseCreateInput {
    pub create_at: Option<DateTime<Utc>>,
    pub content: String,
}

#[derive(Debug, Clone, Default, InputObject)]
pub struct PhraseUpdateInput {
    pub create_at: Option<DateTime<Utc>>,
    pub content: Option<String>,
}

#[derive(Debug, Clone, Default, InputObject)]
pub struct PhraseUpdateManyMutationInput {
    pub create_at: Option<DateTime<Utc>>,
    pub content: Option<String>,
}
