use async_graphql::{Context, Object, Result, SimpleObject};
use chrono::{DateTime, Utc};
use phrasebook_common_types::inputs::{
    CommentFindMany, CommentOrderByInput, CommentScalarFieldEnum, CommentWhereInput,
    CommentWhereUniqueInput, FindManyArgs, PhraseFindMany, PhraseOrderByInput,
    PhraseScalarFieldEnum, PhraseWhereInput, PhraseWhereUniqueInput,
};
use phrasebook_common_types::MutationType;
use phrasebook_store::models::{self, IntId};

use super::ctx_data;

/// Assembles the pagination arguments of list fields.
pub fn comment_find_many(
    filter: Option<CommentWhereInput>,
    order_by: Option<Vec<CommentOrderByInput>>,
    cursor: Option<CommentWhereUniqueInput>,
    take: Option<i32>,
    skip: Option<i32>,
    distinct: Option<Vec<CommentScalarFieldEnum>>,
) -> CommentFindMany {
    FindManyArgs {
        filter,
        order_by: order_by.unwrap_or_default(),
        cursor: cursor.map(|c| c.id),
        take,
        skip,
        distinct: distinct.unwrap_or_default(),
    }
}

pub fn phrase_find_many(
    filter: Option<PhraseWhereInput>,
    order_by: Option<Vec<PhraseOrderByInput>>,
    cursor: Option<PhraseWhereUniqueInput>,
    take: Option<i32>,
    skip: Option<i32>,
    distinct: Option<Vec<PhraseScalarFieldEnum>>,
) -> PhraseFindMany {
    FindManyArgs {
        filter,
        order_by: order_by.unwrap_or_default(),
        cursor: cursor.map(|c| c.id),
        take,
        skip,
        distinct: distinct.unwrap_or_default(),
    }
}

/// A remark about a phrase, or a reply to another comment.
#[derive(Debug, Clone, derive_more::From)]
pub struct Comment {
    model: models::Comment,
}

#[Object]
impl Comment {
    async fn id(&self) -> IntId {
        self.model.id
    }

    async fn create_at(&self) -> DateTime<Utc> {
        self.model.create_at
    }

    async fn content(&self) -> &str {
        &self.model.content
    }

    /// The phrase this comment is attached to.
    async fn phrase(&self, ctx: &Context<'_>) -> Result<Option<Phrase>> {
        let Some(phrase_id) = self.model.phrase_id else {
            return Ok(None);
        };

        let phrase = ctx_data(ctx).loader_phrase.load_one(phrase_id).await?;
        Ok(phrase.map(Into::into))
    }

    async fn phrase_id(&self) -> Option<IntId> {
        self.model.phrase_id
    }

    /// Direct replies to this comment.
    #[allow(clippy::too_many_arguments)]
    async fn comments(
        &self,
        ctx: &Context<'_>,
        #[graphql(name = "where")] filter: Option<CommentWhereInput>,
        order_by: Option<Vec<CommentOrderByInput>>,
        cursor: Option<CommentWhereUniqueInput>,
        take: Option<i32>,
        skip: Option<i32>,
        distinct: Option<Vec<CommentScalarFieldEnum>>,
    ) -> Result<Vec<Comment>> {
        let replies = CommentWhereInput::replies_to(self.model.id);
        let filter = match filter {
            Some(filter) => replies.combined_with(filter),
            None => replies,
        };
        let args = comment_find_many(Some(filter), order_by, cursor, take, skip, distinct);

        let comments = ctx_data(ctx).store.comments(&args).await?;
        Ok(comments.into_iter().map(Into::into).collect())
    }

    /// The comment this one replies to.
    async fn comment(&self, ctx: &Context<'_>) -> Result<Option<Comment>> {
        let Some(comment_id) = self.model.comment_id else {
            return Ok(None);
        };

        let comment = ctx_data(ctx).loader_comment.load_one(comment_id).await?;
        Ok(comment.map(Into::into))
    }

    async fn comment_id(&self) -> Option<IntId> {
        self.model.comment_id
    }

    #[graphql(name = "_count")]
    async fn count(&self, ctx: &Context<'_>) -> Result<CommentCountOutputType> {
        let comments = ctx_data(ctx)
            .loader_reply_count
            .load_one(self.model.id)
            .await?
            .unwrap_or_default();

        Ok(CommentCountOutputType { comments })
    }
}

#[derive(Debug, Clone, SimpleObject)]
pub struct CommentCountOutputType {
    /// Number of direct replies.
    pub comments: i64,
}

#[derive(Debug, Clone, derive_more::From)]
pub struct Phrase {
    model: models::Phrase,
}

#[Object]
impl Phrase {
    async fn id(&self) -> IntId {
        self.model.id
    }

    async fn create_at(&self) -> DateTime<Utc> {
        self.model.create_at
    }

    async fn content(&self) -> &str {
        &self.model.content
    }

    /// Comments attached to this phrase, replies included.
    #[allow(clippy::too_many_arguments)]
    async fn comments(
        &self,
        ctx: &Context<'_>,
        #[graphql(name = "where")] filter: Option<CommentWhereInput>,
        order_by: Option<Vec<CommentOrderByInput>>,
        cursor: Option<CommentWhereUniqueInput>,
        take: Option<i32>,
        skip: Option<i32>,
        distinct: Option<Vec<CommentScalarFieldEnum>>,
    ) -> Result<Vec<Comment>> {
        let attached = CommentWhereInput::attached_to(self.model.id);
        let filter = match filter {
            Some(filter) => attached.combined_with(filter),
            None => attached,
        };
        let args = comment_find_many(Some(filter), order_by, cursor, take, skip, distinct);

        let comments = ctx_data(ctx).store.comments(&args).await?;
        Ok(comments.into_iter().map(Into::into).collect())
    }

    #[graphql(name = "_count")]
    async fn count(&self, ctx: &Context<'_>) -> Result<PhraseCountOutputType> {
        let comments = ctx_data(ctx)
            .loader_phrase_comment_count
            .load_one(self.model.id)
            .await?
            .unwrap_or_default();

        Ok(PhraseCountOutputType { comments })
    }
}

#[derive(Debug, Clone, SimpleObject)]
pub struct PhraseCountOutputType {
    pub comments: i64,
}

/// A write to a comment, as seen by subscribers.
#[derive(Debug, Clone, SimpleObject)]
pub struct CommentEvent {
    pub mutation: MutationType,
    /// The comment after the write. Deleted comments are reported as they
    /// were before deletion.
    pub node: Comment,
}

#[derive(Debug, Clone, SimpleObject)]
pub struct PhraseEvent {
    pub mutation: MutationType,
    pub node: Phrase,
}
