use async_graphql::{Context, Object, Result};
use phrasebook_common_types::inputs::{
    CommentOrderByInput, CommentScalarFieldEnum, CommentWhereInput, CommentWhereUniqueInput,
    PhraseOrderByInput, PhraseScalarFieldEnum, PhraseWhereInput, PhraseWhereUniqueInput,
};
use phrasebook_store::models::{CommentAggregate, PhraseAggregate};

use super::api_types::{comment_find_many, phrase_find_many, Comment, Phrase};
use super::{ctx_data, shield};

pub struct QueryRoot;

#[Object]
impl QueryRoot {
    /// Fetches a single comment by ID.
    async fn find_unique_comment(
        &self,
        ctx: &Context<'_>,
        #[graphql(name = "where")] filter: CommentWhereUniqueInput,
    ) -> Result<Option<Comment>> {
        shield(ctx)?;

        let comment = ctx_data(ctx).store.comment(filter.id).await?;
        Ok(comment.map(Into::into))
    }

    /// The first comment matching `where`, in the requested order.
    #[allow(clippy::too_many_arguments)]
    async fn find_first_comment(
        &self,
        ctx: &Context<'_>,
        #[graphql(name = "where")] filter: Option<CommentWhereInput>,
        order_by: Option<Vec<CommentOrderByInput>>,
        cursor: Option<CommentWhereUniqueInput>,
        take: Option<i32>,
        skip: Option<i32>,
        distinct: Option<Vec<CommentScalarFieldEnum>>,
    ) -> Result<Option<Comment>> {
        shield(ctx)?;

        let args = comment_find_many(filter, order_by, cursor, take, skip, distinct);
        let comment = ctx_data(ctx).store.first_comment(args).await?;
        Ok(comment.map(Into::into))
    }

    /// Filters, sorts and paginates comments. A negative `take` pages
    /// backwards from the cursor.
    #[allow(clippy::too_many_arguments)]
    async fn find_many_comment(
        &self,
        ctx: &Context<'_>,
        #[graphql(name = "where")] filter: Option<CommentWhereInput>,
        order_by: Option<Vec<CommentOrderByInput>>,
        cursor: Option<CommentWhereUniqueInput>,
        take: Option<i32>,
        skip: Option<i32>,
        distinct: Option<Vec<CommentScalarFieldEnum>>,
    ) -> Result<Vec<Comment>> {
        shield(ctx)?;

        let args = comment_find_many(filter, order_by, cursor, take, skip, distinct);
        let comments = ctx_data(ctx).store.comments(&args).await?;
        Ok(comments.into_iter().map(Into::into).collect())
    }

    /// The number of comments [`QueryRoot::find_many_comment`] would return.
    #[allow(clippy::too_many_arguments)]
    async fn find_many_comment_count(
        &self,
        ctx: &Context<'_>,
        #[graphql(name = "where")] filter: Option<CommentWhereInput>,
        order_by: Option<Vec<CommentOrderByInput>>,
        cursor: Option<CommentWhereUniqueInput>,
        take: Option<i32>,
        skip: Option<i32>,
        distinct: Option<Vec<CommentScalarFieldEnum>>,
    ) -> Result<i64> {
        shield(ctx)?;

        let args = comment_find_many(filter, order_by, cursor, take, skip, distinct);
        Ok(ctx_data(ctx).store.count_comments(&args).await?)
    }

    async fn aggregate_comment(
        &self,
        ctx: &Context<'_>,
        #[graphql(name = "where")] filter: Option<CommentWhereInput>,
    ) -> Result<CommentAggregate> {
        shield(ctx)?;

        Ok(ctx_data(ctx)
            .store
            .aggregate_comments(filter.as_ref())
            .await?)
    }

    /// Fetches a single phrase by ID.
    async fn find_unique_phrase(
        &self,
        ctx: &Context<'_>,
        #[graphql(name = "where")] filter: PhraseWhereUniqueInput,
    ) -> Result<Option<Phrase>> {
        shield(ctx)?;

        let phrase = ctx_data(ctx).store.phrase(filter.id).await?;
        Ok(phrase.map(Into::into))
    }

    #[allow(clippy::too_many_arguments)]
    async fn find_first_phrase(
        &self,
        ctx: &Context<'_>,
        #[graphql(name = "where")] filter: Option<PhraseWhereInput>,
        order_by: Option<Vec<PhraseOrderByInput>>,
        cursor: Option<PhraseWhereUniqueInput>,
        take: Option<i32>,
        skip: Option<i32>,
        distinct: Option<Vec<PhraseScalarFieldEnum>>,
    ) -> Result<Option<Phrase>> {
        shield(ctx)?;

        let args = phrase_find_many(filter, order_by, cursor, take, skip, distinct);
        let phrase = ctx_data(ctx).store.first_phrase(args).await?;
        Ok(phrase.map(Into::into))
    }

    #[allow(clippy::too_many_arguments)]
    async fn find_many_phrase(
        &self,
        ctx: &Context<'_>,
        #[graphql(name = "where")] filter: Option<PhraseWhereInput>,
        order_by: Option<Vec<PhraseOrderByInput>>,
        cursor: Option<PhraseWhereUniqueInput>,
        take: Option<i32>,
        skip: Option<i32>,
        distinct: Option<Vec<PhraseScalarFieldEnum>>,
    ) -> Result<Vec<Phrase>> {
        shield(ctx)?;

        let args = phrase_find_many(filter, order_by, cursor, take, skip, distinct);
        let phrases = ctx_data(ctx).store.phrases(&args).await?;
        Ok(phrases.into_iter().map(Into::into).collect())
    }

    #[allow(clippy::too_many_arguments)]
    async fn find_many_phrase_count(
        &self,
        ctx: &Context<'_>,
        #[graphql(name = "where")] filter: Option<PhraseWhereInput>,
        order_by: Option<Vec<PhraseOrderByInput>>,
        cursor: Option<PhraseWhereUniqueInput>,
        take: Option<i32>,
        skip: Option<i32>,
        distinct: Option<Vec<PhraseScalarFieldEnum>>,
    ) -> Result<i64> {
        shield(ctx)?;

        let args = phrase_find_many(filter, order_by, cursor, take, skip, distinct);
        Ok(ctx_data(ctx).store.count_phrases(&args).await?)
    }

    async fn aggregate_phrase(
        &self,
        ctx: &Context<'_>,
        #[graphql(name = "where")] filter: Option<PhraseWhereInput>,
    ) -> Result<PhraseAggregate> {
        shield(ctx)?;

        Ok(ctx_data(ctx)
            .store
            .aggregate_phrases(filter.as_ref())
            .await?)
    }
}
