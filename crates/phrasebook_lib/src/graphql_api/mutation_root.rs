use std::io::Read;

use anyhow::Context as _;
use async_graphql::{Context, Object, Result, Upload};
use phrasebook_common_types::inputs::{
    CommentCreateInput, CommentUpdateInput, CommentUpdateManyMutationInput, CommentWhereInput,
    CommentWhereUniqueInput, PhraseCreateInput, PhraseUpdateInput, PhraseUpdateManyMutationInput,
    PhraseWhereInput, PhraseWhereUniqueInput,
};
use phrasebook_common_types::{BatchPayload, MutationType};
use phrasebook_store::models::{CommentChangeset, PhraseChangeset};
use tracing::info;

use super::api_types::{Comment, Phrase};
use super::{ctx_data, shield};

pub struct MutationRoot;

#[Object]
impl MutationRoot {
    async fn create_one_comment(
        &self,
        ctx: &Context<'_>,
        data: CommentCreateInput,
    ) -> Result<Comment> {
        shield(ctx)?;
        let ctx_data = ctx_data(ctx);

        let comment = ctx_data.store.create_comment(data.into()).await?;
        ctx_data
            .events
            .publish_comments(MutationType::Created, [comment.clone()]);
        Ok(comment.into())
    }

    /// Fails if no comment has the given ID. An empty `data` returns the
    /// comment unchanged and notifies no subscribers.
    async fn update_one_comment(
        &self,
        ctx: &Context<'_>,
        #[graphql(name = "where")] filter: CommentWhereUniqueInput,
        data: CommentUpdateInput,
    ) -> Result<Comment> {
        shield(ctx)?;
        let ctx_data = ctx_data(ctx);

        let changeset = CommentChangeset::from(data);
        let changed = !changeset.is_empty();
        let comment = ctx_data.store.update_comment(filter.id, changeset).await?;
        if changed {
            ctx_data
                .events
                .publish_comments(MutationType::Updated, [comment.clone()]);
        }
        Ok(comment.into())
    }

    /// Updates the comment with the given ID, or creates it from `create` if
    /// there is none.
    async fn upsert_one_comment(
        &self,
        ctx: &Context<'_>,
        #[graphql(name = "where")] filter: CommentWhereUniqueInput,
        create: CommentCreateInput,
        update: CommentUpdateInput,
    ) -> Result<Comment> {
        shield(ctx)?;
        let ctx_data = ctx_data(ctx);

        let update = CommentChangeset::from(update);
        let changed = !update.is_empty();
        let (comment, created) = ctx_data
            .store
            .upsert_comment(filter.id, create.into(), update)
            .await?;
        if created {
            ctx_data
                .events
                .publish_comments(MutationType::Created, [comment.clone()]);
        } else if changed {
            ctx_data
                .events
                .publish_comments(MutationType::Updated, [comment.clone()]);
        }
        Ok(comment.into())
    }

    /// Deletes a comment and returns it. Replies to it become top-level
    /// comments.
    async fn delete_one_comment(
        &self,
        ctx: &Context<'_>,
        #[graphql(name = "where")] filter: CommentWhereUniqueInput,
    ) -> Result<Comment> {
        shield(ctx)?;
        let ctx_data = ctx_data(ctx);

        let comment = ctx_data.store.delete_comment(filter.id).await?;
        ctx_data
            .events
            .publish_comments(MutationType::Deleted, [comment.clone()]);
        Ok(comment.into())
    }

    async fn update_many_comment(
        &self,
        ctx: &Context<'_>,
        #[graphql(name = "where")] filter: Option<CommentWhereInput>,
        data: CommentUpdateManyMutationInput,
    ) -> Result<BatchPayload> {
        shield(ctx)?;
        let ctx_data = ctx_data(ctx);

        let changeset = CommentChangeset::from(data);
        let changed = !changeset.is_empty();
        let comments = ctx_data
            .store
            .update_comments(filter.as_ref(), changeset)
            .await?;
        let count = comments.len() as i64;
        if changed {
            ctx_data
                .events
                .publish_comments(MutationType::Updated, comments);
        }
        Ok(BatchPayload { count })
    }

    async fn delete_many_comment(
        &self,
        ctx: &Context<'_>,
        #[graphql(name = "where")] filter: Option<CommentWhereInput>,
    ) -> Result<BatchPayload> {
        shield(ctx)?;
        let ctx_data = ctx_data(ctx);

        let comments = ctx_data.store.delete_comments(filter.as_ref()).await?;
        let count = comments.len() as i64;
        ctx_data
            .events
            .publish_comments(MutationType::Deleted, comments);
        Ok(BatchPayload { count })
    }

    async fn create_one_phrase(&self, ctx: &Context<'_>, data: PhraseCreateInput) -> Result<Phrase> {
        shield(ctx)?;
        let ctx_data = ctx_data(ctx);

        let phrase = ctx_data.store.create_phrase(data.into()).await?;
        ctx_data
            .events
            .publish_phrases(MutationType::Created, [phrase.clone()]);
        Ok(phrase.into())
    }

    async fn update_one_phrase(
        &self,
        ctx: &Context<'_>,
        #[graphql(name = "where")] filter: PhraseWhereUniqueInput,
        data: PhraseUpdateInput,
    ) -> Result<Phrase> {
        shield(ctx)?;
        let ctx_data = ctx_data(ctx);

        let changeset = PhraseChangeset::from(data);
        let changed = !changeset.is_empty();
        let phrase = ctx_data.store.update_phrase(filter.id, changeset).await?;
        if changed {
            ctx_data
                .events
                .publish_phrases(MutationType::Updated, [phrase.clone()]);
        }
        Ok(phrase.into())
    }

    async fn upsert_one_phrase(
        &self,
        ctx: &Context<'_>,
        #[graphql(name = "where")] filter: PhraseWhereUniqueInput,
        create: PhraseCreateInput,
        update: PhraseUpdateInput,
    ) -> Result<Phrase> {
        shield(ctx)?;
        let ctx_data = ctx_data(ctx);

        let update = PhraseChangeset::from(update);
        let changed = !update.is_empty();
        let (phrase, created) = ctx_data
            .store
            .upsert_phrase(filter.id, create.into(), update)
            .await?;
        if created {
            ctx_data
                .events
                .publish_phrases(MutationType::Created, [phrase.clone()]);
        } else if changed {
            ctx_data
                .events
                .publish_phrases(MutationType::Updated, [phrase.clone()]);
        }
        Ok(phrase.into())
    }

    /// Deletes a phrase and returns it. Its comments are kept, detached from
    /// any phrase.
    async fn delete_one_phrase(
        &self,
        ctx: &Context<'_>,
        #[graphql(name = "where")] filter: PhraseWhereUniqueInput,
    ) -> Result<Phrase> {
        shield(ctx)?;
        let ctx_data = ctx_data(ctx);

        let phrase = ctx_data.store.delete_phrase(filter.id).await?;
        ctx_data
            .events
            .publish_phrases(MutationType::Deleted, [phrase.clone()]);
        Ok(phrase.into())
    }

    async fn update_many_phrase(
        &self,
        ctx: &Context<'_>,
        #[graphql(name = "where")] filter: Option<PhraseWhereInput>,
        data: PhraseUpdateManyMutationInput,
    ) -> Result<BatchPayload> {
        shield(ctx)?;
        let ctx_data = ctx_data(ctx);

        let changeset = PhraseChangeset::from(data);
        let changed = !changeset.is_empty();
        let phrases = ctx_data
            .store
            .update_phrases(filter.as_ref(), changeset)
            .await?;
        let count = phrases.len() as i64;
        if changed {
            ctx_data
                .events
                .publish_phrases(MutationType::Updated, phrases);
        }
        Ok(BatchPayload { count })
    }

    async fn delete_many_phrase(
        &self,
        ctx: &Context<'_>,
        #[graphql(name = "where")] filter: Option<PhraseWhereInput>,
    ) -> Result<BatchPayload> {
        shield(ctx)?;
        let ctx_data = ctx_data(ctx);

        let phrases = ctx_data.store.delete_phrases(filter.as_ref()).await?;
        let count = phrases.len() as i64;
        ctx_data
            .events
            .publish_phrases(MutationType::Deleted, phrases);
        Ok(BatchPayload { count })
    }

    /// Creates one phrase per non-blank line of an uploaded UTF-8 text file.
    async fn import_phrases(&self, ctx: &Context<'_>, file: Upload) -> Result<Vec<Phrase>> {
        shield(ctx)?;
        let ctx_data = ctx_data(ctx);

        let upload = file.value(ctx)?;
        let filename = upload.filename.clone();
        let text = tokio::task::spawn_blocking(move || -> anyhow::Result<String> {
            let mut text = String::new();
            upload
                .into_read()
                .read_to_string(&mut text)
                .context("uploaded file is not valid UTF-8 text")?;
            Ok(text)
        })
        .await??;

        let phrases = ctx_data.store.create_phrases(phrase_lines(&text)).await?;
        info!(filename = %filename, count = phrases.len(), "Imported phrases from upload");

        ctx_data
            .events
            .publish_phrases(MutationType::Created, phrases.clone());
        Ok(phrases.into_iter().map(Into::into).collect())
    }
}

/// Trimmed, non-blank lines.
fn phrase_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}

#[cfg(test)]
mod tests {
    use quickcheck_macros::quickcheck;

    use super::*;

    #[test]
    fn blank_lines_are_skipped() {
        let text = "hello world\n\n   \r\n  good morning  \r\nbye";
        assert_eq!(
            phrase_lines(text),
            vec!["hello world", "good morning", "bye"]
        );
    }

    #[test]
    fn empty_file() {
        assert!(phrase_lines("").is_empty());
    }

    #[quickcheck]
    fn phrases_are_trimmed_and_non_blank(text: String) -> bool {
        phrase_lines(&text)
            .iter()
            .all(|line| !line.is_empty() && line.trim() == line && !line.contains('\n'))
    }
}
