mod diesel_queries;

use std::fmt;

use diesel::prelude::*;
use diesel_async::pooled_connection::deadpool::{Object, Pool};
use diesel_async::pooled_connection::AsyncDieselConnectionManager;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, AsyncPgConnection, RunQueryDsl};
use diesel_async_migrations::{embed_migrations, EmbeddedMigrations};
use phrasebook_common_types::inputs::{
    CommentFindMany, CommentWhereInput, PhraseFindMany, PhraseWhereInput,
};
use tracing::{debug, info};

use crate::models::{
    Comment, CommentAggregate, CommentChangeset, IntId, NewComment, NewPhrase, Phrase,
    PhraseAggregate, PhraseChangeset,
};
use crate::schema::{comments, phrases};

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Rows per `INSERT` statement. PostgreSQL accepts at most 65535 bind
/// parameters in one statement.
const INSERT_CHUNK_SIZE: usize = 10_000;

/// Failures callers may want to tell apart from database errors. They travel
/// inside [`anyhow::Error`]s and can be recovered with `downcast_ref`.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("No {entity} record with id {id} was found")]
    NotFound { entity: &'static str, id: IntId },
    #[error("Cursors can't be combined with ordering by the nullable field `{0}`")]
    UnsupportedCursorOrdering(String),
}

impl StoreError {
    fn comment_not_found(id: IntId) -> anyhow::Error {
        Self::NotFound {
            entity: "Comment",
            id,
        }
        .into()
    }

    fn phrase_not_found(id: IntId) -> anyhow::Error {
        Self::NotFound {
            entity: "Phrase",
            id,
        }
        .into()
    }
}

/// An abstraction over all database operations. It uses [`Arc`](std::sync::Arc)
/// internally, so it's cheaply cloneable.
#[derive(Clone)]
pub struct Store {
    pool: Pool<AsyncPgConnection>,
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("pool_status", &self.pool.status())
            .finish()
    }
}

impl Store {
    /// Connects to the database and runs all pending migrations.
    pub async fn new(db_url: &str) -> anyhow::Result<Self> {
        info!("Initializing database connection pool");
        let manager = AsyncDieselConnectionManager::new(db_url);
        let pool = Pool::builder(manager).build()?;
        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    async fn run_migrations(&self) -> anyhow::Result<()> {
        let mut conn = self.pool.get().await?;

        // Get a lock for running migrations. Blocks until we get the lock.
        // Several server instances may share one database.
        diesel::sql_query("select pg_advisory_lock(1)")
            .execute(&mut conn)
            .await?;
        info!("Run database migrations");

        MIGRATIONS
            .run_pending_migrations(&mut conn)
            .await
            .map_err(|e| anyhow::anyhow!(e))?;

        diesel::sql_query("select pg_advisory_unlock(1)")
            .execute(&mut conn)
            .await?;
        Ok(())
    }

    async fn conn(&self) -> anyhow::Result<Object<AsyncPgConnection>> {
        Ok(self.pool.get().await?)
    }

    pub(crate) async fn conn_err_string(&self) -> Result<Object<AsyncPgConnection>, String> {
        self.conn().await.map_err(|e| e.to_string())
    }
}

/// Getters.
impl Store {
    pub async fn phrase(&self, id: IntId) -> anyhow::Result<Option<Phrase>> {
        Ok(phrases::table
            .find(id)
            .first::<Phrase>(&mut self.conn().await?)
            .await
            .optional()?)
    }

    pub async fn comment(&self, id: IntId) -> anyhow::Result<Option<Comment>> {
        Ok(comments::table
            .find(id)
            .first::<Comment>(&mut self.conn().await?)
            .await
            .optional()?)
    }

    /// Returns the phrases that match `args`. See [`FindManyArgs`] for the
    /// pagination semantics.
    ///
    /// [`FindManyArgs`]: phrasebook_common_types::inputs::FindManyArgs
    pub async fn phrases(&self, args: &PhraseFindMany) -> anyhow::Result<Vec<Phrase>> {
        let mut conn = self.conn().await?;
        diesel_queries::phrases(&mut conn, args).await
    }

    pub async fn comments(&self, args: &CommentFindMany) -> anyhow::Result<Vec<Comment>> {
        let mut conn = self.conn().await?;
        diesel_queries::comments(&mut conn, args).await
    }

    /// Like [`Store::phrases`], but only returns the first match. A negative
    /// `take` returns the last one instead.
    pub async fn first_phrase(&self, args: PhraseFindMany) -> anyhow::Result<Option<Phrase>> {
        let args = PhraseFindMany {
            take: Some(first_take(args.take)),
            ..args
        };
        Ok(self.phrases(&args).await?.into_iter().next())
    }

    pub async fn first_comment(&self, args: CommentFindMany) -> anyhow::Result<Option<Comment>> {
        let args = CommentFindMany {
            take: Some(first_take(args.take)),
            ..args
        };
        Ok(self.comments(&args).await?.into_iter().next())
    }

    pub async fn count_phrases(&self, args: &PhraseFindMany) -> anyhow::Result<i64> {
        let mut conn = self.conn().await?;
        diesel_queries::count_phrases(&mut conn, args).await
    }

    pub async fn count_comments(&self, args: &CommentFindMany) -> anyhow::Result<i64> {
        let mut conn = self.conn().await?;
        diesel_queries::count_comments(&mut conn, args).await
    }

    pub async fn aggregate_phrases(
        &self,
        filter: Option<&PhraseWhereInput>,
    ) -> anyhow::Result<PhraseAggregate> {
        let mut conn = self.conn().await?;
        diesel_queries::aggregate_phrases(&mut conn, filter).await
    }

    pub async fn aggregate_comments(
        &self,
        filter: Option<&CommentWhereInput>,
    ) -> anyhow::Result<CommentAggregate> {
        let mut conn = self.conn().await?;
        diesel_queries::aggregate_comments(&mut conn, filter).await
    }
}

fn first_take(take: Option<i32>) -> i32 {
    match take {
        Some(take) if take < 0 => -1,
        _ => 1,
    }
}

/// Setters and write operations.
impl Store {
    pub async fn create_phrase(&self, phrase: NewPhrase) -> anyhow::Result<Phrase> {
        let phrase = diesel::insert_into(phrases::table)
            .values(&phrase)
            .get_result::<Phrase>(&mut self.conn().await?)
            .await?;

        debug!(id = phrase.id, "Created phrase");
        Ok(phrase)
    }

    /// Inserts one phrase per item of `contents`, all or none.
    pub async fn create_phrases(&self, contents: Vec<String>) -> anyhow::Result<Vec<Phrase>> {
        if contents.is_empty() {
            return Ok(vec![]);
        }

        let rows: Vec<NewPhrase> = contents
            .into_iter()
            .map(|content| NewPhrase {
                create_at: None,
                content,
            })
            .collect();

        let phrases = self
            .conn()
            .await?
            .transaction::<_, anyhow::Error, _>(|conn| {
                async move {
                    let mut created = Vec::with_capacity(rows.len());
                    for chunk in rows.chunks(INSERT_CHUNK_SIZE) {
                        let inserted = diesel::insert_into(phrases::table)
                            .values(chunk)
                            .get_results::<Phrase>(conn)
                            .await?;
                        created.extend(inserted);
                    }
                    Ok(created)
                }
                .scope_boxed()
            })
            .await?;

        info!(count = phrases.len(), "Imported phrases");
        Ok(phrases)
    }

    pub async fn create_comment(&self, comment: NewComment) -> anyhow::Result<Comment> {
        let comment = diesel::insert_into(comments::table)
            .values(&comment)
            .get_result::<Comment>(&mut self.conn().await?)
            .await?;

        debug!(id = comment.id, "Created comment");
        Ok(comment)
    }

    /// Applies `changeset` to the phrase with the given ID. Fails with
    /// [`StoreError::NotFound`] if there is no such phrase.
    pub async fn update_phrase(
        &self,
        id: IntId,
        changeset: PhraseChangeset,
    ) -> anyhow::Result<Phrase> {
        let conn = &mut self.conn().await?;

        let phrase = if changeset.is_empty() {
            phrases::table
                .find(id)
                .first::<Phrase>(conn)
                .await
                .optional()?
        } else {
            diesel::update(phrases::table.find(id))
                .set(&changeset)
                .get_result::<Phrase>(conn)
                .await
                .optional()?
        };

        phrase.ok_or_else(|| StoreError::phrase_not_found(id))
    }

    pub async fn update_comment(
        &self,
        id: IntId,
        changeset: CommentChangeset,
    ) -> anyhow::Result<Comment> {
        let conn = &mut self.conn().await?;

        let comment = if changeset.is_empty() {
            comments::table
                .find(id)
                .first::<Comment>(conn)
                .await
                .optional()?
        } else {
            diesel::update(comments::table.find(id))
                .set(&changeset)
                .get_result::<Comment>(conn)
                .await
                .optional()?
        };

        comment.ok_or_else(|| StoreError::comment_not_found(id))
    }

    /// Updates the phrase with the given ID, or creates a new one if it
    /// doesn't exist. The returned flag is `true` for newly created phrases.
    pub async fn upsert_phrase(
        &self,
        id: IntId,
        create: NewPhrase,
        update: PhraseChangeset,
    ) -> anyhow::Result<(Phrase, bool)> {
        self.conn()
            .await?
            .transaction::<_, anyhow::Error, _>(|conn| {
                async move {
                    let existing = phrases::table
                        .find(id)
                        .for_update()
                        .first::<Phrase>(conn)
                        .await
                        .optional()?;

                    match existing {
                        Some(phrase) if update.is_empty() => Ok((phrase, false)),
                        Some(_) => {
                            let phrase = diesel::update(phrases::table.find(id))
                                .set(&update)
                                .get_result::<Phrase>(conn)
                                .await?;
                            Ok((phrase, false))
                        }
                        None => {
                            let phrase = diesel::insert_into(phrases::table)
                                .values(&create)
                                .get_result::<Phrase>(conn)
                                .await?;
                            Ok((phrase, true))
                        }
                    }
                }
                .scope_boxed()
            })
            .await
    }

    pub async fn upsert_comment(
        &self,
        id: IntId,
        create: NewComment,
        update: CommentChangeset,
    ) -> anyhow::Result<(Comment, bool)> {
        self.conn()
            .await?
            .transaction::<_, anyhow::Error, _>(|conn| {
                async move {
                    let existing = comments::table
                        .find(id)
                        .for_update()
                        .first::<Comment>(conn)
                        .await
                        .optional()?;

                    match existing {
                        Some(comment) if update.is_empty() => Ok((comment, false)),
                        Some(_) => {
                            let comment = diesel::update(comments::table.find(id))
                                .set(&update)
                                .get_result::<Comment>(conn)
                                .await?;
                            Ok((comment, false))
                        }
                        None => {
                            let comment = diesel::insert_into(comments::table)
                                .values(&create)
                                .get_result::<Comment>(conn)
                                .await?;
                            Ok((comment, true))
                        }
                    }
                }
                .scope_boxed()
            })
            .await
    }

    /// Deletes the phrase with the given ID and returns it. Its comments stay
    /// around, detached.
    pub async fn delete_phrase(&self, id: IntId) -> anyhow::Result<Phrase> {
        let phrase = diesel::delete(phrases::table.find(id))
            .get_result::<Phrase>(&mut self.conn().await?)
            .await
            .optional()?;

        phrase.ok_or_else(|| StoreError::phrase_not_found(id))
    }

    /// Deletes the comment with the given ID and returns it. Replies to it
    /// become top-level comments.
    pub async fn delete_comment(&self, id: IntId) -> anyhow::Result<Comment> {
        let comment = diesel::delete(comments::table.find(id))
            .get_result::<Comment>(&mut self.conn().await?)
            .await
            .optional()?;

        comment.ok_or_else(|| StoreError::comment_not_found(id))
    }

    /// Applies `changeset` to all matching phrases and returns them.
    pub async fn update_phrases(
        &self,
        filter: Option<&PhraseWhereInput>,
        changeset: PhraseChangeset,
    ) -> anyhow::Result<Vec<Phrase>> {
        let mut conn = self.conn().await?;
        diesel_queries::update_phrases(&mut conn, filter, &changeset).await
    }

    pub async fn update_comments(
        &self,
        filter: Option<&CommentWhereInput>,
        changeset: CommentChangeset,
    ) -> anyhow::Result<Vec<Comment>> {
        let mut conn = self.conn().await?;
        diesel_queries::update_comments(&mut conn, filter, &changeset).await
    }

    /// Deletes all matching phrases and returns them. No filter deletes
    /// **all** phrases.
    pub async fn delete_phrases(
        &self,
        filter: Option<&PhraseWhereInput>,
    ) -> anyhow::Result<Vec<Phrase>> {
        let mut conn = self.conn().await?;
        let deleted = diesel_queries::delete_phrases(&mut conn, filter).await?;

        info!(count = deleted.len(), "Deleted phrases");
        Ok(deleted)
    }

    pub async fn delete_comments(
        &self,
        filter: Option<&CommentWhereInput>,
    ) -> anyhow::Result<Vec<Comment>> {
        let mut conn = self.conn().await?;
        let deleted = diesel_queries::delete_comments(&mut conn, filter).await?;

        info!(count = deleted.len(), "Deleted comments");
        Ok(deleted)
    }
}
