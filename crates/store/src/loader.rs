use std::collections::HashMap;
use std::marker::PhantomData;

use diesel::dsl::count_star;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::models::{self, IntId};
use crate::{schema, Store};

pub struct StoreLoader<T> {
    store: Store,
    phantom: PhantomData<T>,
}

impl<T> StoreLoader<T> {
    pub fn new(store: Store) -> Self {
        Self {
            store,
            phantom: PhantomData,
        }
    }
}

/// Loads the number of direct replies to comments.
pub struct ReplyCount;

/// Loads the number of comments attached to phrases.
pub struct PhraseCommentCount;

impl async_graphql::dataloader::Loader<IntId> for StoreLoader<models::Phrase> {
    type Value = models::Phrase;
    type Error = String;

    async fn load(&self, keys: &[IntId]) -> Result<HashMap<IntId, Self::Value>, Self::Error> {
        use schema::phrases;

        Ok(phrases::table
            .filter(phrases::id.eq_any(keys))
            .load::<models::Phrase>(&mut self.store.conn_err_string().await?)
            .await
            .map_err(|e| e.to_string())?
            .into_iter()
            .map(|phrase| (phrase.id, phrase))
            .collect())
    }
}

impl async_graphql::dataloader::Loader<IntId> for StoreLoader<models::Comment> {
    type Value = models::Comment;
    type Error = String;

    async fn load(&self, keys: &[IntId]) -> Result<HashMap<IntId, Self::Value>, Self::Error> {
        use schema::comments;

        Ok(comments::table
            .filter(comments::id.eq_any(keys))
            .load::<models::Comment>(&mut self.store.conn_err_string().await?)
            .await
            .map_err(|e| e.to_string())?
            .into_iter()
            .map(|comment| (comment.id, comment))
            .collect())
    }
}

impl async_graphql::dataloader::Loader<IntId> for StoreLoader<ReplyCount> {
    type Value = i64;
    type Error = String;

    async fn load(&self, keys: &[IntId]) -> Result<HashMap<IntId, Self::Value>, Self::Error> {
        use schema::comments;

        let counts = comments::table
            .filter(comments::comment_id.eq_any(keys))
            .group_by(comments::comment_id)
            .select((comments::comment_id, count_star()))
            .load::<(Option<IntId>, i64)>(&mut self.store.conn_err_string().await?)
            .await
            .map_err(|e| e.to_string())?;

        Ok(with_zeroes(keys, counts))
    }
}

impl async_graphql::dataloader::Loader<IntId> for StoreLoader<PhraseCommentCount> {
    type Value = i64;
    type Error = String;

    async fn load(&self, keys: &[IntId]) -> Result<HashMap<IntId, Self::Value>, Self::Error> {
        use schema::comments;

        let counts = comments::table
            .filter(comments::phrase_id.eq_any(keys))
            .group_by(comments::phrase_id)
            .select((comments::phrase_id, count_star()))
            .load::<(Option<IntId>, i64)>(&mut self.store.conn_err_string().await?)
            .await
            .map_err(|e| e.to_string())?;

        Ok(with_zeroes(keys, counts))
    }
}

/// Records without any related rows don't show up in `GROUP BY` results, they
/// count zero.
fn with_zeroes(keys: &[IntId], counts: Vec<(Option<IntId>, i64)>) -> HashMap<IntId, i64> {
    let mut map: HashMap<IntId, i64> = keys.iter().map(|key| (*key, 0)).collect();
    for (key, count) in counts {
        if let Some(key) = key {
            map.insert(key, count);
        }
    }
    map
}
