use async_graphql::{Context, Result, Subscription};
use futures::future::ready;
use futures::{Stream, StreamExt};
use phrasebook_common_types::MutationType;

use super::api_types::{CommentEvent, PhraseEvent};
use super::{ctx_data, shield};

pub struct SubscriptionRoot;

fn wanted(mutations: &Option<Vec<MutationType>>, mutation: MutationType) -> bool {
    mutations
        .as_ref()
        .map_or(true, |mutations| mutations.contains(&mutation))
}

#[Subscription]
impl SubscriptionRoot {
    /// Comment writes, as they happen. `phraseId` only reports comments
    /// attached to that phrase and `mutation` only the given kinds of writes.
    async fn comment_events(
        &self,
        ctx: &Context<'_>,
        phrase_id: Option<i32>,
        mutation: Option<Vec<MutationType>>,
    ) -> Result<impl Stream<Item = CommentEvent>> {
        shield(ctx)?;

        let events = ctx_data(ctx).events.comment_events();
        Ok(events.filter_map(move |event| {
            let keep = wanted(&mutation, event.mutation)
                && phrase_id.map_or(true, |id| event.node.phrase_id == Some(id));

            ready(keep.then(|| CommentEvent {
                mutation: event.mutation,
                node: event.node.into(),
            }))
        }))
    }

    async fn phrase_events(
        &self,
        ctx: &Context<'_>,
        mutation: Option<Vec<MutationType>>,
    ) -> Result<impl Stream<Item = PhraseEvent>> {
        shield(ctx)?;

        let events = ctx_data(ctx).events.phrase_events();
        Ok(events.filter_map(move |event| {
            ready(wanted(&mutation, event.mutation).then(|| PhraseEvent {
                mutation: event.mutation,
                node: event.node.into(),
            }))
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mutation_filter() {
        assert!(wanted(&None, MutationType::Deleted));
        assert!(wanted(
            &Some(vec![MutationType::Created, MutationType::Deleted]),
            MutationType::Deleted
        ));
        assert!(!wanted(&Some(vec![]), MutationType::Created));
    }
}
