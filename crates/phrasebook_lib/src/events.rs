//! In-process publication of write events to GraphQL subscriptions.

use futures::stream::{self, Stream};
use phrasebook_common_types::MutationType;
use phrasebook_store::models::{Comment, Phrase};
use tokio::sync::broadcast;
use tracing::warn;

use crate::metrics;

/// How many events a subscriber may fall behind before it starts missing
/// some.
pub const DEFAULT_CAPACITY: usize = 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event<T> {
    pub mutation: MutationType,
    pub node: T,
}

#[derive(Debug, Clone)]
pub struct EventBus {
    comments: broadcast::Sender<Event<Comment>>,
    phrases: broadcast::Sender<Event<Phrase>>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        Self {
            comments: broadcast::channel(capacity).0,
            phrases: broadcast::channel(capacity).0,
        }
    }

    pub fn publish_comments(
        &self,
        mutation: MutationType,
        comments: impl IntoIterator<Item = Comment>,
    ) {
        publish(&self.comments, "Comment", mutation, comments);
    }

    pub fn publish_phrases(&self, mutation: MutationType, phrases: impl IntoIterator<Item = Phrase>) {
        publish(&self.phrases, "Phrase", mutation, phrases);
    }

    pub fn comment_events(&self) -> impl Stream<Item = Event<Comment>> {
        receiver_stream(self.comments.subscribe())
    }

    pub fn phrase_events(&self) -> impl Stream<Item = Event<Phrase>> {
        receiver_stream(self.phrases.subscribe())
    }
}

fn publish<T>(
    sender: &broadcast::Sender<Event<T>>,
    entity: &str,
    mutation: MutationType,
    nodes: impl IntoIterator<Item = T>,
) {
    let label: &'static str = mutation.into();
    for node in nodes {
        metrics()
            .published_events
            .with_label_values(&[entity, label])
            .inc();
        // Fails only when nobody is subscribed, which is fine.
        let _ = sender.send(Event { mutation, node });
    }
}

fn receiver_stream<T: Clone + Send + 'static>(
    receiver: broadcast::Receiver<Event<T>>,
) -> impl Stream<Item = Event<T>> {
    stream::unfold(receiver, |mut receiver| async move {
        loop {
            match receiver.recv().await {
                Ok(event) => return Some((event, receiver)),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Subscriber lagged behind, dropping events");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    })
}
