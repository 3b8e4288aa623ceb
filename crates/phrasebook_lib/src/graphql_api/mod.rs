pub mod api_types;
mod mutation_root;
mod query_root;
mod subscription_root;

use std::time::Duration;

use async_graphql::dataloader::DataLoader;
use async_graphql::{Context, Schema, SchemaBuilder};
use phrasebook_store::loader::{PhraseCommentCount, ReplyCount, StoreLoader};
use phrasebook_store::{models, Store};
use tracing::debug;

pub use self::mutation_root::MutationRoot;
pub use self::query_root::QueryRoot;
pub use self::subscription_root::SubscriptionRoot;
use crate::auth::Viewer;
use crate::config::Config;
use crate::events::EventBus;
use crate::metrics;
use crate::permissions::{Permissions, NOT_AUTHORISED};

pub type ApiSchema = Schema<QueryRoot, MutationRoot, SubscriptionRoot>;

pub struct ApiSchemaContext {
    pub store: Store,
    pub events: EventBus,
    pub permissions: Permissions,
    pub introspection: bool,
    pub loader_phrase: DataLoader<StoreLoader<models::Phrase>>,
    pub loader_comment: DataLoader<StoreLoader<models::Comment>>,
    pub loader_reply_count: DataLoader<StoreLoader<ReplyCount>>,
    pub loader_phrase_comment_count: DataLoader<StoreLoader<PhraseCommentCount>>,
}

impl ApiSchemaContext {
    pub fn new(store: Store, events: EventBus, config: &Config) -> Self {
        // The default delay is 1ms, but we're happy to wait a bit longer to reduce load on the
        // database.
        let delay = Duration::from_millis(3);

        // Built once per schema and never cached, so rows are always fresh.

        let loader_phrase =
            DataLoader::new(StoreLoader::new(store.clone()), tokio::task::spawn).delay(delay);
        let loader_comment =
            DataLoader::new(StoreLoader::new(store.clone()), tokio::task::spawn).delay(delay);
        let loader_reply_count =
            DataLoader::new(StoreLoader::new(store.clone()), tokio::task::spawn).delay(delay);
        let loader_phrase_comment_count =
            DataLoader::new(StoreLoader::new(store.clone()), tokio::task::spawn).delay(delay);

        Self {
            store,
            events,
            permissions: Permissions::new(&config.permissions),
            introspection: config.graphql.introspection,
            loader_phrase,
            loader_comment,
            loader_reply_count,
            loader_phrase_comment_count,
        }
    }
}

pub fn api_schema_builder() -> SchemaBuilder<QueryRoot, MutationRoot, SubscriptionRoot> {
    Schema::build(QueryRoot, MutationRoot, SubscriptionRoot)
}

pub fn api_schema(ctx: ApiSchemaContext) -> ApiSchema {
    let mut builder = api_schema_builder();
    if !ctx.introspection {
        builder = builder.disable_introspection();
    }

    builder.data(ctx).finish()
}

pub fn ctx_data<'a>(ctx: &'a Context) -> &'a ApiSchemaContext {
    ctx.data::<ApiSchemaContext>()
        .expect("Failed to get API context")
}

/// The [`Viewer`] attached to the request, anonymous if there is none.
pub fn viewer<'a>(ctx: &'a Context) -> &'a Viewer {
    static ANONYMOUS: Viewer = Viewer::Anonymous;
    ctx.data_opt::<Viewer>().unwrap_or(&ANONYMOUS)
}

/// Checks the permission rule of the root field being resolved. Every root
/// field calls this before doing anything else.
pub fn shield(ctx: &Context) -> async_graphql::Result<()> {
    let operation = ctx.field().name();
    let allowed = ctx_data(ctx).permissions.allows(operation, viewer(ctx));

    let outcome = if allowed { "allowed" } else { "denied" };
    metrics()
        .graphql_operations
        .with_label_values(&[operation, outcome])
        .inc();

    if allowed {
        Ok(())
    } else {
        debug!(operation, "Denied operation");
        Err(NOT_AUTHORISED.into())
    }
}
