mod common;

use std::time::Duration;

use async_graphql::Request;
use futures::StreamExt;
use phrasebook_common_types::{MutationType, Role};
use phrasebook_lib::config::{Config, PermissionsConfig};
use phrasebook_lib::permissions::Rule;
use phrasebook_lib::test_utils::test_viewer;
use serde_json::json;

use crate::common::{error_messages, published, SchemaForTesting};

async fn schema_with_phrases(contents: &[&str]) -> SchemaForTesting {
    let schema = SchemaForTesting::new().await.unwrap();
    schema
        .store
        .create_phrases(contents.iter().map(|c| c.to_string()).collect())
        .await
        .unwrap();
    schema
}

#[tokio::test]
async fn anonymous_viewers_can_read_but_not_write() {
    let schema = schema_with_phrases(&["hello"]).await;

    let response = schema
        .anonymous("{ findManyPhrase { content } }")
        .await;
    assert!(response.errors.is_empty());
    assert_eq!(
        response.data.into_json().unwrap(),
        json!({ "findManyPhrase": [{ "content": "hello" }] })
    );

    let response = schema
        .anonymous(r#"mutation { createOnePhrase(data: { content: "bye" }) { id } }"#)
        .await;
    assert_eq!(error_messages(&response), vec!["Not Authorised!"]);
    assert_eq!(schema.store.count_phrases(&Default::default()).await.unwrap(), 1);
}

#[tokio::test]
async fn users_write_single_records_only() {
    let schema = schema_with_phrases(&["hello"]).await;

    let response = schema
        .as_role(
            Role::User,
            r#"mutation { createOnePhrase(data: { content: "bye" }) { content } }"#,
        )
        .await;
    assert!(response.errors.is_empty(), "{:?}", response.errors);

    let response = schema
        .as_role(Role::User, "mutation { deleteManyPhrase { count } }")
        .await;
    assert_eq!(error_messages(&response), vec!["Not Authorised!"]);
    assert_eq!(schema.store.count_phrases(&Default::default()).await.unwrap(), 2);
}

#[tokio::test]
async fn configured_rules_take_precedence() {
    let mut config = Config::default();
    config.permissions = PermissionsConfig {
        fallback_rule: Rule::Allow,
        rules: [("findManyPhrase".to_string(), Rule::Deny)]
            .into_iter()
            .collect(),
    };
    let schema = SchemaForTesting::with_config(&config).await.unwrap();

    let response = schema
        .as_role(Role::Admin, "{ findManyPhrase { id } }")
        .await;
    assert_eq!(error_messages(&response), vec!["Not Authorised!"]);

    let response = schema.anonymous("{ findManyPhraseCount }").await;
    assert!(response.errors.is_empty());
}

#[tokio::test]
async fn comment_threads() {
    let schema = schema_with_phrases(&["hello"]).await;

    let data = schema
        .admin_data(
            r#"mutation {
                createOneComment(data: { content: "first", phraseId: 1 }) { id }
            }"#,
        )
        .await;
    assert_eq!(data, json!({ "createOneComment": { "id": 1 } }));

    schema
        .admin_data(
            r#"mutation {
                a: createOneComment(data: { content: "reply a", phraseId: 1, commentId: 1 }) { id }
                b: createOneComment(data: { content: "reply b", commentId: 1 }) { id }
            }"#,
        )
        .await;

    let data = schema
        .admin_data(
            r#"{
                findUniqueComment(where: { id: 1 }) {
                    content
                    phrase { content _count { comments } }
                    comments(orderBy: { content: desc }) { content comment { id } }
                    _count { comments }
                }
            }"#,
        )
        .await;
    assert_eq!(
        data,
        json!({
            "findUniqueComment": {
                "content": "first",
                "phrase": { "content": "hello", "_count": { "comments": 2 } },
                "comments": [
                    { "content": "reply b", "comment": { "id": 1 } },
                    { "content": "reply a", "comment": { "id": 1 } },
                ],
                "_count": { "comments": 2 },
            }
        })
    );

    let data = schema
        .admin_data(
            r#"{
                findUniquePhrase(where: { id: 1 }) {
                    comments(where: { commentId: { equals: null } }) { content }
                }
            }"#,
        )
        .await;
    assert_eq!(
        data,
        json!({ "findUniquePhrase": { "comments": [{ "content": "first" }] } })
    );
}

#[tokio::test]
async fn missing_records() {
    let schema = SchemaForTesting::new().await.unwrap();

    let data = schema
        .admin_data("{ findUniquePhrase(where: { id: 42 }) { id } findFirstComment { id } }")
        .await;
    assert_eq!(
        data,
        json!({ "findUniquePhrase": null, "findFirstComment": null })
    );

    let response = schema
        .as_role(
            Role::Admin,
            r#"mutation { updateOnePhrase(where: { id: 42 }, data: { content: "x" }) { id } }"#,
        )
        .await;
    assert_eq!(
        error_messages(&response),
        vec!["No Phrase record with id 42 was found"]
    );
}

#[tokio::test]
async fn pagination() {
    let schema = schema_with_phrases(&["a", "b", "c", "d", "e"]).await;

    let data = schema
        .admin_data(
            r#"{
                forwards: findManyPhrase(orderBy: [{ content: desc }], skip: 1, take: 2) { content }
                backwards: findManyPhrase(cursor: { id: 4 }, take: -2) { content }
                fromCursor: findManyPhrase(cursor: { id: 4 }, skip: 1) { content }
                count: findManyPhraseCount(where: { content: { in: ["a", "e", "z"] } })
                first: findFirstPhrase(orderBy: { id: desc }) { content }
            }"#,
        )
        .await;
    assert_eq!(
        data,
        json!({
            "forwards": [{ "content": "d" }, { "content": "c" }],
            "backwards": [{ "content": "c" }, { "content": "d" }],
            "fromCursor": [{ "content": "e" }],
            "count": 2,
            "first": { "content": "e" },
        })
    );
}

#[tokio::test]
async fn negative_skip_is_an_error() {
    let schema = schema_with_phrases(&["a"]).await;

    let response = schema
        .as_role(Role::Admin, "{ findManyPhrase(skip: -1) { id } }")
        .await;
    assert_eq!(response.errors.len(), 1);
}

#[tokio::test]
async fn aggregates() {
    let schema = schema_with_phrases(&["a", "bb", "ccc"]).await;

    let data = schema
        .admin_data(
            r#"{
                aggregatePhrase(where: { id: { gte: 2 } }) {
                    _count { _all }
                    _avg { id }
                    _sum { id }
                    _min { content }
                    _max { content }
                }
            }"#,
        )
        .await;
    assert_eq!(
        data,
        json!({
            "aggregatePhrase": {
                "_count": { "_all": 2 },
                "_avg": { "id": 2.5 },
                "_sum": { "id": 5 },
                "_min": { "content": "bb" },
                "_max": { "content": "ccc" },
            }
        })
    );
}

#[tokio::test]
async fn bulk_mutations() {
    let schema = schema_with_phrases(&["apple", "Avocado", "banana"]).await;

    let data = schema
        .admin_data(
            r#"mutation {
                updateManyPhrase(
                    where: { content: { startsWith: "a", mode: insensitive } },
                    data: { content: "fruit" }
                ) { count }
            }"#,
        )
        .await;
    assert_eq!(data, json!({ "updateManyPhrase": { "count": 2 } }));

    let data = schema
        .admin_data(r#"mutation { deleteManyPhrase(where: { content: { equals: "fruit" } }) { count } }"#)
        .await;
    assert_eq!(data, json!({ "deleteManyPhrase": { "count": 2 } }));

    let data = schema.admin_data("{ findManyPhrase { content } }").await;
    assert_eq!(data, json!({ "findManyPhrase": [{ "content": "banana" }] }));
}

#[tokio::test]
async fn upserts() {
    let schema = SchemaForTesting::new().await.unwrap();
    let upsert = r#"mutation {
        upsertOnePhrase(
            where: { id: 1 },
            create: { content: "created" },
            update: { content: "updated" }
        ) { id content }
    }"#;

    let data = schema.admin_data(upsert).await;
    assert_eq!(
        data,
        json!({ "upsertOnePhrase": { "id": 1, "content": "created" } })
    );
    let data = schema.admin_data(upsert).await;
    assert_eq!(
        data,
        json!({ "upsertOnePhrase": { "id": 1, "content": "updated" } })
    );
}

#[tokio::test]
async fn subscriptions_report_writes() {
    let schema = SchemaForTesting::new().await.unwrap();
    schema
        .store
        .create_phrases(vec!["watched".to_string(), "ignored".to_string()])
        .await
        .unwrap();

    let mut events = schema.schema.execute_stream(
        Request::new(
            "subscription { commentEvents(phraseId: 1, mutation: [CREATED]) { mutation node { content } } }",
        )
        .data(test_viewer(None)),
    );

    let write = async {
        tokio::time::sleep(Duration::from_millis(200)).await;
        schema
            .admin_data(
                r#"mutation {
                    a: createOneComment(data: { content: "elsewhere", phraseId: 2 }) { id }
                    b: createOneComment(data: { content: "here", phraseId: 1 }) { id }
                }"#,
            )
            .await;
    };
    let (event, ()) = tokio::join!(events.next(), write);

    let event = event.unwrap();
    assert!(event.errors.is_empty(), "{:?}", event.errors);
    assert_eq!(
        event.data.into_json().unwrap(),
        json!({ "commentEvents": { "mutation": "CREATED", "node": { "content": "here" } } })
    );
}

#[tokio::test]
async fn phrase_writes_publish_one_event_per_row() {
    use MutationType::{Created, Deleted, Updated};

    let schema = schema_with_phrases(&["a", "b", "c"]).await;
    let mut events = Box::pin(schema.events.phrase_events());
    let phrase_id = |phrase: &phrasebook_store::models::Phrase| phrase.id;

    schema
        .admin_data(
            r#"mutation { updateOnePhrase(where: { id: 1 }, data: { content: "A" }) { id } }"#,
        )
        .await;
    assert_eq!(published(&mut events, phrase_id), vec![(Updated, 1)]);

    let upsert = r#"mutation {
        upsertOnePhrase(where: { id: 4 }, create: { content: "d" }, update: { content: "D" }) { id }
    }"#;
    schema.admin_data(upsert).await;
    assert_eq!(published(&mut events, phrase_id), vec![(Created, 4)]);
    schema.admin_data(upsert).await;
    assert_eq!(published(&mut events, phrase_id), vec![(Updated, 4)]);

    schema
        .admin_data("mutation { deleteOnePhrase(where: { id: 2 }) { id } }")
        .await;
    assert_eq!(published(&mut events, phrase_id), vec![(Deleted, 2)]);

    schema
        .admin_data(r#"mutation { updateManyPhrase(data: { content: "same" }) { count } }"#)
        .await;
    let mut updated = published(&mut events, phrase_id);
    updated.sort_by_key(|(_, id)| *id);
    assert_eq!(updated, vec![(Updated, 1), (Updated, 3), (Updated, 4)]);

    schema
        .admin_data("mutation { deleteManyPhrase(where: { id: { gt: 1 } }) { count } }")
        .await;
    let mut deleted = published(&mut events, phrase_id);
    deleted.sort_by_key(|(_, id)| *id);
    assert_eq!(deleted, vec![(Deleted, 3), (Deleted, 4)]);
}

#[tokio::test]
async fn comment_writes_publish_one_event_per_row() {
    use MutationType::{Created, Deleted, Updated};

    let schema = schema_with_phrases(&["topic"]).await;
    let mut events = Box::pin(schema.events.comment_events());
    let comment_id = |comment: &phrasebook_store::models::Comment| comment.id;

    schema
        .admin_data(
            r#"mutation {
                a: createOneComment(data: { content: "first", phraseId: 1 }) { id }
                b: createOneComment(data: { content: "second", phraseId: 1 }) { id }
            }"#,
        )
        .await;
    assert_eq!(
        published(&mut events, comment_id),
        vec![(Created, 1), (Created, 2)]
    );

    schema
        .admin_data(
            r#"mutation { updateOneComment(where: { id: 1 }, data: { content: "edited" }) { id } }"#,
        )
        .await;
    assert_eq!(published(&mut events, comment_id), vec![(Updated, 1)]);

    let upsert = r#"mutation {
        upsertOneComment(where: { id: 3 }, create: { content: "third" }, update: { content: "3rd" }) { id }
    }"#;
    schema.admin_data(upsert).await;
    assert_eq!(published(&mut events, comment_id), vec![(Created, 3)]);
    schema.admin_data(upsert).await;
    assert_eq!(published(&mut events, comment_id), vec![(Updated, 3)]);

    schema
        .admin_data("mutation { deleteOneComment(where: { id: 3 }) { id } }")
        .await;
    assert_eq!(published(&mut events, comment_id), vec![(Deleted, 3)]);

    schema
        .admin_data(r#"mutation { updateManyComment(data: { content: "same" }) { count } }"#)
        .await;
    let mut updated = published(&mut events, comment_id);
    updated.sort_by_key(|(_, id)| *id);
    assert_eq!(updated, vec![(Updated, 1), (Updated, 2)]);

    schema.admin_data("mutation { deleteManyComment { count } }").await;
    let mut deleted = published(&mut events, comment_id);
    deleted.sort_by_key(|(_, id)| *id);
    assert_eq!(deleted, vec![(Deleted, 1), (Deleted, 2)]);
}

#[tokio::test]
async fn writes_that_change_nothing_publish_nothing() {
    let schema = schema_with_phrases(&["a", "b"]).await;
    let mut events = Box::pin(schema.events.phrase_events());
    let phrase_id = |phrase: &phrasebook_store::models::Phrase| phrase.id;

    let data = schema
        .admin_data("mutation { updateManyPhrase(data: {}) { count } }")
        .await;
    assert_eq!(data, json!({ "updateManyPhrase": { "count": 2 } }));

    let data = schema
        .admin_data("mutation { updateOnePhrase(where: { id: 1 }, data: {}) { content } }")
        .await;
    assert_eq!(data, json!({ "updateOnePhrase": { "content": "a" } }));

    schema
        .admin_data(
            r#"mutation { upsertOnePhrase(where: { id: 2 }, create: { content: "x" }, update: {}) { id } }"#,
        )
        .await;

    assert!(published(&mut events, phrase_id).is_empty());
}

#[tokio::test]
async fn denied_subscriptions() {
    let mut config = Config::default();
    config
        .permissions
        .rules
        .insert("phraseEvents".to_string(), Rule::Authenticated);
    let schema = SchemaForTesting::with_config(&config).await.unwrap();

    let mut events = schema
        .schema
        .execute_stream("subscription { phraseEvents { mutation } }");
    let response = events.next().await.unwrap();
    assert_eq!(error_messages(&response), vec!["Not Authorised!"]);
}
