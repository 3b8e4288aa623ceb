mod common;

use axum::body::{to_bytes, Body};
use axum::http::header::{
    ACCESS_CONTROL_ALLOW_ORIGIN, AUTHORIZATION, CONTENT_TYPE, ORIGIN,
};
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use phrasebook_common_types::{MutationType, Role};
use phrasebook_lib::config::Config;
use phrasebook_lib::http::router;
use phrasebook_lib::test_utils::{bearer, test_authenticator};
use phrasebook_lib::AppEnv;
use serde_json::{json, Value};
use tower::ServiceExt;

use crate::common::{published, SchemaForTesting};

fn app(schema: &SchemaForTesting, env: AppEnv) -> Router {
    router(
        schema.schema.clone(),
        test_authenticator(),
        &Config::default(),
        env,
    )
    .unwrap()
}

fn graphql_request(query: &str, authorization: Option<String>) -> Request<Body> {
    let mut request = Request::builder()
        .method(Method::POST)
        .uri("/graphql")
        .header(CONTENT_TYPE, "application/json");
    if let Some(authorization) = authorization {
        request = request.header(AUTHORIZATION, authorization);
    }

    request
        .body(Body::from(json!({ "query": query }).to_string()))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_check() {
    let schema = SchemaForTesting::new().await.unwrap();

    let response = app(&schema, AppEnv::Production)
        .oneshot(Request::get("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&body[..], b"Ready to roll!");
}

#[tokio::test]
async fn graphiql_only_outside_production() {
    let schema = SchemaForTesting::new().await.unwrap();
    let get = || Request::get("/graphql").body(Body::empty()).unwrap();

    let response = app(&schema, AppEnv::Development)
        .oneshot(get())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app(&schema, AppEnv::Production)
        .oneshot(get())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn bearer_tokens_authenticate_requests() {
    let schema = SchemaForTesting::new().await.unwrap();
    let mutation = r#"mutation { createOnePhrase(data: { content: "hi" }) { content } }"#;

    let response = app(&schema, AppEnv::Production)
        .oneshot(graphql_request(mutation, Some(bearer(Some(Role::User)))))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        json_body(response).await,
        json!({ "data": { "createOnePhrase": { "content": "hi" } } })
    );
}

#[tokio::test]
async fn invalid_tokens_pass_through_anonymously() {
    let schema = SchemaForTesting::new().await.unwrap();
    let mutation = r#"mutation { createOnePhrase(data: { content: "hi" }) { content } }"#;

    let response = app(&schema, AppEnv::Development)
        .oneshot(graphql_request(
            mutation,
            Some("Bearer not-a-token".to_string()),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["errors"][0]["message"], "Not Authorised!");

    let response = app(&schema, AppEnv::Development)
        .oneshot(graphql_request("{ findManyPhraseCount }", None))
        .await
        .unwrap();
    assert_eq!(
        json_body(response).await,
        json!({ "data": { "findManyPhraseCount": 0 } })
    );
}

#[tokio::test]
async fn cors_mirrors_the_origin() {
    let schema = SchemaForTesting::new().await.unwrap();

    let mut request = graphql_request("{ findManyPhraseCount }", None);
    request
        .headers_mut()
        .insert(ORIGIN, "https://studio.example".parse().unwrap());
    let response = app(&schema, AppEnv::Production)
        .oneshot(request)
        .await
        .unwrap();

    assert_eq!(
        response.headers().get(ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
        "https://studio.example"
    );
}

#[tokio::test]
async fn import_phrases_from_upload() {
    let schema = SchemaForTesting::new().await.unwrap();
    let boundary = "phrasebook-boundary";
    let operations = json!({
        "query": "mutation ($file: Upload!) { importPhrases(file: $file) { content } }",
        "variables": { "file": null },
    });
    let body = [
        format!("--{boundary}"),
        r#"Content-Disposition: form-data; name="operations""#.to_string(),
        String::new(),
        operations.to_string(),
        format!("--{boundary}"),
        r#"Content-Disposition: form-data; name="map""#.to_string(),
        String::new(),
        r#"{"0":["variables.file"]}"#.to_string(),
        format!("--{boundary}"),
        r#"Content-Disposition: form-data; name="0"; filename="phrases.txt""#.to_string(),
        "Content-Type: text/plain".to_string(),
        String::new(),
        "good morning\n\n  good night  \n".to_string(),
        format!("--{boundary}--"),
        String::new(),
    ]
    .join("\r\n");

    let request = Request::post("/graphql")
        .header(
            CONTENT_TYPE,
            format!("multipart/form-data; boundary={boundary}"),
        )
        .header(AUTHORIZATION, bearer(Some(Role::Admin)))
        .body(Body::from(body))
        .unwrap();
    let mut events = Box::pin(schema.events.phrase_events());
    let response = app(&schema, AppEnv::Production)
        .oneshot(request)
        .await
        .unwrap();

    assert_eq!(
        json_body(response).await,
        json!({
            "data": {
                "importPhrases": [{ "content": "good morning" }, { "content": "good night" }]
            }
        })
    );
    assert_eq!(
        published(&mut events, |phrase: &phrasebook_store::models::Phrase| phrase.id),
        vec![(MutationType::Created, 1), (MutationType::Created, 2)]
    );
}
