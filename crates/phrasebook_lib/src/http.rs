//! The HTTP and WebSocket face of the GraphQL API.

use std::net::Ipv4Addr;
use std::sync::Arc;

use async_graphql::http::{
    receive_batch_body, GraphiQLSource, MultipartOptions, ALL_WEBSOCKET_PROTOCOLS,
};
use async_graphql::Data;
use async_graphql_axum::rejection::GraphQLRejection;
use async_graphql_axum::{GraphQLProtocol, GraphQLResponse, GraphQLWebSocket};
use axum::extract::{Request, State, WebSocketUpgrade};
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderValue, Method};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Extension, Router};
use futures::TryStreamExt;
use tokio::net::TcpListener;
use tower_http::cors::{AllowHeaders, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::auth::{jwt_passthrough, Authenticator, Viewer};
use crate::config::{Config, CorsConfig, UploadsConfig};
use crate::graphql_api::ApiSchema;
use crate::AppEnv;

#[derive(Clone)]
struct AppState {
    schema: ApiSchema,
    authenticator: Arc<Authenticator>,
    uploads: MultipartOptions,
}

fn multipart_options(config: &UploadsConfig) -> MultipartOptions {
    MultipartOptions::default()
        .max_file_size(config.max_file_size)
        .max_num_files(config.max_files)
}

/// Mirrors the request's `Origin` unless a list of allowed origins is
/// configured.
pub fn cors_layer(config: &CorsConfig) -> anyhow::Result<CorsLayer> {
    let allow_origin = match &config.allowed_origins {
        None => AllowOrigin::mirror_request(),
        Some(origins) => AllowOrigin::list(
            origins
                .iter()
                .map(|origin| HeaderValue::from_str(origin))
                .collect::<Result<Vec<_>, _>>()?,
        ),
    };

    Ok(CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([
            Method::GET,
            Method::HEAD,
            Method::PUT,
            Method::POST,
            Method::DELETE,
            Method::PATCH,
        ])
        .allow_headers(AllowHeaders::mirror_request()))
}

pub fn router(
    schema: ApiSchema,
    authenticator: Authenticator,
    config: &Config,
    env: AppEnv,
) -> anyhow::Result<Router> {
    let authenticator = Arc::new(authenticator);
    let state = AppState {
        schema,
        authenticator: authenticator.clone(),
        uploads: multipart_options(&config.uploads),
    };

    let graphql_route = if env.is_production() {
        post(graphql_handler)
    } else {
        let graphiql = GraphiQLSource::build()
            .endpoint(&config.graphql.path)
            .subscription_endpoint(&config.graphql.subscriptions_path)
            .finish();
        get(|| async move { Html(graphiql) }).post(graphql_handler)
    };

    Ok(Router::new()
        .route("/", get(|| async { "Ready to roll!" }))
        .route(&config.graphql.path, graphql_route)
        .route(&config.graphql.subscriptions_path, get(subscriptions_handler))
        .with_state(state)
        .layer(axum::middleware::from_fn_with_state(
            authenticator,
            jwt_passthrough,
        ))
        .layer(cors_layer(&config.cors)?)
        .layer(TraceLayer::new_for_http()))
}

/// Accepts JSON as well as multipart requests, single or batched.
async fn graphql_handler(
    State(state): State<AppState>,
    viewer: Option<Extension<Viewer>>,
    request: Request,
) -> Response {
    let content_type = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(ToOwned::to_owned);
    let body = request
        .into_body()
        .into_data_stream()
        .map_err(|err| std::io::Error::new(std::io::ErrorKind::Other, err))
        .into_async_read();

    let batch = match receive_batch_body(content_type, body, state.uploads).await {
        Ok(batch) => batch,
        Err(err) => return GraphQLRejection(err).into_response(),
    };

    let viewer = viewer.map(|Extension(viewer)| viewer).unwrap_or_default();
    let response = state.schema.execute_batch(batch.data(viewer)).await;
    GraphQLResponse::from(response).into_response()
}

async fn subscriptions_handler(
    State(state): State<AppState>,
    viewer: Option<Extension<Viewer>>,
    protocol: GraphQLProtocol,
    upgrade: WebSocketUpgrade,
) -> Response {
    let viewer = viewer.map(|Extension(viewer)| viewer).unwrap_or_default();

    upgrade
        .protocols(ALL_WEBSOCKET_PROTOCOLS)
        .on_upgrade(move |stream| {
            let authenticator = state.authenticator.clone();
            GraphQLWebSocket::new(stream, state.schema.clone(), protocol)
                .on_connection_init(move |payload| async move {
                    let mut data = Data::default();
                    data.insert(connection_viewer(&authenticator, &payload, viewer));
                    Ok(data)
                })
                .serve()
        })
}

/// The viewer of a WebSocket connection. A valid token in the
/// `connection_init` payload replaces the viewer of the upgrade request.
fn connection_viewer(
    authenticator: &Authenticator,
    payload: &serde_json::Value,
    upgrade_viewer: Viewer,
) -> Viewer {
    authenticator
        .viewer_from_connection_init(payload)
        .filter(Viewer::is_authenticated)
        .unwrap_or(upgrade_viewer)
}

/// Serves `router` on all interfaces until Ctrl-C or SIGTERM.
pub async fn serve(router: Router, port: u16, graphql_path: &str) -> anyhow::Result<()> {
    let listener = TcpListener::bind((Ipv4Addr::UNSPECIFIED, port)).await?;
    info!("Server ready at: {}", ready_url(port, graphql_path));

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down");
    Ok(())
}

fn ready_url(port: u16, graphql_path: &str) -> String {
    format!("http://localhost:{port}{graphql_path}")
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!(error = %err, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}
