//! GraphQL HTTP server.
//!
//! Besides routing, the handler owns the per-request wiring: it derives the
//! acting [`Viewer`] from the request headers and builds one fresh
//! [`RequestLoaders`] per request, so loader caches never outlive the
//! request that created them.

use std::future::Future;
use std::sync::Arc;

use async_graphql::http::GraphiQLSource;
use async_graphql::{EmptyMutation, EmptySubscription, ObjectType, Schema};
use async_graphql_axum::{GraphQLRequest, GraphQLResponse};
use axum::{
    Router,
    extract::State,
    http::HeaderMap,
    response::{Html, IntoResponse},
    routing::get,
};
use tracing::{debug, info};

use tracker_core::models::Viewer;
use tracker_core::ports::Repositories;

use crate::loaders::RequestLoaders;

/// Header carrying the opaque acting-user key, when the caller is known.
const USER_HEADER: &str = "x-tracker-user";

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub enable_playground: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 4000,
            enable_playground: true,
        }
    }
}

/// Shared state of the GraphQL routes.
pub struct AppState<Q> {
    schema: Schema<Q, EmptyMutation, EmptySubscription>,
    repositories: Arc<dyn Repositories>,
}

impl<Q> Clone for AppState<Q> {
    fn clone(&self) -> Self {
        Self {
            schema: self.schema.clone(),
            repositories: self.repositories.clone(),
        }
    }
}

/// Start the GraphQL server with any schema type.
pub async fn serve<Q>(
    schema: Schema<Q, EmptyMutation, EmptySubscription>,
    repositories: Arc<dyn Repositories>,
    config: ServerConfig,
) -> Result<(), std::io::Error>
where
    Q: ObjectType + 'static,
{
    let app = router(schema, repositories, &config);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("⚡ GraphQL server listening on http://{}", addr);

    axum::serve(listener, app).await
}

/// Start the GraphQL server with graceful shutdown support.
pub async fn serve_with_shutdown<Q, F>(
    schema: Schema<Q, EmptyMutation, EmptySubscription>,
    repositories: Arc<dyn Repositories>,
    config: ServerConfig,
    shutdown_signal: F,
) -> Result<(), std::io::Error>
where
    Q: ObjectType + 'static,
    F: Future<Output = ()> + Send + 'static,
{
    let app = router(schema, repositories, &config);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    debug!(addr = %addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await
}

fn router<Q>(
    schema: Schema<Q, EmptyMutation, EmptySubscription>,
    repositories: Arc<dyn Repositories>,
    config: &ServerConfig,
) -> Router
where
    Q: ObjectType + 'static,
{
    let state = AppState {
        schema,
        repositories,
    };

    let mut app = Router::new()
        .route("/graphql", get(graphql_playground).post(graphql_handler::<Q>))
        .route("/health", get(health_check))
        .with_state(state);

    if config.enable_playground {
        app = app.route("/", get(graphql_playground));
    }

    app
}

/// GraphQL query handler.
///
/// The viewer and the request-scoped loaders ride along in the request
/// context; resolvers pick them up with `ctx.data`.
async fn graphql_handler<Q>(
    State(state): State<AppState<Q>>,
    headers: HeaderMap,
    req: GraphQLRequest,
) -> GraphQLResponse
where
    Q: ObjectType + 'static,
{
    let viewer = viewer_from_headers(&headers);
    let loaders = RequestLoaders::new(state.repositories.as_ref(), &viewer);

    let request = req.into_inner().data(viewer).data(loaders);
    state.schema.execute(request).await.into()
}

/// GraphQL Playground UI.
async fn graphql_playground() -> impl IntoResponse {
    Html(GraphiQLSource::build().endpoint("/graphql").finish())
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}

/// Derive the acting viewer from the opaque user header, if present.
fn viewer_from_headers(headers: &HeaderMap) -> Viewer {
    headers
        .get(USER_HEADER)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
        .map(Viewer::known)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn viewer_header_is_optional() {
        let headers = HeaderMap::new();
        assert!(viewer_from_headers(&headers).user_key.is_none());

        let mut headers = HeaderMap::new();
        headers.insert(USER_HEADER, "users/42".parse().unwrap());
        assert_eq!(
            viewer_from_headers(&headers).user_key.as_deref(),
            Some("users/42")
        );
    }

    #[test]
    fn empty_viewer_header_counts_as_anonymous() {
        let mut headers = HeaderMap::new();
        headers.insert(USER_HEADER, "".parse().unwrap());
        assert!(viewer_from_headers(&headers).user_key.is_none());
    }
}
