//! GraphQL API for the tracker.
//!
//! Provides a GraphQL endpoint to query tracked organizations, domains,
//! scan results, and DMARC summaries, all list fields exposed as Relay
//! cursor-paginated connections backed by `tracker-core`'s pagination core.
//!
//! # Usage
//!
//! ```ignore
//! use tracker_graphql::{build_schema, serve_with_shutdown, ServerConfig};
//!
//! let schema = build_schema(repositories.clone());
//! serve_with_shutdown(schema, repositories, ServerConfig::default(), shutdown).await?;
//! ```

mod loaders;
mod schema;
mod server;
mod types;

pub use loaders::RequestLoaders;
pub use schema::{CoreQuery, MAX_QUERY_COMPLEXITY, MAX_QUERY_DEPTH, build_schema};
pub use server::{ServerConfig, serve, serve_with_shutdown};
pub use types::TrackerSchema;
