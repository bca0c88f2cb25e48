//! Storage layer for the tracker API.
//!
//! This crate provides PostgreSQL implementations of the repository traits
//! defined in `tracker-core`. It handles all database interactions including
//! connection pooling, migrations, and CRUD operations, and implements the
//! [`tracker_core::ports::ConnectionSource`] and
//! [`tracker_core::ports::KeyFetcher`] seams the pagination core runs on.
//!
//! # Architecture
//!
//! The storage layer follows the repository pattern:
//!
//! - [`postgres::Database`] - Connection pool management
//! - [`postgres::PgRepositories`] - Composite repository for all entity types
//! - Individual repositories for organizations, domains, scans, and summaries
//!
//! # Usage
//!
//! ```ignore
//! use tracker_storage::{Database, DatabaseConfig, PgRepositories};
//!
//! let config = DatabaseConfig::for_api(&database_url);
//! let db = Database::connect(&config).await?;
//! db.migrate().await?;
//!
//! let repositories = Arc::new(PgRepositories::new(&db));
//! ```

pub mod postgres;

pub use postgres::{Database, DatabaseConfig, PgRepositories};
