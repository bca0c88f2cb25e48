//! Core domain layer for the tracker API.
//!
//! This crate contains the domain models, port traits (interfaces), and the
//! connection/pagination machinery for the domain security tracker. It
//! follows hexagonal architecture principles - this is the innermost layer
//! with no dependencies on infrastructure.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     tracker (binary)                        │
//! ├─────────────────────────────────────────────────────────────┤
//! │                   tracker-graphql (API)                     │
//! ├─────────────────────────────────────────────────────────────┤
//! │                    tracker-storage                          │
//! │                     (PostgreSQL)                            │
//! ├─────────────────────────────────────────────────────────────┤
//! │                     tracker-core  ← YOU ARE HERE            │
//! │               (models, ports, pagination)                   │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`models`] - Domain models (Organization, Domain, Scan, DmarcSummary)
//! - [`ports`] - Interface traits for adapters to implement
//! - [`error`] - Domain error types
//! - [`metrics`] - Prometheus metrics definitions
//!
//! # Key Concepts
//!
//! ## Connections
//!
//! Every list operation in the API is a Relay-style cursor-paginated
//! connection. [`ports::Paginator`] owns the contract: argument validation,
//! opaque cursor decoding, the peek-ahead window query, and page-info
//! assembly. Storage adapters only implement [`ports::ConnectionSource`] -
//! a count query plus one windowed slice query over structured parameters.
//!
//! ## Batched Loading
//!
//! Single-record lookups go through a request-scoped
//! [`ports::BatchKeyLoader`], which coalesces and deduplicates by-key
//! lookups into one batched query per wave against a
//! [`ports::KeyFetcher`], and caches both hits and confirmed misses for
//! the lifetime of the request.
//!
//! ## Error Boundaries
//!
//! Bad pagination input fails before any query runs and is surfaced
//! verbatim. Data-source failures never cross the loader/paginator
//! boundary: they are logged with their root cause and replaced by a
//! generic, retryable message.

pub mod error;
pub mod metrics;
pub mod models;
pub mod ports;
