//! GraphQL type definitions.

use async_graphql::{EmptyMutation, EmptySubscription, Schema};

use crate::schema::CoreQuery;

/// The core GraphQL schema type.
pub type TrackerSchema = Schema<CoreQuery, EmptyMutation, EmptySubscription>;
