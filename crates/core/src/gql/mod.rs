//! GraphQL support for sqlgraph.
//!
//! This module generates a dynamic GraphQL schema from the introspected
//! structure of a database: its tables, columns and foreign keys, plus the
//! polymorphic relations declared in the configuration.
//!
//! ## Architecture
//!
//! - **Planning** ([`tables`]) -- turns the structure into a [`SchemaPlan`], the object types,
//!   relation fields and root fields to generate, together with the settings their resolvers
//!   read.
//! - **Schema generation** ([`schema`]) -- lowers a plan into an `async_graphql::dynamic::Schema`.
//! - **Arguments** ([`args`]) -- the pagination, order and condition input types shared by all
//!   list and count fields, and their parsed form.
//! - **Compilation** ([`compile`]) -- compiles parsed arguments into calls against a
//!   [`Selection`](crate::kvs::Selection).
//! - **Resolvers** ([`resolvers`]) -- the resolvers bound to root and relation fields.
//! - **Caching** ([`cache`]) -- keeps a generated schema until it is invalidated.
//! - **Error handling** ([`error`]) -- domain error type ([`GqlError`]) with helper constructors.
//!
//! The HTTP layer lives in the `sqlgraph` binary, which serves the schema
//! with Axum.

pub mod args;
pub mod cache;
pub mod compile;
pub mod config;
pub mod error;
mod ext;
pub mod inflect;
pub mod resolvers;
pub mod schema;
pub mod tables;
pub mod types;

pub use args::{Comparator, QueryArgs};
pub use cache::*;
pub use compile::Compiler;
pub use config::{MorphRelation, SchemaConfig};
pub use error::GqlError;
pub use resolvers::{ResolverFactory, ResolverKind};
pub use schema::{SchemaGenerator, generate_schema};
pub use tables::{FieldSettings, SchemaPlan};
