//! # sqlgraph core
//!
//! This crate is the core library of sqlgraph. It introspects the structure
//! of a relational database and generates a GraphQL schema from it, with one
//! object type per table, relation fields for every foreign key and root
//! fields which accept pagination, ordering and nested condition trees.
//!
//! The `sqlgraph` binary serves the generated schema over HTTP on top of
//! this crate.

#[macro_use]
extern crate tracing;

#[macro_use]
mod mac;

pub mod cnf;
pub mod err;
pub mod gql;
pub mod kvs;
pub mod obs;
pub mod val;
