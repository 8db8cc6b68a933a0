//! This binary is the web server and command-line interface of sqlgraph.
//!
//! It opens a SQLite database, generates a GraphQL schema from its structure
//! and serves that schema over HTTP. Everything the schema does is
//! implemented in the `sqlgraph-core` crate.

#[macro_use]
extern crate tracing;

mod cli;
mod cnf;
mod net;
mod telemetry;

use std::process::ExitCode;

fn main() -> ExitCode {
	cli::init()
}
