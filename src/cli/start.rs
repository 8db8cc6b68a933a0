use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use sqlgraph_core::gql::{Fingerprint, SchemaCache, SchemaGenerator};
use sqlgraph_core::kvs::Sqlite;

use super::config;
use crate::cnf::{DEFAULT_BIND, DEFAULT_LOG, PKG_NAME, PKG_VERSION};
use crate::net::{self, AppState};

#[derive(Args, Debug)]
pub struct StartCommandArguments {
	#[arg(help = "Path of the SQLite database file to serve")]
	#[arg(env = "SQLGRAPH_PATH", index = 1)]
	pub(super) path: PathBuf,
	#[arg(help = "The hostname or IP address to listen for connections on")]
	#[arg(env = "SQLGRAPH_BIND", short = 'b', long = "bind", default_value = DEFAULT_BIND)]
	pub(super) bind: SocketAddr,
	#[arg(help = "Path of the TOML file configuring the generated schema")]
	#[arg(env = "SQLGRAPH_CONFIG", short = 'c', long = "config")]
	pub(super) config: Option<PathBuf>,
	#[arg(help = "Trust clients with raw column expressions and literal values")]
	#[arg(env = "SQLGRAPH_FIRST_PARTY", long = "first-party")]
	pub(super) first_party: bool,
	#[arg(help = "Include the executed SQL statements in every response")]
	#[arg(env = "SQLGRAPH_DEBUG", long = "debug")]
	pub(super) debug: bool,
	#[arg(help = "The logging level and filter directives")]
	#[arg(env = "SQLGRAPH_LOG", short = 'l', long = "log", default_value = DEFAULT_LOG)]
	pub(super) log: String,
}

#[tokio::main]
pub async fn init(args: StartCommandArguments) -> Result<()> {
	let StartCommandArguments {
		path,
		bind,
		config,
		first_party,
		debug,
		log,
	} = args;
	// Initialize logging
	crate::telemetry::builder().with_log_level(&log)?.init()?;
	info!("Starting {PKG_NAME} {PKG_VERSION}");
	// Load the schema configuration
	let config = config::load(config.as_deref())?;
	// Open the database
	let ds = Sqlite::open(&path)
		.with_context(|| format!("Failed to open the database {}", path.display()))?;
	if first_party {
		warn!("Serving in first party mode, clients may send raw SQL expressions");
	}
	let generator = SchemaGenerator::new(Arc::new(ds), config).with_first_party(first_party);
	let cache = SchemaCache::<Fingerprint>::new(generator);
	// Generate the schema once, so that errors show up before serving
	cache.get_schema().await.context("Failed to generate the GraphQL schema")?;
	// Start the web server
	net::init(
		bind,
		AppState {
			cache,
			debug,
		},
	)
	.await
}
