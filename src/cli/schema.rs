use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use sqlgraph_core::gql::SchemaGenerator;
use sqlgraph_core::kvs::Sqlite;

use super::config;

#[derive(Args, Debug)]
pub struct SchemaCommandArguments {
	#[arg(help = "Path of the SQLite database file to introspect")]
	#[arg(env = "SQLGRAPH_PATH", index = 1)]
	path: PathBuf,
	#[arg(help = "Path of the TOML file configuring the generated schema")]
	#[arg(env = "SQLGRAPH_CONFIG", short = 'c', long = "config")]
	config: Option<PathBuf>,
}

pub fn init(
	SchemaCommandArguments {
		path,
		config,
	}: SchemaCommandArguments,
) -> Result<()> {
	crate::telemetry::builder().with_log_level("error")?.init()?;
	let config = config::load(config.as_deref())?;
	let ds = Sqlite::open(&path)
		.with_context(|| format!("Failed to open the database {}", path.display()))?;
	let schema = SchemaGenerator::new(Arc::new(ds), config).generate()?;
	println!("{}", schema.sdl());
	Ok(())
}
