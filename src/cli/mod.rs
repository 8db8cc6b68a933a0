mod config;
mod schema;
mod start;

use std::process::ExitCode;

use clap::{Parser, Subcommand};

use crate::cnf::{INFO, PKG_NAME, PKG_VERSION};
use schema::SchemaCommandArguments;
use start::StartCommandArguments;

#[derive(Parser, Debug)]
#[command(name = PKG_NAME, bin_name = PKG_NAME, version = PKG_VERSION, about = INFO)]
#[command(arg_required_else_help = true)]
struct Cli {
	#[command(subcommand)]
	command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
	#[command(about = "Start the GraphQL server")]
	Start(StartCommandArguments),
	#[command(about = "Print the GraphQL schema generated from a database")]
	Schema(SchemaCommandArguments),
}

pub fn init() -> ExitCode {
	let args = Cli::parse();
	let output = match args.command {
		Commands::Start(args) => start::init(args),
		Commands::Schema(args) => schema::init(args),
	};
	if let Err(e) = output {
		eprintln!("{e:#}");
		ExitCode::FAILURE
	} else {
		ExitCode::SUCCESS
	}
}
