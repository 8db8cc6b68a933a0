use anyhow::{Context, Result};
use tracing::Subscriber;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::prelude::*;
use tracing_subscriber::util::SubscriberInitExt;

use crate::cnf::DEFAULT_LOG;

#[derive(Default, Debug)]
pub struct Builder {
	filter: Option<EnvFilter>,
}

pub fn builder() -> Builder {
	Builder::default()
}

impl Builder {
	/// Set the log filter directives on the builder, `info` or
	/// `sqlgraph_core=trace,info` for example
	pub fn with_log_level(self, directives: &str) -> Result<Self> {
		let filter = EnvFilter::builder()
			.parse(directives)
			.with_context(|| format!("Invalid log filter directives '{directives}'"))?;
		Ok(Builder {
			filter: Some(filter),
		})
	}

	/// Build a tracing dispatcher with the fmt subscriber writing to stderr
	pub fn build(self) -> Box<dyn Subscriber + Send + Sync + 'static> {
		let filter = self.filter.unwrap_or_else(|| EnvFilter::new(DEFAULT_LOG));
		let registry = tracing_subscriber::registry().with(
			tracing_subscriber::fmt::layer()
				.compact()
				.with_ansi(true)
				.with_span_events(FmtSpan::NONE)
				.with_writer(std::io::stderr)
				.with_filter(filter),
		);
		Box::new(registry)
	}

	/// Install the tracing pipeline as the global default
	pub fn init(self) -> Result<()> {
		self.build().try_init().context("Failed to install the tracing subscriber")
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_filter_directives() {
		assert!(builder().with_log_level("sqlgraph_core=trace,info").is_ok());
		assert!(builder().with_log_level("sqlgraph_core=loud").is_err());
	}

	#[test]
	fn logs_through_the_built_subscriber() {
		let _enter = builder().with_log_level("debug").unwrap().build().set_default();
		debug!("debug");
	}
}
