//! Diagnostics collected while resolving a query.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

/// A log of the statements executed while resolving a single request.
///
/// The log is a cheap handle: clones append to the same list. Create one
/// per execution and pass it to the resolvers, either through the resolver
/// factory or as request data.
#[derive(Clone, Debug, Default)]
pub struct QueryLog {
	entries: Arc<Mutex<Vec<String>>>,
}

impl QueryLog {
	pub fn new() -> Self {
		Self::default()
	}

	/// Records a statement verbatim
	pub fn record(&self, sql: impl Into<String>) {
		self.entries.lock().push(sql.into());
	}

	/// Records a successfully executed statement with its duration
	pub fn record_timed(&self, sql: &str, elapsed: Duration) {
		let ms = elapsed.as_secs_f64() * 1000.0;
		self.record(format!("({ms:.3} ms) {sql}"));
	}

	/// Records a statement which failed to execute
	pub fn record_failed(&self, sql: &str) {
		debug!("Statement failed: {sql}");
		self.record(sql);
	}

	/// Returns a copy of all entries recorded so far
	pub fn entries(&self) -> Vec<String> {
		self.entries.lock().clone()
	}

	pub fn clear(&self) {
		self.entries.lock().clear();
	}

	pub fn is_empty(&self) -> bool {
		self.entries.lock().is_empty()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn clones_share_entries() {
		let log = QueryLog::new();
		let other = log.clone();
		other.record_timed("SELECT 1", Duration::from_micros(1500));
		other.record_failed("SELECT broken");
		assert_eq!(log.entries(), vec!["(1.500 ms) SELECT 1", "SELECT broken"]);
		log.clear();
		assert!(other.is_empty());
	}
}
