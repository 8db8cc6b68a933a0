use thiserror::Error;

/// An error originating from the relational layer.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
	/// There was a problem with the underlying datastore
	#[error("There was a problem with the underlying datastore: {0}")]
	Ds(String),

	/// There was an error returned by the SQLite driver
	#[cfg(feature = "kv-sqlite")]
	#[error("There was a problem with the SQLite datastore: {0}")]
	Sqlite(#[from] rusqlite::Error),

	/// The requested table does not exist
	#[error("The table '{name}' does not exist")]
	TbNotFound {
		name: String,
	},

	/// The table has no single column primary key to follow relations with
	#[error("The table '{name}' does not have a single column primary key")]
	NoPrimaryKey {
		name: String,
	},

	/// A named placeholder was bound to something other than an identifier
	#[error("The placeholder at position {position} expects an identifier")]
	InvalidPlaceholder {
		position: usize,
	},

	/// The number of placeholders and bound parameters differ
	#[error("Expected {expected} bound parameters, but found {found}")]
	ParamCount {
		expected: usize,
		found: usize,
	},
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
