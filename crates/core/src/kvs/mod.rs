//! The module defining the relational layer.
//!
//! The schema and the resolvers never talk to a database directly. They go
//! through the [`Datastore`] trait, which introspects the structure of the
//! database and hands out [`Selection`]s, lazily built queries over a single
//! table which the condition compiler narrows down before they are executed.
//!
//! These operations can be processed by the following storage engines:
//! - `sqlite`: [SQLite](https://sqlite.org) through `rusqlite`, either on disk
//!   or in memory

mod record;
mod structure;

#[cfg(feature = "kv-sqlite")]
mod sqlite;

pub use record::{Record, Row};
pub use structure::{Column, Structure, Table};

#[cfg(feature = "kv-sqlite")]
pub use sqlite::{Sqlite, SqliteSelection};

use crate::err::Result;
use crate::val::Value;

/// A parameter bound to a placeholder inside a selection expression.
///
/// A `?` placeholder accepts a [`Param::Value`], which is bound as a single
/// value, or a [`Param::List`], which expands into a comma separated list of
/// bound values (or `NULL` when the list is empty). A `?name` placeholder
/// accepts a [`Param::Ident`] only, which is emitted as a quoted identifier.
#[derive(Clone, Debug, PartialEq)]
pub enum Param {
	Value(Value),
	List(Vec<Value>),
	Ident(String),
}

impl Param {
	pub fn ident(name: impl Into<String>) -> Self {
		Param::Ident(name.into())
	}

	pub fn value(v: impl Into<Value>) -> Self {
		Param::Value(v.into())
	}
}

/// A database which the GraphQL schema is generated from and resolved against.
pub trait Datastore: Send + Sync + 'static {
	/// Introspects the tables, columns and foreign keys of the database.
	fn structure(&self) -> Result<Structure>;

	/// A counter which changes whenever the structure of the database does.
	fn schema_version(&self) -> Result<i64>;

	/// Starts a new selection over all rows of a table.
	fn table(&self, name: &str) -> Box<dyn Selection>;

	/// Starts a new selection over the rows of `table` whose `column`
	/// references the primary key of `row`.
	fn related(&self, row: &Row, table: &str, column: &str) -> Result<Box<dyn Selection>>;

	/// Starts a new selection over the row of `table` whose primary key is
	/// the value of `column` in `row`, or `None` when that value is NULL.
	fn referenced(&self, row: &Row, table: &str, column: &str)
	-> Result<Option<Box<dyn Selection>>>;
}

/// A query over a single table, built up by the condition compiler.
///
/// Expressions are fragments of SQL which may contain placeholders, see
/// [`Param`] for the bindings they accept.
pub trait Selection: Send {
	/// Restricts the number of rows returned, both parts are optional.
	fn limit(&mut self, limit: Option<i64>, offset: Option<i64>);

	/// Appends an ordering expression.
	fn order(&mut self, expr: &str, params: Vec<Param>);

	/// Appends a random ordering.
	fn order_random(&mut self);

	/// Appends a filter, combined with previous filters using `AND`.
	fn filter(&mut self, expr: &str, params: Vec<Param>);

	/// Appends an aggregate filter, combined with previous ones using `AND`.
	fn having(&mut self, expr: &str, params: Vec<Param>);

	/// Sets the grouping expression.
	fn group(&mut self, expr: &str, params: Vec<Param>);

	/// Executes the selection, returning all matching rows.
	fn fetch_all(&mut self) -> Result<Vec<Row>>;

	/// Executes the selection as a `COUNT(expr)` aggregate.
	fn count(&mut self, expr: &str) -> Result<i64>;

	/// Returns the statement most recently executed by this selection.
	fn sql(&self) -> String;
}
