use std::fmt::{self, Debug};
use std::sync::Arc;

use indexmap::IndexMap;

use super::{Datastore, Selection};
use crate::err::Result;
use crate::val::Value;

/// A single row of a table, with its columns in selection order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Row {
	pub table: String,
	pub values: IndexMap<String, Value>,
}

impl Row {
	pub fn new(table: impl Into<String>) -> Self {
		Row {
			table: table.into(),
			values: IndexMap::new(),
		}
	}

	pub fn with(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
		self.values.insert(column.into(), value.into());
		self
	}

	pub fn get(&self, column: &str) -> Option<&Value> {
		self.values.get(column)
	}
}

/// A row together with the datastore it was read from, which allows
/// relations to be followed from it.
#[derive(Clone)]
pub struct Record {
	ds: Arc<dyn Datastore>,
	row: Row,
}

impl Debug for Record {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Record").field("row", &self.row).finish()
	}
}

impl Record {
	pub fn new(ds: Arc<dyn Datastore>, row: Row) -> Self {
		Record {
			ds,
			row,
		}
	}

	/// Wraps another row read from the same datastore
	pub fn sibling(&self, row: Row) -> Self {
		Record {
			ds: self.ds.clone(),
			row,
		}
	}

	pub fn row(&self) -> &Row {
		&self.row
	}

	pub fn table(&self) -> &str {
		&self.row.table
	}

	pub fn get(&self, column: &str) -> Option<&Value> {
		self.row.get(column)
	}

	/// Selects the rows of `table` whose `column` references this record.
	pub fn related(&self, table: &str, column: &str) -> Result<Box<dyn Selection>> {
		self.ds.related(&self.row, table, column)
	}

	/// Selects the row of `table` which the `column` of this record references.
	pub fn referenced(&self, table: &str, column: &str) -> Result<Option<Box<dyn Selection>>> {
		self.ds.referenced(&self.row, table, column)
	}
}
