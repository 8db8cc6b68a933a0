use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// The introspected structure of a database.
///
/// The structure is loaded once, before the schema is generated, and is
/// never modified afterwards. Tables are kept in enumeration order, which
/// determines the order of the generated types and root fields.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Structure {
	pub tables: Vec<Table>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Table {
	pub name: String,
	pub columns: Vec<Column>,
	/// Local column name to referenced table name
	#[serde(default)]
	pub belongs_to: IndexMap<String, String>,
	/// Referencing table name to the referencing columns on that table
	#[serde(default)]
	pub has_many: IndexMap<String, Vec<String>>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Column {
	pub name: String,
	pub nullable: bool,
	pub primary: bool,
	pub native_type: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub comment: Option<String>,
}

impl Structure {
	/// Builds a structure from tables carrying belongs-to edges only,
	/// deriving the inverse has-many edges of every table.
	pub fn from_tables(mut tables: Vec<Table>) -> Self {
		let edges: Vec<(String, String, String)> = tables
			.iter()
			.flat_map(|t| {
				t.belongs_to.iter().map(|(col, target)| (target.clone(), t.name.clone(), col.clone()))
			})
			.collect();
		for table in tables.iter_mut() {
			table.has_many.clear();
		}
		for (target, table, column) in edges {
			if let Some(target) = tables.iter_mut().find(|t| t.name == target) {
				target.has_many.entry(table).or_default().push(column);
			}
		}
		Structure {
			tables,
		}
	}

	/// Looks up a table by name
	pub fn table(&self, name: &str) -> Option<&Table> {
		self.tables.iter().find(|t| t.name == name)
	}
}

impl Table {
	pub fn new(name: impl Into<String>) -> Self {
		Table {
			name: name.into(),
			columns: Vec::new(),
			belongs_to: IndexMap::new(),
			has_many: IndexMap::new(),
		}
	}

	pub fn with_column(mut self, column: Column) -> Self {
		self.columns.push(column);
		self
	}

	pub fn with_belongs_to(mut self, column: impl Into<String>, table: impl Into<String>) -> Self {
		self.belongs_to.insert(column.into(), table.into());
		self
	}

	/// Looks up a column by name
	pub fn column(&self, name: &str) -> Option<&Column> {
		self.columns.iter().find(|c| c.name == name)
	}

	/// Returns the primary key column, if the table has exactly one
	pub fn primary_key(&self) -> Option<&Column> {
		let mut keys = self.columns.iter().filter(|c| c.primary);
		match (keys.next(), keys.next()) {
			(Some(key), None) => Some(key),
			_ => None,
		}
	}
}

impl Column {
	pub fn new(name: impl Into<String>, native_type: impl Into<String>) -> Self {
		Column {
			name: name.into(),
			nullable: false,
			primary: false,
			native_type: native_type.into(),
			comment: None,
		}
	}

	pub fn nullable(mut self) -> Self {
		self.nullable = true;
		self
	}

	pub fn primary(mut self) -> Self {
		self.primary = true;
		self.nullable = false;
		self
	}

	pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
		self.comment = Some(comment.into());
		self
	}
}
