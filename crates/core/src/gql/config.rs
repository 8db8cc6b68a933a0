use std::collections::BTreeMap;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::error::{GqlError, schema_error};
use super::ext::NamedContainer;
use crate::cnf::DEFAULT_BELONGS_TO_STRIP_PATTERN;

/// A polymorphic relation, where the table a row references is stored in a
/// discriminator column of that row next to the referenced id.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MorphRelation {
	/// The table owning the id and type columns
	pub table: String,
	/// The column holding the id of the referenced row
	pub id_column: String,
	/// The column holding the name of the referenced table
	pub type_column: String,
	/// The name of the generated morph-to field
	pub relation_name: String,
	/// The tables which receive the inverse has-many fields, every visible
	/// table when empty
	#[serde(default)]
	pub targets: Vec<String>,
}

impl MorphRelation {
	pub fn new(
		table: impl Into<String>,
		id_column: impl Into<String>,
		type_column: impl Into<String>,
		relation_name: impl Into<String>,
	) -> Self {
		MorphRelation {
			table: table.into(),
			id_column: id_column.into(),
			type_column: type_column.into(),
			relation_name: relation_name.into(),
			targets: Vec::new(),
		}
	}

	pub fn with_targets<I, S>(mut self, targets: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.targets = targets.into_iter().map(Into::into).collect();
		self
	}
}

/// The options controlling which parts of the database structure are
/// exposed by the generated schema, and how relation fields are named.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SchemaConfig {
	/// Tables which are never exposed
	pub except_tables: Vec<String>,
	/// When not empty, the only tables which are exposed
	pub only_tables: Vec<String>,
	/// Per table, columns which are never exposed
	pub except_columns: BTreeMap<String, Vec<String>>,
	/// Per table, when not empty, the only columns which are exposed
	pub only_columns: BTreeMap<String, Vec<String>>,
	pub morph_relations: Vec<MorphRelation>,
	/// Always name has-many fields `<table>__<column>`, even when the
	/// referencing table references the parent through a single column
	pub forced_has_many_long_name: bool,
	/// The pattern removed from a foreign key column to name its belongs-to field
	pub belongs_to_strip_pattern: String,
}

impl Default for SchemaConfig {
	fn default() -> Self {
		SchemaConfig {
			except_tables: Vec::new(),
			only_tables: Vec::new(),
			except_columns: BTreeMap::new(),
			only_columns: BTreeMap::new(),
			morph_relations: Vec::new(),
			forced_has_many_long_name: true,
			belongs_to_strip_pattern: DEFAULT_BELONGS_TO_STRIP_PATTERN.to_owned(),
		}
	}
}

fn strings<I, S>(items: I) -> Vec<String>
where
	I: IntoIterator<Item = S>,
	S: Into<String>,
{
	items.into_iter().map(Into::into).collect()
}

impl SchemaConfig {
	pub fn with_except_tables<I, S>(self, tables: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		SchemaConfig {
			except_tables: strings(tables),
			..self
		}
	}

	pub fn with_only_tables<I, S>(self, tables: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		SchemaConfig {
			only_tables: strings(tables),
			..self
		}
	}

	pub fn with_except_columns<I, S>(mut self, table: impl Into<String>, columns: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.except_columns.insert(table.into(), strings(columns));
		self
	}

	pub fn with_only_columns<I, S>(mut self, table: impl Into<String>, columns: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.only_columns.insert(table.into(), strings(columns));
		self
	}

	pub fn with_morph_relation(mut self, relation: MorphRelation) -> Self {
		self.morph_relations.push(relation);
		self
	}

	pub fn with_forced_has_many_long_name(self, forced: bool) -> Self {
		SchemaConfig {
			forced_has_many_long_name: forced,
			..self
		}
	}

	pub fn with_belongs_to_strip_pattern(self, pattern: impl Into<String>) -> Self {
		SchemaConfig {
			belongs_to_strip_pattern: pattern.into(),
			..self
		}
	}

	/// Compiles the belongs-to strip pattern
	pub fn belongs_to_strip_regex(&self) -> Result<Regex, GqlError> {
		Regex::new(&self.belongs_to_strip_pattern).map_err(|e| {
			schema_error(format!(
				"invalid belongs-to strip pattern '{}': {e}",
				self.belongs_to_strip_pattern
			))
		})
	}

	/// Whether a table is exposed. Exclusions are applied first, then the
	/// inclusion list, an empty list never filters anything out.
	pub fn is_table_visible(&self, table: &str) -> bool {
		visible(&self.except_tables, &self.only_tables, table)
	}

	/// Whether a column of a table is exposed, following the same rules as tables
	pub fn is_column_visible(&self, table: &str, column: &str) -> bool {
		let except = self.except_columns.get(table).map(Vec::as_slice).unwrap_or_default();
		let only = self.only_columns.get(table).map(Vec::as_slice).unwrap_or_default();
		visible(except, only, column)
	}
}

fn visible(except: &[String], only: &[String], name: &str) -> bool {
	if except.contains_name(name) {
		return false;
	}
	only.is_empty() || only.contains_name(name)
}
