use std::collections::HashMap;
use std::fmt::{self, Debug};
use std::sync::Arc;

use super::args::QueryArgs;
use super::compile::Compiler;
use super::error::{GqlError, execution_error, internal_error, resolver_error};
use super::tables::FieldSettings;
use crate::kvs::{Datastore, Param, Record, Selection};
use crate::obs::QueryLog;

/// The resolvers which can be bound to a generated field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ResolverKind {
	/// All rows of a table
	Table,
	/// The number of rows of a table
	TableCount,
	/// The row a foreign key of the parent row references
	BelongsTo,
	/// The rows referencing the parent row
	HasMany,
	/// The number of rows referencing the parent row
	HasManyCount,
	/// The row a polymorphic reference of the parent row points to
	MorphTo,
}

impl ResolverKind {
	/// Whether the resolver reads from a parent row
	pub fn needs_parent(&self) -> bool {
		!matches!(self, ResolverKind::Table | ResolverKind::TableCount)
	}
}

/// The outcome of a resolver.
#[derive(Debug)]
pub enum Resolved {
	Rows(Vec<Record>),
	Row(Option<Record>),
	/// A row together with the object type name of its table
	Tagged(Option<(String, Record)>),
	Count(i64),
}

/// Creates the resolvers of a schema, all sharing one datastore and one
/// condition compiler.
#[derive(Clone)]
pub struct ResolverFactory {
	ds: Arc<dyn Datastore>,
	compiler: Compiler,
	log: Option<QueryLog>,
	/// Table name to object type name, used to tag morph-to rows
	type_names: Arc<HashMap<String, String>>,
}

impl Debug for ResolverFactory {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ResolverFactory")
			.field("compiler", &self.compiler)
			.field("log", &self.log)
			.field("type_names", &self.type_names)
			.finish()
	}
}

impl ResolverFactory {
	pub fn new(ds: Arc<dyn Datastore>, first_party: bool) -> Self {
		ResolverFactory {
			ds,
			compiler: Compiler::new(first_party),
			log: None,
			type_names: Arc::default(),
		}
	}

	/// Records every executed statement in the given log
	pub fn with_query_log(self, log: QueryLog) -> Self {
		ResolverFactory {
			log: Some(log),
			..self
		}
	}

	pub fn with_compiler(self, compiler: Compiler) -> Self {
		ResolverFactory {
			compiler,
			..self
		}
	}

	pub(crate) fn with_type_names<I>(self, names: I) -> Self
	where
		I: IntoIterator<Item = (String, String)>,
	{
		ResolverFactory {
			type_names: Arc::new(names.into_iter().collect()),
			..self
		}
	}

	pub fn compiler(&self) -> &Compiler {
		&self.compiler
	}

	pub fn query_log(&self) -> Option<&QueryLog> {
		self.log.as_ref()
	}

	/// Runs a resolver. A log passed in takes precedence over the log of
	/// the factory, which allows logging per execution.
	pub fn resolve(
		&self,
		kind: ResolverKind,
		parent: Option<&Record>,
		args: &QueryArgs,
		settings: &FieldSettings,
		log: Option<&QueryLog>,
	) -> Result<Resolved, GqlError> {
		let log = log.or(self.log.as_ref());
		match (kind, parent) {
			(ResolverKind::Table, _) => self.table(args, settings, log).map(Resolved::Rows),
			(ResolverKind::TableCount, _) => {
				self.table_count(args, settings, log).map(Resolved::Count)
			}
			(ResolverKind::BelongsTo, Some(parent)) => {
				self.belongs_to(parent, settings, log).map(Resolved::Row)
			}
			(ResolverKind::HasMany, Some(parent)) => {
				self.has_many(parent, args, settings, log).map(Resolved::Rows)
			}
			(ResolverKind::HasManyCount, Some(parent)) => {
				self.has_many_count(parent, args, settings, log).map(Resolved::Count)
			}
			(ResolverKind::MorphTo, Some(parent)) => {
				self.morph_to(parent, settings, log).map(Resolved::Tagged)
			}
			(kind, None) => {
				Err(internal_error(format!("{kind:?} field resolved without a parent row")))
			}
		}
	}

	pub fn table(
		&self,
		args: &QueryArgs,
		settings: &FieldSettings,
		log: Option<&QueryLog>,
	) -> Result<Vec<Record>, GqlError> {
		let table = setting(&settings.table_name, "table_name")?;
		let mut sel = self.ds.table(table);
		self.narrow(sel.as_mut(), args)?;
		let rows = logged!(log, sel, sel.fetch_all()).map_err(execution_error)?;
		Ok(rows.into_iter().map(|row| Record::new(self.ds.clone(), row)).collect())
	}

	pub fn table_count(
		&self,
		args: &QueryArgs,
		settings: &FieldSettings,
		log: Option<&QueryLog>,
	) -> Result<i64, GqlError> {
		let table = setting(&settings.table_name, "table_name")?;
		let mut sel = self.ds.table(table);
		self.compiler.apply_conditions(sel.as_mut(), &args.conditions)?;
		logged!(log, sel, sel.count("*")).map_err(execution_error)
	}

	pub fn belongs_to(
		&self,
		parent: &Record,
		settings: &FieldSettings,
		log: Option<&QueryLog>,
	) -> Result<Option<Record>, GqlError> {
		let table = setting(&settings.table_name, "table_name")?;
		let column = setting(&settings.referencing_column, "referencing_column")?;
		fetch_one(parent, table, column, log)
	}

	pub fn has_many(
		&self,
		parent: &Record,
		args: &QueryArgs,
		settings: &FieldSettings,
		log: Option<&QueryLog>,
	) -> Result<Vec<Record>, GqlError> {
		let mut sel = related(parent, settings)?;
		self.narrow(sel.as_mut(), args)?;
		let rows = logged!(log, sel, sel.fetch_all()).map_err(execution_error)?;
		Ok(rows.into_iter().map(|row| parent.sibling(row)).collect())
	}

	pub fn has_many_count(
		&self,
		parent: &Record,
		args: &QueryArgs,
		settings: &FieldSettings,
		log: Option<&QueryLog>,
	) -> Result<i64, GqlError> {
		let mut sel = related(parent, settings)?;
		self.compiler.apply_conditions(sel.as_mut(), &args.conditions)?;
		logged!(log, sel, sel.count("*")).map_err(execution_error)
	}

	pub fn morph_to(
		&self,
		parent: &Record,
		settings: &FieldSettings,
		log: Option<&QueryLog>,
	) -> Result<Option<(String, Record)>, GqlError> {
		let relation = settings
			.morph_relation_definition
			.as_ref()
			.ok_or_else(|| internal_error("missing field setting: morph_relation_definition"))?;
		let Some(table) = parent.get(&relation.type_column).and_then(|v| v.as_table_name()) else {
			return Ok(None);
		};
		let Some(type_name) = self.type_names.get(&table) else {
			return Err(resolver_error(format!(
				"'{table}' referenced by {}.{} is not a table of the schema",
				relation.table, relation.type_column
			)));
		};
		let row = fetch_one(parent, &table, &relation.id_column, log)?;
		Ok(row.map(|row| (type_name.clone(), row)))
	}

	/// Applies the conditions, the order and the pagination of a list field.
	/// Conditions are compiled first, so that nothing is applied when they fail.
	fn narrow(&self, sel: &mut dyn Selection, args: &QueryArgs) -> Result<(), GqlError> {
		self.compiler.apply_conditions(sel, &args.conditions)?;
		self.compiler.apply_order(sel, &args.order);
		self.compiler.apply_pagination(sel, args.pagination.as_ref());
		Ok(())
	}
}

fn setting<'a>(value: &'a Option<String>, name: &str) -> Result<&'a str, GqlError> {
	value.as_deref().ok_or_else(|| internal_error(format!("missing field setting: {name}")))
}

/// Starts the selection of the rows referencing a parent row, restricted
/// to the parent table when the relation is polymorphic
fn related(parent: &Record, settings: &FieldSettings) -> Result<Box<dyn Selection>, GqlError> {
	let table = setting(&settings.table_name, "table_name")?;
	let column = setting(&settings.referencing_column, "referencing_column")?;
	let mut sel = parent.related(table, column).map_err(execution_error)?;
	if let Some(type_column) = &settings.referencing_type_column {
		sel.filter("?name = ?", vec![Param::ident(type_column.as_str()), Param::value(parent.table())]);
	}
	Ok(sel)
}

/// Fetches the row of `table` referenced by `column` of a parent row
fn fetch_one(
	parent: &Record,
	table: &str,
	column: &str,
	log: Option<&QueryLog>,
) -> Result<Option<Record>, GqlError> {
	let Some(mut sel) = parent.referenced(table, column).map_err(execution_error)? else {
		return Ok(None);
	};
	sel.limit(Some(1), None);
	let rows = logged!(log, sel, sel.fetch_all()).map_err(execution_error)?;
	Ok(rows.into_iter().next().map(|row| parent.sibling(row)))
}
