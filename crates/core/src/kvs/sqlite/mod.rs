#![cfg(feature = "kv-sqlite")]

mod selection;
mod value;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use indexmap::IndexMap;
use parking_lot::Mutex;
use rusqlite::Connection;
use rusqlite::config::DbConfig;

pub use self::selection::SqliteSelection;
use crate::cnf::SQLITE_BUSY_TIMEOUT;
use crate::err::{Error, Result};
use crate::kvs::{Column, Datastore, Param, Row, Selection, Structure, Table};
use crate::val::Value;

/// A SQLite database, accessed through a single shared connection.
#[derive(Clone)]
pub struct Sqlite {
	conn: Arc<Mutex<Connection>>,
}

impl Sqlite {
	/// Open a database file, creating it when it does not exist
	pub fn open(path: impl AsRef<Path>) -> Result<Self> {
		let path = path.as_ref();
		debug!("Opening SQLite database at {}", path.display());
		Self::setup(Connection::open(path)?)
	}

	/// Open a new, empty in-memory database
	pub fn in_memory() -> Result<Self> {
		debug!("Opening in-memory SQLite database");
		Self::setup(Connection::open_in_memory()?)
	}

	fn setup(conn: Connection) -> Result<Self> {
		conn.busy_timeout(Duration::from_millis(*SQLITE_BUSY_TIMEOUT))?;
		conn.pragma_update(None, "foreign_keys", true)?;
		// Unknown double quoted identifiers are errors, not string literals
		conn.set_db_config(DbConfig::SQLITE_DBCONFIG_DQS_DML, false)?;
		Ok(Sqlite {
			conn: Arc::new(Mutex::new(conn)),
		})
	}

	/// Executes one or more statements which do not return rows
	pub fn execute_batch(&self, sql: &str) -> Result<()> {
		Ok(self.conn.lock().execute_batch(sql)?)
	}

	fn selection(&self, table: &str) -> SqliteSelection {
		SqliteSelection::new(self.conn.clone(), table)
	}

	/// Looks up the single column primary key of a table
	fn primary_key(&self, table: &str) -> Result<String> {
		let conn = self.conn.lock();
		let mut stmt =
			conn.prepare("SELECT name FROM pragma_table_info(?1) WHERE pk > 0 ORDER BY pk")?;
		let keys = stmt
			.query_map([table], |row| row.get::<_, String>(0))?
			.collect::<Result<Vec<_>, _>>()?;
		match keys.as_slice() {
			[key] => Ok(key.clone()),
			[] if !table_exists(&conn, table)? => Err(Error::TbNotFound {
				name: table.to_owned(),
			}),
			_ => Err(Error::NoPrimaryKey {
				name: table.to_owned(),
			}),
		}
	}
}

impl Datastore for Sqlite {
	fn structure(&self) -> Result<Structure> {
		let conn = self.conn.lock();
		let mut stmt = conn.prepare(
			"SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
		)?;
		let names = stmt
			.query_map([], |row| row.get::<_, String>(0))?
			.collect::<Result<Vec<_>, _>>()?;
		let mut tables = Vec::with_capacity(names.len());
		for name in names {
			trace!("Introspecting table: {name}");
			let mut table = Table::new(&name);
			table.columns = columns(&conn, &name)?;
			table.belongs_to = foreign_keys(&conn, &name)?;
			tables.push(table);
		}
		Ok(Structure::from_tables(tables))
	}

	fn schema_version(&self) -> Result<i64> {
		Ok(self.conn.lock().query_row("PRAGMA schema_version", [], |row| row.get(0))?)
	}

	fn table(&self, name: &str) -> Box<dyn Selection> {
		Box::new(self.selection(name))
	}

	fn related(&self, row: &Row, table: &str, column: &str) -> Result<Box<dyn Selection>> {
		let key = self.primary_key(&row.table)?;
		let id = row.get(&key).cloned().unwrap_or_default();
		let mut sel = self.selection(table);
		sel.filter("?name = ?", vec![Param::ident(column), Param::Value(id)]);
		Ok(Box::new(sel))
	}

	fn referenced(
		&self,
		row: &Row,
		table: &str,
		column: &str,
	) -> Result<Option<Box<dyn Selection>>> {
		let id = match row.get(column) {
			None | Some(Value::Null) => return Ok(None),
			Some(id) => id.clone(),
		};
		let key = self.primary_key(table)?;
		let mut sel = self.selection(table);
		sel.filter("?name = ?", vec![Param::ident(key), Param::Value(id)]);
		Ok(Some(Box::new(sel)))
	}
}

fn table_exists(conn: &Connection, table: &str) -> Result<bool> {
	let mut stmt = conn.prepare("SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1")?;
	Ok(stmt.query_row([table], |row| row.get::<_, i64>(0))? > 0)
}

fn columns(conn: &Connection, table: &str) -> Result<Vec<Column>> {
	let mut stmt = conn.prepare(
		"SELECT name, type, \"notnull\", pk FROM pragma_table_info(?1) ORDER BY cid",
	)?;
	let rows = stmt.query_map([table], |row| {
		Ok((
			row.get::<_, String>(0)?,
			row.get::<_, Option<String>>(1)?,
			row.get::<_, i64>(2)?,
			row.get::<_, i64>(3)?,
		))
	})?;
	let mut out = Vec::new();
	for row in rows {
		let (name, native_type, notnull, pk) = row?;
		out.push(Column {
			name,
			nullable: notnull == 0 && pk == 0,
			primary: pk > 0,
			native_type: native_type.as_deref().map(base_type).unwrap_or_default(),
			comment: None,
		});
	}
	Ok(out)
}

/// Loads the single column foreign keys of a table. Foreign keys spanning
/// several columns cannot be followed from a single field and are skipped.
fn foreign_keys(conn: &Connection, table: &str) -> Result<IndexMap<String, String>> {
	let mut stmt = conn.prepare(
		"SELECT id, \"from\", \"table\" FROM pragma_foreign_key_list(?1) ORDER BY id, seq",
	)?;
	let rows = stmt.query_map([table], |row| {
		Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?, row.get::<_, String>(2)?))
	})?;
	let mut keys: IndexMap<i64, Vec<(String, String)>> = IndexMap::new();
	for row in rows {
		let (id, from, target) = row?;
		keys.entry(id).or_default().push((from, target));
	}
	// SQLite lists foreign keys in reverse declaration order
	keys.reverse();
	let mut out = IndexMap::new();
	for (_, mut parts) in keys {
		match parts.pop() {
			Some((from, target)) if parts.is_empty() => {
				out.entry(from).or_insert(target);
			}
			_ => trace!("Skipping composite foreign key on table: {table}"),
		}
	}
	Ok(out)
}

/// Normalises a declared column type, `decimal(10, 2)` becomes `DECIMAL`
fn base_type(declared: &str) -> String {
	let base = declared.split('(').next().unwrap_or_default();
	base.trim().to_uppercase()
}
