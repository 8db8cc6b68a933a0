use std::sync::Arc;

use parking_lot::Mutex;
use rusqlite::{Connection, params_from_iter};

use crate::err::{Error, Result};
use crate::kvs::{Param, Row, Selection};
use crate::val::Value;

#[derive(Debug)]
struct Fragment {
	expr: String,
	params: Vec<Param>,
}

/// A lazily executed `SELECT` statement over a single SQLite table.
pub struct SqliteSelection {
	conn: Arc<Mutex<Connection>>,
	table: String,
	filters: Vec<Fragment>,
	group: Option<Fragment>,
	havings: Vec<Fragment>,
	orders: Vec<Fragment>,
	limit: Option<i64>,
	offset: Option<i64>,
	last: Option<String>,
}

impl SqliteSelection {
	pub(super) fn new(conn: Arc<Mutex<Connection>>, table: &str) -> Self {
		SqliteSelection {
			conn,
			table: table.to_owned(),
			filters: Vec::new(),
			group: None,
			havings: Vec::new(),
			orders: Vec::new(),
			limit: None,
			offset: None,
			last: None,
		}
	}

	/// Renders the statement, expanding all placeholders into the returned
	/// SQL text and collecting the values to bind to it. The unexpanded text
	/// is kept as the last statement when rendering fails.
	fn render(&mut self, head: &str, wrap_grouped: bool) -> Result<(String, Vec<Value>)> {
		let mut out = Statement::default();
		let grouped = self.group.is_some() || !self.havings.is_empty();
		if wrap_grouped && grouped {
			out.push_text("SELECT COUNT(*) FROM (SELECT * FROM ");
		} else {
			out.push_text(&format!("SELECT {head} FROM "));
		}
		out.push_text(&quote_ident(&self.table));
		let res = self.render_clauses(&mut out, !wrap_grouped);
		if wrap_grouped && grouped {
			out.push_text(")");
		}
		match res {
			Ok(()) => {
				self.last = Some(out.sql.clone());
				Ok((out.sql, out.binds))
			}
			Err(e) => {
				self.last = Some(out.template);
				Err(e)
			}
		}
	}

	fn render_clauses(&self, out: &mut Statement, ordered: bool) -> Result<()> {
		if !self.filters.is_empty() {
			out.push_text(" WHERE ");
			out.push_joined(&self.filters, " AND ", true)?;
		}
		if let Some(group) = &self.group {
			out.push_text(" GROUP BY ");
			out.push_fragment(group)?;
		}
		if !self.havings.is_empty() {
			out.push_text(" HAVING ");
			out.push_joined(&self.havings, " AND ", true)?;
		}
		if ordered {
			if !self.orders.is_empty() {
				out.push_text(" ORDER BY ");
				out.push_joined(&self.orders, ", ", false)?;
			}
			match (self.limit, self.offset) {
				(Some(limit), Some(offset)) => {
					out.push_text(&format!(" LIMIT {limit} OFFSET {offset}"));
				}
				(Some(limit), None) => out.push_text(&format!(" LIMIT {limit}")),
				(None, Some(offset)) => out.push_text(&format!(" LIMIT -1 OFFSET {offset}")),
				(None, None) => {}
			}
		}
		Ok(())
	}
}

impl Selection for SqliteSelection {
	fn limit(&mut self, limit: Option<i64>, offset: Option<i64>) {
		self.limit = limit;
		self.offset = offset;
	}

	fn order(&mut self, expr: &str, params: Vec<Param>) {
		self.orders.push(Fragment {
			expr: expr.to_owned(),
			params,
		});
	}

	fn order_random(&mut self) {
		self.order("RANDOM()", Vec::new());
	}

	fn filter(&mut self, expr: &str, params: Vec<Param>) {
		self.filters.push(Fragment {
			expr: expr.to_owned(),
			params,
		});
	}

	fn having(&mut self, expr: &str, params: Vec<Param>) {
		self.havings.push(Fragment {
			expr: expr.to_owned(),
			params,
		});
	}

	fn group(&mut self, expr: &str, params: Vec<Param>) {
		self.group = Some(Fragment {
			expr: expr.to_owned(),
			params,
		});
	}

	fn fetch_all(&mut self) -> Result<Vec<Row>> {
		let (sql, binds) = self.render("*", false)?;
		trace!("Fetching rows: {sql}");
		let conn = self.conn.lock();
		let mut stmt = conn.prepare(&sql)?;
		let names: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
		let mut rows = stmt.query(params_from_iter(binds.iter()))?;
		let mut out = Vec::new();
		while let Some(row) = rows.next()? {
			let mut res = Row::new(&self.table);
			for (idx, name) in names.iter().enumerate() {
				res.values.insert(name.clone(), Value::from(row.get_ref(idx)?));
			}
			out.push(res);
		}
		Ok(out)
	}

	fn count(&mut self, expr: &str) -> Result<i64> {
		let (sql, binds) = self.render(&format!("COUNT({expr})"), true)?;
		trace!("Counting rows: {sql}");
		let conn = self.conn.lock();
		let mut stmt = conn.prepare(&sql)?;
		Ok(stmt.query_row(params_from_iter(binds.iter()), |row| row.get::<_, i64>(0))?)
	}

	fn sql(&self) -> String {
		self.last.clone().unwrap_or_default()
	}
}

/// A statement under construction, holding both the expanded SQL text with
/// its bound values and the original template text.
#[derive(Default)]
struct Statement {
	sql: String,
	template: String,
	binds: Vec<Value>,
}

impl Statement {
	fn push_text(&mut self, text: &str) {
		self.sql.push_str(text);
		self.template.push_str(text);
	}

	fn push_joined(&mut self, fragments: &[Fragment], sep: &str, parens: bool) -> Result<()> {
		for (idx, fragment) in fragments.iter().enumerate() {
			if idx > 0 {
				self.push_text(sep);
			}
			if parens && fragments.len() > 1 {
				self.push_text("(");
				self.push_fragment(fragment)?;
				self.push_text(")");
			} else {
				self.push_fragment(fragment)?;
			}
		}
		Ok(())
	}

	fn push_fragment(&mut self, fragment: &Fragment) -> Result<()> {
		self.template.push_str(&fragment.expr);
		expand(&fragment.expr, &fragment.params, &mut self.sql, &mut self.binds)
	}
}

enum Token<'a> {
	Text(&'a str),
	/// A `?` placeholder
	Value,
	/// A `?name` placeholder
	Ident,
}

/// Splits an expression into text and placeholders, ignoring question
/// marks inside single quoted string literals.
fn tokenize(expr: &str) -> Vec<Token<'_>> {
	let bytes = expr.as_bytes();
	let mut tokens = Vec::new();
	let mut quoted = false;
	let mut start = 0;
	let mut idx = 0;
	while idx < bytes.len() {
		match bytes[idx] {
			b'\'' => quoted = !quoted,
			b'?' if !quoted => {
				if start < idx {
					tokens.push(Token::Text(&expr[start..idx]));
				}
				let named = expr[idx + 1..].starts_with("name")
					&& !bytes.get(idx + 5).is_some_and(|b| b.is_ascii_alphanumeric() || *b == b'_');
				if named {
					tokens.push(Token::Ident);
					idx += 5;
				} else {
					tokens.push(Token::Value);
					idx += 1;
				}
				start = idx;
				continue;
			}
			_ => {}
		}
		idx += 1;
	}
	if start < bytes.len() {
		tokens.push(Token::Text(&expr[start..]));
	}
	tokens
}

/// Expands the placeholders of an expression into `sql`, pushing the
/// values bound by them onto `binds`.
pub(super) fn expand(
	expr: &str,
	params: &[Param],
	sql: &mut String,
	binds: &mut Vec<Value>,
) -> Result<()> {
	let tokens = tokenize(expr);
	let expected = tokens.iter().filter(|t| !matches!(t, Token::Text(_))).count();
	if expected != params.len() {
		return Err(Error::ParamCount {
			expected,
			found: params.len(),
		});
	}
	let mut params = params.iter();
	for (position, token) in tokens.into_iter().enumerate() {
		match token {
			Token::Text(text) => sql.push_str(text),
			Token::Ident => match params.next() {
				Some(Param::Ident(name)) => sql.push_str(&quote_ident(name)),
				_ => {
					return Err(Error::InvalidPlaceholder {
						position,
					});
				}
			},
			Token::Value => match params.next() {
				Some(Param::Value(v)) => {
					sql.push('?');
					binds.push(v.clone());
				}
				Some(Param::List(vs)) if vs.is_empty() => sql.push_str("NULL"),
				Some(Param::List(vs)) => {
					let marks = vec!["?"; vs.len()];
					sql.push_str(&marks.join(", "));
					binds.extend(vs.iter().cloned());
				}
				Some(Param::Ident(name)) => sql.push_str(&quote_ident(name)),
				None => {
					return Err(Error::InvalidPlaceholder {
						position,
					});
				}
			},
		}
	}
	Ok(())
}

/// Quotes an identifier, quoting every segment of a dotted name separately.
pub(super) fn quote_ident(name: &str) -> String {
	name.split('.').map(|part| format!("\"{}\"", part.replace('"', "\"\""))).collect::<Vec<_>>().join(".")
}
