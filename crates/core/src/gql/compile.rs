//! Compiles field arguments into calls against a [`Selection`].
//!
//! Condition trees are compiled into a single SQL expression per clause.
//! In first-party mode column names and literal values are emitted into the
//! expression as given, otherwise every column is bound as a quoted
//! identifier and literal values are rejected.

use super::args::{Comparator, Condition, Conditions, Direction, Group, OrderBy, Pagination};
use super::error::{GqlError, compile_error};
use crate::cnf::{LITERAL_PREFIX, MAX_CONDITION_DEPTH};
use crate::kvs::{Param, Selection};
use crate::val::Value;

/// The clause a condition tree is compiled for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Clause {
	Where,
	Having,
}

impl Clause {
	/// The nested and-list and or-list of a condition for this clause
	fn nested<'a>(&self, condition: &'a Condition) -> (&'a [Condition], &'a [Condition]) {
		match self {
			Clause::Where => (condition.where_and.as_slice(), condition.where_or.as_slice()),
			Clause::Having => (condition.having_and.as_slice(), condition.having_or.as_slice()),
		}
	}
}

/// A compiled SQL expression with the parameters bound to its placeholders.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Fragment {
	pub expr: String,
	pub params: Vec<Param>,
}

impl Fragment {
	fn join(parts: Vec<Fragment>, sep: &str, parens: bool) -> Option<Fragment> {
		if parts.is_empty() {
			return None;
		}
		let mut exprs = Vec::with_capacity(parts.len());
		let mut params = Vec::new();
		for part in parts {
			if parens {
				exprs.push(format!("({})", part.expr));
			} else {
				exprs.push(part.expr);
			}
			params.extend(part.params);
		}
		Some(Fragment {
			expr: exprs.join(sep),
			params,
		})
	}
}

#[derive(Clone, Copy, Debug)]
pub struct Compiler {
	first_party: bool,
	max_depth: usize,
}

impl Compiler {
	pub fn new(first_party: bool) -> Self {
		Compiler {
			first_party,
			max_depth: *MAX_CONDITION_DEPTH,
		}
	}

	pub fn with_max_depth(self, max_depth: usize) -> Self {
		Compiler {
			max_depth,
			..self
		}
	}

	pub fn first_party(&self) -> bool {
		self.first_party
	}

	pub fn apply_pagination(&self, sel: &mut dyn Selection, pagination: Option<&Pagination>) {
		if let Some(pagination) = pagination {
			sel.limit(pagination.limit, pagination.offset);
		}
	}

	pub fn apply_order(&self, sel: &mut dyn Selection, order: &[OrderBy]) {
		for item in order {
			let direction = item.order.unwrap_or_default();
			if direction == Direction::Random {
				sel.order_random();
				continue;
			}
			let Some(key) = &item.key else {
				continue;
			};
			let (column, params) = self.column(key);
			sel.order(&format!("{column} {}", direction.keyword()), params);
		}
	}

	/// Compiles the where, having and group conditions and applies them to
	/// the selection. Nothing is applied when any part fails to compile.
	pub fn apply_conditions(
		&self,
		sel: &mut dyn Selection,
		conditions: &Conditions,
	) -> Result<(), GqlError> {
		let filter = self.compile_clause(Clause::Where, &conditions.where_and, &conditions.where_or)?;
		let having =
			self.compile_clause(Clause::Having, &conditions.having_and, &conditions.having_or)?;
		let group = self.compile_group(&conditions.group_conditions);
		if let Some(filter) = filter {
			trace!("Applying filter: {}", filter.expr);
			sel.filter(&filter.expr, filter.params);
		}
		if let Some(group) = group {
			sel.group(&group.expr, group.params);
		}
		if let Some(having) = having {
			trace!("Applying having: {}", having.expr);
			sel.having(&having.expr, having.params);
		}
		Ok(())
	}

	/// Compiles the and-list and or-list of a clause, combined with `AND`
	pub fn compile_clause(
		&self,
		clause: Clause,
		and: &[Condition],
		or: &[Condition],
	) -> Result<Option<Fragment>, GqlError> {
		let parts: Vec<Fragment> =
			[self.compile_list(clause, and, "AND", 0)?, self.compile_list(clause, or, "OR", 0)?]
				.into_iter()
				.flatten()
				.collect();
		let parens = parts.len() > 1;
		Ok(Fragment::join(parts, " AND ", parens))
	}

	/// Compiles a list of sibling conditions joined by `connective`
	pub fn compile_list(
		&self,
		clause: Clause,
		conditions: &[Condition],
		connective: &str,
		depth: usize,
	) -> Result<Option<Fragment>, GqlError> {
		if depth > self.max_depth {
			return Err(compile_error(format!(
				"Conditions may not be nested deeper than {} levels.",
				self.max_depth
			)));
		}
		let mut parts = Vec::new();
		for condition in conditions {
			let (and, or) = clause.nested(condition);
			if !and.is_empty() || !or.is_empty() {
				let nested: Vec<Fragment> = [
					self.compile_list(clause, and, "AND", depth + 1)?,
					self.compile_list(clause, or, "OR", depth + 1)?,
				]
				.into_iter()
				.flatten()
				.collect();
				if let Some(fragment) = Fragment::join(nested, " AND ", true) {
					parts.push(fragment);
				}
			} else if let Some(column) = &condition.column {
				if let Some(fragment) = self.compile_leaf(column, condition)? {
					parts.push(fragment);
				}
			}
		}
		Ok(Fragment::join(parts, &format!(" {connective} "), false))
	}

	fn compile_leaf(&self, column: &str, condition: &Condition) -> Result<Option<Fragment>, GqlError> {
		let comparator = match condition.comparator.as_deref() {
			Some(name) => name.parse::<Comparator>()?,
			None => Comparator::Equal,
		};
		let (column, mut params) = self.column(column);
		let expr = match comparator {
			Comparator::In => {
				let values = condition.value.iter().map(|v| input(v.as_deref())).collect();
				params.push(Param::List(values));
				format!("{column} IN (?)")
			}
			Comparator::NotIn => {
				let values: Vec<Value> = condition
					.value
					.iter()
					.flatten()
					.filter(|v| !v.is_empty() && v.as_str() != "0")
					.map(|v| Value::parse_input(v))
					.collect();
				if values.is_empty() {
					return Ok(None);
				}
				params.push(Param::List(values));
				format!("{column} NOT IN (?)")
			}
			Comparator::Null => format!("{column} IS NULL"),
			Comparator::NotNull => format!("{column} IS NOT NULL"),
			scalar => {
				let Some(operator) = scalar.operator() else {
					return Err(compile_error(format!("'{scalar}' is not a valid comparator.")));
				};
				// Only the first value is compared, a null first value binds NULL
				let value = condition.value.first().and_then(Option::as_deref);
				match value.and_then(|v| v.strip_prefix(LITERAL_PREFIX)) {
					Some(_) if !self.first_party => {
						return Err(compile_error(
							"Literal values are not allowed when not in first party mode.",
						));
					}
					Some(literal) => format!("{column} {operator} {literal}"),
					None => {
						params.push(Param::Value(input(value)));
						format!("{column} {operator} ?")
					}
				}
			}
		};
		Ok(Some(Fragment {
			expr,
			params,
		}))
	}

	/// Compiles the grouping columns, `None` when there are none
	pub fn compile_group(&self, groups: &[Group]) -> Option<Fragment> {
		let parts: Vec<Fragment> = groups
			.iter()
			.filter_map(|g| g.column.as_deref())
			.map(|column| {
				let (expr, params) = self.column(column);
				Fragment {
					expr,
					params,
				}
			})
			.collect();
		Fragment::join(parts, ", ", false)
	}

	/// The expression and parameters referencing a column
	fn column(&self, name: &str) -> (String, Vec<Param>) {
		if self.first_party {
			(name.to_owned(), Vec::new())
		} else {
			("?name".to_owned(), vec![Param::ident(name)])
		}
	}
}

/// The bound form of a client supplied value, NULL when absent
fn input(value: Option<&str>) -> Value {
	value.map(Value::parse_input).unwrap_or_default()
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::err::Result;
	use crate::kvs::Row;

	/// A selection which records the calls made against it
	#[derive(Debug, Default)]
	struct Recording {
		calls: Vec<(String, String, Vec<Param>)>,
	}

	impl Recording {
		fn call(&mut self, name: &str, expr: &str, params: Vec<Param>) {
			self.calls.push((name.to_owned(), expr.to_owned(), params));
		}
	}

	impl Selection for Recording {
		fn limit(&mut self, limit: Option<i64>, offset: Option<i64>) {
			self.call("limit", &format!("{limit:?} {offset:?}"), Vec::new());
		}

		fn order(&mut self, expr: &str, params: Vec<Param>) {
			self.call("order", expr, params);
		}

		fn order_random(&mut self) {
			self.call("order", "RANDOM()", Vec::new());
		}

		fn filter(&mut self, expr: &str, params: Vec<Param>) {
			self.call("filter", expr, params);
		}

		fn having(&mut self, expr: &str, params: Vec<Param>) {
			self.call("having", expr, params);
		}

		fn group(&mut self, expr: &str, params: Vec<Param>) {
			self.call("group", expr, params);
		}

		fn fetch_all(&mut self) -> Result<Vec<Row>> {
			Ok(Vec::new())
		}

		fn count(&mut self, _: &str) -> Result<i64> {
			Ok(0)
		}

		fn sql(&self) -> String {
			String::new()
		}
	}

	fn text(values: &[&str]) -> Vec<Value> {
		values.iter().map(|v| Value::from(*v)).collect()
	}

	fn nested(and: Vec<Condition>, or: Vec<Condition>) -> Condition {
		Condition {
			where_and: and,
			where_or: or,
			..Default::default()
		}
	}

	#[test]
	fn compiles_nested_where_conditions() {
		let compiler = Compiler::new(true);
		let conditions = Conditions {
			where_and: vec![
				nested(
					vec![],
					vec![
						Condition::leaf("id", Comparator::In, ["1", "2"]),
						Condition::leaf("id", Comparator::In, ["3"]),
					],
				),
				Condition::leaf("category_id", Comparator::NotNull, Vec::<String>::new()),
			],
			..Default::default()
		};
		let mut sel = Recording::default();
		compiler.apply_conditions(&mut sel, &conditions).unwrap();
		assert_eq!(
			sel.calls,
			vec![(
				"filter".to_owned(),
				"(id IN (?) OR id IN (?)) AND category_id IS NOT NULL".to_owned(),
				vec![
					Param::List(vec![Value::Int(1), Value::Int(2)]),
					Param::List(vec![Value::Int(3)])
				]
			)]
		);
	}

	#[test]
	fn combines_and_and_or_lists() {
		let compiler = Compiler::new(true);
		let conditions = Conditions {
			where_and: vec![
				Condition::leaf("a", Comparator::Equal, ["1"]),
				Condition::leaf("b", Comparator::Equal, ["2"]),
			],
			where_or: vec![
				Condition::leaf("c", Comparator::Equal, ["3"]),
				Condition::leaf("d", Comparator::Equal, ["4"]),
			],
			..Default::default()
		};
		let fragment = compiler
			.compile_clause(Clause::Where, &conditions.where_and, &conditions.where_or)
			.unwrap()
			.unwrap();
		assert_eq!(fragment.expr, "(a = ? AND b = ?) AND (c = ? OR d = ?)");
		assert_eq!(fragment.params.len(), 4);
	}

	#[test]
	fn binds_identifiers_when_untrusted() {
		let compiler = Compiler::new(false);
		let conditions = Conditions {
			where_and: vec![Condition::leaf("price", Comparator::MoreThan, ["10"])],
			group_conditions: vec![Group {
				column: Some("category_id".to_owned()),
			}],
			..Default::default()
		};
		let mut sel = Recording::default();
		compiler.apply_conditions(&mut sel, &conditions).unwrap();
		compiler.apply_order(
			&mut sel,
			&[OrderBy {
				key: Some("name".to_owned()),
				order: Some(Direction::Desc),
			}],
		);
		assert_eq!(
			sel.calls,
			vec![
				(
					"filter".to_owned(),
					"?name > ?".to_owned(),
					vec![Param::ident("price"), Param::value(10_i64)]
				),
				("group".to_owned(), "?name".to_owned(), vec![Param::ident("category_id")]),
				("order".to_owned(), "?name DESC".to_owned(), vec![Param::ident("name")]),
			]
		);
	}

	#[test]
	fn not_in_drops_falsy_values() {
		let compiler = Compiler::new(true);
		let leaf = |values: &[&str]| {
			compiler
				.compile_list(
					Clause::Where,
					&[Condition::leaf("id", Comparator::NotIn, values.iter().copied())],
					"AND",
					0,
				)
				.unwrap()
		};
		assert_eq!(leaf(&[]), None);
		assert_eq!(leaf(&["", "0"]), None);
		assert_eq!(
			leaf(&["0", "4"]),
			Some(Fragment {
				expr: "id NOT IN (?)".to_owned(),
				params: vec![Param::List(vec![Value::Int(4)])],
			})
		);
	}

	#[test]
	fn in_binds_empty_list() {
		let compiler = Compiler::new(true);
		let fragment = compiler
			.compile_list(
				Clause::Where,
				&[Condition::leaf("id", Comparator::In, Vec::<String>::new())],
				"AND",
				0,
			)
			.unwrap()
			.unwrap();
		assert_eq!(fragment.expr, "id IN (?)");
		assert_eq!(fragment.params, vec![Param::List(Vec::new())]);
	}

	#[test]
	fn scalar_without_value_binds_null() {
		let compiler = Compiler::new(true);
		let fragment = compiler
			.compile_list(
				Clause::Where,
				&[Condition::leaf("name", Comparator::Equal, Vec::<String>::new())],
				"AND",
				0,
			)
			.unwrap()
			.unwrap();
		assert_eq!(fragment.params, vec![Param::Value(Value::Null)]);
	}

	#[test]
	fn null_values_are_bound_in_place() {
		let compiler = Compiler::new(true);
		let leaf = |comparator: &str| {
			let condition = Condition {
				column: Some("name".to_owned()),
				comparator: Some(comparator.to_owned()),
				value: vec![None, Some("x".to_owned())],
				..Default::default()
			};
			compiler.compile_list(Clause::Where, &[condition], "AND", 0).unwrap().unwrap()
		};
		assert_eq!(leaf("EQUAL").params, vec![Param::Value(Value::Null)]);
		assert_eq!(leaf("IN").params, vec![Param::List(vec![Value::Null, Value::from("x")])]);
		assert_eq!(leaf("NOT_IN").params, vec![Param::List(text(&["x"]))]);
	}

	#[test]
	fn literals_require_first_party_mode() {
		let condition = Condition::leaf("price", Comparator::MoreThan, ["LITERAL:ROUND(10.4)"]);
		let fragment = Compiler::new(true)
			.compile_list(Clause::Where, &[condition.clone()], "AND", 0)
			.unwrap()
			.unwrap();
		assert_eq!(fragment.expr, "price > ROUND(10.4)");
		assert!(fragment.params.is_empty());
		let err = Compiler::new(false)
			.compile_list(Clause::Where, &[condition], "AND", 0)
			.unwrap_err();
		assert_eq!(err.to_string(), "Literal values are not allowed when not in first party mode.");
	}

	#[test]
	fn compiles_having_with_literals() {
		let compiler = Compiler::new(true);
		let conditions = Conditions {
			having_and: vec![Condition {
				having_or: vec![
					Condition::leaf("COUNT(id)", Comparator::MoreThan, ["LITERAL:2"]),
					Condition::leaf("MAX(price)", Comparator::LessThan, ["20"]),
				],
				..Default::default()
			}],
			group_conditions: vec![Group {
				column: Some("category_id".to_owned()),
			}],
			..Default::default()
		};
		let mut sel = Recording::default();
		compiler.apply_conditions(&mut sel, &conditions).unwrap();
		assert_eq!(
			sel.calls,
			vec![
				("group".to_owned(), "category_id".to_owned(), vec![]),
				(
					"having".to_owned(),
					"(COUNT(id) > 2 OR MAX(price) < ?)".to_owned(),
					vec![Param::value(20_i64)]
				),
			]
		);
	}

	#[test]
	fn compile_errors_leave_selection_untouched() {
		let compiler = Compiler::new(true);
		let conditions = Conditions {
			where_and: vec![Condition::leaf("id", Comparator::Equal, ["1"])],
			having_and: vec![Condition {
				column: Some("id".to_owned()),
				comparator: Some("BETWEEN".to_owned()),
				..Default::default()
			}],
			..Default::default()
		};
		let mut sel = Recording::default();
		let err = compiler.apply_conditions(&mut sel, &conditions).unwrap_err();
		assert_eq!(err.to_string(), "'BETWEEN' is not a valid comparator.");
		assert!(sel.calls.is_empty());
	}

	#[test]
	fn rejects_deeply_nested_conditions() {
		let compiler = Compiler::new(true).with_max_depth(2);
		let mut condition = Condition::leaf("id", Comparator::Equal, ["1"]);
		for _ in 0..4 {
			condition = nested(vec![condition], vec![]);
		}
		let res = compiler.compile_list(Clause::Where, &[condition], "AND", 0);
		assert!(matches!(res, Err(GqlError::CompileError(_))));
	}

	#[test]
	fn ignores_empty_conditions() {
		let compiler = Compiler::new(true);
		let conditions = Conditions {
			where_and: vec![Condition::default(), nested(vec![Condition::default()], vec![])],
			..Default::default()
		};
		let mut sel = Recording::default();
		compiler.apply_conditions(&mut sel, &conditions).unwrap();
		assert!(sel.calls.is_empty());
	}

	#[test]
	fn applies_order_and_pagination() {
		let compiler = Compiler::new(true);
		let mut sel = Recording::default();
		compiler.apply_order(
			&mut sel,
			&[
				OrderBy {
					key: Some("ignored".to_owned()),
					order: Some(Direction::Random),
				},
				OrderBy {
					key: None,
					order: Some(Direction::Desc),
				},
				OrderBy {
					key: Some("id".to_owned()),
					order: None,
				},
			],
		);
		compiler.apply_pagination(
			&mut sel,
			Some(&Pagination {
				limit: Some(2),
				offset: Some(4),
			}),
		);
		let calls: Vec<_> = sel.calls.iter().map(|(n, e, _)| format!("{n}: {e}")).collect();
		assert_eq!(calls, vec!["order: RANDOM()", "order: id ASC", "limit: Some(2) Some(4)"]);
	}
}
