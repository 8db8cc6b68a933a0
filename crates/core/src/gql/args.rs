use std::fmt::{self, Display};
use std::str::FromStr;

use async_graphql::dynamic::indexmap::IndexMap;
use async_graphql::dynamic::{Enum, InputObject, InputValue, Type, TypeRef};
use async_graphql::{Name, Value as GqlValue};
use serde::{Deserialize, Deserializer};

use super::error::{GqlError, compile_error};

pub const PAGINATION_TYPE: &str = "_pagination";
pub const ORDER_TYPE: &str = "_order";
pub const ORDER_DIRECTION_TYPE: &str = "_order_direction";
pub const COMPARATOR_TYPE: &str = "_comparator";
pub const WHERE_TYPE: &str = "_where";
pub const HAVING_TYPE: &str = "_having";
pub const GROUP_TYPE: &str = "_group";
pub const CONDITIONS_TYPE: &str = "_conditions";

macro_rules! pagination_input {
	() => {
		InputValue::new("pagination", TypeRef::named(PAGINATION_TYPE))
	};
}

macro_rules! order_input {
	() => {
		InputValue::new("order", TypeRef::named_nn_list(ORDER_TYPE))
	};
}

macro_rules! conditions_input {
	() => {
		InputValue::new("conditions", TypeRef::named(CONDITIONS_TYPE))
	};
}

/// The arguments accepted by list fields
pub fn list_arguments() -> Vec<InputValue> {
	vec![pagination_input!(), order_input!(), conditions_input!()]
}

/// The arguments accepted by count fields
pub fn count_arguments() -> Vec<InputValue> {
	vec![order_input!(), conditions_input!()]
}

/// The input types referenced by list and count field arguments
pub fn input_types() -> Vec<Type> {
	let pagination = InputObject::new(PAGINATION_TYPE)
		.description("Limits the number of returned rows")
		.field(InputValue::new("limit", TypeRef::named(TypeRef::INT)))
		.field(InputValue::new("offset", TypeRef::named(TypeRef::INT)));

	let direction = Enum::new(ORDER_DIRECTION_TYPE).item("ASC").item("DESC").item("RANDOM");

	let order = InputObject::new(ORDER_TYPE)
		.description("A column to order the returned rows by")
		.field(InputValue::new("key", TypeRef::named(TypeRef::STRING)))
		.field(InputValue::new("order", TypeRef::named(ORDER_DIRECTION_TYPE)));

	let comparator =
		Comparator::ALL.iter().fold(Enum::new(COMPARATOR_TYPE), |e, c| e.item(c.name()));

	let filter = InputObject::new(WHERE_TYPE)
		.description("A condition on a column, or a group of nested conditions")
		.field(InputValue::new("column", TypeRef::named(TypeRef::STRING)))
		.field(InputValue::new("comparator", TypeRef::named(COMPARATOR_TYPE)))
		.field(InputValue::new("value", TypeRef::named_list(TypeRef::STRING)))
		.field(InputValue::new("where", TypeRef::named_nn_list(WHERE_TYPE)))
		.field(InputValue::new("where_or", TypeRef::named_nn_list(WHERE_TYPE)));

	let having = InputObject::new(HAVING_TYPE)
		.description("A condition on an aggregate, or a group of nested conditions")
		.field(InputValue::new("column", TypeRef::named(TypeRef::STRING)))
		.field(InputValue::new("comparator", TypeRef::named(COMPARATOR_TYPE)))
		.field(InputValue::new("value", TypeRef::named_list(TypeRef::STRING)))
		.field(InputValue::new("having", TypeRef::named_nn_list(HAVING_TYPE)))
		.field(InputValue::new("having_or", TypeRef::named_nn_list(HAVING_TYPE)));

	let group = InputObject::new(GROUP_TYPE)
		.field(InputValue::new("column", TypeRef::named_nn(TypeRef::STRING)));

	let conditions = InputObject::new(CONDITIONS_TYPE)
		.field(InputValue::new("where", TypeRef::named_nn_list(WHERE_TYPE)))
		.field(InputValue::new("where_or", TypeRef::named_nn_list(WHERE_TYPE)))
		.field(InputValue::new("having", TypeRef::named_nn_list(HAVING_TYPE)))
		.field(InputValue::new("having_or", TypeRef::named_nn_list(HAVING_TYPE)))
		.field(InputValue::new("group_conditions", TypeRef::named_nn_list(GROUP_TYPE)));

	vec![
		Type::InputObject(pagination),
		Type::Enum(direction),
		Type::InputObject(order),
		Type::Enum(comparator),
		Type::InputObject(filter),
		Type::InputObject(having),
		Type::InputObject(group),
		Type::InputObject(conditions),
	]
}

/// The parsed arguments of a list or count field.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct QueryArgs {
	pub pagination: Option<Pagination>,
	#[serde(deserialize_with = "one_or_many")]
	pub order: Vec<OrderBy>,
	#[serde(deserialize_with = "nullable")]
	pub conditions: Conditions,
}

impl QueryArgs {
	/// Parses the arguments passed to a field
	pub fn from_args(args: &IndexMap<Name, GqlValue>) -> Result<Self, GqlError> {
		let json = GqlValue::Object(args.clone())
			.into_json()
			.map_err(|e| compile_error(format!("invalid arguments: {e}")))?;
		serde_json::from_value(json).map_err(|e| compile_error(format!("invalid arguments: {e}")))
	}
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Pagination {
	pub limit: Option<i64>,
	pub offset: Option<i64>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
	#[default]
	Asc,
	Desc,
	Random,
}

impl Direction {
	pub fn keyword(&self) -> &'static str {
		match self {
			Direction::Asc => "ASC",
			Direction::Desc => "DESC",
			Direction::Random => "RANDOM",
		}
	}
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct OrderBy {
	pub key: Option<String>,
	pub order: Option<Direction>,
}

/// The condition trees of a field, combined with `AND`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Conditions {
	#[serde(rename = "where", deserialize_with = "one_or_many")]
	pub where_and: Vec<Condition>,
	#[serde(deserialize_with = "one_or_many")]
	pub where_or: Vec<Condition>,
	#[serde(rename = "having", deserialize_with = "one_or_many")]
	pub having_and: Vec<Condition>,
	#[serde(deserialize_with = "one_or_many")]
	pub having_or: Vec<Condition>,
	#[serde(deserialize_with = "one_or_many")]
	pub group_conditions: Vec<Group>,
}

/// A node of a condition tree: either a leaf comparing a column, or a
/// group of nested conditions. Where trees nest through `where` and
/// `where_or`, having trees through `having` and `having_or`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Condition {
	pub column: Option<String>,
	pub comparator: Option<String>,
	/// The compared values, a null element keeps its position
	#[serde(deserialize_with = "strings")]
	pub value: Vec<Option<String>>,
	#[serde(rename = "where", deserialize_with = "one_or_many")]
	pub where_and: Vec<Condition>,
	#[serde(deserialize_with = "one_or_many")]
	pub where_or: Vec<Condition>,
	#[serde(rename = "having", deserialize_with = "one_or_many")]
	pub having_and: Vec<Condition>,
	#[serde(deserialize_with = "one_or_many")]
	pub having_or: Vec<Condition>,
}

impl Condition {
	/// A leaf comparing a column against values
	pub fn leaf<I, S>(column: impl Into<String>, comparator: Comparator, value: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		Condition {
			column: Some(column.into()),
			comparator: Some(comparator.name().to_owned()),
			value: value.into_iter().map(|v| Some(v.into())).collect(),
			..Default::default()
		}
	}
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Group {
	pub column: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Comparator {
	Equal,
	NotEqual,
	LessThan,
	LessThanEqual,
	MoreThan,
	MoreThanEqual,
	Like,
	NotLike,
	In,
	NotIn,
	Null,
	NotNull,
}

impl Comparator {
	pub const ALL: [Comparator; 12] = [
		Comparator::Equal,
		Comparator::NotEqual,
		Comparator::LessThan,
		Comparator::LessThanEqual,
		Comparator::MoreThan,
		Comparator::MoreThanEqual,
		Comparator::Like,
		Comparator::NotLike,
		Comparator::In,
		Comparator::NotIn,
		Comparator::Null,
		Comparator::NotNull,
	];

	/// The name of the comparator in the GraphQL enum
	pub fn name(&self) -> &'static str {
		match self {
			Comparator::Equal => "EQUAL",
			Comparator::NotEqual => "NOT_EQUAL",
			Comparator::LessThan => "LESS_THAN",
			Comparator::LessThanEqual => "LESS_THAN_EQUAL",
			Comparator::MoreThan => "MORE_THAN",
			Comparator::MoreThanEqual => "MORE_THAN_EQUAL",
			Comparator::Like => "LIKE",
			Comparator::NotLike => "NOT_LIKE",
			Comparator::In => "IN",
			Comparator::NotIn => "NOT_IN",
			Comparator::Null => "NULL",
			Comparator::NotNull => "NOT_NULL",
		}
	}

	/// The SQL operator of comparators taking a single value
	pub fn operator(&self) -> Option<&'static str> {
		match self {
			Comparator::Equal => Some("="),
			Comparator::NotEqual => Some("!="),
			Comparator::LessThan => Some("<"),
			Comparator::LessThanEqual => Some("<="),
			Comparator::MoreThan => Some(">"),
			Comparator::MoreThanEqual => Some(">="),
			Comparator::Like => Some("LIKE"),
			Comparator::NotLike => Some("NOT LIKE"),
			_ => None,
		}
	}
}

impl Display for Comparator {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.name())
	}
}

impl FromStr for Comparator {
	type Err = GqlError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Comparator::ALL
			.into_iter()
			.find(|c| c.name() == s)
			.ok_or_else(|| compile_error(format!("'{s}' is not a valid comparator.")))
	}
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
	Many(Vec<T>),
	One(T),
}

/// Accepts a single item wherever a list is expected, and null as an empty list
fn one_or_many<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
	D: Deserializer<'de>,
	T: Deserialize<'de>,
{
	Ok(match Option::<OneOrMany<T>>::deserialize(deserializer)? {
		None => Vec::new(),
		Some(OneOrMany::Many(v)) => v,
		Some(OneOrMany::One(v)) => vec![v],
	})
}

/// Accepts a single scalar or a list of scalars, stringifying non-string values
fn strings<'de, D>(deserializer: D) -> Result<Vec<Option<String>>, D::Error>
where
	D: Deserializer<'de>,
{
	let values: Vec<serde_json::Value> = one_or_many(deserializer)?;
	Ok(values
		.into_iter()
		.map(|v| match v {
			serde_json::Value::Null => None,
			serde_json::Value::String(s) => Some(s),
			v => Some(v.to_string()),
		})
		.collect())
}

fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
	D: Deserializer<'de>,
	T: Deserialize<'de> + Default,
{
	Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;

	fn parse(value: serde_json::Value) -> QueryArgs {
		serde_json::from_value(value).unwrap()
	}

	#[test]
	fn parses_nested_conditions() {
		let args = parse(json!({
			"pagination": { "limit": 2 },
			"order": [{ "key": "id", "order": "DESC" }],
			"conditions": {
				"where": [{
					"where_or": [
						{ "column": "id", "comparator": "IN", "value": ["1", "2"] },
						{ "column": "name", "comparator": "LIKE", "value": "%3" }
					]
				}],
				"group_conditions": [{ "column": "category_id" }]
			}
		}));
		assert_eq!(
			args.pagination,
			Some(Pagination {
				limit: Some(2),
				offset: None
			})
		);
		assert_eq!(args.order[0].order, Some(Direction::Desc));
		let nested = &args.conditions.where_and[0].where_or;
		assert_eq!(nested[0], Condition::leaf("id", Comparator::In, ["1", "2"]));
		assert_eq!(nested[1].value, vec![Some("%3".to_owned())]);
		assert_eq!(args.conditions.group_conditions[0].column.as_deref(), Some("category_id"));
	}

	#[test]
	fn accepts_single_items_for_lists() {
		let args = parse(json!({
			"order": { "key": "id" },
			"conditions": { "where": { "column": "id", "comparator": "EQUAL", "value": 5 } }
		}));
		assert_eq!(args.order.len(), 1);
		assert_eq!(args.conditions.where_and[0].value, vec![Some("5".to_owned())]);
	}

	#[test]
	fn accepts_nulls() {
		let args = parse(json!({
			"pagination": null,
			"order": null,
			"conditions": { "where": [{ "column": "id", "comparator": "IN", "value": null }] }
		}));
		assert!(args.order.is_empty());
		assert!(args.conditions.where_and[0].value.is_empty());
		assert_eq!(parse(json!({ "conditions": null })), QueryArgs::default());
	}

	#[test]
	fn null_values_keep_their_position() {
		let args = parse(json!({
			"conditions": { "where": [{ "column": "name", "comparator": "EQUAL", "value": [null, "x"] }] }
		}));
		assert_eq!(args.conditions.where_and[0].value, vec![None, Some("x".to_owned())]);
	}

	#[test]
	fn malformed_arguments_are_compile_errors() {
		let args: IndexMap<Name, GqlValue> =
			[(Name::new("pagination"), GqlValue::String("all".to_owned()))].into_iter().collect();
		let err = QueryArgs::from_args(&args).unwrap_err();
		assert!(matches!(err, GqlError::CompileError(_)));
		assert_eq!(err.code(), "COMPILE");
	}

	#[test]
	fn parses_comparators() {
		assert_eq!("NOT_IN".parse::<Comparator>().unwrap(), Comparator::NotIn);
		let err = "BETWEEN".parse::<Comparator>().unwrap_err();
		assert_eq!(err.to_string(), "'BETWEEN' is not a valid comparator.");
	}
}
