use std::fmt;

use serde::{Deserialize, Serialize};

/// A single column value as read from, or bound into, the relational layer.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
	#[default]
	Null,
	Bool(bool),
	Int(i64),
	Float(f64),
	Text(String),
	Bytes(Vec<u8>),
}

impl Value {
	// -----------------------------------
	// Simple value detection
	// -----------------------------------

	/// Check if this Value is NULL
	pub fn is_null(&self) -> bool {
		matches!(self, Value::Null)
	}

	// -----------------------------------
	// Simple conversion of value
	// -----------------------------------

	/// Parses a value supplied by a client. Text in the canonical form of an
	/// integer or a decimal number becomes that number, so that it compares
	/// numerically with aggregates and computed expressions. Any other text,
	/// such as `007` or `1e3`, is kept as is.
	pub fn parse_input(v: &str) -> Self {
		if let Ok(n) = v.parse::<i64>() {
			if n.to_string() == v {
				return Value::Int(n);
			}
		}
		let digits = v.bytes().filter(u8::is_ascii_digit).count();
		if v.contains('.') && digits <= 15 {
			if let Ok(n) = v.parse::<f64>() {
				if n.is_finite() && format!("{n:?}") == v {
					return Value::Float(n);
				}
			}
		}
		Value::Text(v.to_owned())
	}

	/// Converts this Value into a string usable as a table name,
	/// returning `None` for NULL and binary values
	pub fn as_table_name(&self) -> Option<String> {
		match self {
			Value::Text(v) => Some(v.clone()),
			Value::Int(v) => Some(v.to_string()),
			Value::Float(v) => Some(v.to_string()),
			Value::Bool(v) => Some(v.to_string()),
			Value::Null | Value::Bytes(_) => None,
		}
	}

	/// Converts this Value into a JSON value
	pub fn into_json(self) -> serde_json::Value {
		match self {
			Value::Null => serde_json::Value::Null,
			Value::Bool(v) => v.into(),
			Value::Int(v) => v.into(),
			Value::Float(v) => serde_json::Number::from_f64(v)
				.map(serde_json::Value::Number)
				.unwrap_or(serde_json::Value::Null),
			Value::Text(v) => v.into(),
			Value::Bytes(v) => String::from_utf8_lossy(&v).into_owned().into(),
		}
	}
}

impl fmt::Display for Value {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match self {
			Value::Null => f.write_str("NULL"),
			Value::Bool(v) => write!(f, "{v}"),
			Value::Int(v) => write!(f, "{v}"),
			Value::Float(v) => write!(f, "{v}"),
			Value::Text(v) => f.write_str(v),
			Value::Bytes(v) => f.write_str(&String::from_utf8_lossy(v)),
		}
	}
}

impl From<bool> for Value {
	fn from(v: bool) -> Self {
		Value::Bool(v)
	}
}

impl From<i64> for Value {
	fn from(v: i64) -> Self {
		Value::Int(v)
	}
}

impl From<f64> for Value {
	fn from(v: f64) -> Self {
		Value::Float(v)
	}
}

impl From<String> for Value {
	fn from(v: String) -> Self {
		Value::Text(v)
	}
}

impl From<&str> for Value {
	fn from(v: &str) -> Self {
		Value::Text(v.to_owned())
	}
}

impl From<Vec<u8>> for Value {
	fn from(v: Vec<u8>) -> Self {
		Value::Bytes(v)
	}
}

impl<T> From<Option<T>> for Value
where
	Value: From<T>,
{
	fn from(v: Option<T>) -> Self {
		match v {
			Some(v) => v.into(),
			None => Value::Null,
		}
	}
}
