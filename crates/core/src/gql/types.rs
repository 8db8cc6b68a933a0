use async_graphql::Value as GqlValue;
use async_graphql::dynamic::TypeRef;

use super::error::GqlError;
use super::ext::TryIntoExt;
use crate::kvs::Column;
use crate::val::Value;

/// The GraphQL scalar a column is exposed as.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ScalarKind {
	Id,
	Int,
	Float,
	Boolean,
	String,
}

impl ScalarKind {
	pub fn type_name(&self) -> &'static str {
		match self {
			ScalarKind::Id => TypeRef::ID,
			ScalarKind::Int => TypeRef::INT,
			ScalarKind::Float => TypeRef::FLOAT,
			ScalarKind::Boolean => TypeRef::BOOLEAN,
			ScalarKind::String => TypeRef::STRING,
		}
	}
}

/// Maps the native type of a non-primary column to a GraphQL scalar.
pub trait ColumnTypeMapper: Send + Sync {
	fn handle(&self, column: &Column) -> ScalarKind;
}

/// The default mapping, based on the affinity rules of the native type name.
#[derive(Clone, Copy, Debug, Default)]
pub struct NativeTypeMap;

impl ColumnTypeMapper for NativeTypeMap {
	fn handle(&self, column: &Column) -> ScalarKind {
		let native = column.native_type.to_uppercase();
		match native.as_str() {
			"BOOL" | "BOOLEAN" => ScalarKind::Boolean,
			"FLOAT" | "DOUBLE" | "DOUBLE PRECISION" | "REAL" | "DECIMAL" | "NUMERIC" | "MONEY" => {
				ScalarKind::Float
			}
			s if s.contains("INT") => ScalarKind::Int,
			_ => ScalarKind::String,
		}
	}
}

/// Converts a column value into the GraphQL value of its scalar kind
pub fn to_gql_value(value: &Value, kind: ScalarKind) -> Result<GqlValue, GqlError> {
	let out = match (value, kind) {
		(Value::Null, _) => GqlValue::Null,
		(Value::Int(v), ScalarKind::Id | ScalarKind::String) => GqlValue::String(v.to_string()),
		(Value::Int(v), ScalarKind::Float) => (*v as f64).try_intox()?,
		(Value::Int(v), ScalarKind::Boolean) => GqlValue::Boolean(*v != 0),
		(Value::Int(v), ScalarKind::Int) => GqlValue::from(*v),
		(Value::Float(v), ScalarKind::Int) if v.fract() == 0.0 => GqlValue::from(*v as i64),
		(Value::Float(v), ScalarKind::Id | ScalarKind::String) => GqlValue::String(v.to_string()),
		(Value::Float(v), _) => (*v).try_intox()?,
		(Value::Bool(v), ScalarKind::Id | ScalarKind::String) => GqlValue::String(v.to_string()),
		(Value::Bool(v), ScalarKind::Int) => GqlValue::from(*v as i64),
		(Value::Bool(v), _) => GqlValue::Boolean(*v),
		(Value::Text(v), ScalarKind::Int) => match v.parse::<i64>() {
			Ok(n) => GqlValue::from(n),
			Err(_) => GqlValue::String(v.clone()),
		},
		(Value::Text(v), ScalarKind::Float) => match v.parse::<f64>() {
			Ok(n) => n.try_intox()?,
			Err(_) => GqlValue::String(v.clone()),
		},
		(Value::Text(v), ScalarKind::Boolean) => {
			GqlValue::Boolean(!matches!(v.as_str(), "" | "0" | "false" | "f"))
		}
		(Value::Text(v), _) => GqlValue::String(v.clone()),
		(Value::Bytes(v), _) => GqlValue::String(String::from_utf8_lossy(v).into_owned()),
	};
	Ok(out)
}
