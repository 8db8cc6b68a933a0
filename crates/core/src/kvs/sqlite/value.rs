use rusqlite::types::{ToSql, ToSqlOutput, Value as SqlValue, ValueRef};

use crate::val::Value;

impl ToSql for Value {
	fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
		match self {
			Value::Null => Ok(ToSqlOutput::Owned(SqlValue::Null)),
			Value::Bool(true) => Ok(ToSqlOutput::Owned(SqlValue::Integer(1))),
			Value::Bool(false) => Ok(ToSqlOutput::Owned(SqlValue::Integer(0))),
			Value::Int(v) => Ok(ToSqlOutput::Owned(SqlValue::Integer(*v))),
			Value::Float(v) => Ok(ToSqlOutput::Owned(SqlValue::Real(*v))),
			Value::Text(v) => Ok(ToSqlOutput::Borrowed(ValueRef::Text(v.as_bytes()))),
			Value::Bytes(v) => Ok(ToSqlOutput::Borrowed(ValueRef::Blob(&v[..]))),
		}
	}
}

impl From<ValueRef<'_>> for Value {
	fn from(v: ValueRef<'_>) -> Self {
		match v {
			ValueRef::Null => Value::Null,
			ValueRef::Integer(v) => Value::Int(v),
			ValueRef::Real(v) => Value::Float(v),
			ValueRef::Text(v) => Value::Text(String::from_utf8_lossy(v).into_owned()),
			ValueRef::Blob(v) => Value::Bytes(v.to_vec()),
		}
	}
}
