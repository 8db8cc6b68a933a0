use async_graphql::ErrorExtensions;
use thiserror::Error;

/// The message reported for every failure of the relational layer while
/// resolving a field, the underlying cause is kept as the error source.
pub const RESOLVER_FAILURE_MESSAGE: &str = "There was an error while executing the query";

#[derive(Debug, Error)]
pub enum GqlError {
	#[error("Database error: {0}")]
	DbError(crate::err::Error),
	#[error("Error generating schema: {0}")]
	SchemaError(String),
	#[error("{0}")]
	CompileError(String),
	#[error("{message}")]
	ResolverError {
		message: String,
		#[source]
		source: Option<crate::err::Error>,
	},
	#[error("Internal Error: {0}")]
	InternalError(String),
}

impl GqlError {
	/// The machine readable code exposed in the error extensions
	pub fn code(&self) -> &'static str {
		match self {
			GqlError::DbError(_) => "DATABASE",
			GqlError::SchemaError(_) => "SCHEMA",
			GqlError::CompileError(_) => "COMPILE",
			GqlError::ResolverError {
				..
			} => "RESOLVER",
			GqlError::InternalError(_) => "INTERNAL",
		}
	}
}

pub fn schema_error(msg: impl Into<String>) -> GqlError {
	GqlError::SchemaError(msg.into())
}

pub fn compile_error(msg: impl Into<String>) -> GqlError {
	GqlError::CompileError(msg.into())
}

pub fn resolver_error(msg: impl Into<String>) -> GqlError {
	GqlError::ResolverError {
		message: msg.into(),
		source: None,
	}
}

/// Wraps a failure of the relational layer which happened while resolving a field
pub fn execution_error(source: crate::err::Error) -> GqlError {
	debug!("Query execution failed: {source}");
	GqlError::ResolverError {
		message: RESOLVER_FAILURE_MESSAGE.to_owned(),
		source: Some(source),
	}
}

pub fn internal_error(msg: impl Into<String>) -> GqlError {
	let msg = msg.into();
	error!("{}", msg);
	GqlError::InternalError(msg)
}

impl From<crate::err::Error> for GqlError {
	fn from(value: crate::err::Error) -> Self {
		GqlError::DbError(value)
	}
}

impl ErrorExtensions for GqlError {
	fn extend(&self) -> async_graphql::Error {
		async_graphql::Error::new(self.to_string()).extend_with(|_, e| e.set("code", self.code()))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn extensions_carry_the_error_code() {
		let err = compile_error("'BETWEEN' is not a valid comparator.").extend();
		assert_eq!(err.message, "'BETWEEN' is not a valid comparator.");
		let code = err.extensions.as_ref().and_then(|ext| ext.get("code")).cloned();
		assert_eq!(code, Some(async_graphql::Value::String("COMPILE".to_owned())));
	}

	#[test]
	fn execution_errors_keep_their_source() {
		let err = execution_error(crate::err::Error::Ds("disk I/O error".to_owned()));
		assert_eq!(err.to_string(), RESOLVER_FAILURE_MESSAGE);
		assert!(std::error::Error::source(&err).is_some());
	}
}
