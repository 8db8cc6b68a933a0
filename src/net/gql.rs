use async_graphql::{ErrorExtensionValues, Name, Request, Response, ServerError, Value};
use axum::extract::{Json, State};
use axum::routing::post;
use axum::Router;
use sqlgraph_core::obs::QueryLog;

use super::AppState;
use crate::cnf::GRAPHQL_PATH;

pub(super) fn router() -> Router<AppState> {
	Router::new().route(GRAPHQL_PATH, post(handler))
}

async fn handler(State(state): State<AppState>, Json(req): Json<Request>) -> Json<Response> {
	Json(execute(&state, req).await)
}

/// Executes a request against the current schema, with a fresh query log
pub(super) async fn execute(state: &AppState, req: Request) -> Response {
	let schema = match state.cache.get_schema().await {
		Ok(schema) => schema,
		Err(e) => {
			warn!("Failed to generate the GraphQL schema: {e}");
			let mut extensions = ErrorExtensionValues::default();
			extensions.set("code", e.code());
			let mut err = ServerError::new(e.to_string(), None);
			err.extensions = Some(extensions);
			return Response::from_errors(vec![err]);
		}
	};
	let log = QueryLog::new();
	let mut res = schema.execute(req.data(log.clone())).await;
	if state.debug {
		let sql = log.entries().into_iter().map(Value::String).collect();
		let debug = [(Name::new("sql"), Value::List(sql))].into_iter().collect();
		res.extensions.insert("debug".to_owned(), Value::Object(debug));
	}
	res
}

#[cfg(test)]
mod tests {
	use std::sync::Arc;

	use serde_json::json;
	use sqlgraph_core::gql::{SchemaCache, SchemaConfig, SchemaGenerator};
	use sqlgraph_core::kvs::Sqlite;
	use test_log::test;

	use super::*;

	fn state(sql: &str, debug: bool) -> AppState {
		let ds = Sqlite::in_memory().unwrap();
		ds.execute_batch(sql).unwrap();
		let generator = SchemaGenerator::new(Arc::new(ds), SchemaConfig::default());
		AppState {
			cache: SchemaCache::new(generator),
			debug,
		}
	}

	#[test(tokio::test)]
	async fn exposes_executed_statements_in_debug_mode() {
		let state = state(
			"CREATE TABLE tags (id INTEGER PRIMARY KEY, label TEXT NOT NULL);
			INSERT INTO tags VALUES (1, 'new');",
			true,
		);
		let res = execute(&state, Request::new("{ tags { label } }")).await;
		let res = serde_json::to_value(&res).unwrap();
		assert_eq!(res["data"], json!({ "tags": [{ "label": "new" }] }));
		let sql = res["extensions"]["debug"]["sql"].as_array().unwrap();
		assert_eq!(sql.len(), 1);
		assert!(sql[0].as_str().unwrap().ends_with(r#" ms) SELECT * FROM "tags""#));
	}

	#[test(tokio::test)]
	async fn hides_executed_statements_by_default() {
		let state = state("CREATE TABLE tags (id INTEGER PRIMARY KEY);", false);
		let res = execute(&state, Request::new("{ tags_count }")).await;
		let res = serde_json::to_value(&res).unwrap();
		assert_eq!(res, json!({ "data": { "tags_count": 0 } }));
	}

	#[test(tokio::test)]
	async fn reports_schema_errors() {
		let state = state("", false);
		let res = execute(&state, Request::new("{ tags_count }")).await;
		let res = serde_json::to_value(&res).unwrap();
		assert_eq!(
			res["errors"][0]["message"],
			json!("Error generating schema: no tables found in database")
		);
		assert_eq!(res["errors"][0]["extensions"]["code"], json!("SCHEMA"));
	}
}
