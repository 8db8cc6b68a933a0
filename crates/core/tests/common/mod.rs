#![allow(clippy::unwrap_used)]
#![allow(dead_code)]

use std::sync::Arc;

use async_graphql::Request;
use async_graphql::dynamic::Schema;
use sqlgraph_core::gql::{MorphRelation, SchemaConfig, SchemaGenerator};
use sqlgraph_core::kvs::{Datastore, Sqlite};
use sqlgraph_core::obs::QueryLog;

pub const FIXTURE: &str = r#"
	CREATE TABLE addresses (
		id INTEGER PRIMARY KEY,
		street TEXT NOT NULL
	);
	CREATE TABLE categories (
		id INTEGER PRIMARY KEY,
		name TEXT NOT NULL
	);
	CREATE TABLE products (
		id INTEGER PRIMARY KEY,
		category_id INTEGER REFERENCES categories (id),
		name TEXT NOT NULL,
		price REAL NOT NULL
	);
	CREATE TABLE orders (
		id INTEGER PRIMARY KEY,
		customer TEXT NOT NULL,
		billing_address_id INTEGER NOT NULL REFERENCES addresses (id),
		shipping_address_id INTEGER NOT NULL REFERENCES addresses (id)
	);
	CREATE TABLE order_product (
		id INTEGER PRIMARY KEY,
		order_id INTEGER NOT NULL REFERENCES orders (id),
		product_id INTEGER NOT NULL REFERENCES products (id),
		quantity INTEGER NOT NULL
	);
	CREATE TABLE comments (
		id INTEGER PRIMARY KEY,
		commentable_id INTEGER NOT NULL,
		commentable_type TEXT NOT NULL,
		body TEXT NOT NULL
	);

	INSERT INTO addresses VALUES (1, 'Main Street'), (2, 'Side Street');
	INSERT INTO categories VALUES (1, 'Tools'), (2, 'Toys'), (3, 'Empty');
	INSERT INTO products VALUES
		(1, 1, 'Hammer', 12.5),
		(2, 1, 'Saw', 19.5),
		(3, 2, 'Kite', 8.25),
		(4, NULL, 'Gift card', 50.5);
	INSERT INTO orders VALUES
		(1, 'alice', 1, 2),
		(2, 'bob', 2, 2),
		(3, 'alice', 1, 1);
	INSERT INTO order_product VALUES
		(1, 1, 1, 2),
		(2, 1, 3, 1),
		(3, 2, 2, 1),
		(4, 3, 4, 3);
	INSERT INTO comments VALUES
		(1, 1, 'products', 'Heavy'),
		(2, 1, 'categories', 'Useful'),
		(3, 3, 'products', 'Fun');
"#;

/// An in-memory database loaded with the shop fixture
pub fn sqlite() -> Sqlite {
	let ds = Sqlite::in_memory().unwrap();
	ds.execute_batch(FIXTURE).unwrap();
	ds
}

pub fn datastore() -> Arc<dyn Datastore> {
	Arc::new(sqlite())
}

pub fn commentable() -> MorphRelation {
	MorphRelation::new("comments", "commentable_id", "commentable_type", "commentable")
}

pub fn schema(config: SchemaConfig, first_party: bool) -> Schema {
	SchemaGenerator::new(datastore(), config).with_first_party(first_party).generate().unwrap()
}

/// Executes a query, returning the serialized response
pub async fn execute(schema: &Schema, query: &str) -> serde_json::Value {
	let res = schema.execute(Request::new(query)).await;
	serde_json::to_value(&res).unwrap()
}

/// Executes a query with a query log attached to the request
pub async fn execute_logged(schema: &Schema, query: &str, log: &QueryLog) -> serde_json::Value {
	let res = schema.execute(Request::new(query).data(log.clone())).await;
	serde_json::to_value(&res).unwrap()
}

/// The message and the code of the first error of a response
pub fn first_error(res: &serde_json::Value) -> (String, String) {
	let err = &res["errors"][0];
	(
		err["message"].as_str().unwrap_or_default().to_owned(),
		err["extensions"]["code"].as_str().unwrap_or_default().to_owned(),
	)
}
