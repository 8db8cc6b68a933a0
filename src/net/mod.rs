mod gql;
mod health;
mod signals;

use std::net::SocketAddr;

use anyhow::{Context, Result};
use axum::Router;
use sqlgraph_core::gql::{Fingerprint, SchemaCache};

/// The state shared by all request handlers
#[derive(Clone, Debug)]
pub struct AppState {
	pub cache: SchemaCache<Fingerprint>,
	/// Expose the executed statements in the response extensions
	pub debug: bool,
}

pub fn router(state: AppState) -> Router {
	Router::new().merge(health::router()).merge(gql::router()).with_state(state)
}

pub async fn init(bind: SocketAddr, state: AppState) -> Result<()> {
	let app = router(state);
	let listener = tokio::net::TcpListener::bind(bind)
		.await
		.with_context(|| format!("Failed to listen on {bind}"))?;
	info!("Started web server on {bind}");
	axum::serve(listener, app)
		.with_graceful_shutdown(signals::listen())
		.await
		.context("The web server failed")?;
	info!("Web server stopped. Bye!");
	Ok(())
}
