use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;

use super::AppState;
use crate::cnf::HEALTH_PATH;

pub(super) fn router() -> Router<AppState> {
	Router::new().route(HEALTH_PATH, get(handler))
}

async fn handler(State(state): State<AppState>) -> StatusCode {
	// Attempt to introspect the database
	match state.cache.generator.datastore().structure() {
		// The database can not be read
		Err(e) => {
			warn!("Health check failed: {e}");
			StatusCode::SERVICE_UNAVAILABLE
		}
		// The database is available
		Ok(_) => {
			trace!("Health check succeeded");
			StatusCode::OK
		}
	}
}
