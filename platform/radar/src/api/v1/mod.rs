use std::sync::Arc;

use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde_json::json;

use crate::global::GlobalState;

mod channels;
mod clones;
mod scan;
mod users;

pub fn routes() -> Router<Arc<GlobalState>> {
	Router::new()
		.route("/health", get(health))
		.route("/users", post(users::create))
		.route("/users/:user_id", get(users::profile))
		.route("/users/:user_id/channels", post(channels::collect))
		.route("/users/:user_id/channels/:channel_id", delete(channels::remove))
		.route("/users/:user_id/scan", get(scan::status).post(scan::run))
		.route("/users/:user_id/clones", get(clones::mine))
		.route("/scans/recent", get(clones::recent))
		.route("/channels/popular", get(channels::popular))
		.route("/channels/recent", get(channels::recent))
}

async fn health() -> Json<serde_json::Value> {
	Json(json!({
		"status": "ok"
	}))
}
