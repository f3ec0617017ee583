use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use chrono::{DateTime, Utc};
use ulid::Ulid;

use crate::api::error::Result;
use crate::engine::{format_countdown, ScanReport};
use crate::global::GlobalState;

#[derive(Debug, serde::Serialize)]
pub struct ScanStatusResponse {
	pub can_scan: bool,
	pub last_scan_at: Option<DateTime<Utc>>,
	pub next_allowed_at: Option<DateTime<Utc>>,
	pub remaining_seconds: i64,
	/// `MM:SS`, what the scan button shows while waiting
	pub countdown: String,
}

pub async fn status(State(global): State<Arc<GlobalState>>, Path(user_id): Path<Ulid>) -> Result<Json<ScanStatusResponse>> {
	let status = global.engine().scan_status(user_id, Utc::now()).await?;

	Ok(Json(ScanStatusResponse {
		can_scan: status.can_scan,
		last_scan_at: status.last_scan_at,
		next_allowed_at: status.next_allowed_at,
		remaining_seconds: status.remaining.num_seconds(),
		countdown: format_countdown(status.remaining),
	}))
}

pub async fn run(State(global): State<Arc<GlobalState>>, Path(user_id): Path<Ulid>) -> Result<Json<ScanReport>> {
	Ok(Json(global.engine().scan(user_id).await?))
}
