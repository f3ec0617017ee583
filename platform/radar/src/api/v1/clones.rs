use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use chrono::Utc;
use ulid::Ulid;

use crate::api::error::Result;
use crate::database::{MyClone, RecentScan};
use crate::global::GlobalState;

pub async fn mine(State(global): State<Arc<GlobalState>>, Path(user_id): Path<Ulid>) -> Result<Json<Vec<MyClone>>> {
	Ok(Json(global.listings().my_clones(user_id).await?))
}

pub async fn recent(State(global): State<Arc<GlobalState>>) -> Result<Json<Vec<RecentScan>>> {
	Ok(Json(global.listings().recent_scans(Utc::now()).await?))
}
