use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use ulid::Ulid;

use crate::api::error::Result;
use crate::database::{Channel, NewChannel, PopularChannel};
use crate::global::GlobalState;

pub async fn collect(
	State(global): State<Arc<GlobalState>>,
	Path(user_id): Path<Ulid>,
	Json(channel): Json<NewChannel>,
) -> Result<Json<Channel>> {
	Ok(Json(global.collection().collect(user_id, &channel, Utc::now()).await?))
}

pub async fn remove(
	State(global): State<Arc<GlobalState>>,
	Path((user_id, channel_id)): Path<(Ulid, Ulid)>,
) -> Result<StatusCode> {
	global.collection().remove(user_id, channel_id).await?;

	Ok(StatusCode::NO_CONTENT)
}

pub async fn popular(State(global): State<Arc<GlobalState>>) -> Result<Json<Vec<PopularChannel>>> {
	Ok(Json(global.listings().popular_channels().await?))
}

pub async fn recent(State(global): State<Arc<GlobalState>>) -> Result<Json<Vec<Channel>>> {
	Ok(Json(global.listings().recent_channels().await?))
}
