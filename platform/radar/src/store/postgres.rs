use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use deadpool_postgres::Pool;
use postgres_from_row::FromRow;
use tokio_postgres::Row;
use ulid::Ulid;

use super::{ClonePatch, CollectOutcome, CommitReceipt, RadarStore, ScanCommit, StoreError};
use crate::database::{
	Channel, ChannelSummary, CloneRecord, MyClone, NewChannel, PairKey, PopularChannel, RecentScan, User, UserSummary,
};

fn ids(rows: &[Row]) -> Result<BTreeSet<Ulid>, StoreError> {
	Ok(rows.iter().map(|row| row.try_get(0)).collect::<Result<_, _>>()?)
}

fn rows_as<T: FromRow>(rows: &[Row]) -> Result<Vec<T>, StoreError> {
	Ok(rows.iter().map(T::try_from_row).collect::<Result<_, _>>()?)
}

fn sql_limit(limit: usize) -> i64 {
	i64::try_from(limit).unwrap_or(i64::MAX)
}

/// A [`RadarStore`] backed by Postgres.
#[derive(Clone)]
pub struct PgStore {
	pool: Arc<Pool>,
}

impl PgStore {
	pub fn new(pool: Arc<Pool>) -> Self {
		Self { pool }
	}

	pub async fn migrate(&self) -> anyhow::Result<()> {
		super::migration::run(&self.pool).await
	}

	async fn channel_summaries(&self, ids: &[Ulid]) -> Result<HashMap<Ulid, ChannelSummary>, StoreError> {
		if ids.is_empty() {
			return Ok(HashMap::new());
		}

		let client = self.pool.get().await?;
		let rows = client
			.query("SELECT id, external_id, name FROM channels WHERE id = ANY($1)", &[&ids])
			.await?;

		Ok(rows_as::<ChannelSummary>(&rows)?.into_iter().map(|c| (c.id, c)).collect())
	}
}

#[async_trait::async_trait]
impl RadarStore for PgStore {
	async fn create_user(&self, display_name: &str, now: DateTime<Utc>) -> Result<User, StoreError> {
		let client = self.pool.get().await?;
		let row = client
			.query_one(
				"INSERT INTO users (id, display_name, created_at) VALUES ($1, $2, $3) RETURNING *",
				&[&Ulid::new(), &display_name, &now],
			)
			.await?;

		Ok(User::try_from_row(&row)?)
	}

	async fn user(&self, user_id: Ulid) -> Result<Option<User>, StoreError> {
		let client = self.pool.get().await?;
		let row = client.query_opt("SELECT * FROM users WHERE id = $1", &[&user_id]).await?;

		Ok(row.as_ref().map(User::try_from_row).transpose()?)
	}

	async fn upsert_channel(&self, channel: &NewChannel, now: DateTime<Utc>) -> Result<Channel, StoreError> {
		let client = self.pool.get().await?;
		let row = client
			.query_one(
				"INSERT INTO channels (id, external_id, name, description, thumbnail_url, subscriber_count, video_count, created_at, updated_at)
				VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8)
				ON CONFLICT (external_id) DO UPDATE SET
					name = EXCLUDED.name,
					description = EXCLUDED.description,
					thumbnail_url = EXCLUDED.thumbnail_url,
					subscriber_count = EXCLUDED.subscriber_count,
					video_count = EXCLUDED.video_count,
					updated_at = EXCLUDED.updated_at
				RETURNING *",
				&[
					&Ulid::new(),
					&channel.external_id,
					&channel.name,
					&channel.description,
					&channel.thumbnail_url,
					&channel.subscriber_count,
					&channel.video_count,
					&now,
				],
			)
			.await?;

		Ok(Channel::try_from_row(&row)?)
	}

	async fn collect_channel(&self, user_id: Ulid, channel_id: Ulid, cap: usize) -> Result<CollectOutcome, StoreError> {
		let mut client = self.pool.get().await?;
		let tx = client.transaction().await?;

		// the row lock serializes concurrent collects of the same user
		if tx
			.query_opt("SELECT id FROM users WHERE id = $1 FOR UPDATE", &[&user_id])
			.await?
			.is_none()
		{
			return Err(StoreError::UnknownUser(user_id));
		}

		if tx
			.query_opt("SELECT id FROM channels WHERE id = $1", &[&channel_id])
			.await?
			.is_none()
		{
			return Err(StoreError::UnknownChannel(channel_id));
		}

		let collected = ids(&tx
			.query("SELECT channel_id FROM user_channels WHERE user_id = $1", &[&user_id])
			.await?)?;

		if collected.contains(&channel_id) {
			return Ok(CollectOutcome::AlreadyCollected);
		}

		if collected.len() >= cap {
			return Ok(CollectOutcome::CapReached);
		}

		tx.execute(
			"INSERT INTO user_channels (user_id, channel_id) VALUES ($1, $2)",
			&[&user_id, &channel_id],
		)
		.await?;

		tx.commit().await?;

		Ok(CollectOutcome::Added)
	}

	async fn remove_channel(&self, user_id: Ulid, channel_id: Ulid) -> Result<bool, StoreError> {
		let client = self.pool.get().await?;
		let removed = client
			.execute(
				"DELETE FROM user_channels WHERE user_id = $1 AND channel_id = $2",
				&[&user_id, &channel_id],
			)
			.await?;

		Ok(removed > 0)
	}

	async fn list_channels(&self, user_id: Ulid) -> Result<BTreeSet<Ulid>, StoreError> {
		let client = self.pool.get().await?;
		ids(&client
			.query("SELECT channel_id FROM user_channels WHERE user_id = $1", &[&user_id])
			.await?)
	}

	async fn list_fans(&self, channel_id: Ulid) -> Result<BTreeSet<Ulid>, StoreError> {
		let client = self.pool.get().await?;
		ids(&client
			.query("SELECT user_id FROM user_channels WHERE channel_id = $1", &[&channel_id])
			.await?)
	}

	async fn channel_sets(&self, user_ids: &[Ulid]) -> Result<HashMap<Ulid, BTreeSet<Ulid>>, StoreError> {
		let mut sets: HashMap<_, BTreeSet<_>> = user_ids.iter().map(|id| (*id, BTreeSet::new())).collect();
		if user_ids.is_empty() {
			return Ok(sets);
		}

		let client = self.pool.get().await?;
		let rows = client
			.query(
				"SELECT user_id, channel_id FROM user_channels WHERE user_id = ANY($1)",
				&[&user_ids],
			)
			.await?;

		for row in rows {
			let user_id: Ulid = row.try_get(0)?;
			sets.entry(user_id).or_default().insert(row.try_get(1)?);
		}

		Ok(sets)
	}

	async fn user_channels(&self, user_id: Ulid) -> Result<Vec<Channel>, StoreError> {
		let client = self.pool.get().await?;
		let rows = client
			.query(
				"SELECT c.* FROM channels c
				INNER JOIN user_channels uc ON uc.channel_id = c.id
				WHERE uc.user_id = $1
				ORDER BY c.subscriber_count DESC, c.id ASC",
				&[&user_id],
			)
			.await?;

		rows_as(&rows)
	}

	async fn clone_partners(&self, user_id: Ulid) -> Result<BTreeSet<Ulid>, StoreError> {
		let client = self.pool.get().await?;
		ids(&client
			.query(
				"SELECT CASE WHEN user_a = $1 THEN user_b ELSE user_a END FROM clones WHERE user_a = $1 OR user_b = $1",
				&[&user_id],
			)
			.await?)
	}

	async fn clone_record(&self, key: &PairKey) -> Result<Option<CloneRecord>, StoreError> {
		let client = self.pool.get().await?;
		let row = client
			.query_opt("SELECT * FROM clones WHERE pair_key = $1", &[&key.as_str()])
			.await?;

		Ok(row.as_ref().map(CloneRecord::try_from_row).transpose()?)
	}

	#[tracing::instrument(skip_all, fields(user_id = %commit.user_id, patches = commit.patches.len()))]
	async fn commit_scan(&self, commit: &ScanCommit) -> Result<CommitReceipt, StoreError> {
		commit.validate()?;

		let mut client = self.pool.get().await?;
		let tx = client.transaction().await?;

		// claims the scan, dropping the transaction rolls everything back
		let claimed = tx
			.execute(
				"UPDATE users SET last_scan_at = $2 WHERE id = $1 AND last_scan_at IS NOT DISTINCT FROM $3",
				&[&commit.user_id, &commit.scanned_at, &commit.expected_last_scan],
			)
			.await?;

		if claimed == 0 {
			let exists = tx
				.query_opt("SELECT id FROM users WHERE id = $1", &[&commit.user_id])
				.await?
				.is_some();

			return Err(if exists {
				StoreError::ScanConflict(commit.user_id)
			} else {
				StoreError::UnknownUser(commit.user_id)
			});
		}

		let mut receipt = CommitReceipt::default();

		for patch in &commit.patches {
			match patch {
				ClonePatch::Upsert {
					key,
					participants,
					shared,
				} => {
					let shared: Vec<Ulid> = shared.iter().copied().collect();
					let row = tx
						.query_one(
							"INSERT INTO clones (pair_key, user_a, user_b, match_count, shared_channel_ids, created_at, updated_at)
							VALUES ($1, $2, $3, $4, $5, $6, $6)
							ON CONFLICT (pair_key) DO UPDATE SET
								match_count = EXCLUDED.match_count,
								shared_channel_ids = EXCLUDED.shared_channel_ids,
								updated_at = EXCLUDED.updated_at
							RETURNING (xmax = 0) AS inserted",
							&[
								&key.as_str(),
								&participants.0,
								&participants.1,
								&(shared.len() as i32),
								&shared,
								&commit.scanned_at,
							],
						)
						.await?;

					if row.try_get::<_, bool>("inserted")? {
						receipt.inserted += 1;
					} else {
						receipt.updated += 1;
					}
				}
				ClonePatch::Delete { key } => {
					receipt.deleted += tx
						.execute("DELETE FROM clones WHERE pair_key = $1", &[&key.as_str()])
						.await? as usize;
				}
			}
		}

		tx.commit().await?;

		Ok(receipt)
	}

	async fn clones_of(&self, user_id: Ulid, limit: usize) -> Result<Vec<MyClone>, StoreError> {
		let rows = {
			let client = self.pool.get().await?;
			client
				.query(
					"SELECT c.*, u.display_name AS other_display_name FROM clones c
					INNER JOIN users u ON u.id = CASE WHEN c.user_a = $1 THEN c.user_b ELSE c.user_a END
					WHERE c.user_a = $1 OR c.user_b = $1
					ORDER BY c.match_count DESC, c.updated_at DESC, c.pair_key COLLATE \"C\" ASC
					LIMIT $2",
					&[&user_id, &sql_limit(limit)],
				)
				.await?
		};

		let mut clones = Vec::with_capacity(rows.len());
		for row in &rows {
			let record = CloneRecord::try_from_row(row)?;
			let display_name: String = row.try_get("other_display_name")?;
			clones.push((record, display_name));
		}

		let channel_ids: Vec<Ulid> = clones
			.iter()
			.flat_map(|(record, _)| record.shared_channel_ids.iter().copied())
			.collect::<BTreeSet<_>>()
			.into_iter()
			.collect();
		let channels = self.channel_summaries(&channel_ids).await?;

		Ok(clones
			.into_iter()
			.map(|(record, display_name)| {
				let mut shared_channels: Vec<_> = record
					.shared_channel_ids
					.iter()
					.filter_map(|id| channels.get(id).cloned())
					.collect();
				shared_channels.sort_by(|a, b| a.name.cmp(&b.name));

				MyClone {
					other: UserSummary {
						id: record.other(user_id),
						display_name,
					},
					pair_key: record.pair_key,
					match_count: record.match_count,
					shared_channels,
					updated_at: record.updated_at,
				}
			})
			.collect())
	}

	async fn recent_clones(&self, since: DateTime<Utc>, limit: usize) -> Result<Vec<RecentScan>, StoreError> {
		let client = self.pool.get().await?;
		let rows = client
			.query(
				"SELECT c.pair_key, c.match_count, c.updated_at,
					a.id AS a_id, a.display_name AS a_display_name,
					b.id AS b_id, b.display_name AS b_display_name
				FROM clones c
				INNER JOIN users a ON a.id = c.user_a
				INNER JOIN users b ON b.id = c.user_b
				WHERE c.updated_at >= $1
				ORDER BY c.match_count DESC, c.updated_at DESC, c.pair_key COLLATE \"C\" ASC
				LIMIT $2",
				&[&since, &sql_limit(limit)],
			)
			.await?;

		rows.iter()
			.map(|row| -> Result<_, StoreError> {
				let mut participants = vec![
					UserSummary {
						id: row.try_get("a_id")?,
						display_name: row.try_get("a_display_name")?,
					},
					UserSummary {
						id: row.try_get("b_id")?,
						display_name: row.try_get("b_display_name")?,
					},
				];
				participants.sort_by(|a, b| a.display_name.cmp(&b.display_name));

				Ok(RecentScan {
					pair_key: PairKey::from(row.try_get::<_, String>("pair_key")?),
					participants,
					match_count: row.try_get("match_count")?,
					updated_at: row.try_get("updated_at")?,
				})
			})
			.collect()
	}

	async fn popular_channels(&self, limit: usize) -> Result<Vec<PopularChannel>, StoreError> {
		let client = self.pool.get().await?;
		let rows = client
			.query(
				"SELECT c.*, COUNT(uc.user_id) AS fan_count FROM channels c
				LEFT JOIN user_channels uc ON uc.channel_id = c.id
				GROUP BY c.id
				ORDER BY fan_count DESC, c.subscriber_count DESC, c.id ASC
				LIMIT $1",
				&[&sql_limit(limit)],
			)
			.await?;

		rows.iter()
			.map(|row| -> Result<_, StoreError> {
				Ok(PopularChannel {
					channel: Channel::try_from_row(row)?,
					fan_count: row.try_get("fan_count")?,
				})
			})
			.collect()
	}

	async fn recent_channels(&self, limit: usize) -> Result<Vec<Channel>, StoreError> {
		let client = self.pool.get().await?;
		let rows = client
			.query(
				"SELECT * FROM channels ORDER BY created_at DESC, id ASC LIMIT $1",
				&[&sql_limit(limit)],
			)
			.await?;

		rows_as(&rows)
	}
}
