use anyhow::Context;
use deadpool_postgres::{Pool, Transaction};

struct Migration {
	name: &'static str,
	up: &'static str,
}

const MIGRATIONS: &[Migration] = &[Migration {
	name: "initial",
	up: "
		CREATE TABLE users (
			id UUID PRIMARY KEY,
			display_name VARCHAR(32) NOT NULL,
			last_scan_at TIMESTAMPTZ,
			created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
		);

		CREATE TABLE channels (
			id UUID PRIMARY KEY,
			external_id VARCHAR(64) NOT NULL UNIQUE,
			name TEXT NOT NULL,
			description TEXT NOT NULL DEFAULT '',
			thumbnail_url TEXT,
			subscriber_count BIGINT NOT NULL DEFAULT 0,
			video_count BIGINT NOT NULL DEFAULT 0,
			created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
			updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
		);

		CREATE INDEX channels_created_at_index ON channels (created_at DESC, id ASC);

		CREATE TABLE user_channels (
			user_id UUID NOT NULL REFERENCES users (id) ON DELETE CASCADE,
			channel_id UUID NOT NULL REFERENCES channels (id) ON DELETE CASCADE,
			created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
			PRIMARY KEY (user_id, channel_id)
		);

		CREATE INDEX user_channels_channel_id_index ON user_channels (channel_id);

		CREATE TABLE clones (
			pair_key VARCHAR(53) PRIMARY KEY,
			user_a UUID NOT NULL REFERENCES users (id) ON DELETE CASCADE,
			user_b UUID NOT NULL REFERENCES users (id) ON DELETE CASCADE,
			match_count INTEGER NOT NULL CHECK (match_count > 0),
			shared_channel_ids UUID[] NOT NULL,
			created_at TIMESTAMPTZ NOT NULL,
			updated_at TIMESTAMPTZ NOT NULL,
			CHECK (user_a < user_b),
			CHECK (cardinality(shared_channel_ids) = match_count)
		);

		CREATE INDEX clones_user_a_index ON clones (user_a);
		CREATE INDEX clones_user_b_index ON clones (user_b);
		CREATE INDEX clones_updated_at_index ON clones (updated_at DESC);
	",
}];

async fn current_version(pool: &Pool) -> anyhow::Result<usize> {
	let client = pool.get().await.context("failed to get database connection")?;

	match client.query_one("SELECT version FROM radar_migrations", &[]).await {
		Ok(row) => Ok(row.try_get::<_, i32>(0)? as usize),
		Err(err) => {
			tracing::info!("initializing database: {}", err);

			client
				.batch_execute(
					"CREATE TABLE radar_migrations (version INTEGER NOT NULL);
					INSERT INTO radar_migrations (version) VALUES (0);",
				)
				.await
				.context("failed to create migration table")?;

			Ok(0)
		}
	}
}

#[tracing::instrument(skip(tx, migration), fields(name = migration.name))]
async fn apply(tx: &Transaction<'_>, version: i32, migration: &Migration) -> anyhow::Result<()> {
	tracing::info!("applying migration");

	tx.batch_execute(migration.up).await.context("failed to apply migration")?;

	tx.execute("UPDATE radar_migrations SET version = $1", &[&version])
		.await
		.context("failed to update migration version")?;

	Ok(())
}

/// Brings the schema up to date, one transaction per migration.
#[tracing::instrument(skip(pool))]
pub async fn run(pool: &Pool) -> anyhow::Result<()> {
	let version = current_version(pool).await?;

	if version > MIGRATIONS.len() {
		anyhow::bail!(
			"database is at version {}, but only {} migrations are available",
			version,
			MIGRATIONS.len()
		);
	}

	for (idx, migration) in MIGRATIONS.iter().enumerate().skip(version) {
		let mut client = pool.get().await.context("failed to get database connection")?;
		let tx = client.transaction().await.context("failed to start transaction")?;

		apply(&tx, idx as i32 + 1, migration).await?;

		tx.commit().await.context("failed to commit migration")?;
	}

	Ok(())
}
