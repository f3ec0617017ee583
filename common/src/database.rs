use std::sync::Arc;

use anyhow::Context as _;
pub use deadpool_postgres::Pool;
use deadpool_postgres::{Manager, ManagerConfig, RecyclingMethod, Runtime};
use tokio_postgres::NoTls;
pub use {deadpool_postgres, tokio_postgres};

/// Builds a connection pool. Connections are opened lazily, so this does not
/// fail when the database is unreachable.
pub fn setup_database(uri: &str, pool_size: usize) -> anyhow::Result<Arc<Pool>> {
	let pg_config = uri
		.parse::<tokio_postgres::Config>()
		.context("failed to parse database uri")?;

	let manager = Manager::from_config(
		pg_config,
		NoTls,
		ManagerConfig {
			recycling_method: RecyclingMethod::Fast,
		},
	);

	Ok(Arc::new(
		Pool::builder(manager)
			.max_size(pool_size)
			.runtime(Runtime::Tokio1)
			.build()
			.context("failed to create database pool")?,
	))
}
