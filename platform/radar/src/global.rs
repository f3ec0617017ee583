use std::sync::Arc;

use anyhow::Context as _;

use crate::collection::Collection;
use crate::config::{AppConfig, StoreBackend};
use crate::engine::Engine;
use crate::events::EventBus;
use crate::listing::Listings;
use crate::store::{MemoryStore, PgStore, RadarStore};

pub struct GlobalState {
	config: AppConfig,
	store: Arc<dyn RadarStore>,
	events: EventBus,
	engine: Engine,
	listings: Listings,
	collection: Collection,
}

impl GlobalState {
	pub fn new(config: AppConfig, store: Arc<dyn RadarStore>) -> Self {
		let events = EventBus::new(config.radar.event_capacity);

		Self {
			engine: Engine::new(store.clone(), events.clone(), &config.radar),
			listings: Listings::new(store.clone(), &config.radar),
			collection: Collection::new(store.clone(), events.clone(), config.radar.channel_cap),
			events,
			store,
			config,
		}
	}

	pub fn config(&self) -> &AppConfig {
		&self.config
	}

	pub fn store(&self) -> &Arc<dyn RadarStore> {
		&self.store
	}

	pub fn events(&self) -> &EventBus {
		&self.events
	}

	pub fn engine(&self) -> &Engine {
		&self.engine
	}

	pub fn listings(&self) -> &Listings {
		&self.listings
	}

	pub fn collection(&self) -> &Collection {
		&self.collection
	}
}

/// Builds the configured store backend, running migrations first when asked
/// to.
pub async fn setup_store(config: &AppConfig) -> anyhow::Result<Arc<dyn RadarStore>> {
	match config.database.backend {
		StoreBackend::Memory => {
			tracing::warn!("using the in-memory store, nothing is persisted");
			Ok(Arc::new(MemoryStore::new()))
		}
		StoreBackend::Postgres => {
			let pool = common::database::setup_database(&config.database.uri, config.database.pool_size)?;
			let store = PgStore::new(pool);

			if config.database.migrate {
				store.migrate().await.context("failed to run migrations")?;
			}

			Ok(Arc::new(store))
		}
	}
}
