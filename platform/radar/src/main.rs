use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context as _, Result};
use common::logging;
use common::signal::SignalHandler;
use radar::config::AppConfig;
use radar::global::{self, GlobalState};
use tokio::signal::unix::SignalKind;
use tokio::{select, time};

#[tokio::main]
async fn main() -> Result<()> {
	let config = AppConfig::parse()?;

	logging::init(&config.logging.level, config.logging.mode)?;

	if let Some(file) = &config.config_file {
		tracing::info!(file = file, "loaded config from file");
	}

	tracing::debug!("config: {:#?}", config);

	let store = global::setup_store(&config).await?;
	let global = Arc::new(GlobalState::new(config, store));

	let (shutdown_send, shutdown_recv) = tokio::sync::oneshot::channel::<()>();
	let mut api_future = tokio::spawn(radar::api::run(global.clone(), async move {
		shutdown_recv.await.ok();
	}));

	// Listen on both sigint and sigterm and stop the api when either is received
	let mut signal_handler = SignalHandler::new()
		.with_signal(SignalKind::interrupt())
		.with_signal(SignalKind::terminate());

	select! {
		r = &mut api_future => {
			r.context("api task panicked")??;
			anyhow::bail!("api stopped unexpectedly");
		}
		_ = signal_handler.recv() => tracing::info!("shutting down"),
	}

	shutdown_send.send(()).ok();

	tracing::info!("waiting for requests to finish");

	select! {
		_ = time::sleep(Duration::from_secs(60)) => tracing::warn!("force shutting down"),
		_ = signal_handler.recv() => tracing::warn!("force shutting down"),
		r = api_future => match r {
			Ok(Ok(())) => tracing::info!("shut down"),
			Ok(Err(err)) => tracing::error!(error = %err, "api failed while shutting down"),
			Err(err) => tracing::error!(error = %err, "api task panicked"),
		},
	}

	Ok(())
}
