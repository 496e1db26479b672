//! Main entry point for the facilitator service.
//!
//! This binary wires the components together: configuration, the delivery
//! layer holding the gas-paying key, the relay, and the HTTP API server.

use clap::Parser;
use facilitator_config::Config;
use facilitator_delivery::{AlloyDelivery, DeliveryInterface};
use facilitator_relay::RelayService;
use std::path::PathBuf;
use std::sync::Arc;

mod server;

use server::AppState;

/// Command-line arguments for the facilitator service.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
	/// Path to configuration file
	#[arg(short, long, default_value = "facilitator.toml")]
	config: PathBuf,

	/// Log level (trace, debug, info, warn, error)
	#[arg(short, long, default_value = "info")]
	log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	// Initialize tracing with env filter
	use tracing_subscriber::{fmt, EnvFilter};

	let env_filter = EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| EnvFilter::new(args.log_level.clone()));

	fmt()
		.with_env_filter(env_filter)
		.with_thread_ids(true)
		.with_target(true)
		.init();

	let config = Config::from_file(&args.config.to_string_lossy())?;
	tracing::info!("Loaded configuration [{}]", config.facilitator.id);

	let delivery: Arc<dyn DeliveryInterface> = Arc::new(AlloyDelivery::new(
		&config.networks,
		&config.account.private_key,
		config.relay.poll_interval_secs,
	)?);
	tracing::info!(
		sender = %delivery.sender(),
		networks = config.networks.len(),
		"delivery layer initialized"
	);

	let relay = Arc::new(RelayService::new(
		delivery.clone(),
		config.networks.clone(),
		config.relay.clone(),
	));

	if !config.api.enabled {
		tracing::warn!("API server disabled in configuration, nothing to do");
		return Ok(());
	}

	let state = AppState {
		relay,
		delivery,
		networks: config.networks.clone(),
	};

	tokio::select! {
		result = server::start_server(config.api.clone(), state) => {
			result?;
		}
		_ = tokio::signal::ctrl_c() => {
			tracing::info!("Received shutdown signal");
		}
	}

	Ok(())
}
