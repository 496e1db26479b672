//! HTTP server exposing the facilitator API.
//!
//! Thin adapters over [`RelayService`]: each handler deserializes its
//! request, hands it to the relay, and maps the outcome onto the wire
//! shapes. Both transfer endpoints share all relay logic and differ only in
//! where the burn destination comes from.

use axum::{
	extract::{Path, State},
	response::Json,
	routing::{get, post},
	Router,
};
use facilitator_config::ApiConfig;
use facilitator_delivery::DeliveryInterface;
use facilitator_relay::{DestinationSource, RelayService};
use facilitator_types::{
	parse_nonce, ApiError, DestinationNonce, DestinationResponse, HealthResponse, NetworkHealth,
	NetworksConfig, ServiceInfo, TransferFromNonceRequest, TransferRequest, TransferResponse,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;

/// Shared application state for the API server.
#[derive(Clone)]
pub struct AppState {
	/// Relay handling transfer submissions.
	pub relay: Arc<RelayService>,
	/// Delivery layer, probed directly by the health endpoint.
	pub delivery: Arc<dyn DeliveryInterface>,
	/// Configured networks, for health probing.
	pub networks: NetworksConfig,
}

/// Builds the API router over the given state.
pub fn create_router(state: AppState) -> Router {
	Router::new()
		.route("/", get(handle_info))
		.route("/health", get(handle_health))
		.route("/transfer", post(handle_transfer))
		.route("/transfer-from-nonce", post(handle_transfer_from_nonce))
		.route("/extract-destination/{nonce}", get(handle_extract_destination))
		.layer(ServiceBuilder::new().layer(CorsLayer::permissive()))
		.with_state(state)
}

/// Starts the HTTP server and serves until the process exits.
pub async fn start_server(
	api_config: ApiConfig,
	state: AppState,
) -> Result<(), Box<dyn std::error::Error>> {
	let app = create_router(state);

	let bind_address = format!("{}:{}", api_config.host, api_config.port);
	let listener = TcpListener::bind(&bind_address).await?;
	tracing::info!("Facilitator API server starting on {}", bind_address);

	axum::serve(listener, app).await?;
	Ok(())
}

/// Handles GET / requests.
async fn handle_info(State(state): State<AppState>) -> Json<ServiceInfo> {
	Json(ServiceInfo {
		service: "facilitator".to_string(),
		version: env!("CARGO_PKG_VERSION").to_string(),
		status: "running".to_string(),
		supported_networks: state.relay.supported_networks(),
	})
}

/// Handles GET /health requests by probing every configured RPC endpoint.
/// Answers 503 when any probe fails.
async fn handle_health(
	State(state): State<AppState>,
) -> (axum::http::StatusCode, Json<HealthResponse>) {
	let mut networks = Vec::new();
	let mut all_answered = true;

	let mut chain_ids: Vec<u64> = state.networks.keys().copied().collect();
	chain_ids.sort_unstable();
	for chain_id in chain_ids {
		match state.delivery.get_block_number(chain_id).await {
			Ok(latest_block) => networks.push(NetworkHealth {
				chain_id,
				latest_block,
			}),
			Err(e) => {
				tracing::warn!(chain_id, error = %e, "health probe failed");
				all_answered = false;
			}
		}
	}

	let (status, code) = if all_answered {
		("healthy", axum::http::StatusCode::OK)
	} else {
		("degraded", axum::http::StatusCode::SERVICE_UNAVAILABLE)
	};
	(
		code,
		Json(HealthResponse {
			status: status.to_string(),
			networks,
		}),
	)
}

/// Handles POST /transfer requests with an explicit destination.
async fn handle_transfer(
	State(state): State<AppState>,
	Json(request): Json<TransferRequest>,
) -> Result<Json<TransferResponse>, ApiError> {
	let destination = DestinationSource::Explicit {
		domain: request.destination_domain,
		address: request.destination_address,
	};
	let tx = state
		.relay
		.relay(&request.signature, request.network, destination)
		.await
		.map_err(|e| {
			tracing::warn!(error = %e, "transfer rejected");
			ApiError::from(e)
		})?;
	Ok(Json(TransferResponse::from(tx)))
}

/// Handles POST /transfer-from-nonce requests; the nonce carries the
/// destination.
async fn handle_transfer_from_nonce(
	State(state): State<AppState>,
	Json(request): Json<TransferFromNonceRequest>,
) -> Result<Json<TransferResponse>, ApiError> {
	let tx = state
		.relay
		.relay(&request.signature, request.network, DestinationSource::FromNonce)
		.await
		.map_err(|e| {
			tracing::warn!(error = %e, "transfer rejected");
			ApiError::from(e)
		})?;
	Ok(Json(TransferResponse::from(tx)))
}

/// Handles GET /extract-destination/{nonce} requests. Pure decoding, no
/// chain interaction.
async fn handle_extract_destination(
	Path(nonce): Path<String>,
) -> Result<Json<DestinationResponse>, ApiError> {
	let nonce = parse_nonce(&nonce).map_err(|e| ApiError::BadRequest {
		error: "invalid_nonce".to_string(),
		message: e.to_string(),
	})?;
	let decoded = DestinationNonce::decode(&nonce);
	Ok(Json(DestinationResponse {
		destination_domain: decoded.domain,
		destination_address: decoded.address.to_string(),
		nonce: format!("{nonce:#x}"),
	}))
}
