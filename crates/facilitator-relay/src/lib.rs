//! Relay service: validates signed authorizations and shepherds them
//! on-chain.
//!
//! The relay is deliberately conservative about what it submits. Every check
//! the bridge contract performs cheaply is repeated here first, because a
//! rejected submission still consumes the payer's single-use authorization
//! window and the relay's gas. Failures are classified by whether anything
//! was broadcast: pre-submission failures surface as errors, while anything
//! that happened after broadcast travels in a [`BridgeTransaction`] so the
//! caller keeps the transaction hash.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use alloy_primitives::{Address, B256};
use facilitator_bridge::{
	burn_reference_from_logs, transfer_and_burn_calldata, transfer_and_burn_from_nonce_calldata,
};
use facilitator_config::RelayConfig;
use facilitator_delivery::{DeliveryError, DeliveryInterface};
use facilitator_types::{
	nonce::address_to_bytes32, ApiError, BridgeStatus, BridgeTransaction, DestinationNonce,
	NetworkConfig, NetworksConfig, TransferAuthorization,
};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Relay failure before anything was broadcast.
#[derive(Debug, Error)]
pub enum RelayError {
	/// The signature is structurally invalid and can never recover a payer.
	#[error("Invalid signature: {0}")]
	SignatureInvalid(String),
	/// The request contradicts itself or the configured bridge.
	#[error("Invalid request: {0}")]
	InvalidRequest(String),
	/// The authorization window has closed; a new one must be signed.
	#[error("Authorization expired or already used: {0}")]
	AuthorizationExpiredOrReused(String),
	/// The requested chain id is not configured.
	#[error("Unknown network: {0}")]
	UnknownNetwork(u64),
	/// Transient RPC failure; nothing was broadcast and retrying is safe.
	#[error("Network error: {0}")]
	NetworkTransient(String),
	/// The gas account cannot fund the submission.
	#[error("Insufficient gas funds: {0}")]
	InsufficientFunds(String),
}

impl From<DeliveryError> for RelayError {
	fn from(err: DeliveryError) -> Self {
		match err {
			DeliveryError::Network(msg) => RelayError::NetworkTransient(msg),
			DeliveryError::InsufficientFunds(msg) => RelayError::InsufficientFunds(msg),
			DeliveryError::NoProviderAvailable(chain_id) => RelayError::UnknownNetwork(chain_id),
		}
	}
}

impl From<RelayError> for ApiError {
	fn from(err: RelayError) -> Self {
		match err {
			RelayError::SignatureInvalid(message) => ApiError::BadRequest {
				error: "signature_invalid".to_string(),
				message,
			},
			RelayError::InvalidRequest(message) => ApiError::BadRequest {
				error: "invalid_request".to_string(),
				message,
			},
			RelayError::UnknownNetwork(chain_id) => ApiError::BadRequest {
				error: "unknown_network".to_string(),
				message: format!("chain id {chain_id} is not supported"),
			},
			RelayError::AuthorizationExpiredOrReused(message) => ApiError::UnprocessableEntity {
				error: "authorization_expired_or_reused".to_string(),
				message,
			},
			RelayError::NetworkTransient(message) => ApiError::ServiceUnavailable {
				error: "network_transient".to_string(),
				message,
				retry_after: Some(5),
			},
			RelayError::InsufficientFunds(message) => ApiError::ServiceUnavailable {
				error: "insufficient_funds".to_string(),
				message,
				retry_after: Some(60),
			},
		}
	}
}

/// Where the burn destination comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DestinationSource {
	/// Supplied explicitly alongside the authorization.
	Explicit { domain: u32, address: Address },
	/// Decoded on-chain from the authorization nonce.
	FromNonce,
}

/// Validates authorizations and relays them to the bridge contract.
pub struct RelayService {
	delivery: Arc<dyn DeliveryInterface>,
	networks: NetworksConfig,
	config: RelayConfig,
}

impl RelayService {
	pub fn new(
		delivery: Arc<dyn DeliveryInterface>,
		networks: NetworksConfig,
		config: RelayConfig,
	) -> Self {
		Self {
			delivery,
			networks,
			config,
		}
	}

	/// Chain ids this relay accepts, sorted for stable output.
	pub fn supported_networks(&self) -> Vec<u64> {
		let mut ids: Vec<u64> = self.networks.keys().copied().collect();
		ids.sort_unstable();
		ids
	}

	/// Relays a signed authorization as a transfer-and-burn call on
	/// `chain_id`.
	///
	/// On success the returned transaction is `Confirmed` with its burn
	/// reference, `Reverted` if the chain rejected it, or `Pending` when
	/// receipt waiting is disabled or the RPC went away after broadcast.
	pub async fn relay(
		&self,
		auth: &TransferAuthorization,
		chain_id: u64,
		destination: DestinationSource,
	) -> Result<BridgeTransaction, RelayError> {
		let network = self
			.networks
			.get(&chain_id)
			.ok_or(RelayError::UnknownNetwork(chain_id))?;

		self.validate(auth, network)?;

		let calldata = match destination {
			DestinationSource::Explicit { domain, address } => {
				transfer_and_burn_calldata(auth, domain, address_to_bytes32(&address))
			}
			DestinationSource::FromNonce => {
				let decoded = DestinationNonce::decode(&auth.nonce);
				debug!(
					domain = decoded.domain,
					address = %decoded.address,
					"destination decoded from nonce"
				);
				transfer_and_burn_from_nonce_calldata(auth)
			}
		};

		let tx_hash = self
			.delivery
			.submit(
				chain_id,
				network.bridge_address,
				calldata,
				self.config.gas_limit,
			)
			.await?;
		info!(chain_id, tx_hash = %tx_hash, payer = %auth.from, "bridge transfer submitted");

		if !self.config.wait_for_receipt {
			return Ok(BridgeTransaction {
				tx_hash,
				status: BridgeStatus::Pending,
				burn_reference: None,
			});
		}

		match self
			.delivery
			.wait_for_confirmation(chain_id, tx_hash, self.config.confirmations)
			.await
		{
			Ok(receipt) if receipt.success => {
				let burn_reference =
					burn_reference_from_logs(&receipt.logs, network.bridge_address);
				info!(chain_id, tx_hash = %tx_hash, ?burn_reference, "bridge transfer confirmed");
				Ok(BridgeTransaction {
					tx_hash,
					status: BridgeStatus::Confirmed,
					burn_reference,
				})
			}
			Ok(_) => {
				warn!(chain_id, tx_hash = %tx_hash, "bridge transfer reverted on-chain");
				Ok(BridgeTransaction {
					tx_hash,
					status: BridgeStatus::Reverted,
					burn_reference: None,
				})
			}
			// The transaction is out; losing the RPC afterwards must not be
			// reported as a failure or the caller may resubmit.
			Err(e) => {
				warn!(chain_id, tx_hash = %tx_hash, error = %e, "confirmation wait failed, reporting pending");
				Ok(BridgeTransaction {
					tx_hash,
					status: BridgeStatus::Pending,
					burn_reference: None,
				})
			}
		}
	}

	fn validate(
		&self,
		auth: &TransferAuthorization,
		network: &NetworkConfig,
	) -> Result<(), RelayError> {
		if auth.v != 27 && auth.v != 28 {
			return Err(RelayError::SignatureInvalid(format!(
				"recovery id must be 27 or 28, got {}",
				auth.v
			)));
		}
		if auth.r == B256::ZERO || auth.s == B256::ZERO {
			return Err(RelayError::SignatureInvalid(
				"signature scalars must be non-zero".to_string(),
			));
		}
		if auth.value.is_zero() {
			return Err(RelayError::InvalidRequest(
				"amount must be greater than zero".to_string(),
			));
		}
		if auth.valid_after >= auth.valid_before {
			return Err(RelayError::InvalidRequest(format!(
				"validity window is empty: validAfter {} >= validBefore {}",
				auth.valid_after, auth.valid_before
			)));
		}
		if auth.to != network.bridge_address {
			return Err(RelayError::InvalidRequest(format!(
				"authorization pays {}, expected the bridge contract {}",
				auth.to, network.bridge_address
			)));
		}

		let now = unix_now();
		if auth.is_expired(now) {
			return Err(RelayError::AuthorizationExpiredOrReused(format!(
				"validBefore {} has passed (now {})",
				auth.valid_before, now
			)));
		}
		if now <= auth.valid_after {
			return Err(RelayError::InvalidRequest(format!(
				"authorization only becomes valid after {}",
				auth.valid_after
			)));
		}
		Ok(())
	}
}

fn unix_now() -> u64 {
	SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.map(|d| d.as_secs())
		.unwrap_or_default()
}
