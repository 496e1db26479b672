//! Request and response types for the facilitator HTTP API.

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::authorization::{BridgeStatus, BridgeTransaction, TransferAuthorization};

/// Body of `POST /transfer`: a signed authorization plus an explicit
/// destination.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferRequest {
	/// The signed EIP-3009 authorization.
	pub signature: TransferAuthorization,
	/// CCTP domain of the destination chain.
	pub destination_domain: u32,
	/// Recipient address on the destination chain.
	pub destination_address: Address,
	/// Source chain id selecting the network to submit on.
	pub network: u64,
}

/// Body of `POST /transfer-from-nonce`: the destination is recovered from
/// the authorization's nonce.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferFromNonceRequest {
	/// The signed EIP-3009 authorization with a destination-encoded nonce.
	pub signature: TransferAuthorization,
	/// Source chain id selecting the network to submit on.
	pub network: u64,
}

/// Result of a relayed transfer.
///
/// Submission outcomes are reported precisely: a missing `tx_hash` never
/// happens here (failures before broadcast are API errors instead), while
/// `status` distinguishes pending from confirmed from reverted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferResponse {
	/// True only when the transaction confirmed without revert.
	pub success: bool,
	/// Hash of the broadcast transaction, 0x-prefixed.
	pub tx_hash: String,
	/// Submission status.
	pub status: BridgeStatus,
	/// Burn reference id from the BurnInitiated event, when confirmed.
	pub burn_reference: Option<u64>,
	/// Human-readable summary.
	pub message: String,
}

impl From<BridgeTransaction> for TransferResponse {
	fn from(tx: BridgeTransaction) -> Self {
		let message = match tx.status {
			BridgeStatus::Pending => {
				"Transaction broadcast, awaiting confirmation; do not resubmit".to_string()
			}
			BridgeStatus::Confirmed => "Transfer completed".to_string(),
			BridgeStatus::Reverted => {
				"Transaction reverted on-chain; the authorization is single-use, do not retry"
					.to_string()
			}
		};
		Self {
			success: tx.status == BridgeStatus::Confirmed,
			tx_hash: format!("{:#x}", tx.tx_hash),
			status: tx.status,
			burn_reference: tx.burn_reference,
			message,
		}
	}
}

/// Response of `GET /extract-destination/{nonce}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DestinationResponse {
	/// Decoded CCTP destination domain.
	pub destination_domain: u32,
	/// Decoded destination address, 0x-prefixed.
	pub destination_address: String,
	/// The nonce that was decoded, 0x-prefixed.
	pub nonce: String,
}

/// Per-network liveness data in the health response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkHealth {
	/// Chain id.
	pub chain_id: u64,
	/// Latest block observed at the RPC endpoint.
	pub latest_block: u64,
}

/// Response of `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
	/// "healthy" when every configured network answered.
	pub status: String,
	/// Probe results per network.
	pub networks: Vec<NetworkHealth>,
}

/// Response of `GET /`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceInfo {
	/// Service name.
	pub service: String,
	/// Crate version.
	pub version: String,
	/// Always "running".
	pub status: String,
	/// Chain ids the relay accepts.
	pub supported_networks: Vec<u64>,
}

/// Error payload returned by every failing endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
	/// Stable error code.
	pub error: String,
	/// Human-readable description.
	pub message: String,
	/// Suggested retry delay in seconds, for transient failures only.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub retry_after: Option<u64>,
}

/// Structured API error with HTTP status mapping.
///
/// Only failures where nothing was broadcast become API errors; a revert
/// after submission travels in a [`TransferResponse`] so the caller keeps
/// the transaction hash.
#[derive(Debug)]
pub enum ApiError {
	/// Malformed request (400). Non-retryable as-is.
	BadRequest { error: String, message: String },
	/// Valid request the chain will never accept, e.g. expired
	/// authorization (422). Terminal for that authorization.
	UnprocessableEntity { error: String, message: String },
	/// Transient failure before anything was broadcast (503). Safe to retry.
	ServiceUnavailable {
		error: String,
		message: String,
		retry_after: Option<u64>,
	},
	/// Unexpected failure (500).
	Internal { message: String },
}

impl ApiError {
	/// HTTP status code for this error.
	pub fn status_code(&self) -> u16 {
		match self {
			ApiError::BadRequest { .. } => 400,
			ApiError::UnprocessableEntity { .. } => 422,
			ApiError::ServiceUnavailable { .. } => 503,
			ApiError::Internal { .. } => 500,
		}
	}

	fn to_error_response(&self) -> ErrorResponse {
		match self {
			ApiError::BadRequest { error, message }
			| ApiError::UnprocessableEntity { error, message } => ErrorResponse {
				error: error.clone(),
				message: message.clone(),
				retry_after: None,
			},
			ApiError::ServiceUnavailable {
				error,
				message,
				retry_after,
			} => ErrorResponse {
				error: error.clone(),
				message: message.clone(),
				retry_after: *retry_after,
			},
			ApiError::Internal { message } => ErrorResponse {
				error: "internal_error".to_string(),
				message: message.clone(),
				retry_after: None,
			},
		}
	}
}

impl fmt::Display for ApiError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let resp = self.to_error_response();
		write!(f, "{} ({}): {}", resp.error, self.status_code(), resp.message)
	}
}

impl std::error::Error for ApiError {}

impl axum::response::IntoResponse for ApiError {
	fn into_response(self) -> axum::response::Response {
		use axum::{http::StatusCode, response::Json};

		let status = StatusCode::from_u16(self.status_code())
			.unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
		(status, Json(self.to_error_response())).into_response()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use alloy_primitives::B256;

	#[test]
	fn transfer_response_reflects_status() {
		let confirmed = TransferResponse::from(BridgeTransaction {
			tx_hash: B256::repeat_byte(0xab),
			status: BridgeStatus::Confirmed,
			burn_reference: Some(7),
		});
		assert!(confirmed.success);
		assert_eq!(confirmed.burn_reference, Some(7));
		assert!(confirmed.tx_hash.starts_with("0x"));

		let reverted = TransferResponse::from(BridgeTransaction {
			tx_hash: B256::repeat_byte(0xab),
			status: BridgeStatus::Reverted,
			burn_reference: None,
		});
		assert!(!reverted.success);
		assert!(reverted.message.contains("do not retry"));
	}

	#[test]
	fn error_status_codes() {
		let err = ApiError::ServiceUnavailable {
			error: "network_transient".into(),
			message: "rpc timeout".into(),
			retry_after: Some(5),
		};
		assert_eq!(err.status_code(), 503);
		let body = serde_json::to_value(err.to_error_response()).unwrap();
		assert_eq!(body["retry_after"], 5);
	}
}
