//! Common types for the CCTP transfer facilitator.
//!
//! This crate defines the data model shared by every facilitator component:
//! signed transfer authorizations, destination-carrying nonces, bridge
//! transaction state, API request/response shapes, and the EIP-712 helpers
//! used both when producing and when verifying authorization signatures.

/// HTTP API request/response types and the structured API error.
pub mod api;
/// Transfer authorization and bridge transaction types.
pub mod authorization;
/// Transaction hashes and receipts returned by delivery providers.
pub mod delivery;
/// EIP-712 hashing helpers for EIP-3009 authorizations.
pub mod eip712;
/// Network configuration keyed by chain id.
pub mod networks;
/// Destination-carrying nonce encoding and decoding.
pub mod nonce;
/// Secret wrapper for private key material.
pub mod secret_string;

// Re-export all types for convenient access
pub use api::*;
pub use authorization::*;
pub use delivery::*;
pub use networks::{deserialize_networks, NetworkConfig, NetworksConfig};
pub use nonce::*;
pub use secret_string::SecretString;

// The facilitator is EVM-only, so the alloy primitive types are used
// directly instead of wrapping them.
pub use alloy_primitives::{Address, B256, U256};
