//! Network configuration for multi-chain relaying.
//!
//! Each supported chain carries its RPC endpoint, the deployed bridge
//! contract, and the EIP-3009 token the bridge custodies. Networks are keyed
//! by chain id; TOML tables use string keys, so a custom deserializer
//! converts them.

use alloy_primitives::Address;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;

/// Settings for one blockchain network.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct NetworkConfig {
	/// HTTP(S) RPC endpoint.
	pub rpc_url: String,
	/// Deployed bridge contract address.
	pub bridge_address: Address,
	/// EIP-3009 token the bridge moves (USDC).
	pub token_address: Address,
	/// Token EIP-712 domain name.
	#[serde(default = "default_token_name")]
	pub token_name: String,
	/// Token EIP-712 domain version.
	#[serde(default = "default_token_version")]
	pub token_version: String,
}

fn default_token_name() -> String {
	"USDC".to_string()
}

fn default_token_version() -> String {
	"2".to_string()
}

/// Map of chain id to network configuration.
pub type NetworksConfig = HashMap<u64, NetworkConfig>;

/// Deserializes networks from a TOML table with string chain-id keys.
pub fn deserialize_networks<'de, D>(deserializer: D) -> Result<NetworksConfig, D::Error>
where
	D: Deserializer<'de>,
{
	let string_map: HashMap<String, NetworkConfig> = HashMap::deserialize(deserializer)?;
	let mut result = HashMap::new();

	for (key, value) in string_map {
		let chain_id = key
			.parse::<u64>()
			.map_err(|e| serde::de::Error::custom(format!("Invalid chain id '{}': {}", key, e)))?;
		result.insert(chain_id, value);
	}

	Ok(result)
}
