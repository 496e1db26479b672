//! Configuration for the facilitator service.
//!
//! Configuration is loaded from a TOML file with `${ENV_VAR}` and
//! `${ENV_VAR:-default}` substitution, so the gas-paying private key and RPC
//! endpoints stay out of the file itself. All values are validated on load.

use facilitator_types::{deserialize_networks, NetworksConfig, SecretString};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// File could not be read.
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	/// TOML was malformed.
	#[error("Configuration error: {0}")]
	Parse(String),
	/// Values were present but unusable.
	#[error("Validation error: {0}")]
	Validation(String),
}

impl From<toml::de::Error> for ConfigError {
	fn from(err: toml::de::Error) -> Self {
		ConfigError::Parse(err.message().to_string())
	}
}

/// Top-level facilitator configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
	/// Instance identity.
	pub facilitator: FacilitatorConfig,
	/// Supported networks keyed by chain id.
	#[serde(deserialize_with = "deserialize_networks")]
	pub networks: NetworksConfig,
	/// Gas-paying account.
	pub account: AccountConfig,
	/// Relay submission behavior.
	#[serde(default)]
	pub relay: RelayConfig,
	/// HTTP API server settings.
	#[serde(default)]
	pub api: ApiConfig,
}

/// Identity of this facilitator instance.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FacilitatorConfig {
	/// Unique identifier used in logs.
	pub id: String,
}

/// The relay's gas-paying account.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AccountConfig {
	/// Hex-encoded secp256k1 private key, usually `${PRIVATE_KEY}`.
	pub private_key: SecretString,
}

/// Submission and confirmation behavior.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RelayConfig {
	/// Confirmations to wait for before reporting Confirmed.
	#[serde(default = "default_confirmations")]
	pub confirmations: u64,
	/// Seconds between receipt polls.
	#[serde(default = "default_poll_interval_secs")]
	pub poll_interval_secs: u64,
	/// Gas limit for bridge calls.
	#[serde(default = "default_gas_limit")]
	pub gas_limit: u64,
	/// When false, respond as soon as the transaction is broadcast instead
	/// of waiting for a receipt.
	#[serde(default = "default_wait_for_receipt")]
	pub wait_for_receipt: bool,
}

impl Default for RelayConfig {
	fn default() -> Self {
		Self {
			confirmations: default_confirmations(),
			poll_interval_secs: default_poll_interval_secs(),
			gas_limit: default_gas_limit(),
			wait_for_receipt: default_wait_for_receipt(),
		}
	}
}

fn default_confirmations() -> u64 {
	1
}

fn default_poll_interval_secs() -> u64 {
	7
}

fn default_gas_limit() -> u64 {
	300_000
}

fn default_wait_for_receipt() -> bool {
	true
}

/// HTTP API server settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
	/// Whether to start the HTTP server.
	#[serde(default = "default_api_enabled")]
	pub enabled: bool,
	/// Bind address.
	#[serde(default = "default_api_host")]
	pub host: String,
	/// Bind port.
	#[serde(default = "default_api_port")]
	pub port: u16,
}

impl Default for ApiConfig {
	fn default() -> Self {
		Self {
			enabled: default_api_enabled(),
			host: default_api_host(),
			port: default_api_port(),
		}
	}
}

fn default_api_enabled() -> bool {
	true
}

fn default_api_host() -> String {
	"127.0.0.1".to_string()
}

fn default_api_port() -> u16 {
	8000
}

impl Config {
	/// Loads configuration from a TOML file, resolving environment
	/// variables first.
	pub fn from_file(path: &str) -> Result<Self, ConfigError> {
		let content = std::fs::read_to_string(path)?;
		content.parse()
	}

	/// Validates semantic constraints the type system cannot express.
	pub fn validate(&self) -> Result<(), ConfigError> {
		if self.facilitator.id.is_empty() {
			return Err(ConfigError::Validation(
				"facilitator.id must not be empty".into(),
			));
		}
		if self.networks.is_empty() {
			return Err(ConfigError::Validation(
				"at least one network must be configured".into(),
			));
		}
		for (chain_id, network) in &self.networks {
			if network.rpc_url.is_empty() {
				return Err(ConfigError::Validation(format!(
					"networks.{}.rpc_url must not be empty",
					chain_id
				)));
			}
		}
		if self.account.private_key.is_empty() {
			return Err(ConfigError::Validation(
				"account.private_key must not be empty".into(),
			));
		}
		let key_len = self
			.account
			.private_key
			.with_exposed(|k| k.strip_prefix("0x").unwrap_or(k).len());
		if key_len != 64 {
			return Err(ConfigError::Validation(
				"account.private_key must be a 32-byte hex string".into(),
			));
		}
		Ok(())
	}
}

impl FromStr for Config {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let resolved = resolve_env_vars(s)?;
		let config: Config = toml::from_str(&resolved)?;
		config.validate()?;
		Ok(config)
	}
}

/// Replaces `${VAR}` and `${VAR:-default}` occurrences with environment
/// values. A reference without a default to an unset variable is an error.
fn resolve_env_vars(input: &str) -> Result<String, ConfigError> {
	let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]{0,127})(?::-([^}]{0,256}))?\}")
		.map_err(|e| ConfigError::Parse(format!("Regex error: {}", e)))?;

	let mut result = input.to_string();
	let mut replacements = Vec::new();

	for cap in re.captures_iter(input) {
		let full_match = cap.get(0).unwrap();
		let var_name = cap.get(1).unwrap().as_str();
		let default_value = cap.get(2).map(|m| m.as_str());

		let value = match std::env::var(var_name) {
			Ok(v) => v,
			Err(_) => match default_value {
				Some(default) => default.to_string(),
				None => {
					return Err(ConfigError::Validation(format!(
						"Environment variable '{}' not found",
						var_name
					)))
				}
			},
		};

		replacements.push((full_match.start(), full_match.end(), value));
	}

	// Apply in reverse to keep earlier offsets valid.
	for (start, end, value) in replacements.iter().rev() {
		result.replace_range(start..end, value);
	}

	Ok(result)
}
