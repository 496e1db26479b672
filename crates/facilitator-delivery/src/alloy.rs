//! Alloy-based EVM delivery implementation.
//!
//! One instance serves every configured network with a shared signer. The
//! provider's wallet signs outgoing transactions; explicit nonces come from
//! the [`NonceManager`] so concurrent relay requests serialize correctly.

use alloy_network::EthereumWallet;
use alloy_primitives::{Address, B256, U256};
use alloy_provider::{Provider, ProviderBuilder};
use alloy_rpc_types::TransactionRequest;
use alloy_signer::Signer;
use alloy_signer_local::PrivateKeySigner;
use alloy_transport_http::Http;
use async_trait::async_trait;
use facilitator_types::{NetworksConfig, SecretString, TransactionReceipt};
use std::collections::HashMap;
use std::sync::Arc;

use crate::{DeliveryError, DeliveryInterface, NonceManager};

/// Delivery provider backed by alloy HTTP providers.
pub struct AlloyDelivery {
	/// Alloy providers per supported chain.
	providers: HashMap<u64, Arc<dyn Provider<Http<reqwest::Client>> + Send + Sync>>,
	/// Gas-paying account address.
	sender: Address,
	/// Outgoing nonce serialization for the gas account.
	nonces: NonceManager,
	/// Receipt poll interval.
	poll_interval: std::time::Duration,
}

impl AlloyDelivery {
	/// Creates providers for every configured network, each with a wallet
	/// bound to that network's chain id.
	pub fn new(
		networks: &NetworksConfig,
		private_key: &SecretString,
		poll_interval_secs: u64,
	) -> Result<Self, DeliveryError> {
		if networks.is_empty() {
			return Err(DeliveryError::Network(
				"at least one network must be configured".to_string(),
			));
		}

		let signer: PrivateKeySigner = private_key
			.with_exposed(|key| key.parse())
			.map_err(|e| DeliveryError::Network(format!("Invalid private key: {}", e)))?;
		let sender = signer.address();

		let mut providers = HashMap::new();
		for (chain_id, network) in networks {
			let url = network.rpc_url.parse().map_err(|e| {
				DeliveryError::Network(format!("Invalid RPC URL for chain {}: {}", chain_id, e))
			})?;

			let chain_signer = signer.clone().with_chain_id(Some(*chain_id));
			let wallet = EthereumWallet::from(chain_signer);

			let provider = ProviderBuilder::new()
				.with_recommended_fillers()
				.wallet(wallet)
				.on_http(url);

			providers.insert(
				*chain_id,
				Arc::new(provider) as Arc<dyn Provider<Http<reqwest::Client>> + Send + Sync>,
			);
		}

		Ok(Self {
			providers,
			sender,
			nonces: NonceManager::new(),
			poll_interval: std::time::Duration::from_secs(poll_interval_secs),
		})
	}

	fn provider(
		&self,
		chain_id: u64,
	) -> Result<&Arc<dyn Provider<Http<reqwest::Client>> + Send + Sync>, DeliveryError> {
		self.providers
			.get(&chain_id)
			.ok_or(DeliveryError::NoProviderAvailable(chain_id))
	}
}

/// Maps an RPC send failure onto the delivery taxonomy. A gas shortfall is
/// fatal until the operator tops up; everything else is transient.
fn classify_send_error(message: String) -> DeliveryError {
	if message.to_lowercase().contains("insufficient funds") {
		DeliveryError::InsufficientFunds(message)
	} else {
		DeliveryError::Network(message)
	}
}

/// Seconds to wait for the requested confirmation depth. ~20s per
/// confirmation covers typical block times, capped at an hour.
fn confirmation_timeout(confirmations: u64) -> u64 {
	let seconds_per_confirmation = 20;
	confirmations
		.saturating_mul(seconds_per_confirmation)
		.max(seconds_per_confirmation)
		.min(3600)
}

fn convert_receipt(receipt: alloy_rpc_types::TransactionReceipt) -> TransactionReceipt {
	TransactionReceipt {
		hash: receipt.transaction_hash,
		block_number: receipt.block_number.unwrap_or(0),
		success: receipt.status(),
		logs: receipt
			.inner
			.logs()
			.iter()
			.map(|log| log.inner.clone())
			.collect(),
	}
}

#[async_trait]
impl DeliveryInterface for AlloyDelivery {
	async fn submit(
		&self,
		chain_id: u64,
		to: Address,
		calldata: Vec<u8>,
		gas_limit: u64,
	) -> Result<B256, DeliveryError> {
		let provider = self.provider(chain_id)?;

		// Fetch the chain's view before locking; the reservation reconciles
		// it with the local counter.
		let onchain_next = provider
			.get_transaction_count(self.sender)
			.await
			.map_err(|e| DeliveryError::Network(format!("Failed to get nonce: {}", e)))?;
		let reservation = self.nonces.reserve(chain_id, onchain_next).await;

		let request = TransactionRequest::default()
			.from(self.sender)
			.to(to)
			.input(calldata.into())
			.nonce(reservation.nonce())
			.gas_limit(gas_limit);

		let pending = provider
			.send_transaction(request)
			.await
			.map_err(|e| classify_send_error(format!("Failed to send transaction: {}", e)))?;

		let tx_hash = *pending.tx_hash();
		reservation.commit();
		tracing::info!(tx_hash = %format!("{:#x}", tx_hash), chain_id, "Submitted transaction");

		Ok(tx_hash)
	}

	async fn get_receipt(
		&self,
		chain_id: u64,
		hash: B256,
	) -> Result<Option<TransactionReceipt>, DeliveryError> {
		let provider = self.provider(chain_id)?;

		match provider.get_transaction_receipt(hash).await {
			Ok(receipt) => Ok(receipt.map(convert_receipt)),
			Err(e) => Err(DeliveryError::Network(format!(
				"Failed to get receipt on chain {}: {}",
				chain_id, e
			))),
		}
	}

	async fn wait_for_confirmation(
		&self,
		chain_id: u64,
		hash: B256,
		confirmations: u64,
	) -> Result<TransactionReceipt, DeliveryError> {
		let timeout_seconds = confirmation_timeout(confirmations);
		let max_wait = tokio::time::Duration::from_secs(timeout_seconds);
		let start = tokio::time::Instant::now();

		tracing::debug!(
			chain_id,
			confirmations,
			timeout_seconds,
			"Waiting for confirmations"
		);

		let provider = self.provider(chain_id)?;

		loop {
			if start.elapsed() > max_wait {
				return Err(DeliveryError::Network(format!(
					"Timeout waiting for {} confirmations after {}s",
					confirmations, timeout_seconds
				)));
			}

			let receipt = match provider.get_transaction_receipt(hash).await {
				Ok(Some(receipt)) => receipt,
				Ok(None) => {
					tokio::time::sleep(self.poll_interval).await;
					continue;
				}
				Err(e) => {
					return Err(DeliveryError::Network(format!(
						"Failed to get receipt: {}",
						e
					)));
				}
			};

			let current_block = provider.get_block_number().await.map_err(|e| {
				DeliveryError::Network(format!("Failed to get block number: {}", e))
			})?;

			let tx_block = receipt.block_number.unwrap_or(0);
			if current_block.saturating_sub(tx_block) + 1 >= confirmations {
				return Ok(convert_receipt(receipt));
			}

			tokio::time::sleep(self.poll_interval).await;
		}
	}

	async fn get_balance(&self, chain_id: u64, address: Address) -> Result<U256, DeliveryError> {
		let provider = self.provider(chain_id)?;

		provider
			.get_balance(address)
			.await
			.map_err(|e| DeliveryError::Network(format!("Failed to get balance: {}", e)))
	}

	async fn get_block_number(&self, chain_id: u64) -> Result<u64, DeliveryError> {
		let provider = self.provider(chain_id)?;

		provider
			.get_block_number()
			.await
			.map_err(|e| DeliveryError::Network(format!("Failed to get block number: {}", e)))
	}

	fn sender(&self) -> Address {
		self.sender
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn gas_shortfall_is_classified() {
		let err = classify_send_error("server returned: Insufficient funds for gas".into());
		assert!(matches!(err, DeliveryError::InsufficientFunds(_)));

		let err = classify_send_error("connection reset by peer".into());
		assert!(matches!(err, DeliveryError::Network(_)));
	}

	#[test]
	fn confirmation_timeout_is_bounded() {
		assert_eq!(confirmation_timeout(0), 20);
		assert_eq!(confirmation_timeout(1), 20);
		assert_eq!(confirmation_timeout(12), 240);
		assert_eq!(confirmation_timeout(1_000), 3600);
		assert_eq!(confirmation_timeout(u64::MAX), 3600);
	}
}
