//! Transaction delivery for the facilitator.
//!
//! This crate submits bridge calls to EVM networks and tracks their
//! confirmation. It owns the one genuine concurrency hazard in the relay:
//! the gas-paying account must never broadcast two transactions with the
//! same ledger sequence number, so all outgoing submissions pass through a
//! per-chain [`NonceManager`].

use alloy_primitives::{Address, B256, U256};
use async_trait::async_trait;
use facilitator_types::TransactionReceipt;
use thiserror::Error;

mod alloy;
mod nonce_manager;

pub use alloy::AlloyDelivery;
pub use nonce_manager::{NonceManager, NonceReservation};

/// Errors that can occur during transaction delivery.
#[derive(Debug, Error)]
pub enum DeliveryError {
	/// RPC or connectivity failure. Nothing was necessarily broadcast.
	#[error("Network error: {0}")]
	Network(String),
	/// The gas account cannot pay for the transaction.
	#[error("Insufficient gas funds: {0}")]
	InsufficientFunds(String),
	/// No provider is configured for the requested chain.
	#[error("No provider configured for chain {0}")]
	NoProviderAvailable(u64),
}

/// Interface for blockchain transaction submission and monitoring.
///
/// Implementations sign with the relay's own key and pay gas; the payer's
/// funds only move when the chain executes the carried authorization.
#[async_trait]
pub trait DeliveryInterface: Send + Sync {
	/// Submits a transaction carrying `calldata` to `to` and returns its
	/// hash. Returning `Ok` means the transaction was broadcast; it says
	/// nothing about execution success.
	async fn submit(
		&self,
		chain_id: u64,
		to: Address,
		calldata: Vec<u8>,
		gas_limit: u64,
	) -> Result<B256, DeliveryError>;

	/// Fetches the receipt for a transaction, or `None` while unmined.
	async fn get_receipt(
		&self,
		chain_id: u64,
		hash: B256,
	) -> Result<Option<TransactionReceipt>, DeliveryError>;

	/// Blocks until the transaction has `confirmations` confirmations or a
	/// timeout elapses.
	async fn wait_for_confirmation(
		&self,
		chain_id: u64,
		hash: B256,
		confirmations: u64,
	) -> Result<TransactionReceipt, DeliveryError>;

	/// Native-token balance of an address, used to monitor the gas account.
	async fn get_balance(&self, chain_id: u64, address: Address) -> Result<U256, DeliveryError>;

	/// Latest block number on the chain.
	async fn get_block_number(&self, chain_id: u64) -> Result<u64, DeliveryError>;

	/// Address of the gas-paying account.
	fn sender(&self) -> Address;
}
