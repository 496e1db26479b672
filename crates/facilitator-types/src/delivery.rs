//! Types returned by transaction delivery providers.

use alloy_primitives::{Log, B256};
use serde::{Deserialize, Serialize};

/// Receipt of a mined transaction.
///
/// `success` distinguishes "executed" from "included but reverted"; the logs
/// are carried so callers can extract event data such as the burn reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionReceipt {
	/// The hash of the transaction.
	pub hash: B256,
	/// The block the transaction was included in.
	pub block_number: u64,
	/// Whether execution completed without revert.
	pub success: bool,
	/// Logs emitted by the transaction. Empty when it reverted.
	pub logs: Vec<Log>,
}
