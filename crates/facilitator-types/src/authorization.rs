//! Transfer authorization and bridge transaction types.
//!
//! A [`TransferAuthorization`] is a signed EIP-3009 permission letting the
//! facilitator move a fixed token amount out of the payer's account within a
//! time window. It is created client-side, consumed exactly once on-chain,
//! and immutable afterwards. A [`BridgeTransaction`] records what happened to
//! the on-chain submission that carried it.

use alloy_primitives::{Address, B256, U256};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::eip712;

/// A signed EIP-3009 `TransferWithAuthorization` permission.
///
/// Field names on the wire match the authorization schema the token contract
/// verifies, so a payload signed by a browser wallet deserializes directly.
/// The signature commits to every field; altering any of them invalidates it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferAuthorization {
	/// The payer whose funds move.
	pub from: Address,
	/// The payee. For bridge transfers this is always the bridge contract.
	pub to: Address,
	/// Amount in the token's smallest unit, as a decimal string on the wire.
	#[serde(rename = "amount", with = "u256_decimal")]
	pub value: U256,
	/// Unix timestamp the authorization becomes valid at.
	#[serde(rename = "validAfter", default)]
	pub valid_after: u64,
	/// Unix timestamp the authorization expires at.
	#[serde(rename = "validBefore")]
	pub valid_before: u64,
	/// Replay-prevention nonce, unique per payer. May carry an encoded
	/// destination (see [`crate::nonce::DestinationNonce`]).
	pub nonce: B256,
	/// Recovery id, 27 or 28.
	pub v: u8,
	/// First signature scalar.
	pub r: B256,
	/// Second signature scalar.
	pub s: B256,
}

impl TransferAuthorization {
	/// Returns true if `now` falls within the validity window.
	pub fn window_contains(&self, now: u64) -> bool {
		now > self.valid_after && now < self.valid_before
	}

	/// Returns true if the authorization can no longer become valid.
	pub fn is_expired(&self, now: u64) -> bool {
		now >= self.valid_before
	}

	/// Computes the EIP-712 digest this authorization was signed over,
	/// given the token's domain separator.
	pub fn signing_digest(&self, domain_separator: &B256) -> B256 {
		let struct_hash = eip712::authorization_struct_hash(
			&self.from,
			&self.to,
			self.value,
			self.valid_after,
			self.valid_before,
			&self.nonce,
		);
		eip712::final_digest(domain_separator, &struct_hash)
	}
}

/// Outcome of a relayed bridge transaction.
///
/// `Confirmed` and `Reverted` are terminal. A pending transaction was
/// broadcast but has not yet been observed in a block with enough
/// confirmations; it must not be resubmitted, since the authorization it
/// carries is single-use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BridgeStatus {
	/// Broadcast, awaiting confirmation.
	Pending,
	/// Executed without revert.
	Confirmed,
	/// Included on-chain but reverted; no state changed.
	Reverted,
}

impl fmt::Display for BridgeStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			BridgeStatus::Pending => write!(f, "pending"),
			BridgeStatus::Confirmed => write!(f, "confirmed"),
			BridgeStatus::Reverted => write!(f, "reverted"),
		}
	}
}

/// Record of a relayed transferAndBurn submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeTransaction {
	/// Hash of the submitted transaction.
	pub tx_hash: B256,
	/// Current status. Never mutated once Confirmed or Reverted.
	pub status: BridgeStatus,
	/// Sequence number returned by the token messenger, parsed from the
	/// BurnInitiated event. None while pending or after a revert.
	pub burn_reference: Option<u64>,
}

/// Serde helper serializing a U256 as a decimal string, the format token
/// amounts use on the wire.
pub mod u256_decimal {
	use alloy_primitives::U256;
	use serde::{de::Error, Deserialize, Deserializer, Serialize, Serializer};

	pub fn serialize<S>(value: &U256, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		value.to_string().serialize(serializer)
	}

	pub fn deserialize<'de, D>(deserializer: D) -> Result<U256, D::Error>
	where
		D: Deserializer<'de>,
	{
		let s = String::deserialize(deserializer)?;
		U256::from_str_radix(&s, 10).map_err(D::Error::custom)
	}
}
