//! Destination-carrying nonce encoding.
//!
//! The 32-byte EIP-3009 nonce does double duty for bridge transfers: it
//! prevents replay and it carries the cross-chain destination, so the relay
//! and the contract need no extra parameters. Layout:
//!
//! ```text
//! bytes 0..4    destination domain, big-endian uint32
//! bytes 4..24   destination address, 20 bytes
//! bytes 24..32  uniqueness tag
//! ```
//!
//! The tag is caller-chosen entropy with no on-chain uniqueness enforcement
//! beyond the token contract's replay rejection. 64 bits keep the collision
//! probability negligible, but it is probabilistic, not guaranteed.

use alloy_primitives::{Address, B256};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const DOMAIN_RANGE: std::ops::Range<usize> = 0..4;
const ADDRESS_RANGE: std::ops::Range<usize> = 4..24;
const TAG_RANGE: std::ops::Range<usize> = 24..32;

/// Errors produced when parsing nonce text from an API path or payload.
#[derive(Debug, Error)]
pub enum NonceError {
	#[error("invalid nonce hex: {0}")]
	InvalidHex(String),
	#[error("nonce must be 32 bytes, got {0}")]
	InvalidLength(usize),
}

/// A decoded destination nonce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DestinationNonce {
	/// CCTP domain of the destination chain (protocol numbering, not the
	/// chain id).
	pub domain: u32,
	/// Mint recipient on the destination chain.
	pub address: Address,
	/// Uniqueness tag.
	pub tag: [u8; 8],
}

impl DestinationNonce {
	/// Creates a nonce for the given destination with a random tag.
	pub fn new(domain: u32, address: Address) -> Self {
		Self {
			domain,
			address,
			tag: rand::random(),
		}
	}

	/// Creates a nonce with an explicit tag. Useful when the tag must be
	/// reproducible, e.g. in tests.
	pub fn with_tag(domain: u32, address: Address, tag: [u8; 8]) -> Self {
		Self {
			domain,
			address,
			tag,
		}
	}

	/// Packs the destination into the 32-byte nonce.
	pub fn encode(&self) -> B256 {
		let mut out = [0u8; 32];
		out[DOMAIN_RANGE].copy_from_slice(&self.domain.to_be_bytes());
		out[ADDRESS_RANGE].copy_from_slice(self.address.as_slice());
		out[TAG_RANGE].copy_from_slice(&self.tag);
		B256::from(out)
	}

	/// Reverses [`Self::encode`]. The byte offsets must mirror the encoder
	/// exactly; any drift silently corrupts the destination.
	pub fn decode(nonce: &B256) -> Self {
		let bytes = nonce.as_slice();
		let domain = u32::from_be_bytes(bytes[DOMAIN_RANGE].try_into().unwrap());
		let address = Address::from_slice(&bytes[ADDRESS_RANGE]);
		let tag = bytes[TAG_RANGE].try_into().unwrap();
		Self {
			domain,
			address,
			tag,
		}
	}

	/// The destination address as the bytes32 the burn call consumes:
	/// 20 address bytes left-aligned, zero padding on the right.
	pub fn address_bytes32(&self) -> B256 {
		address_to_bytes32(&self.address)
	}
}

/// Widens an address to bytes32, left-aligned with zero right-padding.
pub fn address_to_bytes32(address: &Address) -> B256 {
	let mut out = [0u8; 32];
	out[..20].copy_from_slice(address.as_slice());
	B256::from(out)
}

/// Parses a 32-byte nonce from hex text, with or without a 0x prefix.
pub fn parse_nonce(text: &str) -> Result<B256, NonceError> {
	let stripped = text.strip_prefix("0x").unwrap_or(text);
	let bytes = hex::decode(stripped).map_err(|e| NonceError::InvalidHex(e.to_string()))?;
	if bytes.len() != 32 {
		return Err(NonceError::InvalidLength(bytes.len()));
	}
	Ok(B256::from_slice(&bytes))
}

#[cfg(test)]
mod tests {
	use super::*;
	use alloy_primitives::address;

	#[test]
	fn encode_layout() {
		let dest = DestinationNonce::with_tag(
			6,
			address!("742d35Cc6634C0532925a3b8D5c9C5e3fBE5e1d4"),
			[0xAA; 8],
		);
		let nonce = dest.encode();
		assert_eq!(&nonce[0..4], &[0, 0, 0, 6]);
		assert_eq!(&nonce[4..24], dest.address.as_slice());
		assert_eq!(&nonce[24..32], &[0xAA; 8]);
	}

	#[test]
	fn round_trip_exact() {
		let pairs = [
			(0u32, address!("742d35Cc6634C0532925a3b8D5c9C5e3fBE5e1d4")),
			(1, address!("0000000000000000000000000000000000000001")),
			(3, address!("ffffffffffffffffffffffffffffffffffffffff")),
			(6, address!("4F26A0466F08BA8Ee601C661C0B2e8d75996a48c")),
			(u32::MAX, address!("0000000000000000000000000000000000000000")),
		];
		for (domain, addr) in pairs {
			let dest = DestinationNonce::new(domain, addr);
			let decoded = DestinationNonce::decode(&dest.encode());
			assert_eq!(decoded, dest);
		}
	}

	#[test]
	fn address_bytes32_is_right_padded() {
		let dest = DestinationNonce::with_tag(
			0,
			address!("742d35Cc6634C0532925a3b8D5c9C5e3fBE5e1d4"),
			[0; 8],
		);
		let wide = dest.address_bytes32();
		assert_eq!(&wide[..20], dest.address.as_slice());
		assert_eq!(&wide[20..], &[0u8; 12]);
	}

	#[test]
	fn fresh_nonces_differ() {
		let addr = address!("742d35Cc6634C0532925a3b8D5c9C5e3fBE5e1d4");
		let a = DestinationNonce::new(0, addr);
		let b = DestinationNonce::new(0, addr);
		assert_ne!(a.tag, b.tag);
	}

	#[test]
	fn parse_nonce_validates_length() {
		assert!(parse_nonce("0x1234").is_err());
		assert!(parse_nonce("zz").is_err());
		let hex64 = "11".repeat(32);
		assert!(parse_nonce(&hex64).is_ok());
		assert!(parse_nonce(&format!("0x{hex64}")).is_ok());
	}
}
