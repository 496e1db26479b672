//! EIP-712 hashing for EIP-3009 transfer authorizations.
//!
//! These helpers compute the token's domain separator and the
//! `TransferWithAuthorization` struct hash exactly as the token contract
//! does, so a digest produced here verifies on-chain and a signature
//! verified against it recovers the same payer. Only the static field types
//! the authorization schema uses are supported by the encoder.

use alloy_primitives::{keccak256, Address, B256, U256};

/// Domain type of EIP-3009 tokens (USDC uses the 5-field variant with a
/// version string).
pub const EIP712_DOMAIN_TYPE: &str =
	"EIP712Domain(string name,string version,uint256 chainId,address verifyingContract)";

/// The authorization type string hashed into every transfer digest.
pub const TRANSFER_WITH_AUTHORIZATION_TYPE: &str = "TransferWithAuthorization(address from,address to,uint256 value,uint256 validAfter,uint256 validBefore,bytes32 nonce)";

/// keccak256 of [`TRANSFER_WITH_AUTHORIZATION_TYPE`].
pub fn transfer_with_authorization_typehash() -> B256 {
	keccak256(TRANSFER_WITH_AUTHORIZATION_TYPE.as_bytes())
}

/// Computes the token's EIP-712 domain separator:
/// keccak256(abi.encode(typeHash, nameHash, versionHash, chainId, contract)).
pub fn domain_separator(
	name: &str,
	version: &str,
	chain_id: u64,
	verifying_contract: &Address,
) -> B256 {
	let mut enc = WordEncoder::new();
	enc.push_b256(&keccak256(EIP712_DOMAIN_TYPE.as_bytes()));
	enc.push_b256(&keccak256(name.as_bytes()));
	enc.push_b256(&keccak256(version.as_bytes()));
	enc.push_u256(U256::from(chain_id));
	enc.push_address(verifying_contract);
	keccak256(enc.finish())
}

/// Computes the struct hash of a `TransferWithAuthorization`.
pub fn authorization_struct_hash(
	from: &Address,
	to: &Address,
	value: U256,
	valid_after: u64,
	valid_before: u64,
	nonce: &B256,
) -> B256 {
	let mut enc = WordEncoder::new();
	enc.push_b256(&transfer_with_authorization_typehash());
	enc.push_address(from);
	enc.push_address(to);
	enc.push_u256(value);
	enc.push_u256(U256::from(valid_after));
	enc.push_u256(U256::from(valid_before));
	enc.push_b256(nonce);
	keccak256(enc.finish())
}

/// The digest that is actually signed:
/// keccak256(0x1901 || domainSeparator || structHash).
pub fn final_digest(domain_separator: &B256, struct_hash: &B256) -> B256 {
	let mut out = Vec::with_capacity(2 + 32 + 32);
	out.push(0x19);
	out.push(0x01);
	out.extend_from_slice(domain_separator.as_slice());
	out.extend_from_slice(struct_hash.as_slice());
	keccak256(out)
}

/// Minimal abi.encode for the static types above. Every pushed value
/// occupies one 32-byte word.
struct WordEncoder {
	buf: Vec<u8>,
}

impl WordEncoder {
	fn new() -> Self {
		Self { buf: Vec::new() }
	}

	fn push_b256(&mut self, v: &B256) {
		self.buf.extend_from_slice(v.as_slice());
	}

	fn push_address(&mut self, addr: &Address) {
		let mut word = [0u8; 32];
		word[12..].copy_from_slice(addr.as_slice());
		self.buf.extend_from_slice(&word);
	}

	fn push_u256(&mut self, v: U256) {
		self.buf.extend_from_slice(&v.to_be_bytes::<32>());
	}

	fn finish(self) -> Vec<u8> {
		self.buf
	}
}
