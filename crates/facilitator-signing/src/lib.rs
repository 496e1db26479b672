//! EIP-3009 authorization signing.
//!
//! This crate is the programmatic counterpart of the wallet prompt: given a
//! local private key and transfer parameters, it produces a signed
//! [`TransferAuthorization`] the relay can submit. The digest is built with
//! the same EIP-712 helpers the bridge model verifies against, so signatures
//! produced here recover to the payer everywhere.

use alloy_primitives::{B256, U256};
use alloy_signer::SignerSync;
use alloy_signer_local::PrivateKeySigner;
use facilitator_types::{
	eip712, Address, DestinationNonce, SecretString, TransferAuthorization,
};
use thiserror::Error;

/// Errors that can occur while producing an authorization.
#[derive(Debug, Error)]
pub enum SigningError {
	/// The private key could not be parsed.
	#[error("Invalid key: {0}")]
	InvalidKey(String),
	/// The underlying signer failed.
	#[error("Signing failed: {0}")]
	SigningFailed(String),
}

/// Signs `TransferWithAuthorization` digests for one token domain.
///
/// The signer is scoped to a specific token contract and chain: the domain
/// separator is computed once at construction and commits the signature to
/// that token, so a relay cannot replay it against another deployment.
pub struct AuthorizationSigner {
	signer: PrivateKeySigner,
	domain_separator: B256,
}

impl AuthorizationSigner {
	/// Creates a signer for the payer key against the given token domain.
	pub fn new(
		private_key: &SecretString,
		token_name: &str,
		token_version: &str,
		chain_id: u64,
		token_address: &Address,
	) -> Result<Self, SigningError> {
		let signer = private_key
			.with_exposed(|key| key.parse::<PrivateKeySigner>())
			.map_err(|e| SigningError::InvalidKey(e.to_string()))?;
		let domain_separator =
			eip712::domain_separator(token_name, token_version, chain_id, token_address);
		Ok(Self {
			signer,
			domain_separator,
		})
	}

	/// The payer address derived from the key.
	pub fn address(&self) -> Address {
		self.signer.address()
	}

	/// The token domain separator this signer commits to.
	pub fn domain_separator(&self) -> B256 {
		self.domain_separator
	}

	/// Signs an authorization for `value` tokens to `to`, valid in
	/// `(valid_after, valid_before)`, replay-keyed by `nonce`.
	pub fn sign_transfer(
		&self,
		to: Address,
		value: U256,
		valid_after: u64,
		valid_before: u64,
		nonce: B256,
	) -> Result<TransferAuthorization, SigningError> {
		let from = self.signer.address();
		let struct_hash = eip712::authorization_struct_hash(
			&from,
			&to,
			value,
			valid_after,
			valid_before,
			&nonce,
		);
		let digest = eip712::final_digest(&self.domain_separator, &struct_hash);

		let signature = self
			.signer
			.sign_hash_sync(&digest)
			.map_err(|e| SigningError::SigningFailed(e.to_string()))?;

		Ok(TransferAuthorization {
			from,
			to,
			value,
			valid_after,
			valid_before,
			nonce,
			// Normalize recovery id to the 27/28 convention the contract expects.
			v: 27 + u8::from(signature.v()),
			r: signature.r().into(),
			s: signature.s().into(),
		})
	}

	/// Signs a bridge transfer whose nonce carries the destination, the
	/// payload `transferAndBurnFromNonce` consumes.
	pub fn sign_bridge_transfer(
		&self,
		bridge: Address,
		value: U256,
		valid_before: u64,
		destination: &DestinationNonce,
	) -> Result<TransferAuthorization, SigningError> {
		self.sign_transfer(bridge, value, 0, valid_before, destination.encode())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use alloy_primitives::{address, Parity, Signature};

	// Well-known development key; address 0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266.
	const DEV_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

	fn signer() -> AuthorizationSigner {
		AuthorizationSigner::new(
			&SecretString::from(DEV_KEY),
			"USDC",
			"2",
			84532,
			&address!("036CbD53842c5426634e7929541eC2318f3dCF7e"),
		)
		.unwrap()
	}

	#[test]
	fn rejects_malformed_key() {
		let result = AuthorizationSigner::new(
			&SecretString::from("not-a-key"),
			"USDC",
			"2",
			84532,
			&address!("036CbD53842c5426634e7929541eC2318f3dCF7e"),
		);
		assert!(matches!(result, Err(SigningError::InvalidKey(_))));
	}

	#[test]
	fn signature_recovers_to_payer() {
		let signer = signer();
		let auth = signer
			.sign_transfer(
				address!("4F26A0466F08BA8Ee601C661C0B2e8d75996a48c"),
				U256::from(1_000000u64),
				0,
				1_700_003_600,
				B256::repeat_byte(0x42),
			)
			.unwrap();

		assert!(auth.v == 27 || auth.v == 28);
		let digest = auth.signing_digest(&signer.domain_separator());
		let sig =
			Signature::from_scalars_and_parity(auth.r, auth.s, Parity::Parity(auth.v == 28))
				.unwrap();
		let recovered = sig.recover_address_from_prehash(&digest).unwrap();
		assert_eq!(recovered, signer.address());
		assert_eq!(auth.from, signer.address());
	}

	#[test]
	fn tampering_breaks_recovery() {
		let signer = signer();
		let mut auth = signer
			.sign_transfer(
				address!("4F26A0466F08BA8Ee601C661C0B2e8d75996a48c"),
				U256::from(500u64),
				0,
				1_700_003_600,
				B256::repeat_byte(0x42),
			)
			.unwrap();

		// Inflate the amount after signing; the digest no longer matches.
		auth.value = U256::from(5_000_000u64);
		let digest = auth.signing_digest(&signer.domain_separator());
		let sig =
			Signature::from_scalars_and_parity(auth.r, auth.s, Parity::Parity(auth.v == 28))
				.unwrap();
		let recovered = sig.recover_address_from_prehash(&digest).unwrap();
		assert_ne!(recovered, signer.address());
	}

	#[test]
	fn bridge_transfer_encodes_destination() {
		let signer = signer();
		let destination = DestinationNonce::with_tag(
			0,
			address!("742d35Cc6634C0532925a3b8D5c9C5e3fBE5e1d4"),
			[7; 8],
		);
		let auth = signer
			.sign_bridge_transfer(
				address!("4F26A0466F08BA8Ee601C661C0B2e8d75996a48c"),
				U256::from(500u64),
				1_700_003_600,
				&destination,
			)
			.unwrap();

		assert_eq!(auth.valid_after, 0);
		assert_eq!(DestinationNonce::decode(&auth.nonce), destination);
	}
}
