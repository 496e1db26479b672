//! In-memory model of the bridge contract and its collaborators.
//!
//! One [`BridgeChain`] stands in for a single network: an account-keyed
//! [`Ledger`] with a per-payer nonce-consumption set, an EIP-3009 token that
//! verifies real signatures, and a token messenger handing out sequential
//! burn references. Each transfer-and-burn invocation runs the
//! Start → TransferExecuted → Approved → BurnInitiated → Done machine on a
//! snapshot of the state and commits only on success, mirroring transaction
//! atomicity: a failure at any state leaves nothing behind.

use alloy_primitives::{Address, Parity, Signature, B256, U256};
use facilitator_types::{eip712, DestinationNonce, TransferAuthorization};
use std::collections::{HashMap, HashSet};
use thiserror::Error;

/// Rejection reasons, each mapping onto a revert of the whole run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BridgeError {
	#[error("amount must be greater than zero")]
	ZeroAmount,
	#[error("authorization payee {0} is not the bridge contract")]
	WrongPayee(Address),
	#[error("authorization is not yet valid")]
	NotYetValid,
	#[error("authorization is expired")]
	Expired,
	#[error("authorization nonce was already used")]
	NonceUsed,
	#[error("invalid signature: {0}")]
	InvalidSignature(String),
	#[error("insufficient token balance")]
	InsufficientBalance,
	#[error("insufficient allowance for the token messenger")]
	InsufficientAllowance,
	#[error("caller is not the contract owner")]
	NotOwner,
}

/// Token balances and consumed authorization nonces, keyed by account.
#[derive(Debug, Clone, Default)]
pub struct Ledger {
	balances: HashMap<Address, U256>,
	used_nonces: HashMap<Address, HashSet<B256>>,
}

impl Ledger {
	/// Mints `amount` to `account`. Test faucet.
	pub fn credit(&mut self, account: Address, amount: U256) {
		let entry = self.balances.entry(account).or_default();
		*entry += amount;
	}

	/// Current balance of `account`.
	pub fn balance(&self, account: &Address) -> U256 {
		self.balances.get(account).copied().unwrap_or_default()
	}

	/// Whether `payer` already consumed `nonce`.
	pub fn nonce_used(&self, payer: &Address, nonce: &B256) -> bool {
		self.used_nonces
			.get(payer)
			.is_some_and(|set| set.contains(nonce))
	}

	fn debit(&mut self, account: Address, amount: U256) -> Result<(), BridgeError> {
		let balance = self.balances.entry(account).or_default();
		if *balance < amount {
			return Err(BridgeError::InsufficientBalance);
		}
		*balance -= amount;
		Ok(())
	}

	fn consume_nonce(&mut self, payer: Address, nonce: B256) {
		self.used_nonces.entry(payer).or_default().insert(nonce);
	}
}

/// EIP-3009 token model. Verification is delegated here exactly as it is
/// on-chain: window, replay set, then signature recovery against the
/// token's own EIP-712 domain.
#[derive(Debug, Clone)]
pub struct Eip3009Token {
	/// Token contract address.
	pub address: Address,
	domain_separator: B256,
}

impl Eip3009Token {
	pub fn new(name: &str, version: &str, chain_id: u64, address: Address) -> Self {
		Self {
			address,
			domain_separator: eip712::domain_separator(name, version, chain_id, &address),
		}
	}

	/// The domain separator signatures must commit to.
	pub fn domain_separator(&self) -> B256 {
		self.domain_separator
	}

	fn transfer_with_authorization(
		&self,
		ledger: &mut Ledger,
		auth: &TransferAuthorization,
		now: u64,
	) -> Result<(), BridgeError> {
		if now <= auth.valid_after {
			return Err(BridgeError::NotYetValid);
		}
		if now >= auth.valid_before {
			return Err(BridgeError::Expired);
		}
		if ledger.nonce_used(&auth.from, &auth.nonce) {
			return Err(BridgeError::NonceUsed);
		}
		if auth.v != 27 && auth.v != 28 {
			return Err(BridgeError::InvalidSignature(format!(
				"recovery id {} out of range",
				auth.v
			)));
		}

		let digest = auth.signing_digest(&self.domain_separator);
		let signature =
			Signature::from_scalars_and_parity(auth.r, auth.s, Parity::Parity(auth.v == 28))
				.map_err(|e| BridgeError::InvalidSignature(e.to_string()))?;
		let recovered = signature
			.recover_address_from_prehash(&digest)
			.map_err(|e| BridgeError::InvalidSignature(e.to_string()))?;
		if recovered != auth.from {
			return Err(BridgeError::InvalidSignature(format!(
				"recovered {recovered}, expected {}",
				auth.from
			)));
		}

		ledger.debit(auth.from, auth.value)?;
		ledger.credit(auth.to, auth.value);
		ledger.consume_nonce(auth.from, auth.nonce);
		Ok(())
	}
}

/// Record of one burn issued through the token messenger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BurnRecord {
	pub amount: U256,
	pub destination_domain: u32,
	pub mint_recipient: B256,
	pub burn_token: Address,
}

/// CCTP token messenger model: pulls approved funds out of existence and
/// hands back a sequential burn reference.
#[derive(Debug, Clone)]
pub struct TokenMessenger {
	/// Messenger contract address.
	pub address: Address,
	next_reference: u64,
	burns: Vec<BurnRecord>,
}

impl TokenMessenger {
	fn new(address: Address) -> Self {
		Self {
			address,
			next_reference: 1,
			burns: Vec::new(),
		}
	}

	fn deposit_for_burn(
		&mut self,
		ledger: &mut Ledger,
		allowances: &mut HashMap<(Address, Address), U256>,
		caller: Address,
		amount: U256,
		destination_domain: u32,
		mint_recipient: B256,
		burn_token: Address,
	) -> Result<u64, BridgeError> {
		let allowance = allowances.entry((caller, self.address)).or_default();
		if *allowance < amount {
			return Err(BridgeError::InsufficientAllowance);
		}
		*allowance -= amount;
		ledger.debit(caller, amount)?;

		self.burns.push(BurnRecord {
			amount,
			destination_domain,
			mint_recipient,
			burn_token,
		});
		let reference = self.next_reference;
		self.next_reference += 1;
		Ok(reference)
	}
}

/// Event recorded at the Done state of a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BurnEvent {
	pub from: Address,
	pub recipient: Address,
	pub amount: U256,
	pub destination_domain: u32,
	pub destination_address: B256,
	pub burn_reference: u64,
}

#[derive(Debug, Clone)]
struct ChainState {
	ledger: Ledger,
	allowances: HashMap<(Address, Address), U256>,
	messenger: TokenMessenger,
	events: Vec<BurnEvent>,
}

/// One simulated network hosting the bridge contract.
#[derive(Debug, Clone)]
pub struct BridgeChain {
	token: Eip3009Token,
	bridge_address: Address,
	owner: Address,
	state: ChainState,
	now: u64,
}

impl BridgeChain {
	/// Creates a chain with the given deployments. Time starts at 1 so a
	/// `valid_after` of 0 is immediately satisfied.
	pub fn new(
		chain_id: u64,
		token_address: Address,
		messenger_address: Address,
		bridge_address: Address,
		owner: Address,
	) -> Self {
		Self {
			token: Eip3009Token::new("USDC", "2", chain_id, token_address),
			bridge_address,
			owner,
			state: ChainState {
				ledger: Ledger::default(),
				allowances: HashMap::new(),
				messenger: TokenMessenger::new(messenger_address),
				events: Vec::new(),
			},
			now: 1,
		}
	}

	/// Sets the chain clock used for validity-window checks.
	pub fn set_time(&mut self, now: u64) {
		self.now = now;
	}

	/// The bridge contract address on this chain.
	pub fn bridge_address(&self) -> Address {
		self.bridge_address
	}

	/// The token this bridge custodies.
	pub fn token(&self) -> &Eip3009Token {
		&self.token
	}

	/// Mints token balance to an account.
	pub fn credit(&mut self, account: Address, amount: U256) {
		self.state.ledger.credit(account, amount);
	}

	/// Token balance of an account.
	pub fn balance(&self, account: &Address) -> U256 {
		self.state.ledger.balance(account)
	}

	/// Burn events emitted so far, oldest first.
	pub fn events(&self) -> &[BurnEvent] {
		&self.state.events
	}

	/// Burns issued through the messenger, oldest first.
	pub fn burns(&self) -> &[BurnRecord] {
		&self.state.messenger.burns
	}

	/// Explicit-destination entry point.
	pub fn transfer_and_burn(
		&mut self,
		auth: &TransferAuthorization,
		destination_domain: u32,
		destination_address: B256,
	) -> Result<u64, BridgeError> {
		self.execute(auth, destination_domain, destination_address)
	}

	/// Nonce-derived entry point. Decodes the destination and then runs the
	/// identical machine as the explicit variant.
	pub fn transfer_and_burn_from_nonce(
		&mut self,
		auth: &TransferAuthorization,
	) -> Result<u64, BridgeError> {
		let destination = DestinationNonce::decode(&auth.nonce);
		self.execute(auth, destination.domain, destination.address_bytes32())
	}

	/// Read-only mirror of the contract's nonce decoding helper.
	pub fn extract_destination(nonce: &B256) -> (u32, B256) {
		let destination = DestinationNonce::decode(nonce);
		(destination.domain, destination.address_bytes32())
	}

	/// Owner-restricted rescue of stranded tokens. Moves custody directly;
	/// no fabricated authorization is involved.
	pub fn rescue(&mut self, caller: Address, to: Address, amount: U256) -> Result<(), BridgeError> {
		if caller != self.owner {
			return Err(BridgeError::NotOwner);
		}
		self.state.ledger.debit(self.bridge_address, amount)?;
		self.state.ledger.credit(to, amount);
		Ok(())
	}

	fn execute(
		&mut self,
		auth: &TransferAuthorization,
		destination_domain: u32,
		destination_address: B256,
	) -> Result<u64, BridgeError> {
		// Run on a snapshot; commit only if every state transition succeeds.
		let mut state = self.state.clone();
		let reference = self.run(&mut state, auth, destination_domain, destination_address)?;
		self.state = state;
		Ok(reference)
	}

	fn run(
		&self,
		state: &mut ChainState,
		auth: &TransferAuthorization,
		destination_domain: u32,
		destination_address: B256,
	) -> Result<u64, BridgeError> {
		if auth.value.is_zero() {
			return Err(BridgeError::ZeroAmount);
		}
		if auth.to != self.bridge_address {
			return Err(BridgeError::WrongPayee(auth.to));
		}

		// Start -> TransferExecuted: payer funds move into bridge custody.
		self.token
			.transfer_with_authorization(&mut state.ledger, auth, self.now)?;

		// TransferExecuted -> Approved: messenger may pull exactly `value`.
		state
			.allowances
			.insert((self.bridge_address, state.messenger.address), auth.value);

		// Approved -> BurnInitiated.
		let reference = state.messenger.deposit_for_burn(
			&mut state.ledger,
			&mut state.allowances,
			self.bridge_address,
			auth.value,
			destination_domain,
			destination_address,
			self.token.address,
		)?;

		// BurnInitiated -> Done.
		state.events.push(BurnEvent {
			from: auth.from,
			recipient: self.bridge_address,
			amount: auth.value,
			destination_domain,
			destination_address,
			burn_reference: reference,
		});
		Ok(reference)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use alloy_primitives::address;
	use facilitator_signing::AuthorizationSigner;
	use facilitator_types::SecretString;

	const PAYER_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
	const CHAIN_ID: u64 = 84532;

	const TOKEN: Address = address!("036CbD53842c5426634e7929541eC2318f3dCF7e");
	const MESSENGER: Address = address!("9f3B8679c73C2Fef8b59B4f3444d4e156fb70AA5");
	const BRIDGE: Address = address!("4F26A0466F08BA8Ee601C661C0B2e8d75996a48c");
	const OWNER: Address = address!("00000000000000000000000000000000000000AA");
	const RECIPIENT: Address = address!("742d35Cc6634C0532925a3b8D5c9C5e3fBE5e1d4");

	fn chain() -> BridgeChain {
		BridgeChain::new(CHAIN_ID, TOKEN, MESSENGER, BRIDGE, OWNER)
	}

	fn signer() -> AuthorizationSigner {
		AuthorizationSigner::new(&SecretString::from(PAYER_KEY), "USDC", "2", CHAIN_ID, &TOKEN)
			.unwrap()
	}

	#[test]
	fn end_to_end_burn() {
		let mut chain = chain();
		chain.set_time(1_700_000_000);
		let signer = signer();
		let payer = signer.address();
		chain.credit(payer, U256::from(10_000000u64));

		let destination = DestinationNonce::with_tag(0, RECIPIENT, [1; 8]);
		let auth = signer
			.sign_bridge_transfer(BRIDGE, U256::from(10_000000u64), 1_700_003_600, &destination)
			.unwrap();

		let reference = chain.transfer_and_burn_from_nonce(&auth).unwrap();

		// Custody was transient: both payer and bridge end at zero.
		assert_eq!(chain.balance(&payer), U256::ZERO);
		assert_eq!(chain.balance(&BRIDGE), U256::ZERO);

		let event = chain.events().last().unwrap();
		assert_eq!(event.burn_reference, reference);
		assert_eq!(event.from, payer);
		assert_eq!(event.recipient, BRIDGE);
		assert_eq!(event.amount, U256::from(10_000000u64));
		assert_eq!(event.destination_domain, 0);
		assert_eq!(event.destination_address, destination.address_bytes32());

		let burn = chain.burns().last().unwrap();
		assert_eq!(burn.amount, U256::from(10_000000u64));
		assert_eq!(burn.burn_token, TOKEN);

		let (domain, address) = BridgeChain::extract_destination(&auth.nonce);
		assert_eq!(domain, event.destination_domain);
		assert_eq!(address, event.destination_address);
	}

	#[test]
	fn replay_is_rejected_without_reexecution() {
		let mut chain = chain();
		chain.set_time(1_700_000_000);
		let signer = signer();
		let payer = signer.address();
		chain.credit(payer, U256::from(2_000000u64));

		let destination = DestinationNonce::with_tag(3, RECIPIENT, [2; 8]);
		let auth = signer
			.sign_bridge_transfer(BRIDGE, U256::from(1_000000u64), 1_700_003_600, &destination)
			.unwrap();

		chain.transfer_and_burn_from_nonce(&auth).unwrap();
		let err = chain.transfer_and_burn_from_nonce(&auth).unwrap_err();
		assert_eq!(err, BridgeError::NonceUsed);

		// The second attempt moved nothing.
		assert_eq!(chain.balance(&payer), U256::from(1_000000u64));
		assert_eq!(chain.events().len(), 1);
	}

	#[test]
	fn expired_window_is_rejected_despite_valid_signature() {
		let mut chain = chain();
		chain.set_time(1_700_010_000);
		let signer = signer();
		chain.credit(signer.address(), U256::from(1_000000u64));

		let destination = DestinationNonce::with_tag(0, RECIPIENT, [3; 8]);
		let auth = signer
			.sign_bridge_transfer(BRIDGE, U256::from(1_000000u64), 1_700_003_600, &destination)
			.unwrap();

		assert_eq!(
			chain.transfer_and_burn_from_nonce(&auth).unwrap_err(),
			BridgeError::Expired
		);
	}

	#[test]
	fn zero_scalars_revert_before_any_state_mutation() {
		let mut chain = chain();
		chain.set_time(1_700_000_000);
		let signer = signer();
		let payer = signer.address();
		chain.credit(payer, U256::from(1_000000u64));

		let destination = DestinationNonce::with_tag(0, RECIPIENT, [4; 8]);
		let mut auth = signer
			.sign_bridge_transfer(BRIDGE, U256::from(1_000000u64), 1_700_003_600, &destination)
			.unwrap();
		auth.r = B256::ZERO;
		auth.s = B256::ZERO;

		let err = chain.transfer_and_burn_from_nonce(&auth).unwrap_err();
		assert!(matches!(err, BridgeError::InvalidSignature(_)));
		assert_eq!(chain.balance(&payer), U256::from(1_000000u64));
		assert!(!chain.state.ledger.nonce_used(&payer, &auth.nonce));
	}

	#[test]
	fn zero_amount_is_rejected() {
		let mut chain = chain();
		chain.set_time(1_700_000_000);
		let signer = signer();

		let destination = DestinationNonce::with_tag(0, RECIPIENT, [5; 8]);
		let auth = signer
			.sign_bridge_transfer(BRIDGE, U256::ZERO, 1_700_003_600, &destination)
			.unwrap();

		assert_eq!(
			chain.transfer_and_burn_from_nonce(&auth).unwrap_err(),
			BridgeError::ZeroAmount
		);
		assert!(chain.events().is_empty());
	}

	#[test]
	fn insufficient_balance_reverts_atomically() {
		let mut chain = chain();
		chain.set_time(1_700_000_000);
		let signer = signer();
		let payer = signer.address();
		chain.credit(payer, U256::from(100u64));

		let destination = DestinationNonce::with_tag(0, RECIPIENT, [6; 8]);
		let auth = signer
			.sign_bridge_transfer(BRIDGE, U256::from(1_000000u64), 1_700_003_600, &destination)
			.unwrap();

		assert_eq!(
			chain.transfer_and_burn_from_nonce(&auth).unwrap_err(),
			BridgeError::InsufficientBalance
		);
		// Nonce consumption was part of the discarded snapshot.
		assert!(!chain.state.ledger.nonce_used(&payer, &auth.nonce));
	}

	#[test]
	fn payee_must_be_the_bridge() {
		let mut chain = chain();
		chain.set_time(1_700_000_000);
		let signer = signer();
		chain.credit(signer.address(), U256::from(1_000000u64));

		let auth = signer
			.sign_transfer(
				RECIPIENT,
				U256::from(1_000000u64),
				0,
				1_700_003_600,
				DestinationNonce::with_tag(0, RECIPIENT, [7; 8]).encode(),
			)
			.unwrap();

		assert_eq!(
			chain.transfer_and_burn_from_nonce(&auth).unwrap_err(),
			BridgeError::WrongPayee(RECIPIENT)
		);
	}

	#[test]
	fn both_entry_points_converge_after_decode() {
		let mut chain = chain();
		chain.set_time(1_700_000_000);
		let signer = signer();
		let payer = signer.address();
		chain.credit(payer, U256::from(2_000000u64));

		let dest_a = DestinationNonce::with_tag(6, RECIPIENT, [8; 8]);
		let auth_a = signer
			.sign_bridge_transfer(BRIDGE, U256::from(1_000000u64), 1_700_003_600, &dest_a)
			.unwrap();
		chain.transfer_and_burn_from_nonce(&auth_a).unwrap();

		let dest_b = DestinationNonce::with_tag(6, RECIPIENT, [9; 8]);
		let auth_b = signer
			.sign_bridge_transfer(BRIDGE, U256::from(1_000000u64), 1_700_003_600, &dest_b)
			.unwrap();
		chain
			.transfer_and_burn(&auth_b, dest_b.domain, dest_b.address_bytes32())
			.unwrap();

		let events = chain.events();
		assert_eq!(events.len(), 2);
		assert_eq!(events[0].destination_domain, events[1].destination_domain);
		assert_eq!(events[0].destination_address, events[1].destination_address);
		assert_eq!(events[0].amount, events[1].amount);
		// References are sequential across entry points.
		assert_eq!(events[1].burn_reference, events[0].burn_reference + 1);
	}

	#[test]
	fn rescue_is_owner_only() {
		let mut chain = chain();
		chain.credit(BRIDGE, U256::from(777u64));

		assert_eq!(
			chain
				.rescue(RECIPIENT, RECIPIENT, U256::from(777u64))
				.unwrap_err(),
			BridgeError::NotOwner
		);

		chain.rescue(OWNER, RECIPIENT, U256::from(777u64)).unwrap();
		assert_eq!(chain.balance(&BRIDGE), U256::ZERO);
		assert_eq!(chain.balance(&RECIPIENT), U256::from(777u64));
	}
}
