//! Bridge contract interface and executable model.
//!
//! The bridge contract itself lives on-chain; this crate carries what the
//! relay needs to talk to it (ABI bindings and calldata builders) and an
//! in-memory model of its transfer-and-burn state machine. The model backs
//! the test harness: it keeps an explicit ledger keyed by account and a
//! nonce-consumption set per payer, and verifies real signatures, so relay
//! behavior can be exercised end to end without a chain.

mod abi;
pub mod model;

pub use abi::{
	burn_initiated_log, burn_reference_from_logs, transfer_and_burn_calldata,
	transfer_and_burn_from_nonce_calldata, ICctpBridge,
};
