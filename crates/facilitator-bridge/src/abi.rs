//! ABI bindings and calldata builders for the bridge contract.

use alloy_primitives::{Address, Log, B256, U256};
use alloy_sol_types::{sol, SolCall, SolEvent};
use facilitator_types::TransferAuthorization;

sol! {
	/// On-chain surface of the CCTP bridge contract.
	///
	/// Both transfer entry points run the same machine; the second derives
	/// the destination by decoding the authorization nonce on-chain.
	interface ICctpBridge {
		/// Emitted once per completed run, after the burn is initiated.
		event BurnInitiated(
			address indexed from,
			address indexed recipient,
			uint256 amount,
			uint32 destinationDomain,
			bytes32 destinationAddress,
			uint64 burnReference
		);

		function transferAndBurn(
			address from,
			uint256 amount,
			uint256 validAfter,
			uint256 validBefore,
			bytes32 nonce,
			uint32 destinationDomain,
			bytes32 destinationAddress,
			uint8 v,
			bytes32 r,
			bytes32 s
		) external returns (uint64);

		function transferAndBurnFromNonce(
			address from,
			uint256 amount,
			uint256 validAfter,
			uint256 validBefore,
			bytes32 nonce,
			uint8 v,
			bytes32 r,
			bytes32 s
		) external returns (uint64);

		function extractDestinationFromNonce(bytes32 nonce)
			external
			pure
			returns (uint32 destinationDomain, bytes32 destinationAddress);

		/// Owner-restricted escape hatch for tokens stranded in the contract.
		function rescueTokens(address token, uint256 amount) external;
	}
}

/// Builds calldata for the explicit-destination entry point.
pub fn transfer_and_burn_calldata(
	auth: &TransferAuthorization,
	destination_domain: u32,
	destination_address: B256,
) -> Vec<u8> {
	ICctpBridge::transferAndBurnCall {
		from: auth.from,
		amount: auth.value,
		validAfter: U256::from(auth.valid_after),
		validBefore: U256::from(auth.valid_before),
		nonce: auth.nonce,
		destinationDomain: destination_domain,
		destinationAddress: destination_address,
		v: auth.v,
		r: auth.r,
		s: auth.s,
	}
	.abi_encode()
}

/// Builds calldata for the nonce-derived-destination entry point.
pub fn transfer_and_burn_from_nonce_calldata(auth: &TransferAuthorization) -> Vec<u8> {
	ICctpBridge::transferAndBurnFromNonceCall {
		from: auth.from,
		amount: auth.value,
		validAfter: U256::from(auth.valid_after),
		validBefore: U256::from(auth.valid_before),
		nonce: auth.nonce,
		v: auth.v,
		r: auth.r,
		s: auth.s,
	}
	.abi_encode()
}

/// Extracts the burn reference from a receipt's logs, ignoring events
/// emitted by other contracts.
pub fn burn_reference_from_logs(logs: &[Log], bridge: Address) -> Option<u64> {
	logs.iter().find_map(|log| {
		if log.address != bridge {
			return None;
		}
		ICctpBridge::BurnInitiated::decode_log(log, true)
			.ok()
			.map(|decoded| decoded.data.burnReference)
	})
}

/// Encodes a BurnInitiated event as the raw log a receipt would carry.
pub fn burn_initiated_log(bridge: Address, event: ICctpBridge::BurnInitiated) -> Log {
	Log {
		address: bridge,
		data: event.encode_log_data(),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use alloy_primitives::address;

	fn sample_auth() -> TransferAuthorization {
		TransferAuthorization {
			from: address!("742d35Cc6634C0532925a3b8D5c9C5e3fBE5e1d4"),
			to: address!("4F26A0466F08BA8Ee601C661C0B2e8d75996a48c"),
			value: U256::from(10_000000u64),
			valid_after: 0,
			valid_before: 1_700_003_600,
			nonce: B256::repeat_byte(0x11),
			v: 27,
			r: B256::repeat_byte(0x22),
			s: B256::repeat_byte(0x33),
		}
	}

	#[test]
	fn calldata_round_trips() {
		let auth = sample_auth();
		let data = transfer_and_burn_calldata(&auth, 6, B256::repeat_byte(0x44));
		let call = ICctpBridge::transferAndBurnCall::abi_decode(&data, true).unwrap();
		assert_eq!(call.from, auth.from);
		assert_eq!(call.amount, auth.value);
		assert_eq!(call.destinationDomain, 6);
		assert_eq!(call.v, 27);

		let data = transfer_and_burn_from_nonce_calldata(&auth);
		let call = ICctpBridge::transferAndBurnFromNonceCall::abi_decode(&data, true).unwrap();
		assert_eq!(call.nonce, auth.nonce);
	}

	#[test]
	fn burn_reference_extraction() {
		let bridge = address!("4F26A0466F08BA8Ee601C661C0B2e8d75996a48c");
		let event = ICctpBridge::BurnInitiated {
			from: address!("742d35Cc6634C0532925a3b8D5c9C5e3fBE5e1d4"),
			recipient: bridge,
			amount: U256::from(500u64),
			destinationDomain: 0,
			destinationAddress: B256::repeat_byte(0x55),
			burnReference: 42,
		};
		let log = burn_initiated_log(bridge, event);
		assert_eq!(burn_reference_from_logs(&[log.clone()], bridge), Some(42));

		// Same event from an unrelated contract is ignored.
		let other = address!("0000000000000000000000000000000000000001");
		assert_eq!(burn_reference_from_logs(&[log], other), None);
	}
}
