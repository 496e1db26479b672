//! Serialization of the gas account's transaction nonces.
//!
//! The relay handles requests concurrently, but the chain assigns the gas
//! account one nonce sequence per network. Two in-flight submissions that
//! pick the same nonce would race, with one of them silently replaced. The
//! manager hands out nonces under a per-instance lock that is held until the
//! submission either commits or is abandoned.

use std::collections::HashMap;
use tokio::sync::{Mutex, MutexGuard};

/// Tracks the next usable nonce per chain for a single sending account.
#[derive(Default)]
pub struct NonceManager {
	next: Mutex<HashMap<u64, u64>>,
}

impl NonceManager {
	pub fn new() -> Self {
		Self::default()
	}

	/// Reserves the next nonce for `chain_id`, holding the lock until the
	/// returned reservation is committed or dropped.
	///
	/// `onchain_next` is the pending transaction count reported by the
	/// chain; the reservation uses whichever of the local counter and the
	/// chain's view is further ahead, so restarts and externally submitted
	/// transactions cannot cause a collision.
	pub async fn reserve(&self, chain_id: u64, onchain_next: u64) -> NonceReservation<'_> {
		let guard = self.next.lock().await;
		let nonce = guard
			.get(&chain_id)
			.copied()
			.map_or(onchain_next, |local| local.max(onchain_next));
		NonceReservation {
			guard,
			chain_id,
			nonce,
		}
	}
}

/// A held nonce. Dropping it without [`commit`](Self::commit) releases the
/// nonce unused, which is the correct behavior when the transaction was
/// never broadcast.
pub struct NonceReservation<'a> {
	guard: MutexGuard<'a, HashMap<u64, u64>>,
	chain_id: u64,
	nonce: u64,
}

impl NonceReservation<'_> {
	/// The reserved nonce value.
	pub fn nonce(&self) -> u64 {
		self.nonce
	}

	/// Marks the nonce as consumed after a successful broadcast.
	pub fn commit(mut self) {
		self.guard.insert(self.chain_id, self.nonce + 1);
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn sequences_after_commit() {
		let manager = NonceManager::new();

		let reservation = manager.reserve(1, 5).await;
		assert_eq!(reservation.nonce(), 5);
		reservation.commit();

		// The chain still reports 5 until the first tx is mined; the local
		// counter must win.
		let reservation = manager.reserve(1, 5).await;
		assert_eq!(reservation.nonce(), 6);
		reservation.commit();
	}

	#[tokio::test]
	async fn abandoned_reservation_is_reused() {
		let manager = NonceManager::new();

		let reservation = manager.reserve(1, 5).await;
		assert_eq!(reservation.nonce(), 5);
		drop(reservation);

		let reservation = manager.reserve(1, 5).await;
		assert_eq!(reservation.nonce(), 5);
	}

	#[tokio::test]
	async fn chain_view_ahead_of_local_wins() {
		let manager = NonceManager::new();
		manager.reserve(1, 5).await.commit();

		// Something outside the relay bumped the account nonce.
		let reservation = manager.reserve(1, 20).await;
		assert_eq!(reservation.nonce(), 20);
	}

	#[tokio::test]
	async fn chains_are_independent() {
		let manager = NonceManager::new();
		manager.reserve(1, 9).await.commit();

		let reservation = manager.reserve(2, 0).await;
		assert_eq!(reservation.nonce(), 0);
	}
}
