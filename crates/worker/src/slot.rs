use std::sync::Arc;

use parking_lot::{Condvar, Mutex};

/// Outcome from offering a value into the slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotPush {
	/// Slot was empty; the value is now pending.
	Queued,
	/// An older pending value was dropped in favor of this one.
	Replaced,
}

/// Offer failed because the slot is closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("slot is closed")]
pub struct SlotClosed;

struct SlotState<T> {
	pending: Option<T>,
	closed: bool,
}

struct SlotInner<T> {
	state: Mutex<SlotState<T>>,
	ready: Condvar,
}

/// Capacity-1 latest-wins exchange slot feeding one worker loop.
///
/// Offers never block and never queue more than one value: a new offer
/// unconditionally replaces the pending one. The replaced value is dropped
/// without ever being received.
pub struct SingleSlot<T> {
	inner: Arc<SlotInner<T>>,
}

/// Producer handle for a [`SingleSlot`].
pub struct SlotSender<T> {
	inner: Arc<SlotInner<T>>,
}

/// Consumer handle for the worker loop of a [`SingleSlot`].
pub struct SlotReceiver<T> {
	inner: Arc<SlotInner<T>>,
}

impl<T> Clone for SlotSender<T> {
	fn clone(&self) -> Self {
		Self {
			inner: Arc::clone(&self.inner),
		}
	}
}

impl<T> SingleSlot<T> {
	/// Creates an empty open slot.
	pub fn new() -> Self {
		Self {
			inner: Arc::new(SlotInner {
				state: Mutex::new(SlotState {
					pending: None,
					closed: false,
				}),
				ready: Condvar::new(),
			}),
		}
	}

	/// Returns a sender handle.
	pub fn sender(&self) -> SlotSender<T> {
		SlotSender {
			inner: Arc::clone(&self.inner),
		}
	}

	/// Returns a receiver handle.
	pub fn receiver(&self) -> SlotReceiver<T> {
		SlotReceiver {
			inner: Arc::clone(&self.inner),
		}
	}
}

impl<T> Default for SingleSlot<T> {
	fn default() -> Self {
		Self::new()
	}
}

impl<T> SlotSender<T> {
	/// Non-blocking offer. Replaces (and drops) any pending value.
	pub fn offer(&self, value: T) -> Result<SlotPush, SlotClosed> {
		let superseded = {
			let mut state = self.inner.state.lock();
			if state.closed {
				return Err(SlotClosed);
			}
			let superseded = state.pending.replace(value);
			self.inner.ready.notify_one();
			superseded
		};
		// The superseded value drops outside the lock.
		if superseded.is_some() {
			Ok(SlotPush::Replaced)
		} else {
			Ok(SlotPush::Queued)
		}
	}

	/// True while a value sits in the slot.
	pub fn has_pending(&self) -> bool {
		self.inner.state.lock().pending.is_some()
	}

	/// Closes the slot. Any pending value is dropped undelivered and the
	/// receiver wakes with `None`.
	pub fn close(&self) {
		let dropped = {
			let mut state = self.inner.state.lock();
			state.closed = true;
			let dropped = state.pending.take();
			self.inner.ready.notify_all();
			dropped
		};
		drop(dropped);
	}
}

impl<T> SlotReceiver<T> {
	/// Takes the pending value, blocking until one arrives. Returns `None`
	/// once the slot is closed.
	pub fn recv(&self) -> Option<T> {
		let mut state = self.inner.state.lock();
		loop {
			if let Some(value) = state.pending.take() {
				return Some(value);
			}
			if state.closed {
				return None;
			}
			self.inner.ready.wait(&mut state);
		}
	}
}

#[cfg(test)]
mod tests {
	use std::sync::mpsc;
	use std::thread;
	use std::time::Duration;

	use super::*;

	// ── Golden behavior ──

	#[test]
	fn offer_queues_then_replaces() {
		let slot = SingleSlot::new();
		let tx = slot.sender();
		let rx = slot.receiver();

		assert_eq!(tx.offer(1u32), Ok(SlotPush::Queued));
		assert_eq!(tx.offer(2), Ok(SlotPush::Replaced));
		assert_eq!(tx.offer(3), Ok(SlotPush::Replaced));

		// Only the latest survives.
		assert_eq!(rx.recv(), Some(3));
		assert!(!tx.has_pending());
	}

	#[test]
	fn recv_blocks_until_offer() {
		let slot = SingleSlot::new();
		let tx = slot.sender();
		let rx = slot.receiver();

		let (done_tx, done_rx) = mpsc::channel();
		thread::spawn(move || {
			done_tx.send(rx.recv()).unwrap();
		});

		// Receiver parks while the slot is empty.
		assert!(done_rx.recv_timeout(Duration::from_millis(20)).is_err());

		assert_eq!(tx.offer(42u32), Ok(SlotPush::Queued));
		assert_eq!(done_rx.recv_timeout(Duration::from_secs(1)), Ok(Some(42)));
	}

	#[test]
	fn close_drops_pending_and_wakes_receiver() {
		let slot = SingleSlot::new();
		let tx = slot.sender();
		let rx = slot.receiver();

		let _ = tx.offer(7u32);
		tx.close();

		assert_eq!(rx.recv(), None);
		assert_eq!(tx.offer(8), Err(SlotClosed));
		// Repeated recv after close still returns None.
		assert_eq!(rx.recv(), None);
	}

	#[test]
	fn has_pending_tracks_slot_occupancy() {
		let slot = SingleSlot::new();
		let tx = slot.sender();
		let rx = slot.receiver();

		assert!(!tx.has_pending());
		let _ = tx.offer(1u32);
		assert!(tx.has_pending());
		let _ = rx.recv();
		assert!(!tx.has_pending());
	}

	// ── Invariant stress (deterministic xorshift) ──

	/// Deterministic pseudo-random number generator for reproducible stress tests.
	struct Xorshift64(u64);

	impl Xorshift64 {
		fn new(seed: u64) -> Self {
			Self(seed)
		}

		fn next(&mut self) -> u64 {
			let mut x = self.0;
			x ^= x << 13;
			x ^= x >> 7;
			x ^= x << 17;
			self.0 = x;
			x
		}

		fn next_usize(&mut self, bound: usize) -> usize {
			(self.next() % bound as u64) as usize
		}
	}

	#[test]
	fn stress_latest_wins_matches_model() {
		const OPS: usize = 10_000;
		let slot = SingleSlot::new();
		let tx = slot.sender();
		let rx = slot.receiver();
		let mut model: Option<u32> = None;
		let mut rng = Xorshift64::new(0xDEAD_BEEF);

		for i in 0..OPS {
			// 60% offer, 40% take.
			if rng.next_usize(10) < 6 {
				let val = i as u32;
				let expected = if model.is_some() { SlotPush::Replaced } else { SlotPush::Queued };
				assert_eq!(tx.offer(val), Ok(expected), "op {i}: offer({val})");
				model = Some(val);
			} else {
				match model.take() {
					Some(v) => assert_eq!(rx.recv(), Some(v), "op {i}: take"),
					None => assert!(!tx.has_pending(), "op {i}: slot should be empty"),
				}
			}
		}

		tx.close();
		assert_eq!(rx.recv(), None);
	}

	#[test]
	fn concurrent_offers_deliver_an_increasing_subsequence() {
		const N: u32 = 10_000;
		let slot = SingleSlot::new();
		let tx = slot.sender();
		let rx = slot.receiver();

		let producer = thread::spawn(move || {
			for i in 1..=N {
				tx.offer(i).unwrap();
			}
			// Close only after the final offer has been taken, so the last
			// delivered value is deterministic.
			while tx.has_pending() {
				thread::yield_now();
			}
			tx.close();
		});

		let mut received = Vec::new();
		while let Some(v) = rx.recv() {
			received.push(v);
		}
		producer.join().unwrap();

		assert!(!received.is_empty());
		assert!(received.windows(2).all(|w| w[0] < w[1]), "replaced values must never resurface");
		assert_eq!(received.last(), Some(&N));
	}
}
