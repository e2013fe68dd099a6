use std::sync::Arc;

use arc_swap::ArcSwap;
use parking_lot::Mutex;

use crate::stats::StatsSnapshot;

/// Fire-and-forget "statistics updated" notification to the render layer.
pub type RenderSignal = Arc<dyn Fn() + Send + Sync>;

/// Holds the last published statistics snapshot for lock-free readers.
///
/// Publishes are monotonic in generation: an older snapshot never lands on
/// top of a newer one, independently of the submit-side discipline. Readers
/// pay a single atomic pointer load.
pub struct ResultSink {
	current: ArcSwap<StatsSnapshot>,
	/// Serializes the generation comparison with the swap.
	publish: Mutex<()>,
	signal: Mutex<Option<RenderSignal>>,
}

impl ResultSink {
	pub fn new() -> Self {
		Self {
			current: ArcSwap::from_pointee(StatsSnapshot::Unset { generation: 0 }),
			publish: Mutex::new(()),
			signal: Mutex::new(None),
		}
	}

	/// Installs the render notification callback.
	pub fn set_render_signal(&self, signal: impl Fn() + Send + Sync + 'static) {
		*self.signal.lock() = Some(Arc::new(signal));
	}

	/// Last published snapshot; readable at any time, including mid-scan.
	pub fn current(&self) -> StatsSnapshot {
		**self.current.load()
	}

	/// Replaces the visible snapshot and fires the render signal. Refused
	/// when `snapshot` is older than the held one.
	pub fn publish(&self, snapshot: StatsSnapshot) -> bool {
		{
			let _guard = self.publish.lock();
			let held = self.current.load();
			if snapshot.generation() < held.generation() {
				tracing::trace!(
					generation = snapshot.generation(),
					held = held.generation(),
					"discarding stale publish"
				);
				return false;
			}
			self.current.store(Arc::new(snapshot));
		}
		tracing::trace!(generation = snapshot.generation(), "statistics published");

		// The signal fires outside every lock; it may call straight back in.
		let signal = self.signal.lock().clone();
		if let Some(signal) = signal {
			signal();
		}
		true
	}

	/// Resets to the unset state at `generation`.
	pub fn clear(&self, generation: u64) -> bool {
		self.publish(StatsSnapshot::Unset { generation })
	}
}

impl Default for ResultSink {
	fn default() -> Self {
		Self::new()
	}
}
