use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonic generation clock shared between submitters and in-flight tasks.
///
/// Generation 0 means "nothing submitted yet"; the first advance returns 1.
/// A task captures its generation at submission time and compares it against
/// [`GenerationClock::latest`] at its check points: a mismatch means the task
/// has been superseded and must not publish.
#[derive(Debug, Default)]
pub struct GenerationClock {
	latest: AtomicU64,
}

impl GenerationClock {
	/// Creates a clock at generation 0.
	pub fn new() -> Self {
		Self::default()
	}

	/// Bumps and returns the new latest generation.
	pub fn advance(&self) -> u64 {
		self.latest.fetch_add(1, Ordering::AcqRel).wrapping_add(1)
	}

	/// Returns the latest generation.
	pub fn latest(&self) -> u64 {
		self.latest.load(Ordering::Acquire)
	}

	/// True while `generation` is still the latest.
	pub fn is_current(&self, generation: u64) -> bool {
		self.latest() == generation
	}
}
