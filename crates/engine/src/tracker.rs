use std::io;
use std::sync::Arc;

use gaze_worker::{GenerationClock, SingleSlotProcessor, WorkerContext};
use parking_lot::Mutex;

use crate::entity::{EntityId, EntitySubscription, FocusedEntity};
use crate::scan::{ScanError, ScanPolicy, compute_region_stats};
use crate::sink::ResultSink;
use crate::stats::StatsSnapshot;

/// Tracks the externally focused entity and keeps the sink fresh.
///
/// Every focus change or geometry mutation funnels a recompute through the
/// single-slot worker, so at most one scan runs at any instant and only the
/// newest request survives the pending slot. Listener lifecycle is 1:1 with
/// the tracked entity: exactly one attach and one detach per transition.
pub struct FocusTracker {
	inner: Arc<TrackerInner>,
}

struct TrackerInner {
	processor: SingleSlotProcessor,
	clock: Arc<GenerationClock>,
	sink: Arc<ResultSink>,
	policy: ScanPolicy,
	state: Mutex<TrackerState>,
}

#[derive(Default)]
struct TrackerState {
	tracked: Option<Tracked>,
	transitioning: bool,
	/// Newest focus request that arrived while a transition was in progress.
	deferred: Option<Option<Arc<FocusedEntity>>>,
}

struct Tracked {
	entity: Arc<FocusedEntity>,
	_subscription: EntitySubscription,
}

impl FocusTracker {
	/// Spawns the worker and starts with no tracked entity.
	pub fn new(policy: ScanPolicy) -> io::Result<Self> {
		Ok(Self {
			inner: Arc::new(TrackerInner {
				processor: SingleSlotProcessor::new("gaze-stats")?,
				clock: Arc::new(GenerationClock::new()),
				sink: Arc::new(ResultSink::new()),
				policy,
				state: Mutex::new(TrackerState::default()),
			}),
		})
	}

	/// The sink the render layer reads.
	pub fn sink(&self) -> &Arc<ResultSink> {
		&self.inner.sink
	}

	/// Last published snapshot.
	pub fn current(&self) -> StatsSnapshot {
		self.inner.sink.current()
	}

	/// True while a scan is executing; the render layer uses this for its
	/// "updating" marker.
	pub fn is_processing(&self) -> bool {
		self.inner.processor.is_processing()
	}

	/// External notification: focus moved to `entity` (or nowhere).
	pub fn focus_changed(&self, entity: Option<Arc<FocusedEntity>>) {
		TrackerInner::focus_changed(&self.inner, entity);
	}

	/// External notification: `entity`'s geometry changed.
	///
	/// Ignored unless `entity` is the tracked one. Mutations performed via
	/// [`FocusedEntity::set_geometry`] arrive here through the attached
	/// listener as well.
	pub fn entity_mutated(&self, entity: &Arc<FocusedEntity>) {
		self.inner.entity_mutated(entity.id());
	}

	/// External notification: the active data source went away or was
	/// replaced. The tracked entity no longer overlays valid data.
	pub fn source_changed(&self) {
		TrackerInner::focus_changed(&self.inner, None);
	}
}

impl TrackerInner {
	fn focus_changed(this: &Arc<Self>, entity: Option<Arc<FocusedEntity>>) {
		{
			let mut state = this.state.lock();
			if state.transitioning {
				// Re-entrant notification: park it, newest wins.
				state.deferred = Some(entity);
				return;
			}
			state.transitioning = true;
		}

		let mut next = Some(entity);
		while let Some(target) = next.take() {
			Self::apply_focus(this, target);

			let mut state = this.state.lock();
			next = state.deferred.take();
			if next.is_none() {
				state.transitioning = false;
			}
		}
	}

	fn apply_focus(this: &Arc<Self>, target: Option<Arc<FocusedEntity>>) {
		let same = {
			let state = this.state.lock();
			match (&state.tracked, &target) {
				(Some(tracked), Some(target)) => tracked.entity.id() == target.id(),
				(None, None) => true,
				_ => false,
			}
		};
		if same {
			return;
		}

		// Detach before attach: dropping the old guard releases the listener.
		{
			let mut state = this.state.lock();
			state.tracked = None;
		}

		match target {
			Some(entity) => {
				let id = entity.id();
				let weak = Arc::downgrade(this);
				let subscription = entity.subscribe(move |_| {
					if let Some(inner) = weak.upgrade() {
						inner.entity_mutated(id);
					}
				});
				tracing::trace!(entity = ?id, "tracking focused entity");

				{
					let mut state = this.state.lock();
					state.tracked = Some(Tracked {
						entity: Arc::clone(&entity),
						_subscription: subscription,
					});
				}
				this.submit_scan(&entity);
			}
			None => {
				let generation = this.clock.advance();
				tracing::trace!(generation, "focus cleared");
				this.sink.clear(generation);
			}
		}
	}

	fn entity_mutated(&self, id: EntityId) {
		let entity = {
			let state = self.state.lock();
			match &state.tracked {
				Some(tracked) if tracked.entity.id() == id => Some(Arc::clone(&tracked.entity)),
				_ => None,
			}
		};
		if let Some(entity) = entity {
			self.submit_scan(&entity);
		}
	}

	fn submit_scan(&self, entity: &Arc<FocusedEntity>) {
		let generation = self.clock.advance();
		let entity = Arc::clone(entity);
		let clock = Arc::clone(&self.clock);
		let sink = Arc::clone(&self.sink);
		let policy = self.policy;

		tracing::trace!(generation, entity = ?entity.id(), "submitting scan");
		let _ = self.processor.submit(move |ctx| {
			run_scan(ctx, &entity, generation, policy, &clock, &sink);
		});
	}
}

/// Executes one scan task on the worker and publishes if still current.
fn run_scan(
	ctx: &WorkerContext,
	entity: &FocusedEntity,
	generation: u64,
	policy: ScanPolicy,
	clock: &GenerationClock,
	sink: &ResultSink,
) {
	// The geometry is read once; the entity may mutate freely afterwards.
	let region = entity.geometry();
	let source = Arc::clone(entity.source());

	let superseded = || ctx.has_newer_pending() || !clock.is_current(generation);
	match compute_region_stats(region, source.as_ref(), generation, policy, superseded) {
		Ok(stats) => {
			// Freshness is re-checked right before publish, not only at the
			// periodic check points.
			if clock.is_current(generation) {
				sink.publish(StatsSnapshot::Ready(stats));
			} else {
				tracing::trace!(generation, "scan finished stale; discarded");
			}
		}
		Err(ScanError::Superseded) => {
			tracing::trace!(generation, "scan superseded at check point");
		}
		Err(ScanError::Inconsistent(err)) => {
			tracing::warn!(generation, %err, "entity inconsistent mid-scan; partial result discarded");
		}
	}
}
