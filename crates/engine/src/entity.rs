use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::source::DataSource;

/// Process-unique identifier for a focused entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityId(u64);

impl EntityId {
	fn next() -> Self {
		static NEXT: AtomicU64 = AtomicU64::new(0);
		Self(NEXT.fetch_add(1, Ordering::Relaxed))
	}
}

/// Axis of a sample grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Axis {
	X,
	Y,
	Z,
}

/// Rectangular (planar) or box (volumetric) support of a focused region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionGeometry {
	pub x: i64,
	pub y: i64,
	pub width: u64,
	pub height: u64,
	/// `Some((z, depth))` for volumetric regions.
	pub slab: Option<(i64, u64)>,
}

impl RegionGeometry {
	/// Planar region.
	pub const fn plane(x: i64, y: i64, width: u64, height: u64) -> Self {
		Self {
			x,
			y,
			width,
			height,
			slab: None,
		}
	}

	/// Volumetric region.
	pub const fn volume(x: i64, y: i64, z: i64, width: u64, height: u64, depth: u64) -> Self {
		Self {
			x,
			y,
			width,
			height,
			slab: Some((z, depth)),
		}
	}

	/// True for box-shaped regions with a z extent.
	pub const fn is_volumetric(&self) -> bool {
		self.slab.is_some()
	}

	/// Extent along z; 1 for planar regions.
	pub fn depth(&self) -> u64 {
		match self.slab {
			Some((_, depth)) => depth,
			None => 1,
		}
	}

	/// Number of samples inside the support.
	pub fn sample_count(&self) -> u64 {
		self.width.saturating_mul(self.height).saturating_mul(self.depth())
	}

	/// True when the support contains no samples.
	pub fn is_empty(&self) -> bool {
		self.sample_count() == 0
	}
}

type MutationListener = Arc<dyn Fn(&FocusedEntity) + Send + Sync>;

/// A user-focused region of interest overlaying a data source.
///
/// Externally owned and externally mutable: the geometry can change while a
/// scan is in flight. Mutations fan out to subscribed listeners.
pub struct FocusedEntity {
	id: EntityId,
	geometry: Mutex<RegionGeometry>,
	source: Arc<dyn DataSource>,
	listeners: Mutex<Vec<(u64, MutationListener)>>,
	next_listener: AtomicU64,
}

impl FocusedEntity {
	pub fn new(geometry: RegionGeometry, source: Arc<dyn DataSource>) -> Arc<Self> {
		Arc::new(Self {
			id: EntityId::next(),
			geometry: Mutex::new(geometry),
			source,
			listeners: Mutex::new(Vec::new()),
			next_listener: AtomicU64::new(0),
		})
	}

	pub fn id(&self) -> EntityId {
		self.id
	}

	/// Snapshot of the current geometry.
	pub fn geometry(&self) -> RegionGeometry {
		*self.geometry.lock()
	}

	/// The data source this entity overlays.
	pub fn source(&self) -> &Arc<dyn DataSource> {
		&self.source
	}

	/// Replaces the geometry and notifies listeners.
	pub fn set_geometry(&self, geometry: RegionGeometry) {
		*self.geometry.lock() = geometry;

		// Listeners run outside the registry lock so they may re-subscribe.
		let listeners: Vec<MutationListener> = self.listeners.lock().iter().map(|(_, l)| Arc::clone(l)).collect();
		for listener in listeners {
			listener(self);
		}
	}

	/// Subscribes to mutation notifications. Dropping the guard detaches.
	pub fn subscribe(self: &Arc<Self>, listener: impl Fn(&FocusedEntity) + Send + Sync + 'static) -> EntitySubscription {
		let id = self.next_listener.fetch_add(1, Ordering::Relaxed);
		self.listeners.lock().push((id, Arc::new(listener)));
		EntitySubscription {
			entity: Arc::downgrade(self),
			id,
		}
	}

	/// Number of attached listeners.
	pub fn listener_count(&self) -> usize {
		self.listeners.lock().len()
	}
}

impl fmt::Debug for FocusedEntity {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("FocusedEntity")
			.field("id", &self.id)
			.field("geometry", &self.geometry())
			.finish_non_exhaustive()
	}
}

/// Scoped mutation subscription; detaches on drop.
pub struct EntitySubscription {
	entity: Weak<FocusedEntity>,
	id: u64,
}

impl Drop for EntitySubscription {
	fn drop(&mut self) {
		if let Some(entity) = self.entity.upgrade() {
			entity.listeners.lock().retain(|(id, _)| *id != self.id);
		}
	}
}
