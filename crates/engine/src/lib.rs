//! Asynchronous statistics recomputation for the focused region of interest.
//!
//! Whenever the user focuses or mutates a region over a large sample grid,
//! the engine recomputes aggregate statistics (sample count, min/max/mean
//! intensity, physical area/volume) on a dedicated worker. Goals:
//! * never block the interactive path: submission is a constant-time slot swap
//! * at most one scan in flight, latest submission wins
//! * stale results are discarded, never published over fresher ones
//! * entity listener lifecycle is 1:1 with the tracked entity

mod entity;
mod hint;
mod scan;
mod sink;
mod source;
mod stats;
mod tracker;

pub use entity::{Axis, EntityId, EntitySubscription, FocusedEntity, RegionGeometry};
pub use hint::hint_text;
pub use scan::{ScanError, ScanPolicy, compute_region_stats};
pub use sink::{RenderSignal, ResultSink};
pub use source::{DataSource, GridSource, SampleStream, SourceError};
pub use stats::{RegionStats, StatsSnapshot};
pub use tracker::FocusTracker;
