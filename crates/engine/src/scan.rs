use crate::entity::{Axis, RegionGeometry};
use crate::source::{DataSource, SourceError};
use crate::stats::RegionStats;

/// Tuning for the cooperative scan loop.
#[derive(Debug, Clone, Copy)]
pub struct ScanPolicy {
	/// Samples processed between supersession checks. Coarse on purpose:
	/// polling per sample would dominate large scans.
	pub check_interval: u64,
}

impl Default for ScanPolicy {
	fn default() -> Self {
		Self { check_interval: 1 << 16 }
	}
}

/// Why a scan produced no statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ScanError {
	/// A newer submission superseded this scan. Normal discard, not a failure.
	#[error("superseded by a newer submission")]
	Superseded,
	/// The entity/data became inconsistent mid-scan; partial state discarded.
	#[error("entity became inconsistent mid-scan: {0}")]
	Inconsistent(#[from] SourceError),
}

/// Scans every sample inside `region` exactly once and folds the aggregates.
///
/// `superseded` is polled every `policy.check_interval` samples; once it
/// reports true the accumulated state is discarded. A full pass over an empty
/// support is a valid all-zero result, not an error.
pub fn compute_region_stats(
	region: RegionGeometry,
	source: &dyn DataSource,
	generation: u64,
	policy: ScanPolicy,
	superseded: impl Fn() -> bool,
) -> Result<RegionStats, ScanError> {
	let interval = policy.check_interval.max(1);

	let mut count = 0u64;
	let mut sum = 0.0f64;
	let mut min = f64::INFINITY;
	let mut max = f64::NEG_INFINITY;

	for sample in source.samples(&region) {
		let value = sample?;
		count += 1;
		sum += value;
		min = min.min(value);
		max = max.max(value);

		if count % interval == 0 && superseded() {
			return Err(ScanError::Superseded);
		}
	}

	if count == 0 {
		return Ok(RegionStats::empty(generation));
	}

	let mut sample_size = source.scale(Axis::X) * source.scale(Axis::Y);
	if region.is_volumetric() {
		sample_size *= source.scale(Axis::Z);
	}

	Ok(RegionStats {
		sample_count: count,
		area: count as f64 * sample_size,
		min_intensity: min,
		max_intensity: max,
		mean_intensity: sum / count as f64,
		generation,
	})
}
