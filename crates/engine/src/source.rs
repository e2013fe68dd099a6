use crate::entity::{Axis, RegionGeometry};

/// Failure while pulling samples out of a source.
///
/// Surfaces when the backing data became inconsistent with the region being
/// scanned (e.g. the region mutated or the data was swapped mid-scan).
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SourceError {
	#[error("sample {index} is out of range for the backing data")]
	OutOfRange { index: u64 },
	#[error("backing data is gone")]
	Detached,
}

/// Fallible lazy sample stream, finite and restartable.
pub type SampleStream<'a> = Box<dyn Iterator<Item = Result<f64, SourceError>> + 'a>;

/// A grid of numeric samples an entity can overlay.
pub trait DataSource: Send + Sync {
	/// Iterates every sample inside `region`, exactly once each.
	fn samples(&self, region: &RegionGeometry) -> SampleStream<'_>;

	/// Physical size of one sample step along `axis`.
	fn scale(&self, axis: Axis) -> f64;
}

/// Dense in-memory sample grid.
///
/// Regions are intersected with the grid: samples outside the grid are not
/// part of the iteration. A planar region over a volumetric grid reads the
/// z=0 slice.
pub struct GridSource {
	width: u64,
	height: u64,
	depth: u64,
	scale: [f64; 3],
	data: Vec<f64>,
}

impl GridSource {
	/// Planar grid with row-major `data` (`width * height` values).
	pub fn plane(width: u64, height: u64, scale_x: f64, scale_y: f64, data: Vec<f64>) -> Self {
		assert_eq!(data.len() as u64, width * height, "data length must match grid extent");
		Self {
			width,
			height,
			depth: 1,
			scale: [scale_x, scale_y, 1.0],
			data,
		}
	}

	/// Volumetric grid with slice-major `data` (`width * height * depth` values).
	pub fn volume(width: u64, height: u64, depth: u64, scale: [f64; 3], data: Vec<f64>) -> Self {
		assert_eq!(data.len() as u64, width * height * depth, "data length must match grid extent");
		Self {
			width,
			height,
			depth,
			scale,
			data,
		}
	}

	fn value_at(&self, x: u64, y: u64, z: u64) -> f64 {
		self.data[(z * self.height * self.width + y * self.width + x) as usize]
	}
}

impl DataSource for GridSource {
	fn samples(&self, region: &RegionGeometry) -> SampleStream<'_> {
		let x0 = region.x.clamp(0, self.width as i64) as u64;
		let x1 = region.x.saturating_add(region.width as i64).clamp(0, self.width as i64) as u64;
		let y0 = region.y.clamp(0, self.height as i64) as u64;
		let y1 = region.y.saturating_add(region.height as i64).clamp(0, self.height as i64) as u64;
		let (z0, z1) = match region.slab {
			Some((z, depth)) => (
				z.clamp(0, self.depth as i64) as u64,
				z.saturating_add(depth as i64).clamp(0, self.depth as i64) as u64,
			),
			None => (0, 1.min(self.depth)),
		};

		Box::new((z0..z1).flat_map(move |z| {
			(y0..y1).flat_map(move |y| (x0..x1).map(move |x| Ok(self.value_at(x, y, z))))
		}))
	}

	fn scale(&self, axis: Axis) -> f64 {
		match axis {
			Axis::X => self.scale[0],
			Axis::Y => self.scale[1],
			Axis::Z => self.scale[2],
		}
	}
}
