use crate::entity::RegionGeometry;
use crate::stats::StatsSnapshot;

fn enlarge(text: &str, len: usize) -> String {
	let mut out = text.to_owned();
	while out.len() < len {
		out.push(' ');
	}
	out
}

fn fmt1(value: f64) -> String {
	format!("{value:.1}")
}

/// Renders the tooltip body for a focused region.
///
/// Two aligned columns for position/size, then one line per aggregate. The
/// Unset snapshot renders position/size only. `updating` appends the marker
/// the render layer shows while a recompute is in flight.
pub fn hint_text(region: &RegionGeometry, snapshot: &StatsSnapshot, updating: bool) -> String {
	let mut left = vec![
		format!("Position X {}", region.x),
		format!("Size X     {}", region.width),
	];
	let right = [
		format!("Position Y {}", region.y),
		format!("Size Y     {}", region.height),
	];

	let stats = snapshot.stats().copied();
	if let Some(stats) = stats {
		left.push(format!("Interior   {} px", stats.sample_count));
		if region.is_volumetric() {
			left.push(format!("Volume     {}", fmt1(stats.area)));
		} else {
			left.push(format!("Area       {}", fmt1(stats.area)));
		}
	}

	let width = left.iter().map(String::len).max().unwrap_or(0) + 2;

	let mut lines: Vec<String> = Vec::new();
	for (i, line) in left.iter().enumerate() {
		match right.get(i) {
			Some(r) => lines.push(format!("{}{}", enlarge(line, width), r)),
			None => lines.push(line.clone()),
		}
	}

	match stats {
		Some(stats) => {
			let mut intensity = format!(
				"Intensity  min: {}  max: {}  mean: {}",
				fmt1(stats.min_intensity),
				fmt1(stats.max_intensity),
				fmt1(stats.mean_intensity)
			);
			if updating {
				intensity.push_str(" *");
			}
			lines.push(intensity);
		}
		None => {
			if updating {
				lines.push("updating *".to_owned());
			}
		}
	}

	lines.join("\n")
}
