use gridbeat_shared::STEPS;

use crate::rhythm::StepMask;

/// Slices shorter than this are skipped rather than clicked through.
pub const MIN_SLICE_SECS: f64 = 0.005;
/// Chance that the marker assignment generator breaks the cycle with a
/// random marker.
const MARKER_SCATTER_PROB: f32 = 0.3;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Slice {
    pub start: f64,
    pub duration: f64,
}

/// Resolve marker `m` against the loaded buffer: the slice runs from the
/// marker to the next one (or the end of the buffer). Returns `None` for
/// anything unplayable; the dispatcher skips those steps silently.
pub fn slice_for_marker(markers: &[f64], m: usize, buffer_secs: f64) -> Option<Slice> {
    if buffer_secs <= 0.0 {
        return None;
    }
    let start = markers.get(m)?.clamp(0.0, buffer_secs);
    let end = markers.get(m + 1).copied().unwrap_or(buffer_secs);
    if end - start <= 0.0 {
        return None;
    }
    let duration = (end - start).max(MIN_SLICE_SECS).min(buffer_secs - start);
    if duration < MIN_SLICE_SECS {
        return None;
    }
    Some(Slice { start, duration })
}

/// Procedural sample-roll fill: active steps cycle through the marker set
/// in order, occasionally grabbing a random marker instead.
pub fn assign_markers(
    mask: &StepMask,
    marker_count: usize,
    rng: &mut fastrand::Rng,
) -> [Option<u8>; STEPS] {
    let mut roll = [None; STEPS];
    if marker_count == 0 {
        return roll;
    }
    let mut cursor = 0usize;
    for (i, slot) in roll.iter_mut().enumerate() {
        if !mask[i] {
            continue;
        }
        let marker = if rng.f32() < MARKER_SCATTER_PROB {
            rng.usize(0..marker_count)
        } else {
            cursor % marker_count
        };
        *slot = Some(marker as u8);
        cursor += 1;
    }
    roll
}
