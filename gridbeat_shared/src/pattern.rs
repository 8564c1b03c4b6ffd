use serde::{Deserialize, Serialize};

use crate::{ChannelId, DrumTrack, MAX_MARKERS, ROLL_NOTES, STEPS};

pub const MIN_BPM: f32 = 60.0;
pub const MAX_BPM: f32 = 180.0;
pub const MIN_DB: f32 = -60.0;
pub const MAX_DB: f32 = 6.0;

/// One cycle of sequencer content: four drum rows, a monophonic note roll
/// and a sample-marker roll. Every row is exactly `STEPS` long; `None` means
/// no event at that step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pattern {
    pub drum_hits: [[bool; STEPS]; 4],
    pub note_roll: [Option<u8>; STEPS],
    pub sample_roll: [Option<u8>; STEPS],
}

impl Default for Pattern {
    fn default() -> Self {
        Self {
            drum_hits: [[false; STEPS]; 4],
            note_roll: [None; STEPS],
            sample_roll: [None; STEPS],
        }
    }
}

impl Pattern {
    pub fn toggle_drum(&mut self, track: DrumTrack, step: usize) {
        if step < STEPS {
            self.drum_hits[track.index()][step] = !self.drum_hits[track.index()][step];
        }
    }

    pub fn set_drum(&mut self, track: DrumTrack, step: usize, on: bool) {
        if step < STEPS {
            self.drum_hits[track.index()][step] = on;
        }
    }

    /// Set a roll note. Rows outside the pitch table clear the step instead.
    pub fn set_note(&mut self, step: usize, row: Option<u8>) {
        if step < STEPS {
            self.note_roll[step] = row.filter(|&r| (r as usize) < ROLL_NOTES.len());
        }
    }

    /// Set a sample marker index. Out-of-range markers clear the step.
    pub fn set_sample_step(&mut self, step: usize, marker: Option<u8>) {
        if step < STEPS {
            self.sample_roll[step] = marker.filter(|&m| (m as usize) < MAX_MARKERS);
        }
    }

    pub fn clear_drums(&mut self, track: DrumTrack) {
        self.drum_hits[track.index()] = [false; STEPS];
    }

    pub fn clear_note_roll(&mut self) {
        self.note_roll = [None; STEPS];
    }

    pub fn clear_sample_roll(&mut self) {
        self.sample_roll = [None; STEPS];
    }
}

/// Slice boundaries into the loaded sample, in seconds. Kept sorted and
/// capped at `MAX_MARKERS`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Markers {
    offsets: Vec<f64>,
}

impl Markers {
    /// Rebuild from arbitrary offsets, restoring the invariants (sorted,
    /// non-negative, capped).
    pub fn from_offsets(mut offsets: Vec<f64>) -> Self {
        offsets.retain(|t| t.is_finite() && *t >= 0.0);
        offsets.sort_by(f64::total_cmp);
        offsets.truncate(MAX_MARKERS);
        Self { offsets }
    }

    /// Insert a marker, keeping the sequence sorted. No-op at the cap.
    pub fn add(&mut self, secs: f64) -> bool {
        if self.offsets.len() >= MAX_MARKERS || !secs.is_finite() || secs < 0.0 {
            return false;
        }
        let at = self.offsets.partition_point(|&t| t <= secs);
        self.offsets.insert(at, secs);
        true
    }

    pub fn clear(&mut self) {
        self.offsets.clear();
    }

    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<f64> {
        self.offsets.get(index).copied()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.offsets
    }
}

/// Per-channel levels in decibels, clamped to `[MIN_DB, MAX_DB]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MixLevels {
    db: [f32; 6],
}

impl Default for MixLevels {
    fn default() -> Self {
        Self { db: [0.0; 6] }
    }
}

impl MixLevels {
    pub fn get(&self, channel: ChannelId) -> f32 {
        self.db[channel.index()]
    }

    pub fn set(&mut self, channel: ChannelId, db: f32) {
        self.db[channel.index()] = db.clamp(MIN_DB, MAX_DB);
    }

    pub fn iter(&self) -> impl Iterator<Item = (ChannelId, f32)> + '_ {
        ChannelId::ALL.into_iter().map(|c| (c, self.db[c.index()]))
    }
}

/// Periodic velocity boost. `Off` disables accents entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccentInterval {
    Off,
    Two,
    Three,
    Four,
    Eight,
}

impl Default for AccentInterval {
    fn default() -> Self {
        Self::Off
    }
}

impl AccentInterval {
    const ALL: [AccentInterval; 5] = [
        AccentInterval::Off,
        AccentInterval::Two,
        AccentInterval::Three,
        AccentInterval::Four,
        AccentInterval::Eight,
    ];

    /// Lookup by index, wrapping out-of-range values into the valid set.
    pub fn from_index(idx: usize) -> AccentInterval {
        Self::ALL[idx % Self::ALL.len()]
    }

    pub fn steps(self) -> Option<u8> {
        match self {
            AccentInterval::Off => None,
            AccentInterval::Two => Some(2),
            AccentInterval::Three => Some(3),
            AccentInterval::Four => Some(4),
            AccentInterval::Eight => Some(8),
        }
    }
}

/// Tempo and feel settings for the step clock.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransportConfig {
    pub bpm: f32,
    /// 0..1, applied to every second 16th.
    pub swing: f32,
    pub accent: AccentInterval,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            bpm: 120.0,
            swing: 0.0,
            accent: AccentInterval::Off,
        }
    }
}

impl TransportConfig {
    pub fn set_bpm(&mut self, bpm: f32) {
        self.bpm = bpm.clamp(MIN_BPM, MAX_BPM);
    }

    pub fn set_swing(&mut self, swing: f32) {
        self.swing = swing.clamp(0.0, 1.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_rows_stay_fixed_length() {
        let mut p = Pattern::default();
        p.set_drum(DrumTrack::Kick, 0, true);
        p.set_drum(DrumTrack::Kick, 99, true); // ignored
        p.set_note(3, Some(5));
        p.set_note(4, Some(12)); // outside the pitch table
        p.set_sample_step(7, Some(15));
        p.set_sample_step(8, Some(16)); // outside the marker table

        assert!(p.drum_hits[0][0]);
        assert_eq!(p.note_roll[3], Some(5));
        assert_eq!(p.note_roll[4], None);
        assert_eq!(p.sample_roll[7], Some(15));
        assert_eq!(p.sample_roll[8], None);
    }

    #[test]
    fn test_markers_sorted_and_capped() {
        let mut m = Markers::default();
        assert!(m.add(2.0));
        assert!(m.add(0.5));
        assert!(m.add(1.0));
        assert_eq!(m.as_slice(), &[0.5, 1.0, 2.0]);

        for i in 0..MAX_MARKERS {
            m.add(3.0 + i as f64);
        }
        assert_eq!(m.len(), MAX_MARKERS);
        // At the cap further adds are no-ops
        assert!(!m.add(100.0));
        assert_eq!(m.len(), MAX_MARKERS);
    }

    #[test]
    fn test_mix_levels_clamp() {
        let mut mix = MixLevels::default();
        mix.set(ChannelId::Synth, -90.0);
        assert_eq!(mix.get(ChannelId::Synth), MIN_DB);
        mix.set(ChannelId::Kick, 20.0);
        assert_eq!(mix.get(ChannelId::Kick), MAX_DB);
    }

    #[test]
    fn test_accent_interval_wraps() {
        assert_eq!(AccentInterval::from_index(1), AccentInterval::Two);
        assert_eq!(AccentInterval::from_index(5), AccentInterval::Off);
        assert_eq!(AccentInterval::from_index(9), AccentInterval::Eight);
        assert_eq!(AccentInterval::Off.steps(), None);
        assert_eq!(AccentInterval::Eight.steps(), Some(8));
    }
}
