use serde::{Deserialize, Serialize};

pub mod pattern;
pub mod scale;

// Re-exports
pub use pattern::{AccentInterval, Markers, MixLevels, Pattern, TransportConfig};
pub use scale::ScaleType;

/// Steps per pattern cycle (one bar of 16th notes).
pub const STEPS: usize = 16;
/// Maximum slice markers per sample buffer.
pub const MAX_MARKERS: usize = 16;

/// Piano-roll pitch table, top row first: B4 down to C4 (MIDI note numbers).
/// Roll entries index into this table.
pub const ROLL_NOTES: [u8; 12] = [71, 70, 69, 68, 67, 66, 65, 64, 63, 62, 61, 60];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DrumTrack {
    Kick,
    Snare,
    HiHat,
    Perc,
}

impl DrumTrack {
    pub const ALL: [DrumTrack; 4] = [
        DrumTrack::Kick,
        DrumTrack::Snare,
        DrumTrack::HiHat,
        DrumTrack::Perc,
    ];

    pub fn index(self) -> usize {
        match self {
            DrumTrack::Kick => 0,
            DrumTrack::Snare => 1,
            DrumTrack::HiHat => 2,
            DrumTrack::Perc => 3,
        }
    }

    /// Stable identifier used in the persisted payload.
    pub fn name(self) -> &'static str {
        match self {
            DrumTrack::Kick => "kick",
            DrumTrack::Snare => "snare",
            DrumTrack::HiHat => "hihat",
            DrumTrack::Perc => "perc",
        }
    }

    pub fn from_name(name: &str) -> Option<DrumTrack> {
        Self::ALL.into_iter().find(|t| t.name() == name)
    }

    /// Fixed note each track fires with (GM drum map).
    pub fn midi_note(self) -> u8 {
        match self {
            DrumTrack::Kick => 36,
            DrumTrack::Snare => 38,
            DrumTrack::HiHat => 42,
            DrumTrack::Perc => 39,
        }
    }

    /// Step offset within the accent interval that this track accents on.
    /// HiHat/Perc never accent.
    pub fn accent_offset(self) -> Option<u8> {
        match self {
            DrumTrack::Kick => Some(0),
            DrumTrack::Snare => Some(2),
            DrumTrack::HiHat | DrumTrack::Perc => None,
        }
    }

    pub fn channel(self) -> ChannelId {
        match self {
            DrumTrack::Kick => ChannelId::Kick,
            DrumTrack::Snare => ChannelId::Snare,
            DrumTrack::HiHat => ChannelId::HiHat,
            DrumTrack::Perc => ChannelId::Perc,
        }
    }
}

/// Mixable channels: the four drum tracks plus the synth and the sampler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChannelId {
    Kick,
    Snare,
    HiHat,
    Perc,
    Synth,
    Sampler,
}

impl ChannelId {
    pub const ALL: [ChannelId; 6] = [
        ChannelId::Kick,
        ChannelId::Snare,
        ChannelId::HiHat,
        ChannelId::Perc,
        ChannelId::Synth,
        ChannelId::Sampler,
    ];

    pub fn index(self) -> usize {
        match self {
            ChannelId::Kick => 0,
            ChannelId::Snare => 1,
            ChannelId::HiHat => 2,
            ChannelId::Perc => 3,
            ChannelId::Synth => 4,
            ChannelId::Sampler => 5,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ChannelId::Kick => "kick",
            ChannelId::Snare => "snare",
            ChannelId::HiHat => "hihat",
            ChannelId::Perc => "perc",
            ChannelId::Synth => "synth",
            ChannelId::Sampler => "sampler",
        }
    }
}

/// Note length hint passed through to the sound engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DurationTag {
    Eighth,
    Sixteenth,
}

impl DurationTag {
    pub fn name(self) -> &'static str {
        match self {
            DurationTag::Eighth => "8n",
            DurationTag::Sixteenth => "16n",
        }
    }
}
