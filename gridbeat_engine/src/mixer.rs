use gridbeat_shared::pattern::{MAX_DB, MIN_DB};
use gridbeat_shared::{ChannelId, MixLevels};

use crate::sound::SoundEngine;

/// Smoothing applied to every gain change so level edits don't click.
pub const GAIN_RAMP_SECS: f32 = 0.03;

pub fn db_to_gain(db: f32) -> f32 {
    10f32.powf(db.clamp(MIN_DB, MAX_DB) / 20.0)
}

/// Pushes decibel levels into the sound engine as ramped linear gains.
pub struct MixGainStage;

impl MixGainStage {
    pub fn apply_channel(sound: &mut dyn SoundEngine, channel: ChannelId, db: f32) {
        sound.set_channel_gain(channel, db_to_gain(db), GAIN_RAMP_SECS);
    }

    pub fn apply_all(sound: &mut dyn SoundEngine, levels: &MixLevels) {
        for (channel, db) in levels.iter() {
            Self::apply_channel(sound, channel, db);
        }
    }
}
