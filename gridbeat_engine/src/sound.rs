use gridbeat_shared::{ChannelId, DurationTag};

/// Seam to whatever actually makes noise. The scheduling core only ever
/// talks to this trait; synthesis, sample decoding and output routing all
/// live behind it.
pub trait SoundEngine: Send {
    /// Fire a note (or an un-pitched drum hit) at `time` seconds on the
    /// engine's timeline.
    fn trigger(
        &mut self,
        channel: ChannelId,
        note: Option<u8>,
        tag: DurationTag,
        time: f64,
        velocity: f32,
    );

    /// Play `duration` seconds of the loaded sample starting at `start`.
    fn play_slice(&mut self, time: f64, start: f64, duration: f64);

    /// Ramp a channel's linear gain over `ramp_secs`.
    fn set_channel_gain(&mut self, channel: ChannelId, gain: f32, ramp_secs: f32);
}

/// Prints every call instead of synthesizing. Backs the headless binary and
/// doubles as a poor man's event monitor.
pub struct LogSoundEngine;

impl SoundEngine for LogSoundEngine {
    fn trigger(
        &mut self,
        channel: ChannelId,
        note: Option<u8>,
        tag: DurationTag,
        time: f64,
        velocity: f32,
    ) {
        eprintln!(
            "[Sound] t={:.3} {} note={:?} vel={:.2} ({})",
            time,
            channel.name(),
            note,
            velocity,
            tag.name()
        );
    }

    fn play_slice(&mut self, time: f64, start: f64, duration: f64) {
        eprintln!(
            "[Sound] t={:.3} slice start={:.3}s dur={:.3}s",
            time, start, duration
        );
    }

    fn set_channel_gain(&mut self, channel: ChannelId, gain: f32, ramp_secs: f32) {
        eprintln!(
            "[Sound] gain {} -> {:.3} over {:.0}ms",
            channel.name(),
            gain,
            ramp_secs * 1000.0
        );
    }
}
