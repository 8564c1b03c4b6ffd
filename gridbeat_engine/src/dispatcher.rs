use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use gridbeat_shared::{AccentInterval, ChannelId, DrumTrack, DurationTag, Markers, Pattern, ROLL_NOTES, STEPS};

use crate::clock::{ClockSource, ScheduleHandle, TickCallback};
use crate::sample::SampleInfo;
use crate::slicer;
use crate::sound::SoundEngine;

pub const SYNTH_VELOCITY: f32 = 0.8;

/// (base, accented) velocity per drum track. Exactly two values each.
fn drum_velocities(track: DrumTrack) -> (f32, f32) {
    match track {
        DrumTrack::Kick => (0.85, 1.0),
        DrumTrack::Snare => (0.8, 1.0),
        DrumTrack::HiHat => (0.6, 0.85),
        DrumTrack::Perc => (0.65, 0.9),
    }
}

fn drum_duration(track: DrumTrack) -> DurationTag {
    match track {
        DrumTrack::Kick | DrumTrack::Snare => DurationTag::Eighth,
        DrumTrack::HiHat | DrumTrack::Perc => DurationTag::Sixteenth,
    }
}

/// Shared handle to the injected sound engine. Only the tick path locks it.
pub type SharedSound = Arc<Mutex<Box<dyn SoundEngine>>>;

/// Reads one immutable snapshot and turns a tick into sound engine calls.
/// Built fresh whenever the pattern, accent interval, markers or sample
/// readiness change; never mutated in place.
#[derive(Clone)]
pub struct StepDispatcher {
    pattern: Arc<Pattern>,
    markers: Arc<Markers>,
    accent: AccentInterval,
    sample: Option<Arc<SampleInfo>>,
}

impl StepDispatcher {
    pub fn new(
        pattern: Arc<Pattern>,
        markers: Arc<Markers>,
        accent: AccentInterval,
        sample: Option<Arc<SampleInfo>>,
    ) -> Self {
        Self {
            pattern,
            markers,
            accent,
            sample,
        }
    }

    /// Issue every event active at this step. All calls carry the same
    /// scheduled `time`; any per-event failure degrades to skipping that
    /// event, so nothing here can take down the tick.
    pub fn dispatch(&self, time: f64, raw_step: u64, sound: &mut dyn SoundEngine) {
        let i = (raw_step % STEPS as u64) as usize;

        for track in DrumTrack::ALL {
            if !self.pattern.drum_hits[track.index()][i] {
                continue;
            }
            let (base, accented) = drum_velocities(track);
            let velocity = match (self.accent.steps(), track.accent_offset()) {
                (Some(n), Some(offset)) if (i as u8) % n == offset => accented,
                _ => base,
            };
            sound.trigger(
                track.channel(),
                Some(track.midi_note()),
                drum_duration(track),
                time,
                velocity,
            );
        }

        if let Some(row) = self.pattern.note_roll[i] {
            if let Some(&note) = ROLL_NOTES.get(row as usize) {
                sound.trigger(
                    ChannelId::Synth,
                    Some(note),
                    DurationTag::Sixteenth,
                    time,
                    SYNTH_VELOCITY,
                );
            }
        }

        if let (Some(marker), Some(info)) = (self.pattern.sample_roll[i], self.sample.as_deref()) {
            if let Some(slice) =
                slicer::slice_for_marker(self.markers.as_slice(), marker as usize, info.duration_seconds)
            {
                sound.play_slice(time, slice.start, slice.duration);
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayState {
    Stopped,
    Running,
}

/// Owns the clock and the single live schedule registration. Rebuilding
/// disposes the old registration before the new one is installed, so two
/// can never fire the same tick and no tick falls through the swap.
pub struct Transport<C: ClockSource> {
    clock: C,
    handle: Option<ScheduleHandle>,
    state: PlayState,
    playhead: Arc<AtomicU32>,
}

impl<C: ClockSource> Transport<C> {
    pub fn new(clock: C) -> Self {
        Self {
            clock,
            handle: None,
            state: PlayState::Stopped,
            playhead: Arc::new(AtomicU32::new(0)),
        }
    }

    /// UI-facing step indicator, written before any trigger on each tick.
    pub fn playhead(&self) -> Arc<AtomicU32> {
        self.playhead.clone()
    }

    pub fn configure(&mut self, bpm: f32, swing: f32) {
        self.clock.configure(bpm, swing);
    }

    /// Tear down the previous registration and install a new dispatcher.
    pub fn install(&mut self, dispatcher: StepDispatcher, sound: SharedSound) {
        if let Some(handle) = self.handle.take() {
            self.clock.dispose(handle);
        }
        let playhead = self.playhead.clone();
        let callback: TickCallback = Box::new(move |time, raw_step| {
            playhead.store((raw_step % STEPS as u64) as u32, Ordering::Relaxed);
            if let Ok(mut engine) = sound.lock() {
                dispatcher.dispatch(time, raw_step, &mut **engine);
            }
        });
        self.handle = Some(self.clock.schedule(callback));
    }

    pub fn play(&mut self) {
        if self.state == PlayState::Stopped {
            self.state = PlayState::Running;
            self.clock.start(0);
        }
    }

    pub fn stop(&mut self) {
        self.clock.stop();
        self.state = PlayState::Stopped;
        self.playhead.store(0, Ordering::Relaxed);
    }

    pub fn state(&self) -> PlayState {
        self.state
    }

    pub fn clock_mut(&mut self) -> &mut C {
        &mut self.clock
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridbeat_shared::MAX_MARKERS;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Trigger(ChannelId, Option<u8>, DurationTag, f64, f32),
        Slice(f64, f64, f64),
    }

    #[derive(Default)]
    struct FakeSound {
        calls: Vec<Call>,
    }

    impl SoundEngine for FakeSound {
        fn trigger(
            &mut self,
            channel: ChannelId,
            note: Option<u8>,
            tag: DurationTag,
            time: f64,
            velocity: f32,
        ) {
            self.calls.push(Call::Trigger(channel, note, tag, time, velocity));
        }

        fn play_slice(&mut self, time: f64, start: f64, duration: f64) {
            self.calls.push(Call::Slice(time, start, duration));
        }

        fn set_channel_gain(&mut self, _channel: ChannelId, _gain: f32, _ramp_secs: f32) {}
    }

    fn sample_info(duration: f64) -> Arc<SampleInfo> {
        Arc::new(SampleInfo {
            path: "test.wav".into(),
            sample_rate: 44100,
            channels: 1,
            frames: (duration * 44100.0) as u64,
            duration_seconds: duration,
        })
    }

    #[test]
    fn test_drum_accent_velocities() {
        let mut pattern = Pattern::default();
        for step in 0..STEPS {
            pattern.set_drum(DrumTrack::Kick, step, true);
            pattern.set_drum(DrumTrack::Snare, step, true);
        }
        let dispatcher = StepDispatcher::new(
            Arc::new(pattern),
            Arc::new(Markers::default()),
            AccentInterval::Four,
            None,
        );

        let mut sound = FakeSound::default();
        for step in 0..STEPS as u64 {
            dispatcher.dispatch(step as f64 * 0.125, step, &mut sound);
        }

        let kick_vels: Vec<f32> = sound
            .calls
            .iter()
            .filter_map(|c| match c {
                Call::Trigger(ChannelId::Kick, _, _, _, v) => Some(*v),
                _ => None,
            })
            .collect();
        let snare_vels: Vec<f32> = sound
            .calls
            .iter()
            .filter_map(|c| match c {
                Call::Trigger(ChannelId::Snare, _, _, _, v) => Some(*v),
                _ => None,
            })
            .collect();

        // Kick accents on 0, 4, 8, 12; snare on 2, 6, 10, 14
        for (i, &v) in kick_vels.iter().enumerate() {
            assert_eq!(v, if i % 4 == 0 { 1.0 } else { 0.85 }, "kick step {i}");
        }
        for (i, &v) in snare_vels.iter().enumerate() {
            assert_eq!(v, if i % 4 == 2 { 1.0 } else { 0.8 }, "snare step {i}");
        }
    }

    #[test]
    fn test_accent_off_uses_base_velocity() {
        let mut pattern = Pattern::default();
        pattern.set_drum(DrumTrack::Kick, 0, true);
        let dispatcher = StepDispatcher::new(
            Arc::new(pattern),
            Arc::new(Markers::default()),
            AccentInterval::Off,
            None,
        );
        let mut sound = FakeSound::default();
        dispatcher.dispatch(0.0, 0, &mut sound);
        assert_eq!(
            sound.calls,
            vec![Call::Trigger(
                ChannelId::Kick,
                Some(36),
                DurationTag::Eighth,
                0.0,
                0.85
            )]
        );
    }

    #[test]
    fn test_synth_note_maps_through_roll_table() {
        let mut pattern = Pattern::default();
        pattern.set_note(5, Some(0)); // top row = B4
        let dispatcher = StepDispatcher::new(
            Arc::new(pattern),
            Arc::new(Markers::default()),
            AccentInterval::Off,
            None,
        );
        let mut sound = FakeSound::default();
        dispatcher.dispatch(1.25, 5, &mut sound);
        assert_eq!(
            sound.calls,
            vec![Call::Trigger(
                ChannelId::Synth,
                Some(71),
                DurationTag::Sixteenth,
                1.25,
                SYNTH_VELOCITY
            )]
        );
    }

    #[test]
    fn test_sample_steps_skip_without_buffer() {
        let mut pattern = Pattern::default();
        pattern.set_sample_step(0, Some(0));
        let mut markers = Markers::default();
        markers.add(0.0);

        let no_buffer = StepDispatcher::new(
            Arc::new(pattern.clone()),
            Arc::new(markers.clone()),
            AccentInterval::Off,
            None,
        );
        let mut sound = FakeSound::default();
        no_buffer.dispatch(0.0, 0, &mut sound);
        assert!(sound.calls.is_empty());

        let ready = StepDispatcher::new(
            Arc::new(pattern),
            Arc::new(markers),
            AccentInterval::Off,
            Some(sample_info(2.0)),
        );
        let mut sound = FakeSound::default();
        ready.dispatch(0.0, 0, &mut sound);
        assert_eq!(sound.calls, vec![Call::Slice(0.0, 0.0, 2.0)]);
    }

    #[test]
    fn test_all_events_share_the_scheduled_time() {
        let mut pattern = Pattern::default();
        pattern.set_drum(DrumTrack::Kick, 2, true);
        pattern.set_drum(DrumTrack::HiHat, 2, true);
        pattern.set_note(2, Some(3));
        pattern.set_sample_step(2, Some(0));
        let mut markers = Markers::default();
        markers.add(0.5);

        let dispatcher = StepDispatcher::new(
            Arc::new(pattern),
            Arc::new(markers),
            AccentInterval::Off,
            Some(sample_info(4.0)),
        );
        let mut sound = FakeSound::default();
        dispatcher.dispatch(7.125, 18, &mut sound); // raw step 18 -> step 2
        assert_eq!(sound.calls.len(), 4);
        for call in &sound.calls {
            let time = match call {
                Call::Trigger(_, _, _, t, _) => *t,
                Call::Slice(t, _, _) => *t,
            };
            assert_eq!(time, 7.125);
        }
    }

    #[test]
    fn test_out_of_range_roll_entries_are_skipped() {
        // Bypass the setters to simulate a corrupt snapshot
        let mut pattern = Pattern::default();
        pattern.note_roll[0] = Some(200);
        pattern.sample_roll[1] = Some(MAX_MARKERS as u8);
        let dispatcher = StepDispatcher::new(
            Arc::new(pattern),
            Arc::new(Markers::default()),
            AccentInterval::Off,
            Some(sample_info(1.0)),
        );
        let mut sound = FakeSound::default();
        dispatcher.dispatch(0.0, 0, &mut sound);
        dispatcher.dispatch(0.25, 1, &mut sound);
        assert!(sound.calls.is_empty());
    }
}
