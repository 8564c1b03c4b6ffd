use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};

use gridbeat_shared::{AccentInterval, ChannelId, DrumTrack, DurationTag, Markers, Pattern, STEPS};

use crate::clock::StepClock;
use crate::dispatcher::{PlayState, SharedSound, StepDispatcher, Transport};
use crate::sound::SoundEngine;

/// Records the scheduled time of every event it is asked to play.
#[derive(Clone, Default)]
struct Recorder(Arc<Mutex<Vec<f64>>>);

impl SoundEngine for Recorder {
    fn trigger(
        &mut self,
        _channel: ChannelId,
        _note: Option<u8>,
        _tag: DurationTag,
        time: f64,
        _velocity: f32,
    ) {
        self.0.lock().unwrap().push(time);
    }

    fn play_slice(&mut self, time: f64, _start: f64, _duration: f64) {
        self.0.lock().unwrap().push(time);
    }

    fn set_channel_gain(&mut self, _channel: ChannelId, _gain: f32, _ramp_secs: f32) {}
}

fn kick_every_step() -> Pattern {
    let mut pattern = Pattern::default();
    for step in 0..STEPS {
        pattern.set_drum(DrumTrack::Kick, step, true);
    }
    pattern
}

fn dispatcher_for(pattern: Pattern) -> StepDispatcher {
    StepDispatcher::new(
        Arc::new(pattern),
        Arc::new(Markers::default()),
        AccentInterval::Off,
        None,
    )
}

// 16 Hz "sample rate" at 60 BPM -> exactly 4 samples per 16th.
fn test_transport() -> Transport<StepClock> {
    let mut transport = Transport::new(StepClock::new(16.0));
    transport.configure(60.0, 0.0);
    transport
}

#[test]
fn test_rebuild_storm_keeps_one_registration_and_never_double_fires() {
    let recorder = Recorder::default();
    let sound: SharedSound = Arc::new(Mutex::new(Box::new(recorder.clone())));
    let mut transport = test_transport();

    transport.install(dispatcher_for(kick_every_step()), sound.clone());
    transport.play();

    for i in 0..100usize {
        // Mutate the pattern and swap in a fresh dispatcher while running.
        // The edit touches the (unloaded) sample roll so the expected
        // trigger count stays one per step.
        let mut pattern = kick_every_step();
        pattern.set_sample_step(i % STEPS, Some((i % STEPS) as u8));
        transport.install(dispatcher_for(pattern), sound.clone());
        assert_eq!(
            transport.clock_mut().registration_count(),
            1,
            "rebuild {i} left a stale registration"
        );
        transport.clock_mut().advance(4); // exactly one step boundary
    }

    let times = recorder.0.lock().unwrap();
    assert_eq!(times.len(), 100, "a tick was dropped or double-fired");
    for (k, &time) in times.iter().enumerate() {
        assert_eq!(time, k as f64 * 0.25, "step occurrence {k} fired off-grid");
    }
}

#[test]
fn test_stop_cancels_and_rewinds() {
    let recorder = Recorder::default();
    let sound: SharedSound = Arc::new(Mutex::new(Box::new(recorder.clone())));
    let mut transport = test_transport();
    let playhead = transport.playhead();

    transport.install(dispatcher_for(kick_every_step()), sound.clone());
    transport.play();
    assert_eq!(transport.state(), PlayState::Running);
    transport.clock_mut().advance(24); // 6 steps
    assert_eq!(playhead.load(Ordering::Relaxed), 5);

    transport.stop();
    assert_eq!(transport.state(), PlayState::Stopped);
    assert_eq!(playhead.load(Ordering::Relaxed), 0);
    let fired = recorder.0.lock().unwrap().len();
    transport.clock_mut().advance(64); // nothing may fire while stopped
    assert_eq!(recorder.0.lock().unwrap().len(), fired);

    // Restart begins again at step 0
    transport.play();
    transport.clock_mut().advance(4);
    assert_eq!(playhead.load(Ordering::Relaxed), 0);
}

#[test]
fn test_playhead_wraps_past_pattern_length() {
    let recorder = Recorder::default();
    let sound: SharedSound = Arc::new(Mutex::new(Box::new(recorder)));
    let mut transport = test_transport();
    let playhead = transport.playhead();

    transport.install(dispatcher_for(Pattern::default()), sound);
    transport.play();
    transport.clock_mut().advance(4 * (STEPS + 3)); // 19 steps
    assert_eq!(playhead.load(Ordering::Relaxed), 2);
}

#[test]
fn test_sample_readiness_change_takes_effect_on_rebuild() {
    use crate::sample::SampleInfo;

    let recorder = Recorder::default();
    let sound: SharedSound = Arc::new(Mutex::new(Box::new(recorder.clone())));
    let mut transport = test_transport();

    let mut pattern = Pattern::default();
    pattern.set_sample_step(0, Some(0));
    let mut markers = Markers::default();
    markers.add(0.0);
    let markers = Arc::new(markers);
    let pattern = Arc::new(pattern);

    // Not ready: the sample step is silent
    transport.install(
        StepDispatcher::new(pattern.clone(), markers.clone(), AccentInterval::Off, None),
        sound.clone(),
    );
    transport.play();
    transport.clock_mut().advance(4 * STEPS);
    assert!(recorder.0.lock().unwrap().is_empty());

    // Ready: rebuild with the loaded buffer and the same step plays
    let info = Arc::new(SampleInfo {
        path: "loop.wav".into(),
        sample_rate: 44100,
        channels: 2,
        frames: 44100,
        duration_seconds: 1.0,
    });
    transport.install(
        StepDispatcher::new(pattern, markers, AccentInterval::Off, Some(info)),
        sound.clone(),
    );
    transport.clock_mut().advance(4 * STEPS);
    assert_eq!(recorder.0.lock().unwrap().len(), 1);
}
