use crossbeam_channel::unbounded;
use gridbeat_engine::melody::{MelodyEngine, MelodyParams};
use gridbeat_engine::rhythm::RhythmStyle;
use gridbeat_engine::sound::LogSoundEngine;
use gridbeat_engine::{AudioEngine, Session};
use gridbeat_shared::{AccentInterval, ChannelId, DrumTrack, ScaleType};
use std::thread;
use std::time::Duration;

fn main() -> Result<(), anyhow::Error> {
    println!("[Headless] Starting test runner...");
    let (tx, rx) = unbounded();

    let engine = AudioEngine::new(rx, Box::new(LogSoundEngine))?;
    let mut session = Session::new(tx, fastrand::Rng::with_seed(0xBEA7));

    // Generate a pattern to play
    session.generate_rhythm(DrumTrack::Kick, RhythmStyle::Euclid, 4);
    session.generate_rhythm(DrumTrack::Snare, RhythmStyle::OffbeatFill, 3);
    session.generate_rhythm(DrumTrack::HiHat, RhythmStyle::Euclid, 11);
    session.generate_melody(
        MelodyParams {
            root: 9, // A
            scale: ScaleType::Minor,
            jump_prob: 0.2,
        },
        MelodyEngine::Walk,
        RhythmStyle::Syncopated,
        5,
    );
    session.set_bpm(124.0);
    session.set_accent(AccentInterval::Four);
    session.set_level(ChannelId::HiHat, -9.0);

    println!("[Headless] Playing for 5 seconds...");
    session.play();
    thread::sleep(Duration::from_secs(5));

    session.stop();
    thread::sleep(Duration::from_millis(200));
    println!("[Headless] Done. Playhead back at {}", engine.playhead());
    Ok(())
}
