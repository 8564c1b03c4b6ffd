use std::path::PathBuf;
use std::sync::Arc;

use crossbeam_channel::Sender;

use gridbeat_shared::{
    AccentInterval, ChannelId, DrumTrack, Markers, MixLevels, Pattern, TransportConfig,
};

use crate::commands::EngineCommand;
use crate::melody::{self, MelodyEngine, MelodyParams};
use crate::persistence::{self, StateStore, MARKERS_KEY};
use crate::rhythm::{self, RhythmStyle};
use crate::sample::SampleBank;
use crate::slicer;
use crate::store::PatternStore;

/// Control-side facade: owns the editable state (pattern store, markers,
/// mix, transport config, sample slot) and keeps the audio side in sync by
/// sending a fresh snapshot after every mutation. The injected rng makes
/// every generator call reproducible.
pub struct Session {
    patterns: PatternStore,
    markers: Markers,
    mix: MixLevels,
    config: TransportConfig,
    bank: SampleBank,
    backing: Option<Arc<dyn StateStore>>,
    tx: Sender<EngineCommand>,
    rng: fastrand::Rng,
}

impl Session {
    /// In-memory session with no persistence.
    pub fn new(tx: Sender<EngineCommand>, rng: fastrand::Rng) -> Self {
        Self {
            patterns: PatternStore::new(),
            markers: Markers::default(),
            mix: MixLevels::default(),
            config: TransportConfig::default(),
            bank: SampleBank::new(),
            backing: None,
            tx,
            rng,
        }
    }

    /// Restore persisted state and push the initial snapshots to the engine.
    pub fn load(backing: Arc<dyn StateStore>, tx: Sender<EngineCommand>, rng: fastrand::Rng) -> Self {
        let patterns = PatternStore::load(backing.clone());
        let markers = backing
            .get(MARKERS_KEY)
            .and_then(|data| persistence::decode_markers(&data))
            .unwrap_or_default();
        let session = Self {
            patterns,
            markers,
            mix: MixLevels::default(),
            config: TransportConfig::default(),
            bank: SampleBank::new(),
            backing: Some(backing),
            tx,
            rng,
        };
        session.send(EngineCommand::SetPattern(session.patterns.snapshot()));
        session.send(EngineCommand::SetMarkers(Arc::new(session.markers.clone())));
        session
    }

    fn send(&self, command: EngineCommand) {
        // The engine may be gone in tests; dropped commands are harmless there
        let _ = self.tx.send(command);
    }

    fn push_pattern(&self, snapshot: Arc<Pattern>) {
        self.send(EngineCommand::SetPattern(snapshot));
    }

    fn push_markers(&self) {
        if let Some(store) = &self.backing {
            match persistence::encode_markers(&self.markers) {
                Ok(data) => {
                    if let Err(e) = store.put(MARKERS_KEY, &data) {
                        eprintln!("[Session] Marker save failed: {e}");
                    }
                }
                Err(e) => eprintln!("[Session] Marker encode failed: {e}"),
            }
        }
        self.send(EngineCommand::SetMarkers(Arc::new(self.markers.clone())));
    }

    // -- Transport --

    pub fn play(&self) {
        self.send(EngineCommand::Play);
    }

    pub fn stop(&self) {
        self.send(EngineCommand::Stop);
    }

    pub fn set_bpm(&mut self, bpm: f32) {
        self.config.set_bpm(bpm);
        self.send(EngineCommand::SetBpm(self.config.bpm));
    }

    pub fn set_swing(&mut self, swing: f32) {
        self.config.set_swing(swing);
        self.send(EngineCommand::SetSwing(self.config.swing));
    }

    pub fn set_accent(&mut self, accent: AccentInterval) {
        self.config.accent = accent;
        self.send(EngineCommand::SetAccent(accent));
    }

    // -- Step edits --

    pub fn toggle_drum_step(&mut self, track: DrumTrack, step: usize) {
        let snapshot = self.patterns.update(|p| p.toggle_drum(track, step));
        self.push_pattern(snapshot);
    }

    pub fn set_note_step(&mut self, step: usize, row: Option<u8>) {
        let snapshot = self.patterns.update(|p| p.set_note(step, row));
        self.push_pattern(snapshot);
    }

    pub fn set_sample_step(&mut self, step: usize, marker: Option<u8>) {
        let snapshot = self.patterns.update(|p| p.set_sample_step(step, marker));
        self.push_pattern(snapshot);
    }

    pub fn clear_drums(&mut self, track: DrumTrack) {
        let snapshot = self.patterns.update(|p| p.clear_drums(track));
        self.push_pattern(snapshot);
    }

    // -- Generators --

    /// Regenerate one drum row from a rhythm style.
    pub fn generate_rhythm(&mut self, track: DrumTrack, style: RhythmStyle, hits: usize) {
        let mask = rhythm::generate(style, hits, &mut self.rng);
        let snapshot = self.patterns.update(|p| p.drum_hits[track.index()] = mask);
        self.push_pattern(snapshot);
    }

    /// Replace the whole note roll: rhythm style decides when, melody engine
    /// decides what.
    pub fn generate_melody(
        &mut self,
        params: MelodyParams,
        engine: MelodyEngine,
        style: RhythmStyle,
        hits: usize,
    ) {
        let mask = rhythm::generate(style, hits, &mut self.rng);
        let roll = melody::generate(params, &mask, engine, &mut self.rng);
        let snapshot = self.patterns.update(|p| p.note_roll = roll);
        self.push_pattern(snapshot);
    }

    /// Replace the whole sample roll with generated marker assignments.
    pub fn generate_sample_roll(&mut self, style: RhythmStyle, hits: usize) {
        let mask = rhythm::generate(style, hits, &mut self.rng);
        let roll = slicer::assign_markers(&mask, self.markers.len(), &mut self.rng);
        let snapshot = self.patterns.update(|p| p.sample_roll = roll);
        self.push_pattern(snapshot);
    }

    // -- Markers & sample --

    pub fn add_marker(&mut self, secs: f64) -> bool {
        let added = self.markers.add(secs);
        if added {
            self.push_markers();
        }
        added
    }

    pub fn clear_markers(&mut self) {
        self.markers.clear();
        self.push_markers();
    }

    pub fn load_sample(&self, path: PathBuf) {
        self.bank.load_async(path, self.tx.clone());
    }

    pub fn clear_sample(&self) {
        self.bank.clear(&self.tx);
    }

    // -- Mix --

    pub fn set_level(&mut self, channel: ChannelId, db: f32) {
        self.mix.set(channel, db);
        self.send(EngineCommand::SetChannelLevel {
            channel,
            db: self.mix.get(channel),
        });
    }

    // -- Read access --

    pub fn pattern(&self) -> Arc<Pattern> {
        self.patterns.snapshot()
    }

    pub fn markers(&self) -> &Markers {
        &self.markers
    }

    pub fn mix(&self) -> &MixLevels {
        &self.mix
    }

    pub fn config(&self) -> TransportConfig {
        self.config
    }
}
