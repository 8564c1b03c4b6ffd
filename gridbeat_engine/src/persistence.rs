use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use gridbeat_shared::{DrumTrack, Markers, Pattern, MAX_MARKERS, ROLL_NOTES, STEPS};

pub const PATTERN_KEY: &str = "pattern";
pub const MARKERS_KEY: &str = "markers";
const PAYLOAD_VERSION: u32 = 2;

/// Key/value byte storage for serialized state. Saves happen on every
/// mutation; a missing or unreadable key is never an error.
pub trait StateStore: Send + Sync {
    fn get(&self, key: &str) -> Option<Vec<u8>>;
    fn put(&self, key: &str, data: &[u8]) -> Result<(), anyhow::Error>;
}

/// One JSON file per key under `<project_dir>/.gridbeat/`.
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(project_dir: &Path) -> Self {
        Self {
            dir: project_dir.join(".gridbeat"),
        }
    }

    fn key_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl StateStore for FileStore {
    fn get(&self, key: &str) -> Option<Vec<u8>> {
        std::fs::read(self.key_path(key)).ok()
    }

    fn put(&self, key: &str, data: &[u8]) -> Result<(), anyhow::Error> {
        std::fs::create_dir_all(&self.dir)?;
        std::fs::write(self.key_path(key), data)?;
        Ok(())
    }
}

/// In-memory store for tests.
#[derive(Default)]
pub struct MemStore {
    map: Mutex<HashMap<String, Vec<u8>>>,
}

impl StateStore for MemStore {
    fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.map.lock().ok()?.get(key).cloned()
    }

    fn put(&self, key: &str, data: &[u8]) -> Result<(), anyhow::Error> {
        self.map
            .lock()
            .map_err(|_| anyhow::anyhow!("store poisoned"))?
            .insert(key.to_string(), data.to_vec());
        Ok(())
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PatternPayload {
    version: u32,
    drum_hits: HashMap<String, Vec<bool>>,
    note_roll: Vec<Option<u8>>,
    sample_roll: Vec<Option<u8>>,
}

pub fn encode_pattern(pattern: &Pattern) -> Result<Vec<u8>, anyhow::Error> {
    let payload = PatternPayload {
        version: PAYLOAD_VERSION,
        drum_hits: DrumTrack::ALL
            .iter()
            .map(|t| (t.name().to_string(), pattern.drum_hits[t.index()].to_vec()))
            .collect(),
        note_roll: pattern.note_roll.to_vec(),
        sample_roll: pattern.sample_roll.to_vec(),
    };
    Ok(serde_json::to_vec(&payload)?)
}

/// Decode a persisted pattern. Tries the versioned payload first, then the
/// legacy drum-only grid (which migrates with empty rolls). `None` means
/// the caller should fall back to an empty default.
pub fn decode_pattern(data: &[u8]) -> Option<Pattern> {
    if let Ok(payload) = serde_json::from_slice::<PatternPayload>(data) {
        return Some(pattern_from_payload(payload));
    }
    if let Ok(grid) = serde_json::from_slice::<HashMap<String, Vec<bool>>>(data) {
        let mut pattern = Pattern::default();
        fill_drum_rows(&mut pattern, &grid);
        return Some(pattern);
    }
    None
}

fn pattern_from_payload(payload: PatternPayload) -> Pattern {
    let mut pattern = Pattern::default();
    fill_drum_rows(&mut pattern, &payload.drum_hits);
    for (step, entry) in payload.note_roll.into_iter().take(STEPS).enumerate() {
        pattern.note_roll[step] = entry.filter(|&r| (r as usize) < ROLL_NOTES.len());
    }
    for (step, entry) in payload.sample_roll.into_iter().take(STEPS).enumerate() {
        pattern.sample_roll[step] = entry.filter(|&m| (m as usize) < MAX_MARKERS);
    }
    pattern
}

fn fill_drum_rows(pattern: &mut Pattern, grid: &HashMap<String, Vec<bool>>) {
    for (name, row) in grid {
        if let Some(track) = DrumTrack::from_name(name) {
            for (step, &on) in row.iter().take(STEPS).enumerate() {
                pattern.drum_hits[track.index()][step] = on;
            }
        }
    }
}

pub fn encode_markers(markers: &Markers) -> Result<Vec<u8>, anyhow::Error> {
    Ok(serde_json::to_vec(markers.as_slice())?)
}

pub fn decode_markers(data: &[u8]) -> Option<Markers> {
    let offsets: Vec<f64> = serde_json::from_slice(data).ok()?;
    Some(Markers::from_offsets(offsets))
}
