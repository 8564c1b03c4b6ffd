use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;

use arc_swap::ArcSwapOption;
use crossbeam_channel::Sender;

use crate::commands::EngineCommand;

/// Metadata of the loaded sample buffer. Decoding the PCM itself is the
/// sound engine's job; the sequencer only needs duration and readiness.
#[derive(Debug, Clone)]
pub struct SampleInfo {
    pub path: PathBuf,
    pub sample_rate: u32,
    pub channels: u16,
    pub frames: u64,
    pub duration_seconds: f64,
}

pub fn read_info(path: &Path) -> Result<SampleInfo, anyhow::Error> {
    let reader = hound::WavReader::open(path)?;
    let spec = reader.spec();
    let frames = reader.duration() as u64;
    if spec.sample_rate == 0 {
        anyhow::bail!("invalid sample rate in {}", path.display());
    }
    Ok(SampleInfo {
        path: path.to_path_buf(),
        sample_rate: spec.sample_rate,
        channels: spec.channels,
        frames,
        duration_seconds: frames as f64 / spec.sample_rate as f64,
    })
}

/// Control-side owner of the sample slot. Loading happens on a spawned
/// thread; the tick path only ever consults the readiness snapshot it was
/// built with.
pub struct SampleBank {
    slot: Arc<ArcSwapOption<SampleInfo>>,
}

impl Default for SampleBank {
    fn default() -> Self {
        Self::new()
    }
}

impl SampleBank {
    pub fn new() -> Self {
        Self {
            slot: Arc::new(ArcSwapOption::empty()),
        }
    }

    pub fn current(&self) -> Option<Arc<SampleInfo>> {
        self.slot.load_full()
    }

    /// Swap out the active sample immediately (readiness goes false), then
    /// read the new file's header off-thread. The engine hears about both
    /// transitions through its command channel.
    pub fn load_async(&self, path: PathBuf, notify: Sender<EngineCommand>) {
        self.slot.store(None);
        let _ = notify.send(EngineCommand::SampleCleared);
        let slot = self.slot.clone();
        thread::spawn(move || match read_info(&path) {
            Ok(info) => {
                eprintln!(
                    "[SampleBank] Loaded {} ({:.2}s, {} ch)",
                    path.display(),
                    info.duration_seconds,
                    info.channels
                );
                let info = Arc::new(info);
                slot.store(Some(info.clone()));
                let _ = notify.send(EngineCommand::SampleReady(info));
            }
            Err(e) => {
                eprintln!("[SampleBank] Load failed {}: {}", path.display(), e);
            }
        });
    }

    /// Drop the loaded sample without replacing it.
    pub fn clear(&self, notify: &Sender<EngineCommand>) {
        self.slot.store(None);
        let _ = notify.send(EngineCommand::SampleCleared);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;

    #[test]
    fn test_load_missing_file_leaves_slot_empty() {
        let (tx, rx) = unbounded();
        let bank = SampleBank::new();
        bank.load_async(PathBuf::from("/nonexistent/nope.wav"), tx);
        // First the invalidation, then nothing: the failed load never
        // reports readiness.
        assert!(matches!(rx.recv().unwrap(), EngineCommand::SampleCleared));
        thread::sleep(std::time::Duration::from_millis(100));
        assert!(rx.try_recv().is_err());
        assert!(bank.current().is_none());
    }

    #[test]
    fn test_clear_invalidates() {
        let (tx, rx) = unbounded();
        let bank = SampleBank::new();
        bank.clear(&tx);
        assert!(matches!(rx.recv().unwrap(), EngineCommand::SampleCleared));
        assert!(bank.current().is_none());
    }
}
