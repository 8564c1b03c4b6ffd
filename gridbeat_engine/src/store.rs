use std::sync::Arc;

use arc_swap::ArcSwap;

use gridbeat_shared::Pattern;

use crate::persistence::{self, StateStore, PATTERN_KEY};

/// Owns the pattern. Readers take cheap immutable snapshots; writers clone,
/// mutate and swap, then persist. The dispatch path never sees a half-edited
/// pattern.
pub struct PatternStore {
    current: ArcSwap<Pattern>,
    backing: Option<Arc<dyn StateStore>>,
}

impl Default for PatternStore {
    fn default() -> Self {
        Self::new()
    }
}

impl PatternStore {
    /// In-memory store with no persistence.
    pub fn new() -> Self {
        Self {
            current: ArcSwap::from_pointee(Pattern::default()),
            backing: None,
        }
    }

    /// Restore from the backing store, falling back to an empty pattern on
    /// absence or parse failure.
    pub fn load(backing: Arc<dyn StateStore>) -> Self {
        let pattern = backing
            .get(PATTERN_KEY)
            .and_then(|data| persistence::decode_pattern(&data))
            .unwrap_or_default();
        Self {
            current: ArcSwap::from_pointee(pattern),
            backing: Some(backing),
        }
    }

    pub fn snapshot(&self) -> Arc<Pattern> {
        self.current.load_full()
    }

    /// Copy-on-write mutation. Returns the new snapshot after persisting it.
    pub fn update(&self, mutate: impl FnOnce(&mut Pattern)) -> Arc<Pattern> {
        let mut next = self.current.load_full().as_ref().clone();
        mutate(&mut next);
        let next = Arc::new(next);
        self.current.store(next.clone());
        self.persist(&next);
        next
    }

    fn persist(&self, pattern: &Pattern) {
        let Some(store) = &self.backing else {
            return;
        };
        match persistence::encode_pattern(pattern) {
            Ok(data) => {
                if let Err(e) = store.put(PATTERN_KEY, &data) {
                    eprintln!("[Store] Pattern save failed: {e}");
                }
            }
            Err(e) => eprintln!("[Store] Pattern encode failed: {e}"),
        }
    }
}
