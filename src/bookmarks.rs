//! Per-cue playback bookmarks kept in local storage: the last heard offset
//! and one manually saved backup offset.

use crate::db::KeyValueStore;
use std::rc::Rc;

const BOOKMARK_PREFIX: &str = "cuedesk.bookmark";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Last,
    Backup,
}

impl Slot {
    fn name(self) -> &'static str {
        match self {
            Self::Last => "last",
            Self::Backup => "backup",
        }
    }
}

#[derive(Clone)]
pub struct BookmarkStore {
    kv: Rc<dyn KeyValueStore>,
}

impl BookmarkStore {
    pub fn new(kv: Rc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    fn key(cue_key: &str, slot: Slot) -> String {
        format!("{BOOKMARK_PREFIX}.{}.{cue_key}", slot.name())
    }

    fn read(&self, cue_key: &str, slot: Slot) -> Option<f64> {
        let key = Self::key(cue_key, slot);
        let raw = match self.kv.get(&key) {
            Ok(raw) => raw?,
            Err(err) => {
                tracing::debug!(%key, %err, "bookmark read failed");
                return None;
            }
        };
        raw.trim()
            .parse::<f64>()
            .ok()
            .filter(|secs| secs.is_finite() && *secs >= 0.0)
    }

    fn write(&self, cue_key: &str, slot: Slot, secs: f64) -> bool {
        if !secs.is_finite() || secs < 0.0 {
            return false;
        }
        let key = Self::key(cue_key, slot);
        match self.kv.set(&key, &secs.to_string()) {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(%key, %err, "skipping bookmark write");
                false
            }
        }
    }

    pub fn last_offset(&self, cue_key: &str) -> Option<f64> {
        self.read(cue_key, Slot::Last)
    }

    pub fn set_last_offset(&self, cue_key: &str, secs: f64) -> bool {
        self.write(cue_key, Slot::Last, secs)
    }

    pub fn saved_backup(&self, cue_key: &str) -> Option<f64> {
        self.read(cue_key, Slot::Backup)
    }

    pub fn save_backup(&self, cue_key: &str, secs: f64) -> bool {
        self.write(cue_key, Slot::Backup, secs)
    }
}
