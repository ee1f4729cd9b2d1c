//! Transport state for one cue's audio element.
//!
//! The player never touches the element itself. It consumes the element's
//! notifications and returns `MediaCommand`s for the widget to apply.

use crate::bookmarks::BookmarkStore;

pub const SKIP_SECS: f64 = 10.0;
/// Tracked and element offsets further apart than this are resynced.
pub const RESYNC_THRESHOLD_SECS: f64 = 1.0;
/// Minimum offset movement between two `last` bookmark writes.
pub const BOOKMARK_WRITE_STEP_SECS: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Transport {
    #[default]
    Unloaded,
    Ready,
    Playing,
    Paused,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MediaCommand {
    Play,
    Pause,
    Seek(f64),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BackupOutcome {
    Saved(f64),
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RestoreOutcome {
    Restored(f64),
    NotFound,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CuePlayer {
    cue_key: String,
    transport: Transport,
    offset: f64,
    duration: Option<f64>,
    /// Stored offset to apply once metadata is known.
    pending_seek: Option<f64>,
    /// Explicit seek the element has not caught up with yet.
    seek_target: Option<f64>,
    last_persisted: Option<f64>,
}

impl CuePlayer {
    pub fn new(cue_key: impl Into<String>) -> Self {
        Self {
            cue_key: cue_key.into(),
            transport: Transport::Unloaded,
            offset: 0.0,
            duration: None,
            pending_seek: None,
            seek_target: None,
            last_persisted: None,
        }
    }

    /// Creates the player and queues the remembered offset, if any.
    pub fn mount(cue_key: impl Into<String>, bookmarks: &BookmarkStore) -> Self {
        let mut player = Self::new(cue_key);
        player.pending_seek = bookmarks.last_offset(&player.cue_key);
        player.last_persisted = player.pending_seek;
        player
    }

    pub fn transport(&self) -> Transport {
        self.transport
    }

    pub fn is_playing(&self) -> bool {
        self.transport == Transport::Playing
    }

    pub fn offset(&self) -> f64 {
        self.offset
    }

    pub fn duration(&self) -> Option<f64> {
        self.duration
    }

    #[cfg(test)]
    pub fn pending_seek(&self) -> Option<f64> {
        self.pending_seek
    }

    fn clamp(&self, secs: f64) -> f64 {
        let upper = self.duration.unwrap_or(f64::INFINITY);
        secs.max(0.0).min(upper)
    }

    /// The element started loading a (new) source.
    pub fn on_load(&mut self) {
        self.transport = Transport::Unloaded;
        self.duration = None;
        self.seek_target = None;
    }

    pub fn on_metadata_loaded(&mut self, duration: f64) -> Option<MediaCommand> {
        self.duration = (duration.is_finite() && duration >= 0.0).then_some(duration);
        if self.transport == Transport::Unloaded {
            self.transport = Transport::Ready;
        }

        let target = self.pending_seek.take()?;
        let in_range = match self.duration {
            Some(duration) => (0.0..=duration).contains(&target),
            None => target >= 0.0,
        };
        if !in_range {
            tracing::debug!(cue = %self.cue_key, target, "dropping out-of-range resume offset");
            return None;
        }
        self.offset = target;
        self.seek_target = Some(target);
        Some(MediaCommand::Seek(target))
    }

    pub fn request_play(&self) -> Option<MediaCommand> {
        (!self.is_playing()).then_some(MediaCommand::Play)
    }

    pub fn request_pause(&self) -> Option<MediaCommand> {
        self.is_playing().then_some(MediaCommand::Pause)
    }

    pub fn toggle(&self) -> MediaCommand {
        self.request_pause()
            .or_else(|| self.request_play())
            .unwrap_or(MediaCommand::Play)
    }

    pub fn on_element_play(&mut self) {
        self.transport = Transport::Playing;
    }

    /// The element paused, by us or by anything else. Flushes the offset.
    pub fn on_element_pause(&mut self, bookmarks: &BookmarkStore) {
        if self.transport != Transport::Unloaded {
            self.transport = Transport::Paused;
        }
        self.persist(bookmarks, true);
    }

    /// Moves by `delta` seconds within `[0, duration]`.
    pub fn skip(&mut self, delta: f64) -> MediaCommand {
        self.seek_to(self.offset + delta)
    }

    /// Sets the tracked offset; the element follows via the returned command
    /// or, failing that, through `reconcile`.
    pub fn seek_to(&mut self, secs: f64) -> MediaCommand {
        let target = self.clamp(secs);
        self.offset = target;
        self.seek_target = Some(target);
        MediaCommand::Seek(target)
    }

    /// Guard transition: while an explicit seek is outstanding, an element
    /// more than `RESYNC_THRESHOLD_SECS` away is forced back to the tracked
    /// offset. Once the element is within the threshold it is authoritative
    /// again.
    pub fn reconcile(&mut self, element_offset: f64) -> Option<MediaCommand> {
        let target = self.seek_target?;
        if (element_offset - target).abs() > RESYNC_THRESHOLD_SECS {
            return Some(MediaCommand::Seek(target));
        }
        self.seek_target = None;
        None
    }

    /// Element time update: reconcile, adopt the element's offset, persist.
    pub fn on_time_update(
        &mut self,
        element_offset: f64,
        bookmarks: &BookmarkStore,
    ) -> Option<MediaCommand> {
        if !element_offset.is_finite() {
            return None;
        }
        if let Some(command) = self.reconcile(element_offset) {
            return Some(command);
        }
        self.offset = self.clamp(element_offset);
        self.persist(bookmarks, false);
        None
    }

    fn persist(&mut self, bookmarks: &BookmarkStore, force: bool) {
        let due = match self.last_persisted {
            Some(last) => force || (self.offset - last).abs() >= BOOKMARK_WRITE_STEP_SECS,
            None => true,
        };
        if due && bookmarks.set_last_offset(&self.cue_key, self.offset) {
            self.last_persisted = Some(self.offset);
        }
    }

    pub fn backup(&self, bookmarks: &BookmarkStore) -> BackupOutcome {
        if bookmarks.save_backup(&self.cue_key, self.offset) {
            BackupOutcome::Saved(self.offset)
        } else {
            BackupOutcome::Failed
        }
    }

    pub fn restore(&mut self, bookmarks: &BookmarkStore) -> RestoreOutcome {
        match bookmarks.saved_backup(&self.cue_key) {
            Some(saved) => {
                let target = self.clamp(saved);
                self.offset = target;
                self.seek_target = Some(target);
                RestoreOutcome::Restored(target)
            }
            None => RestoreOutcome::NotFound,
        }
    }
}
