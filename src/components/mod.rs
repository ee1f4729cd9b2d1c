//! The components module contains all shared components for our app.

mod app;
mod app_view;
mod audio_player;
mod cue_card;
mod cue_form;
mod comments;
mod dialogs;
mod icons;
mod media;
mod session;
pub mod views;

pub use app::*;
pub use app_view::*;
pub use audio_player::*;
pub use cue_card::*;
pub use cue_form::*;
pub use comments::*;
pub use dialogs::*;
pub use icons::*;
pub use session::*;

use crate::db::KeyValueStore;
use dioxus::prelude::*;
use std::rc::Rc;

/// Message shown in the blocking alert dialog, if any.
#[derive(Clone, Copy)]
pub struct AlertSignal(pub Signal<Option<String>>);

impl AlertSignal {
    /// Reports a failed user action.
    pub fn show(mut self, message: impl std::fmt::Display) {
        let message = message.to_string();
        tracing::error!(%message, "action failed");
        self.0.set(Some(message));
    }
}

/// Local key-value store shared by settings, sessions and bookmarks.
#[derive(Clone)]
pub struct LocalStore(pub Rc<dyn KeyValueStore>);
