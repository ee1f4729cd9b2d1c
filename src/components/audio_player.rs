use crate::api::format_offset;
use crate::bookmarks::BookmarkStore;
use crate::components::media::{self, element_id};
use crate::components::{AlertSignal, Icon};
use crate::playback::{
    BackupOutcome, CuePlayer, MediaCommand, RestoreOutcome, Transport, SKIP_SECS,
};
use dioxus::prelude::*;

/// One audio element with transport, scrubber and bookmark buttons.
/// `cue_key` scopes the stored offsets.
#[component]
pub fn AudioPlayer(cue_key: String, audio_url: String, label: Option<String>) -> Element {
    let bookmarks = use_context::<BookmarkStore>();
    let alert = use_context::<AlertSignal>();
    let mut player = use_signal({
        let bookmarks = bookmarks.clone();
        let cue_key = cue_key.clone();
        move || CuePlayer::mount(cue_key, &bookmarks)
    });
    let mut load_error = use_signal(|| None::<&'static str>);
    let mut status = use_signal(|| None::<String>);
    let id = element_id(&cue_key);

    let on_load_start = move |_| {
        load_error.set(None);
        player.write().on_load();
    };

    let on_metadata = {
        let id = id.clone();
        move |_| {
            let id = id.clone();
            spawn(async move {
                let Some(snapshot) = media::snapshot(&id).await else {
                    return;
                };
                let command = player
                    .write()
                    .on_metadata_loaded(snapshot.duration.unwrap_or(f64::NAN));
                if let Some(command) = command {
                    media::apply(&id, command);
                }
            });
        }
    };

    let on_time_update = {
        let id = id.clone();
        let bookmarks = bookmarks.clone();
        move |_| {
            let id = id.clone();
            let bookmarks = bookmarks.clone();
            spawn(async move {
                let Some(snapshot) = media::snapshot(&id).await else {
                    return;
                };
                let command = player.write().on_time_update(snapshot.current_time, &bookmarks);
                if let Some(command) = command {
                    media::apply(&id, command);
                }
            });
        }
    };

    let on_pause = {
        let bookmarks = bookmarks.clone();
        move |_| player.write().on_element_pause(&bookmarks)
    };

    let on_error = {
        let id = id.clone();
        move |_| {
            let id = id.clone();
            spawn(async move {
                let code = media::snapshot(&id)
                    .await
                    .and_then(|snapshot| snapshot.error_code)
                    .unwrap_or(0);
                tracing::warn!(%id, code, "audio failed to load");
                load_error.set(Some(media::error_message(code)));
            });
        }
    };

    let on_toggle = {
        let id = id.clone();
        move |_| {
            let command = player.peek().toggle();
            media::apply(&id, command);
        }
    };

    let on_back = {
        let id = id.clone();
        move |_| {
            let command = player.write().skip(-SKIP_SECS);
            media::apply(&id, command);
        }
    };

    let on_forward = {
        let id = id.clone();
        move |_| {
            let command = player.write().skip(SKIP_SECS);
            media::apply(&id, command);
        }
    };

    let on_scrub = {
        let id = id.clone();
        move |evt: FormEvent| {
            if let Ok(secs) = evt.value().parse::<f64>() {
                let command = player.write().seek_to(secs);
                media::apply(&id, command);
            }
        }
    };

    let on_backup = {
        let bookmarks = bookmarks.clone();
        move |_| match player.peek().backup(&bookmarks) {
            BackupOutcome::Saved(secs) => {
                status.set(Some(format!("Position saved at {}", format_offset(secs))));
            }
            BackupOutcome::Failed => alert.show("Could not save the position on this device."),
        }
    };

    let on_restore = {
        let id = id.clone();
        let bookmarks = bookmarks.clone();
        move |_| {
            let outcome = player.write().restore(&bookmarks);
            match outcome {
                RestoreOutcome::Restored(secs) => {
                    media::apply(&id, MediaCommand::Seek(secs));
                    status.set(Some(format!("Jumped to {}", format_offset(secs))));
                }
                RestoreOutcome::NotFound => {
                    status.set(Some("No saved position for this cue yet".to_string()));
                }
            }
        }
    };

    let state = player();
    let offset = state.offset();
    let duration = state.duration();
    let elapsed = format_offset(offset);
    let total = duration.map(format_offset).unwrap_or_else(|| "--:--".to_string());
    let max = duration.unwrap_or(0.0);
    let loading = state.transport() == Transport::Unloaded && load_error().is_none();

    rsx! {
        div { class: "rounded-xl bg-zinc-900/60 border border-zinc-800/60 p-3 space-y-2",
            if let Some(label) = label {
                p { class: "text-xs uppercase tracking-widest text-zinc-500", "{label}" }
            }
            audio {
                id: "{id}",
                src: "{audio_url}",
                preload: "metadata",
                onloadstart: on_load_start,
                onloadedmetadata: on_metadata,
                ontimeupdate: on_time_update,
                onplay: move |_| player.write().on_element_play(),
                onpause: on_pause,
                onerror: on_error,
            }
            div { class: "flex items-center gap-2",
                button {
                    class: "p-2 rounded-lg text-zinc-300 hover:text-white hover:bg-zinc-800/60 transition-colors",
                    aria_label: "Back 10 seconds",
                    onclick: on_back,
                    Icon {
                        name: "skip-back".to_string(),
                        class: "w-5 h-5".to_string(),
                    }
                }
                button {
                    class: "p-3 rounded-full bg-emerald-500 hover:bg-emerald-400 text-white transition-colors",
                    aria_label: if state.is_playing() { "Pause" } else { "Play" },
                    onclick: on_toggle,
                    if state.is_playing() {
                        Icon { name: "pause".to_string(), class: "w-5 h-5".to_string() }
                    } else {
                        Icon { name: "play".to_string(), class: "w-5 h-5".to_string() }
                    }
                }
                button {
                    class: "p-2 rounded-lg text-zinc-300 hover:text-white hover:bg-zinc-800/60 transition-colors",
                    aria_label: "Forward 10 seconds",
                    onclick: on_forward,
                    Icon {
                        name: "skip-forward".to_string(),
                        class: "w-5 h-5".to_string(),
                    }
                }
                span { class: "text-xs text-zinc-400 tabular-nums w-12 text-right", "{elapsed}" }
                input {
                    class: "flex-1 accent-emerald-500",
                    r#type: "range",
                    min: "0",
                    max: "{max}",
                    step: "0.1",
                    value: "{offset}",
                    disabled: duration.is_none(),
                    oninput: on_scrub,
                }
                span { class: "text-xs text-zinc-400 tabular-nums w-12", "{total}" }
            }
            div { class: "flex flex-wrap items-center gap-2",
                button {
                    class: "flex items-center gap-1.5 px-3 py-1.5 rounded-lg border border-zinc-700 text-zinc-300 hover:text-white hover:border-zinc-500 text-xs transition-colors",
                    onclick: on_backup,
                    Icon {
                        name: "bookmark".to_string(),
                        class: "w-4 h-4".to_string(),
                    }
                    "Save position"
                }
                button {
                    class: "flex items-center gap-1.5 px-3 py-1.5 rounded-lg border border-zinc-700 text-zinc-300 hover:text-white hover:border-zinc-500 text-xs transition-colors",
                    onclick: on_restore,
                    Icon {
                        name: "history".to_string(),
                        class: "w-4 h-4".to_string(),
                    }
                    "Restore position"
                }
                if let Some(message) = status() {
                    span { class: "text-xs text-emerald-400", "{message}" }
                }
            }
            if loading {
                p { class: "text-xs text-zinc-500", "Loading audio..." }
            }
            if let Some(message) = load_error() {
                p { class: "text-xs text-red-400", "{message}" }
            }
        }
    }
}
