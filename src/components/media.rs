// Applies player commands to a rendered `<audio>` element and reads its state
// back: web-sys in the browser, an injected script on desktop.
use crate::playback::MediaCommand;
use serde::Deserialize;

#[cfg(not(target_arch = "wasm32"))]
use dioxus::prelude::*;
#[cfg(target_arch = "wasm32")]
use dioxus::prelude::spawn;
#[cfg(target_arch = "wasm32")]
use wasm_bindgen::JsCast;
#[cfg(target_arch = "wasm32")]
use web_sys::{window, HtmlMediaElement};

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Default)]
pub struct MediaSnapshot {
    pub current_time: f64,
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub error_code: Option<u16>,
}

pub fn element_id(cue_key: &str) -> String {
    format!("cue-audio-{cue_key}")
}

/// User-facing text for a `MediaError.code`.
pub fn error_message(code: u16) -> &'static str {
    match code {
        1 => "Playback was aborted before the audio loaded.",
        2 => "Network error while loading this cue's audio.",
        3 => "The audio file could not be decoded.",
        4 => "No playable audio was found at this cue's URL.",
        _ => "Unable to load this cue's audio.",
    }
}

#[cfg(target_arch = "wasm32")]
fn media_element(id: &str) -> Option<HtmlMediaElement> {
    window()?
        .document()?
        .get_element_by_id(id)?
        .dyn_into::<HtmlMediaElement>()
        .ok()
}

#[cfg(target_arch = "wasm32")]
pub fn apply(id: &str, command: MediaCommand) {
    let Some(audio) = media_element(id) else {
        tracing::debug!(id, "audio element not mounted");
        return;
    };
    match command {
        MediaCommand::Play => {
            if let Ok(promise) = audio.play() {
                spawn(async move {
                    if let Err(err) = wasm_bindgen_futures::JsFuture::from(promise).await {
                        tracing::warn!(?err, "play request rejected");
                    }
                });
            }
        }
        MediaCommand::Pause => {
            let _ = audio.pause();
        }
        MediaCommand::Seek(secs) => audio.set_current_time(secs),
    }
}

#[cfg(target_arch = "wasm32")]
pub async fn snapshot(id: &str) -> Option<MediaSnapshot> {
    let audio = media_element(id)?;
    Some(MediaSnapshot {
        current_time: audio.current_time(),
        duration: Some(audio.duration()).filter(|secs| secs.is_finite()),
        error_code: audio.error().map(|err| err.code()),
    })
}

#[cfg(not(target_arch = "wasm32"))]
pub fn apply(id: &str, command: MediaCommand) {
    let action = match command {
        MediaCommand::Play => "el.play().catch(() => {});".to_string(),
        MediaCommand::Pause => "el.pause();".to_string(),
        MediaCommand::Seek(secs) => format!("el.currentTime = {secs};"),
    };
    let id = serde_json::Value::from(id);
    let script = format!(
        r#"(function () {{
            const el = document.getElementById({id});
            if (!el) return false;
            {action}
            return true;
        }})();"#
    );
    let _ = document::eval(&script);
}

#[cfg(not(target_arch = "wasm32"))]
pub async fn snapshot(id: &str) -> Option<MediaSnapshot> {
    let id = serde_json::Value::from(id);
    let eval = document::eval(&format!(
        r#"return (function () {{
            const el = document.getElementById({id});
            if (!el) return null;
            return {{
              current_time: Number.isFinite(el.currentTime) ? el.currentTime : 0,
              duration: Number.isFinite(el.duration) ? el.duration : null,
              error_code: el.error ? el.error.code : null,
            }};
        }})();"#
    ));
    eval.join::<Option<MediaSnapshot>>().await.ok().flatten()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn element_ids_keep_the_cue_key_verbatim() {
        assert_eq!(element_id("cue-0001"), "cue-audio-cue-0001");
        assert_eq!(element_id("cue-0001#2"), "cue-audio-cue-0001#2");
    }

    #[test]
    fn ids_differing_only_in_case_get_separate_elements() {
        assert_ne!(
            element_id("Xy3kQp9LmN2bVc8rT1zA"),
            element_id("xY3kqP9lmn2BvC8Rt1Za")
        );
    }

    #[test]
    fn snapshots_decode_from_script_results() {
        let snapshot: MediaSnapshot = serde_json::from_value(serde_json::json!({
            "current_time": 12.5,
            "duration": null,
            "error_code": null
        }))
        .unwrap();
        assert_eq!(snapshot.duration, None);
        assert_eq!(snapshot.current_time, 12.5);
        assert_eq!(error_message(4), "No playable audio was found at this cue's URL.");
    }
}
