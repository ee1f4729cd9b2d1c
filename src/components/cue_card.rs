use crate::api::*;
use crate::components::{
    use_cue_controller, AlertSignal, AudioPlayer, CommentThread, ConfirmDialog, CueFormPanel, Icon,
};
use crate::controller::Confirmation;
use dioxus::prelude::*;

/// Bookmark key for the n-th player section of a cue. The first section
/// uses the bare cue id.
pub fn section_key(cue_id: &str, index: usize) -> String {
    if index == 0 {
        cue_id.to_string()
    } else {
        format!("{cue_id}#{}", index + 1)
    }
}

#[component]
pub fn CueCard(cue: Cue) -> Element {
    let controller = use_cue_controller();
    let session = use_context::<Signal<Option<UserSession>>>();
    let alert = use_context::<AlertSignal>();
    let mut editing = use_signal(|| false);
    let mut confirm_delete = use_signal(|| false);

    let on_confirm_delete = {
        let id = cue.id.clone();
        move |_| {
            confirm_delete.set(false);
            let controller = controller();
            let id = id.clone();
            spawn(async move {
                if let Err(err) = controller.delete_cue(&id, Confirmation::Confirmed).await {
                    alert.show(err);
                }
            });
        }
    };

    let sections = cue.play.stage_sections();
    let split = sections.len() > 1;
    let created = cue.created_at.format("%b %-d, %Y %H:%M").to_string();
    let signed_in = session().is_some();

    rsx! {
        article { class: "rounded-2xl bg-zinc-900/50 border border-zinc-800/60 p-4 space-y-4",
            div { class: "flex items-start justify-between gap-3",
                div {
                    h2 { class: "text-lg font-semibold text-white", "{cue.title}" }
                    div { class: "flex flex-wrap items-center gap-2 mt-1 text-xs text-zinc-400",
                        span { class: "px-2 py-0.5 rounded-full bg-emerald-500/15 text-emerald-300",
                            "{cue.play.label()}"
                        }
                        span { "{created}" }
                        a {
                            class: "flex items-center gap-1 text-zinc-300 hover:text-white underline-offset-2 hover:underline",
                            href: "{cue.pdf_url}",
                            target: "_blank",
                            rel: "noopener",
                            Icon {
                                name: "file-text".to_string(),
                                class: "w-4 h-4".to_string(),
                            }
                            "Sheet music"
                        }
                    }
                }
                if signed_in {
                    div { class: "flex items-center gap-1",
                        button {
                            class: "p-2 rounded-lg text-zinc-400 hover:text-white hover:bg-zinc-800/60 transition-colors",
                            aria_label: "Edit cue",
                            onclick: move |_| editing.set(!editing()),
                            Icon { name: "edit".to_string(), class: "w-4 h-4".to_string() }
                        }
                        button {
                            class: "p-2 rounded-lg text-zinc-400 hover:text-red-400 hover:bg-zinc-800/60 transition-colors",
                            aria_label: "Delete cue",
                            onclick: move |_| confirm_delete.set(true),
                            Icon { name: "trash".to_string(), class: "w-4 h-4".to_string() }
                        }
                    }
                }
            }

            if editing() {
                CueFormPanel {
                    editing: Some(cue.clone()),
                    on_done: move |_| editing.set(false),
                }
            }

            div { class: if split { "grid gap-3 md:grid-cols-2" } else { "grid gap-3" },
                for (index, production) in sections.iter().enumerate() {
                    AudioPlayer {
                        key: "{section_key(&cue.id, index)}",
                        cue_key: section_key(&cue.id, index),
                        audio_url: cue.audio_url.clone(),
                        label: split.then(|| production.label().to_string()),
                    }
                }
            }

            CommentThread { cue_id: cue.id.clone(), comments: cue.comments.clone() }
        }

        if confirm_delete() {
            ConfirmDialog {
                title: "Delete cue".to_string(),
                message: format!(
                    "Delete \"{}\"? Its comments go with it. This action cannot be undone.",
                    cue.title,
                ),
                confirm_label: "Delete".to_string(),
                on_confirm: on_confirm_delete,
                on_cancel: move |_| confirm_delete.set(false),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_section_gets_its_own_bookmark_key() {
        assert_eq!(section_key("cue-0007", 0), "cue-0007");
        assert_eq!(section_key("cue-0007", 1), "cue-0007#2");
    }
}
