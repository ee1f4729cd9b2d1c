use crate::api::*;
use crate::components::{use_cue_controller, AlertSignal, Icon};
use crate::controller::CueForm;
use dioxus::prelude::*;

/// Reads the first file picked in a file input.
async fn picked_file(evt: FormEvent) -> Result<Option<FileUpload>, String> {
    let Some(file) = evt.files().into_iter().next() else {
        return Ok(None);
    };
    let name = file.name();
    let content_type = file.content_type().unwrap_or_default();
    let bytes = file.read_bytes().await.map_err(|err| err.to_string())?;
    Ok(Some(FileUpload::new(name, content_type, bytes.to_vec())))
}

/// Add form when `editing` is `None`, edit form for that cue otherwise.
/// Picking no file while editing keeps the stored one.
#[component]
pub fn CueFormPanel(editing: Option<Cue>, on_done: EventHandler<()>) -> Element {
    let controller = use_cue_controller();
    let alert = use_context::<AlertSignal>();
    let is_edit = editing.is_some();
    let mut title = use_signal({
        let editing = editing.clone();
        move || editing.map(|cue| cue.title).unwrap_or_default()
    });
    let mut play = use_signal({
        let editing = editing.clone();
        move || editing.map(|cue| cue.play).unwrap_or_default()
    });
    let mut audio = use_signal(|| None::<FileUpload>);
    let mut pdf = use_signal(|| None::<FileUpload>);
    let mut busy = use_signal(|| false);

    let on_audio = move |evt: FormEvent| {
        spawn(async move {
            match picked_file(evt).await {
                Ok(file) => audio.set(file),
                Err(err) => alert.show(format!("Could not read the audio file: {err}")),
            }
        });
    };

    let on_pdf = move |evt: FormEvent| {
        spawn(async move {
            match picked_file(evt).await {
                Ok(file) => pdf.set(file),
                Err(err) => alert.show(format!("Could not read the PDF: {err}")),
            }
        });
    };

    let on_submit = {
        let editing_id = editing.as_ref().map(|cue| cue.id.clone());
        move |evt: FormEvent| {
            evt.prevent_default();
            if busy() {
                return;
            }
            let form = CueForm {
                title: title(),
                play: play(),
                audio: audio(),
                pdf: pdf(),
            };
            let controller = controller();
            let editing_id = editing_id.clone();
            busy.set(true);
            spawn(async move {
                let result = match editing_id {
                    Some(id) => controller.edit_cue(&id, form).await,
                    None => controller.add_cue(form).await.map(|_| ()),
                };
                busy.set(false);
                match result {
                    Ok(()) => {
                        title.set(String::new());
                        audio.set(None);
                        pdf.set(None);
                        on_done.call(());
                    }
                    Err(err) => alert.show(err),
                }
            });
        }
    };

    let heading = if is_edit { "Edit cue" } else { "Add a cue" };
    let file_hint = if is_edit {
        "Leave empty to keep the current file"
    } else {
        "Required"
    };

    rsx! {
        form {
            class: "rounded-2xl bg-zinc-900/50 border border-zinc-800/60 p-4 space-y-3",
            onsubmit: on_submit,
            h2 { class: "text-lg font-semibold text-white", "{heading}" }
            input {
                class: "w-full px-4 py-2 bg-zinc-900/50 border border-zinc-700 rounded-lg text-white placeholder-zinc-500 focus:outline-none focus:border-emerald-500/50",
                placeholder: "Cue title",
                value: title,
                oninput: move |e| title.set(e.value()),
            }
            select {
                class: "w-full px-4 py-2 bg-zinc-900/50 border border-zinc-700 rounded-lg text-white focus:outline-none focus:border-emerald-500/50",
                value: play().label(),
                onchange: move |e| {
                    if let Some(selected) = Production::from_label(&e.value()) {
                        play.set(selected);
                    }
                },
                for production in Production::ALL {
                    option {
                        value: production.label(),
                        selected: production == play(),
                        "{production.label()}"
                    }
                }
            }
            div { class: "grid gap-3 md:grid-cols-2",
                label { class: "flex flex-col gap-1 text-sm text-zinc-400",
                    span { class: "flex items-center gap-1.5",
                        Icon { name: "music".to_string(), class: "w-4 h-4".to_string() }
                        "Audio ({file_hint})"
                    }
                    input {
                        class: "text-sm text-zinc-300",
                        r#type: "file",
                        accept: "audio/*",
                        onchange: on_audio,
                    }
                }
                label { class: "flex flex-col gap-1 text-sm text-zinc-400",
                    span { class: "flex items-center gap-1.5",
                        Icon {
                            name: "file-text".to_string(),
                            class: "w-4 h-4".to_string(),
                        }
                        "Sheet music PDF ({file_hint})"
                    }
                    input {
                        class: "text-sm text-zinc-300",
                        r#type: "file",
                        accept: "application/pdf",
                        onchange: on_pdf,
                    }
                }
            }
            div { class: "flex gap-3 justify-end",
                if is_edit {
                    button {
                        class: "px-4 py-2 rounded-lg border border-zinc-700 text-zinc-300 hover:text-white hover:border-zinc-500 transition-colors",
                        r#type: "button",
                        onclick: move |_| on_done.call(()),
                        "Cancel"
                    }
                }
                button {
                    class: "flex items-center gap-2 px-4 py-2 rounded-lg bg-emerald-500 hover:bg-emerald-400 text-white font-medium transition-colors disabled:opacity-50",
                    r#type: "submit",
                    disabled: busy(),
                    if busy() {
                        Icon {
                            name: "loader".to_string(),
                            class: "w-4 h-4".to_string(),
                        }
                        "Uploading..."
                    } else if is_edit {
                        "Save changes"
                    } else {
                        Icon { name: "plus".to_string(), class: "w-4 h-4".to_string() }
                        "Add cue"
                    }
                }
            }
        }
    }
}
