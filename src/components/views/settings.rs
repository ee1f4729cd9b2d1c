use crate::api::*;
use crate::components::{AlertSignal, LocalStore};
use crate::config::{load_backend_override, save_backend_override, BackendConfig};
use crate::db::{save_settings, CommentWriteMode, DashboardSettings};
use dioxus::prelude::*;

fn backend_label(mode: &BackendMode) -> String {
    match mode {
        BackendMode::Firebase { project_id } => format!("Firebase project \"{project_id}\""),
        BackendMode::Demo => "Demo (in-memory, nothing is shared)".to_string(),
    }
}

#[component]
pub fn SettingsView() -> Element {
    let store = use_context::<LocalStore>();
    let gateway = use_context::<Gateway>();
    let alert = use_context::<AlertSignal>();
    let mut settings = use_context::<Signal<DashboardSettings>>();
    let saved = use_hook({
        let store = store.clone();
        move || load_backend_override(store.0.as_ref()).unwrap_or_default()
    });

    let mut api_key = use_signal(|| saved.api_key.clone());
    let mut project_id = use_signal(|| saved.project_id.clone());
    let mut storage_bucket = use_signal(|| saved.storage_bucket.clone());
    let mut save_status = use_signal(|| None::<String>);

    let on_save_backend = {
        let store = store.clone();
        move |evt: FormEvent| {
            evt.prevent_default();
            let config = BackendConfig::new(api_key(), project_id(), storage_bucket());
            if !config.is_complete() {
                alert.show("API key, project id and storage bucket are all required.");
                return;
            }
            match save_backend_override(store.0.as_ref(), Some(&config)) {
                Ok(()) => {
                    tracing::info!(project = %config.project_id, "backend override saved");
                    save_status.set(Some("Backend saved. Reload to connect.".to_string()));
                }
                Err(err) => alert.show(err),
            }
        }
    };

    let on_clear_backend = {
        let store = store.clone();
        move |_| match save_backend_override(store.0.as_ref(), None) {
            Ok(()) => {
                api_key.set(String::new());
                project_id.set(String::new());
                storage_bucket.set(String::new());
                save_status.set(Some("Backend override cleared. Reload to apply.".to_string()));
            }
            Err(err) => alert.show(err),
        }
    };

    let on_mode_change = use_callback({
        let store = store.clone();
        move |mode: CommentWriteMode| {
            let mut next = settings();
            next.comment_write_mode = mode;
            if let Err(err) = save_settings(store.0.as_ref(), &next) {
                alert.show(err);
                return;
            }
            settings.set(next);
        }
    });

    let mode = settings().comment_write_mode;
    let input_class = "w-full px-4 py-2 bg-zinc-900/50 border border-zinc-700 rounded-lg text-white placeholder-zinc-500 focus:outline-none focus:border-emerald-500/50";

    rsx! {
        div { class: "space-y-8",
            header { class: "page-header",
                h1 { class: "page-title", "Settings" }
                p { class: "page-subtitle", "Backend connection and comment behaviour" }
            }

            if let Some(status) = save_status() {
                div { class: "px-4 py-2 bg-emerald-500/20 border border-emerald-500/50 rounded-lg text-emerald-400 text-sm",
                    "{status}"
                }
            }

            section { class: "bg-zinc-800/30 rounded-2xl border border-zinc-700/30 p-6",
                h2 { class: "text-lg font-semibold text-white mb-2", "Backend" }
                p { class: "text-sm text-zinc-400 mb-5",
                    "Connected to: {backend_label(&gateway.mode)}"
                }
                form { class: "space-y-3", onsubmit: on_save_backend,
                    input {
                        class: input_class,
                        placeholder: "Web API key",
                        value: api_key,
                        oninput: move |e| api_key.set(e.value()),
                    }
                    input {
                        class: input_class,
                        placeholder: "Project id",
                        value: project_id,
                        oninput: move |e| project_id.set(e.value()),
                    }
                    input {
                        class: input_class,
                        placeholder: "Storage bucket (e.g. my-project.appspot.com)",
                        value: storage_bucket,
                        oninput: move |e| storage_bucket.set(e.value()),
                    }
                    div { class: "flex gap-3 justify-end",
                        button {
                            class: "px-4 py-2 rounded-lg border border-zinc-700 text-zinc-300 hover:text-white hover:border-zinc-500 transition-colors",
                            r#type: "button",
                            onclick: on_clear_backend,
                            "Clear override"
                        }
                        button {
                            class: "px-4 py-2 rounded-lg bg-emerald-500 hover:bg-emerald-400 text-white font-medium transition-colors",
                            r#type: "submit",
                            "Save backend"
                        }
                    }
                }
            }

            section { class: "bg-zinc-800/30 rounded-2xl border border-zinc-700/30 p-6",
                h2 { class: "text-lg font-semibold text-white mb-3", "Comments" }
                div { class: "space-y-3",
                    label { class: "flex items-start gap-3 cursor-pointer",
                        input {
                            r#type: "radio",
                            name: "comment-mode",
                            checked: mode == CommentWriteMode::AtomicAppend,
                            onchange: move |_| on_mode_change.call(CommentWriteMode::AtomicAppend),
                        }
                        div {
                            p { class: "font-medium text-white", "Atomic append" }
                            p { class: "text-sm text-zinc-400",
                                "The server adds each comment, so simultaneous commenters never overwrite each other."
                            }
                        }
                    }
                    label { class: "flex items-start gap-3 cursor-pointer",
                        input {
                            r#type: "radio",
                            name: "comment-mode",
                            checked: mode == CommentWriteMode::ReadModifyWrite,
                            onchange: move |_| {
                                on_mode_change.call(CommentWriteMode::ReadModifyWrite)
                            },
                        }
                        div {
                            p { class: "font-medium text-white", "Read, then overwrite" }
                            p { class: "text-sm text-zinc-400",
                                "Rewrites the whole comment list. Two people posting at once can lose a comment."
                            }
                        }
                    }
                }
            }
        }
    }
}
