use crate::components::AlertSignal;
use dioxus::prelude::*;

#[component]
pub fn ConfirmDialog(
    title: String,
    message: String,
    confirm_label: String,
    on_confirm: EventHandler<()>,
    on_cancel: EventHandler<()>,
) -> Element {
    rsx! {
        div { class: "fixed inset-0 bg-black/50 flex items-center justify-center z-50",
            div { class: "bg-zinc-900 border border-zinc-700 rounded-lg p-6 max-w-md w-full mx-4",
                h2 { class: "text-xl font-bold text-white mb-4", "{title}" }
                p { class: "text-zinc-300 mb-6", "{message}" }
                div { class: "flex gap-3 justify-end",
                    button {
                        class: "px-4 py-2 rounded-lg border border-zinc-700 text-zinc-300 hover:text-white hover:border-zinc-500 transition-colors",
                        onclick: move |_| on_cancel.call(()),
                        "Cancel"
                    }
                    button {
                        class: "px-4 py-2 rounded-lg bg-red-600 hover:bg-red-500 text-white transition-colors",
                        onclick: move |_| on_confirm.call(()),
                        "{confirm_label}"
                    }
                }
            }
        }
    }
}

/// Blocking notice for failed actions. Rendered once by the shell.
#[component]
pub fn AlertDialog() -> Element {
    let mut alert = use_context::<AlertSignal>().0;
    let Some(message) = alert() else {
        return rsx! {};
    };

    rsx! {
        div { class: "fixed inset-0 bg-black/50 flex items-center justify-center z-[60]",
            div {
                class: "bg-zinc-900 border border-zinc-700 rounded-lg p-6 max-w-md w-full mx-4",
                role: "alertdialog",
                p { class: "text-zinc-200 mb-6", "{message}" }
                div { class: "flex justify-end",
                    button {
                        class: "px-4 py-2 rounded-lg bg-emerald-600 hover:bg-emerald-500 text-white transition-colors",
                        onclick: move |_| alert.set(None),
                        "OK"
                    }
                }
            }
        }
    }
}
