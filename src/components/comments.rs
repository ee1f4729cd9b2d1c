use crate::api::*;
use crate::components::{use_cue_controller, AlertSignal, ConfirmDialog, Icon};
use crate::controller::Confirmation;
use dioxus::prelude::*;

#[component]
pub fn CommentThread(cue_id: String, comments: Vec<Comment>) -> Element {
    let controller = use_cue_controller();
    let session = use_context::<Signal<Option<UserSession>>>();
    let alert = use_context::<AlertSignal>();
    let mut draft = use_signal(String::new);
    let mut posting = use_signal(|| false);
    let mut pending_delete = use_signal(|| None::<String>);

    let on_post = {
        let cue_id = cue_id.clone();
        let controller = controller.clone();
        move |evt: FormEvent| {
            evt.prevent_default();
            if posting() {
                return;
            }
            let controller = controller();
            let cue_id = cue_id.clone();
            let text = draft();
            posting.set(true);
            spawn(async move {
                match controller.add_comment(&cue_id, &text).await {
                    Ok(_) => draft.set(String::new()),
                    Err(err) => alert.show(err),
                }
                posting.set(false);
            });
        }
    };

    let on_confirm_delete = {
        let cue_id = cue_id.clone();
        move |_| {
            let Some(comment_id) = pending_delete() else {
                return;
            };
            pending_delete.set(None);
            let controller = controller();
            let cue_id = cue_id.clone();
            spawn(async move {
                if let Err(err) = controller
                    .delete_comment(&cue_id, &comment_id, Confirmation::Confirmed)
                    .await
                {
                    alert.show(err);
                }
            });
        }
    };

    let viewer = session();

    rsx! {
        div { class: "space-y-2",
            h3 { class: "flex items-center gap-1.5 text-sm font-semibold text-zinc-300",
                Icon { name: "message".to_string(), class: "w-4 h-4".to_string() }
                "Comments ({comments.len()})"
            }
            if comments.is_empty() {
                p { class: "text-sm text-zinc-500", "No comments yet." }
            }
            ul { class: "space-y-1.5",
                for comment in comments.iter() {
                    li {
                        key: "{comment.id}",
                        class: "flex items-start justify-between gap-3 rounded-lg bg-zinc-900/40 px-3 py-2",
                        p { class: "text-sm text-zinc-200 break-words",
                            span { class: "font-semibold text-emerald-300", "{comment.username}: " }
                            "{comment.text}"
                        }
                        if viewer.as_ref().is_some_and(|user| comment.is_owned_by(user)) {
                            button {
                                class: "p-1 rounded text-zinc-500 hover:text-red-400 transition-colors",
                                aria_label: "Delete comment",
                                onclick: {
                                    let comment_id = comment.id.clone();
                                    move |_| pending_delete.set(Some(comment_id.clone()))
                                },
                                Icon { name: "trash".to_string(), class: "w-4 h-4".to_string() }
                            }
                        }
                    }
                }
            }
            if viewer.is_some() {
                form { class: "flex gap-2", onsubmit: on_post,
                    input {
                        class: "flex-1 px-3 py-1.5 bg-zinc-900/50 border border-zinc-700 rounded-lg text-sm text-white placeholder-zinc-500 focus:outline-none focus:border-emerald-500/50",
                        placeholder: "Add a comment",
                        value: draft,
                        oninput: move |e| draft.set(e.value()),
                    }
                    button {
                        class: "px-3 py-1.5 rounded-lg bg-emerald-500 hover:bg-emerald-400 text-white text-sm font-medium transition-colors disabled:opacity-50",
                        r#type: "submit",
                        disabled: posting(),
                        "Post"
                    }
                }
            } else {
                p { class: "text-xs text-zinc-500", "Sign in to comment." }
            }
        }

        if pending_delete().is_some() {
            ConfirmDialog {
                title: "Delete comment".to_string(),
                message: "Are you sure you want to delete this comment?".to_string(),
                confirm_label: "Delete".to_string(),
                on_confirm: on_confirm_delete,
                on_cancel: move |_| pending_delete.set(None),
            }
        }
    }
}
