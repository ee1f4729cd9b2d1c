use crate::api::*;
use crate::components::{AlertSignal, Icon};
use dioxus::prelude::*;

#[component]
pub fn SignInPanel() -> Element {
    let gateway = use_context::<Gateway>();
    let session = use_context::<Signal<Option<UserSession>>>();
    let alert = use_context::<AlertSignal>();
    let mut email = use_signal(String::new);
    let mut password = use_signal(String::new);
    let mut busy = use_signal(|| false);
    let mut form_open = use_signal(|| false);

    let on_sign_in = {
        let gateway = gateway.clone();
        move |evt: FormEvent| {
            evt.prevent_default();
            if busy() {
                return;
            }
            let credentials = Credentials {
                email: email().trim().to_string(),
                password: password(),
            };
            busy.set(true);
            let gateway = gateway.clone();
            spawn(async move {
                match gateway.identity.sign_in(credentials).await {
                    Ok(_) => {
                        password.set(String::new());
                        form_open.set(false);
                    }
                    Err(err) => alert.show(format!("Sign-in failed: {err}")),
                }
                busy.set(false);
            });
        }
    };

    let on_sign_out = {
        let gateway = gateway.clone();
        move |_| {
            let gateway = gateway.clone();
            spawn(async move {
                if let Err(err) = gateway.identity.sign_out().await {
                    alert.show(format!("Sign-out failed: {err}"));
                }
            });
        }
    };

    if let Some(user) = session() {
        return rsx! {
            div { class: "flex items-center gap-2",
                span { class: "text-sm text-zinc-300 truncate max-w-[12rem]", "{user.author_label()}" }
                button {
                    class: "p-2 rounded-lg text-zinc-300 hover:text-white hover:bg-zinc-800/60 transition-colors",
                    aria_label: "Sign out",
                    onclick: on_sign_out,
                    Icon {
                        name: "log-out".to_string(),
                        class: "w-5 h-5".to_string(),
                    }
                }
            }
        };
    }

    rsx! {
        if form_open() {
            form { class: "flex flex-wrap items-center gap-2", onsubmit: on_sign_in,
                input {
                    class: "w-44 px-3 py-1.5 bg-zinc-900/50 border border-zinc-700 rounded-lg text-sm text-white placeholder-zinc-500 focus:outline-none focus:border-emerald-500/50",
                    r#type: "email",
                    placeholder: "Email",
                    value: email,
                    oninput: move |e| email.set(e.value()),
                }
                input {
                    class: "w-36 px-3 py-1.5 bg-zinc-900/50 border border-zinc-700 rounded-lg text-sm text-white placeholder-zinc-500 focus:outline-none focus:border-emerald-500/50",
                    r#type: "password",
                    placeholder: "Password",
                    value: password,
                    oninput: move |e| password.set(e.value()),
                }
                button {
                    class: "px-3 py-1.5 rounded-lg bg-emerald-500 hover:bg-emerald-400 text-white text-sm font-medium transition-colors disabled:opacity-50",
                    r#type: "submit",
                    disabled: busy(),
                    if busy() {
                        "Signing in..."
                    } else {
                        "Sign in"
                    }
                }
                button {
                    class: "p-1.5 rounded-lg text-zinc-400 hover:text-white transition-colors",
                    r#type: "button",
                    aria_label: "Close sign-in",
                    onclick: move |_| form_open.set(false),
                    Icon { name: "x".to_string(), class: "w-4 h-4".to_string() }
                }
            }
        } else {
            button {
                class: "px-3 py-1.5 rounded-lg bg-emerald-500 hover:bg-emerald-400 text-white text-sm font-medium transition-colors",
                onclick: move |_| form_open.set(true),
                "Sign in"
            }
        }
    }
}
