use crate::api::*;
use crate::bookmarks::BookmarkStore;
use crate::components::{
    view_label, AlertDialog, AlertSignal, AppView, Icon, LocalStore, SignInPanel,
};
use crate::config::resolve_backend;
use crate::controller::CueController;
use crate::db::{load_settings, platform_store, DashboardSettings};
use dioxus::prelude::*;
use futures_util::StreamExt;

/// Controller for the current comment write mode.
pub fn use_cue_controller() -> impl Fn() -> CueController + Clone {
    let gateway = use_context::<Gateway>();
    let settings = use_context::<Signal<DashboardSettings>>();
    move || CueController::new(gateway.clone(), settings.peek().comment_write_mode)
}

#[component]
pub fn AppShell() -> Element {
    let store = use_hook(|| LocalStore(platform_store()));
    let gateway = use_hook({
        let store = store.clone();
        move || Gateway::connect(resolve_backend(store.0.as_ref()), store.0.clone())
    });
    let bookmarks = use_hook({
        let store = store.clone();
        move || BookmarkStore::new(store.0.clone())
    });
    let settings = use_signal({
        let store = store.clone();
        move || load_settings(store.0.as_ref())
    });
    let mut session = use_signal(|| gateway.identity.current_session());
    let mut cues = use_signal(Vec::<Cue>::new);
    let mut cues_loaded = use_signal(|| false);
    let alert = use_signal(|| None::<String>);
    let view = use_route::<AppView>();

    // Provide state via context
    use_context_provider(|| store.clone());
    use_context_provider(|| gateway.clone());
    use_context_provider(|| bookmarks.clone());
    use_context_provider(|| settings);
    use_context_provider(|| session);
    use_context_provider(|| cues);
    use_context_provider(|| cues_loaded);
    use_context_provider(|| AlertSignal(alert));

    use_future({
        let gateway = gateway.clone();
        move || {
            let gateway = gateway.clone();
            async move {
                let mut changes = gateway.identity.session_changes();
                while let Some(next) = changes.next().await {
                    session.set(next);
                }
            }
        }
    });

    // Live cue list. Dropping the stream on unmount ends the subscription.
    use_future({
        let gateway = gateway.clone();
        move || {
            let gateway = gateway.clone();
            async move {
                let mut snapshots = gateway.cues.subscribe();
                while let Some(snapshot) = snapshots.next().await {
                    tracing::debug!(count = snapshot.len(), "cue snapshot");
                    cues.set(snapshot);
                    cues_loaded.set(true);
                }
            }
        }
    });

    let nav = navigator();
    let on_settings_page = matches!(view, AppView::SettingsView {});

    rsx! {
        div { class: "app-container min-h-screen text-white",
            header { class: "mobile-safe-top border-b border-zinc-800/60 bg-zinc-950/80 backdrop-blur-xl sticky top-0 z-20",
                div { class: "max-w-5xl mx-auto flex items-center justify-between gap-4 px-4 py-3",
                    div { class: "flex items-center gap-3",
                        if on_settings_page {
                            button {
                                class: "p-2 rounded-lg text-zinc-300 hover:text-white hover:bg-zinc-800/60 transition-colors",
                                aria_label: "Back to cues",
                                onclick: move |_| {
                                    nav.push(AppView::DashboardView {});
                                },
                                Icon {
                                    name: "arrow-left".to_string(),
                                    class: "w-5 h-5".to_string(),
                                }
                            }
                        }
                        div { class: "flex flex-col",
                            span { class: "text-xs uppercase tracking-widest text-zinc-500",
                                "Composer's Dashboard"
                            }
                            span { class: "text-sm font-semibold text-white", "{view_label(&view)}" }
                        }
                        if gateway.is_demo() {
                            span { class: "px-2 py-0.5 rounded-full text-xs bg-amber-500/20 text-amber-300",
                                "Demo"
                            }
                        }
                    }
                    div { class: "flex items-center gap-2",
                        SignInPanel {}
                        if !on_settings_page {
                            button {
                                class: "p-2 rounded-lg text-zinc-300 hover:text-white hover:bg-zinc-800/60 transition-colors",
                                aria_label: "Settings",
                                onclick: move |_| {
                                    nav.push(AppView::SettingsView {});
                                },
                                Icon {
                                    name: "settings".to_string(),
                                    class: "w-5 h-5".to_string(),
                                }
                            }
                        }
                    }
                }
            }

            main { class: "main-scroll",
                div { class: "page-shell max-w-5xl mx-auto px-4 py-6", Outlet::<AppView> {} }
            }
        }

        AlertDialog {}
    }
}
