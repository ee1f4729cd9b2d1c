use crate::api::*;
use crate::components::{CueCard, CueFormPanel, Icon, LocalStore};
use crate::db::{save_settings, DashboardSettings};
use dioxus::prelude::*;

/// Cues visible under `filter`, keeping the pushed order.
pub fn filter_cues(cues: &[Cue], filter: Option<Production>) -> Vec<Cue> {
    cues.iter()
        .filter(|cue| filter.is_none_or(|filter| cue.play.matches_filter(filter)))
        .cloned()
        .collect()
}

#[component]
pub fn DashboardView() -> Element {
    let store = use_context::<LocalStore>();
    let cues = use_context::<Signal<Vec<Cue>>>();
    let cues_loaded = use_context::<Signal<bool>>();
    let session = use_context::<Signal<Option<UserSession>>>();
    let mut settings = use_context::<Signal<DashboardSettings>>();
    // Bumped after each successful add so the file inputs start empty.
    let mut form_generation = use_signal(|| 0u32);

    let on_filter_change = move |evt: FormEvent| {
        let filter = Production::from_label(&evt.value());
        let mut next = settings();
        next.last_filter = filter;
        if let Err(err) = save_settings(store.0.as_ref(), &next) {
            tracing::warn!(%err, "filter preference not saved");
        }
        settings.set(next);
    };

    let filter = settings().last_filter;
    let visible = filter_cues(&cues(), filter);
    let selected = filter.map(Production::label).unwrap_or("all");

    rsx! {
        div { class: "space-y-6",
            header { class: "page-header flex flex-wrap items-end justify-between gap-4",
                div {
                    h1 { class: "page-title", "Cues" }
                    p { class: "page-subtitle", "Audio and sheet music for each production" }
                }
                select {
                    class: "px-4 py-2 bg-zinc-900/50 border border-zinc-700 rounded-lg text-white text-sm focus:outline-none focus:border-emerald-500/50",
                    aria_label: "Filter by production",
                    value: selected,
                    onchange: on_filter_change,
                    option { value: "all", selected: filter.is_none(), "All productions" }
                    for production in Production::ALL {
                        option {
                            value: production.label(),
                            selected: filter == Some(production),
                            "{production.label()}"
                        }
                    }
                }
            }

            if session().is_some() {
                CueFormPanel {
                    key: "{form_generation}",
                    editing: None,
                    on_done: move |_| form_generation += 1,
                }
            } else {
                p { class: "text-sm text-zinc-400", "Sign in to add cues and comments." }
            }

            if !cues_loaded() {
                div { class: "flex items-center justify-center py-20",
                    Icon {
                        name: "loader".to_string(),
                        class: "w-8 h-8 text-zinc-500".to_string(),
                    }
                }
            } else if visible.is_empty() {
                div { class: "flex flex-col items-center justify-center py-20 text-center",
                    Icon {
                        name: "music".to_string(),
                        class: "w-16 h-16 text-zinc-600 mb-4".to_string(),
                    }
                    p { class: "text-zinc-400", "No cues yet" }
                }
            } else {
                div { class: "space-y-4",
                    for cue in visible {
                        CueCard { key: "{cue.id}", cue: cue.clone() }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn cue(id: &str, play: Production) -> Cue {
        Cue {
            id: id.to_string(),
            title: id.to_string(),
            play,
            audio_url: String::new(),
            pdf_url: String::new(),
            created_at: Utc.with_ymd_and_hms(2024, 3, 1, 20, 0, 0).unwrap(),
            comments: Vec::new(),
        }
    }

    #[test]
    fn both_cues_show_under_either_production() {
        let cues = vec![
            cue("a", Production::JuliusCaesar),
            cue("b", Production::Both),
            cue("c", Production::AntonyAndCleopatra),
        ];
        let ids = |filter: Option<Production>| -> Vec<String> {
            filter_cues(&cues, filter).into_iter().map(|c| c.id).collect()
        };
        assert_eq!(ids(None), ["a", "b", "c"]);
        assert_eq!(ids(Some(Production::JuliusCaesar)), ["a", "b"]);
        assert_eq!(ids(Some(Production::AntonyAndCleopatra)), ["b", "c"]);
        assert_eq!(ids(Some(Production::Both)), ["b"]);
    }
}
