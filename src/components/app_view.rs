//! Routes of the dashboard.

use crate::components::views::{DashboardView, SettingsView};
use crate::components::AppShell;
use dioxus::prelude::*;

#[derive(Routable, Clone, PartialEq, Debug)]
#[rustfmt::skip]
pub enum AppView {
    #[layout(AppShell)]
        #[route("/")]
        DashboardView {},
        #[route("/settings")]
        SettingsView {},
}

pub fn view_label(view: &AppView) -> &'static str {
    match view {
        AppView::DashboardView {} => "Cues",
        AppView::SettingsView {} => "Settings",
    }
}
