use dioxus::prelude::*;

mod api;
mod bookmarks;
mod components;
mod config;
mod controller;
mod db;
mod playback;
mod utils;

use components::AppView;

const APP_CSS: Asset = asset!("/assets/styling/app.css");
const TAILWIND_CSS: Asset = asset!("/assets/tailwind.css");

fn main() {
    dioxus::launch(App);
}

#[component]
fn App() -> Element {
    rsx! {
        document::Title { "Composer's Dashboard" }
        document::Meta { name: "theme-color", content: "#18181b" }
        document::Meta { name: "mobile-web-app-capable", content: "yes" }

        document::Stylesheet { href: TAILWIND_CSS }
        document::Stylesheet { href: APP_CSS }

        Router::<AppView> {}
    }
}
