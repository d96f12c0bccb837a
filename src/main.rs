mod api;
mod app;
mod config;
mod models;
mod services;
mod ui;

use std::sync::Arc;

use gtk::prelude::*;
use relm4::prelude::*;
use tracing_subscriber::EnvFilter;

use api::{ChatBackend, HttpBackend};
use app::App;
use config::{ClientConfig, APP_ID};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = ClientConfig::from_env()?;
    tracing::info!("Using chat API at {}", config.api_base);
    let backend: Arc<dyn ChatBackend> = Arc::new(HttpBackend::new(&config)?);

    let app = adw::Application::builder().application_id(APP_ID).build();

    app.connect_startup(|_| {
        gtk::Window::set_default_icon_name("chat-symbolic");

        let provider = gtk::CssProvider::new();
        provider.load_from_string(ui::STYLE);
        gtk::style_context_add_provider_for_display(
            &gtk::gdk::Display::default().expect("Could not get default display"),
            &provider,
            gtk::STYLE_PROVIDER_PRIORITY_APPLICATION,
        );
    });

    RelmApp::from_app(app).run_async::<App>(backend);
    Ok(())
}
