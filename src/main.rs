mod app;
mod config;
mod event;
mod link;
mod session;
mod state_block;
mod theme;
mod tutor;

use app::GradusApp;
use config::Settings;
use eframe::egui;
use std::sync::mpsc;
use tracing_subscriber::EnvFilter;
use tutor::TutorClient;

// A setup link passed as the first argument patches the stored settings
// field by field; the raw link is dropped right after the decode so the
// credential-bearing fragment is not kept anywhere.
fn load_settings() -> (Settings, Vec<String>) {
    let mut warnings = Vec::new();
    let (stored, warning) = session::store::load_settings();
    if let Some(warning) = warning {
        warnings.push(format!("settings load warning: {warning}"));
    }
    let mut settings = stored.unwrap_or_default();

    if let Some(link_arg) = std::env::args().nth(1) {
        match link::decode_share_link(&link_arg) {
            Some(record) => {
                link::apply_share_patch(&mut settings, record);
                if let Err(err) = session::store::save_settings(&settings) {
                    warnings.push(format!("failed to persist settings from setup link: {err}"));
                }
                tracing::info!(
                    target: "gradus::link",
                    page = %link::strip_fragment(&link_arg),
                    "applied setup link"
                );
            }
            None => warnings.push("setup link was not recognized and was ignored".to_string()),
        }
    }

    (settings, warnings)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let (settings, warnings) = load_settings();
    let (tx, rx) = mpsc::channel();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("gradus-runtime")
        .build()?;

    let client = TutorClient::new(runtime.handle().clone(), tx);
    let app = GradusApp::new(rx, client, settings, warnings);
    let _runtime = runtime;

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1180.0, 760.0])
            .with_min_inner_size([960.0, 600.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Gradus",
        native_options,
        Box::new(move |creation_context| {
            app.apply_theme(&creation_context.egui_ctx);
            Ok(Box::new(app))
        }),
    )?;

    Ok(())
}
