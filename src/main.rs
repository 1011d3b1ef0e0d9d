mod app;
mod catalog;
mod editor;
mod export;
mod geometry;
mod model;
mod net;
mod store;

use std::path::PathBuf;

use eframe::egui;

use app::BoxlabelApp;
use net::DEFAULT_ENDPOINT;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // boxlabel [catalog.csv] [endpoint]
    let args: Vec<String> = std::env::args().collect();
    let catalog_path = args.get(1).map(PathBuf::from);
    if let Some(path) = &catalog_path {
        if !path.exists() {
            eprintln!("File not found: {}", path.display());
            std::process::exit(1);
        }
    }
    let endpoint = args
        .get(2)
        .cloned()
        .unwrap_or_else(|| DEFAULT_ENDPOINT.to_owned());

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1200.0, 800.0])
            .with_title("boxlabel"),
        ..Default::default()
    };

    eframe::run_native(
        "boxlabel",
        options,
        Box::new(move |_cc| {
            Ok(Box::new(BoxlabelApp::new(
                catalog_path.as_deref(),
                endpoint,
            )))
        }),
    )
    .expect("Failed to run eframe");
}
