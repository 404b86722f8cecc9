mod api;
mod app;
mod detail;
mod filters;
mod graph;
mod layout;
mod util;

use clap::Parser;

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Base URL of the interview data API.
    #[arg(long, default_value = "http://127.0.0.1:8000")]
    api_base: String,

    /// Filter query string to restore a shared view,
    /// e.g. "cat=react&cluster=5&page=2".
    #[arg(long, default_value = "")]
    filters: String,
}

fn main() -> eframe::Result<()> {
    env_logger::init();

    let args = Args::parse();
    let options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default().with_inner_size([1440.0, 920.0]),
        ..Default::default()
    };

    eframe::run_native(
        "interview-constellation",
        options,
        Box::new(move |cc| {
            Ok(Box::new(app::ConstellationApp::new(
                cc,
                args.api_base.clone(),
                args.filters.clone(),
            )))
        }),
    )
}
