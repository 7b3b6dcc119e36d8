//! Cleaner Air, Quieter Cities - Environmental Co-Benefit Dashboard
//!
//! Loads a spreadsheet of air-quality and noise co-benefit projections per
//! small area (2025-2050), cleans it, and renders the dashboard charts.

mod charts;
mod data;
mod gui;
mod stats;

use eframe::egui;
use gui::DashboardApp;

fn main() -> eframe::Result<()> {
    // Configure native options
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1400.0, 800.0])
            .with_min_inner_size([1200.0, 700.0])
            .with_title("Cleaner Air, Quieter Cities"),
        ..Default::default()
    };

    // Run the application
    eframe::run_native(
        "Cleaner Air, Quieter Cities",
        options,
        Box::new(|cc| Ok(Box::new(DashboardApp::new(cc)))),
    )
}
