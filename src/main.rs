// GUI-subsystem binary: no console window is ever allocated on Windows.
#![windows_subsystem = "windows"]
#![allow(clippy::too_many_arguments)]

use eframe::egui;
use overlayfe::app::OverlayFEApp;
use overlayfe::logger;

fn main() -> Result<(), eframe::Error> {
    // Initialize session log (overwrites previous session log)
    logger::init();

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 720.0])
            .with_title("OverlayFE"),
        ..Default::default()
    };

    eframe::run_native(
        "OverlayFE",
        options,
        Box::new(|cc| Box::new(OverlayFEApp::new(cc))),
    )
}
