use std::{path::PathBuf, sync::Arc};

use anyhow::{Result, anyhow};
use cp_workbench::{
    app::WorkbenchApp,
    config::{self, Settings},
    logging::{self, LogSink, MessageLog},
    toolchain,
    window::Window,
};
use eframe::NativeOptions;

fn main() -> Result<()> {
    env_logger::init();
    logging::init();
    log::info!("Launching cp-workbench");

    let settings_path = config::default_settings_path();
    let settings = Settings::load_or_default().unwrap_or_else(|error| {
        log::error!("Falling back to default settings: {error:#}");
        Settings::default()
    });

    let messages = Arc::new(MessageLog::new());
    let sink: Arc<dyn LogSink> = messages.clone();
    let toolchain = toolchain::process_toolchain(0, &settings, Arc::clone(&sink));
    let mut window = Window::new(0, settings, toolchain, sink);
    if let Some(path) = std::env::args_os().nth(1) {
        window.open(PathBuf::from(path));
    }

    let native_options = NativeOptions::default();

    eframe::run_native(
        "cp-workbench",
        native_options,
        Box::new(move |cc| {
            Ok(Box::new(WorkbenchApp::new(
                cc,
                window,
                messages,
                settings_path,
            )))
        }),
    )
    .map_err(|error| anyhow!("Failed to start UI: {error}"))?;

    Ok(())
}
