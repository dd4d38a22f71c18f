//! Real-time volumetric cloud viewer.
//!
//! Fly with W/S/A/D (R/F up/down) while the pointer is captured; Space
//! toggles capture, Escape quits.

mod config;
mod driver;
mod editor;
mod frame;
mod params;
mod router;
mod uniforms;

use anyhow::Result;

use stratus_engine::device::GpuInit;
use stratus_engine::logging::{init_logging, LoggingConfig};
use stratus_engine::window::Runtime;

use crate::config::ViewerConfig;
use crate::driver::ViewerApp;
use crate::editor::NoEditor;

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());

    let config = ViewerConfig::default();
    log::info!("starting {} ({}x{})", config.title, config.width, config.height);

    let runtime = config.runtime();
    Runtime::run(runtime, GpuInit::default(), ViewerApp::new(config, NoEditor))
}
