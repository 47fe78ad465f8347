//! vk-viewer: interactive Vulkan model viewer.
//!
//! Loads a textured OBJ model and renders it with a first-person camera and
//! an animated point light. WASD moves, the mouse looks around, Escape
//! toggles pause and releases the cursor.

mod app;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};
use winit::event_loop::{ControlFlow, EventLoop};

use viewer_core::{ViewerConfig, init_logging};
use viewer_resources::ViewerAssets;

use crate::app::ViewerApp;

#[derive(Parser, Debug)]
#[command(name = "vk-viewer", version, about = "Interactive Vulkan model viewer")]
struct Args {
    /// TOML configuration file. A missing file means defaults.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Enable the Khronos validation layer.
    #[arg(long)]
    validation: bool,

    /// Initial window width in pixels.
    #[arg(long)]
    width: Option<u32>,

    /// Initial window height in pixels.
    #[arg(long)]
    height: Option<u32>,
}

impl Args {
    fn load_config(&self) -> anyhow::Result<ViewerConfig> {
        let mut config = match &self.config {
            Some(path) => ViewerConfig::load(path)
                .with_context(|| format!("invalid config {}", path.display()))?,
            None => ViewerConfig::default(),
        };
        if self.validation {
            config.render.validation = true;
        }
        if let Some(width) = self.width {
            config.window.width = width;
        }
        if let Some(height) = self.height {
            config.window.height = height;
        }
        Ok(config)
    }
}

fn run(args: &Args) -> anyhow::Result<()> {
    let config = args.load_config()?;
    init_logging(&config.log_filter);
    info!("Starting vk-viewer {}", env!("CARGO_PKG_VERSION"));

    let assets = ViewerAssets::load(
        &config.assets.model,
        &config.assets.diffuse,
        &config.assets.specular,
    )
    .context("failed to load assets")?;

    let event_loop = EventLoop::new().context("failed to create event loop")?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = ViewerApp::new(config, assets);
    event_loop.run_app(&mut app)?;
    app.finish()
}

fn main() -> ExitCode {
    let args = Args::parse();
    match run(&args) {
        Ok(()) => {
            info!("Clean shutdown");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
