mod variants;

use anyhow::{Context, Result};

use trigon_engine::device::GpuInit;
use trigon_engine::logging::{init_logging, LoggingConfig};
use trigon_engine::scene::SceneApp;
use trigon_engine::window::{Runtime, RuntimeConfig};

use crate::variants::Variant;

const USAGE: &str = "usage: trigon-viewer [flat|interpolated|transformed]";

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());

    let variant = match std::env::args().nth(1) {
        Some(arg) => arg.parse::<Variant>().context(USAGE)?,
        None => Variant::default(),
    };

    let gpu_init = GpuInit::from_env();
    log::info!("showing `{variant}` triangle ({:?})", gpu_init.power_preference);

    let config = RuntimeConfig {
        title: format!("trigon: {variant}"),
        ..RuntimeConfig::default()
    };

    Runtime::run(config, gpu_init, SceneApp::new(variant.scene_desc()))
}
