mod status;

use locomoco_engine::device::GpuInit;
use locomoco_engine::logging::{init_logging, LoggingConfig};
use locomoco_engine::window::{Runtime, RuntimeConfig};

use status::StatusLayer;

fn main() -> anyhow::Result<()> {
    init_logging(LoggingConfig::default());

    let config = RuntimeConfig {
        title: "Locomoco".to_string(),
        ..RuntimeConfig::default()
    };

    log::info!(
        "opening {}x{} window",
        config.initial_size.width,
        config.initial_size.height
    );

    Runtime::run(config, GpuInit::default(), StatusLayer::new())
}
