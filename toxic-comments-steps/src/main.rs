mod auxiliary_scoring;
mod preprocessing;
mod utils;

use {
    tracing::{info, warn},
    toxic_comments_core::config::Config,
    crate::{
        auxiliary_scoring::run_auxiliary_scoring_step,
        preprocessing::run_preprocessing_step,
        utils::init_logging,
    },
};

fn main() -> anyhow::Result<()> {
    let (config, load_error) = Config::load();
    init_logging(config.log_level());

    if let Some(err) = load_error {
        warn!("failed to read config, using defaults: {}", err);
    }

    info!("toxic comments feature preparation");

    match std::env::args().nth(1).as_deref() {
        Some("auxiliary") => run_auxiliary_scoring_step(&config)?,
        Some("preprocess") | None => run_preprocessing_step(&config)?,
        Some(other) => anyhow::bail!("unknown step: {} (expected \"auxiliary\" or \"preprocess\")", other),
    }

    Ok(())
}
