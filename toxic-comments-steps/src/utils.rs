use {
    std::str::FromStr,
    tracing::{Level, Metadata},
    tracing_subscriber::{
        prelude::*,
        filter::filter_fn,
    },
    toxic_comments_features::ridge::SOLVER_LOG_TARGET,
};

pub fn init_logging(log_level: &str) {
    let level = Level::from_str(log_level).unwrap_or(Level::INFO);

    tracing_subscriber::FmtSubscriber::builder()
        .with_max_level(level)
        .finish()
        .with(filter_fn(move |metadata| is_enabled(metadata, level)))
        .init();
}

// per-iteration solver output only shows up at trace level
fn is_enabled(metadata: &Metadata<'_>, level: Level) -> bool {
    is_enabled_for(metadata.target(), metadata.level(), level)
}

fn is_enabled_for(target: &str, event_level: &Level, level: Level) -> bool {
    if target == SOLVER_LOG_TARGET {
        event_level <= &Level::INFO || level == Level::TRACE
    } else {
        true
    }
}
