use anyhow::{Context, Result};
use log::LevelFilter;
use simplelog::{ColorChoice, ConfigBuilder, TermLogger, TerminalMode};

pub fn level_for(verbose: bool) -> LevelFilter {
    if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    }
}

/// Installs a `TermLogger` at Info, or Debug when `verbose` is set.
///
/// Fails if a logger is already installed for this process.
pub fn init_logging(verbose: bool) -> Result<()> {
    let mut builder = ConfigBuilder::new();
    builder
        .set_time_format_rfc3339()
        .set_target_level(LevelFilter::Off)
        .set_thread_level(LevelFilter::Off);
    // Falls back to UTC when the local offset cannot be determined
    let _ = builder.set_time_offset_to_local();

    TermLogger::init(
        level_for(verbose),
        builder.build(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )
    .context("Failed to initialize logger")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_for() {
        assert_eq!(level_for(false), LevelFilter::Info);
        assert_eq!(level_for(true), LevelFilter::Debug);
    }

    #[test]
    fn test_second_init_fails() {
        init_logging(false).unwrap();
        assert!(init_logging(true).is_err());
    }
}
