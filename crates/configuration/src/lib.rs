use std::path::Path;

// Declare the modules that make up this crate.
#[cfg(feature = "clap")]
pub mod cli;
pub mod error;
pub mod logging;
pub mod settings;

// Re-export the core types to provide a clean public API.
#[cfg(feature = "clap")]
pub use cli::CliOverrides;
pub use error::ConfigError;
pub use logging::init_logging;
pub use settings::{AnalysisParams, BacktestParams, Config, LoggingSettings, TierParams};

/// Prefix for environment variables, e.g. `TIERWATCH_ANALYSIS__MIN_CONFIDENCE=0.7`.
pub const ENV_PREFIX: &str = "TIERWATCH";

/// Loads the application configuration.
///
/// Sources are layered: built-in defaults, then `config.toml` in the working directory
/// (if present), then `TIERWATCH_*` environment variables. The result is validated
/// before it is returned.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(None)
}

/// Same as [`load_config`] but reads an explicit file instead of `config.toml`.
/// An explicit file must exist.
pub fn load_config_from(path: Option<&Path>) -> Result<Config, ConfigError> {
    let file = match path {
        Some(path) => config::File::from(path).required(true),
        None => config::File::with_name("config").required(false),
    };
    build_config(file, environment())
}

/// `TIERWATCH_SECTION__KEY` variables, e.g. `TIERWATCH_BACKTEST__INITIAL_CAPITAL`.
fn environment() -> config::Environment {
    config::Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}

fn build_config(
    file: config::File<config::FileSourceFile, config::FileFormat>,
    environment: config::Environment,
) -> Result<Config, ConfigError> {
    let builder = config::Config::builder()
        .add_source(file)
        .add_source(environment)
        .build()?;

    // Attempt to deserialize the entire configuration into our `Config` struct
    let config = builder.try_deserialize::<Config>()?;
    config.validate()?;

    tracing::debug!(?config, "configuration loaded");
    Ok(config)
}
