//! Configuration commands.

use crate::config::Config;
use crate::error::{ClientError, ClientResult};

/// Dump the effective configuration to stdout.
pub fn dump(config: &Config) -> ClientResult<()> {
    let toml_str = toml::to_string_pretty(config)
        .map_err(|e| ClientError::Config(format!("failed to serialize config: {}", e)))?;
    println!("# config.toml ({})", Config::default_path().display());
    println!("{}", toml_str);
    Ok(())
}

/// Validate the configuration.
pub fn validate(config: &Config) -> ClientResult<()> {
    config.validate().map_err(ClientError::Config)?;

    let dist = config.dist_dir();
    if !dist.join("patcher.js").exists() {
        println!(
            "note: {} has no patcher.js yet; the first REPAIR downloads it.",
            dist.display()
        );
    }

    println!("Configuration is valid.");
    Ok(())
}

/// Show the configuration file path.
pub fn path() -> ClientResult<()> {
    println!("config: {}", Config::default_path().display());
    println!("dist: {}", Config::default_dist_dir().display());
    Ok(())
}
