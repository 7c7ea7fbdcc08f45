use std::path::Path;

use anyhow::{Context, Result};

use stickbottom_core::Config;

/// Print the effective configuration, or write it out with `init`
pub fn run(config: &Config, path: Option<&Path>, init: bool) -> Result<()> {
    if !init {
        let content = toml::to_string_pretty(config).context("Failed to serialize configuration")?;
        print!("{}", content);
        return Ok(());
    }

    let written = match path {
        Some(path) => {
            config.save_to(path)?;
            path.to_path_buf()
        }
        None => config.save()?,
    };
    println!("Configuration written to {}", written.display());
    Ok(())
}
