use anyhow::{Result, bail};

use crate::config;

/// `snapdiff init` — create .snapdiff/config.toml.
pub fn init(force: bool) -> Result<()> {
    if !force && config::config_file_exists() {
        bail!(".snapdiff/config.toml already exists (use --force to overwrite)");
    }

    config::write_template()?;
    config::write_gitignore(force)?;

    let verb = if force { "Regenerated" } else { "Created" };
    println!("{verb} .snapdiff/config.toml");
    Ok(())
}
