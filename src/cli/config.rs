use crate::cli::CliError;
use crate::config::generate::generate_starter_config;
use crate::config::user_config_path;
use std::fs;
use std::path::PathBuf;

/// Print the starter config, or write it to `~/.config/hostwatch/config.yml`.
pub fn init(stdout: bool) -> Result<(), CliError> {
    let config_content = generate_starter_config();

    if stdout {
        print!("{}", config_content);
        return Ok(());
    }

    let config_path = user_config_path().ok_or(CliError::NoHomeDir)?;
    let written = write_config(&config_content, config_path)?;
    println!("Config file written to {}", written.display());
    Ok(())
}

/// Write `content` to `path`, refusing to overwrite an existing file.
pub fn write_config(content: &str, path: PathBuf) -> Result<PathBuf, CliError> {
    if path.exists() {
        return Err(CliError::ConfigExists(path));
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&path, content)?;
    Ok(path)
}
