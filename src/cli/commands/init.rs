//! Init command implementation.

use crate::cli::Output;
use crate::config::Settings;
use anyhow::Result;

/// Create the data directories and write a default config file.
pub fn run_init(settings: &Settings) -> Result<()> {
    std::fs::create_dir_all(settings.document_library_dir())?;
    std::fs::create_dir_all(settings.audio_dir())?;
    Output::success(&format!("Data directory: {}", settings.data_dir().display()));

    let config_path = Settings::default_config_path();
    if config_path.exists() {
        Output::info(&format!("Config already exists: {}", config_path.display()));
    } else {
        settings.save_to(&config_path)?;
        Output::success(&format!("Wrote default config: {}", config_path.display()));
    }

    Output::info("Run 'fortell doctor' to verify tools and credentials.");
    Ok(())
}
