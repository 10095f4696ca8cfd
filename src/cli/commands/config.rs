//! Config command implementation.

use crate::cli::{ConfigAction, Output};
use crate::config::Settings;
use anyhow::Result;

/// Run the config command.
pub fn run_config(action: &ConfigAction, settings: Settings) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let rendered = toml::to_string_pretty(&settings)?;
            println!("{}", rendered);
            Ok(())
        }
        ConfigAction::Set { key, value } => {
            Output::warning("Config set is not yet implemented.");
            Output::info(&format!("Would set {} = {}", key, value));
            Output::info("Please edit the config file directly for now.");
            Ok(())
        }
        ConfigAction::Path => {
            Output::kv(
                "config",
                &Settings::default_config_path().display().to_string(),
            );
            Ok(())
        }
    }
}
