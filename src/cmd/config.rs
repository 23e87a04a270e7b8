//! Configuration view and validation commands — `reviewd config`.

use anyhow::Result;

use super::super::ConfigCommands;

pub fn cmd_config(command: Option<ConfigCommands>) -> Result<()> {
    use reviewd::config::RemoteConfig;

    let config = RemoteConfig::from_env();

    match command {
        None | Some(ConfigCommands::Show) => {
            println!();
            println!("reviewd Configuration");
            println!("=====================");
            println!();
            println!(
                "  api_key = {}",
                if config.api_key_present() {
                    "(set)"
                } else {
                    "(not set)"
                }
            );
            println!("  base_url = \"{}\"", config.base_url);
            println!("  model = \"{}\"", config.model);
            println!("  timeout_seconds = {}", config.timeout.as_secs());
            println!("  max_attempts = {}", config.max_attempts);
            println!(
                "  retry_delay_seconds = {}",
                config.retry_delay.as_secs_f64()
            );
            println!("  max_tokens = {}", config.max_tokens);
            println!("  temperature = {}", config.temperature);
            match config.max_code_chars {
                Some(limit) => println!("  max_code_chars = {}", limit),
                None => println!("  max_code_chars = (unlimited)"),
            }
            println!("  fallback_enabled = {}", config.fallback_enabled);
            println!();
        }
        Some(ConfigCommands::Validate) => {
            println!();
            println!("Validating configuration...");
            println!();

            let warnings = config.validation_warnings();
            if warnings.is_empty() {
                println!("Configuration is valid.");
                println!();
            } else {
                println!("Configuration warnings:");
                for warning in &warnings {
                    println!("  - {}", warning);
                }
                println!();
                anyhow::bail!("{} configuration warning(s)", warnings.len());
            }
        }
    }

    Ok(())
}
