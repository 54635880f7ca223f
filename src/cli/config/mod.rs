//! Config command - prints the configuration the service would start with

use crate::config::AppConfig;

const REDACTED: &str = "[REDACTED]";

/// Load, validate and print the effective configuration
pub fn run() -> anyhow::Result<()> {
    let config = AppConfig::load()?;
    config.validate()?;

    println!("{}", render(&config)?);

    Ok(())
}

fn render(config: &AppConfig) -> anyhow::Result<String> {
    let mut shown = config.clone();

    if shown.store.database_url.is_some() {
        shown.store.database_url = Some(REDACTED.to_string());
    }

    Ok(serde_json::to_string_pretty(&shown)?)
}
