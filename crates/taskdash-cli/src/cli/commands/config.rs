//! Config command handlers.

use anyhow::{Context, Result};
use taskdash_core::config::{self, Config, paths};

pub fn path() {
    println!("{}", paths::config_path().display());
}

pub fn init() -> Result<()> {
    let config_path = paths::config_path();
    Config::init(&config_path)
        .with_context(|| format!("init config at {}", config_path.display()))?;
    println!("Created config at {}", config_path.display());
    Ok(())
}

pub fn generate() -> Result<()> {
    print!("{}", Config::generate()?);
    Ok(())
}

/// Prints the settings in effect after environment overrides.
pub fn show(config: &Config) -> Result<()> {
    let mut base_url = config.effective_base_url()?;
    if std::env::var_os(config::API_URL_ENV).is_some() {
        base_url.push_str(&format!(" (from {})", config::API_URL_ENV));
    }
    let timeout = config
        .request_timeout()
        .map_or_else(|| "disabled".to_string(), |t| format!("{}s", t.as_secs()));

    let rows = [
        ("api.base_url", base_url),
        ("api.timeout_secs", timeout),
        (
            "api.accept_invalid_certs",
            config.api.accept_invalid_certs.to_string(),
        ),
        (
            "tasks.refetch_delay_ms",
            config.refetch_delay().as_millis().to_string(),
        ),
        ("log.filter", config.log.filter.clone()),
        ("session file", paths::session_path().display().to_string()),
        ("log directory", paths::logs_dir().display().to_string()),
    ];
    for (key, value) in rows {
        println!("{key:<26}{value}");
    }
    Ok(())
}
