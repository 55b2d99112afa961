//! `ponder onboard` — First-time setup.

use ponder_config::AppConfig;
use std::path::{Path, PathBuf};

pub async fn run(config_path: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let config_path = config_path.unwrap_or_else(|| AppConfig::config_dir().join("config.toml"));

    println!("Ponder — First-Time Setup");
    println!("=========================\n");

    if write_default_config(&config_path)? {
        println!("✅ Created config.toml at: {}", config_path.display());
    } else {
        println!("⚠️  Config already exists at: {}", config_path.display());
        println!("   Edit it manually or delete and re-run onboard.\n");
        return Ok(());
    }

    println!("\n📝 Next steps:");
    println!("   1. Set OPENAI_API_KEY (or add api_key to the config file)");
    println!("   2. Set SERPAPI_API_KEY to enable the Search tool");
    println!("   3. Run `ponder` and ask a question");
    println!();

    Ok(())
}

/// Write the default config to `path` unless a file is already there.
/// Returns whether a file was written.
fn write_default_config(path: &Path) -> std::io::Result<bool> {
    if path.exists() {
        return Ok(false);
    }
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(path, AppConfig::default_toml())?;
    Ok(true)
}
