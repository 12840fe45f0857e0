//! `codeflow onboard`: first-time setup.

use codeflow_config::AppConfig;
use std::path::Path;

/// Outcome of writing the config file.
#[derive(Debug, PartialEq, Eq)]
enum Written {
    Created,
    AlreadyExists,
}

fn write_default_config(config_dir: &Path) -> std::io::Result<Written> {
    std::fs::create_dir_all(config_dir)?;

    let config_path = config_dir.join("config.toml");
    if config_path.exists() {
        return Ok(Written::AlreadyExists);
    }

    std::fs::write(&config_path, AppConfig::default_toml())?;
    Ok(Written::Created)
}

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config_dir = AppConfig::config_dir();
    let config_path = config_dir.join("config.toml");

    println!("codeflow setup");
    println!("==============\n");

    match write_default_config(&config_dir)? {
        Written::AlreadyExists => {
            println!("Config already exists at: {}", config_path.display());
            println!("   Edit it manually or delete and re-run onboard.\n");
        }
        Written::Created => {
            println!("Created config.toml at: {}", config_path.display());
            println!("\nNext steps:");
            println!("   1. Set OPENAI_API_KEY (or edit {})", config_path.display());
            println!("   2. Set E2B_API_KEY for the sandbox service");
            println!("   3. Run: codeflow run \"describe the repository\"\n");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_once_and_never_overwrites() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join(".codeflow");

        assert_eq!(write_default_config(&dir).unwrap(), Written::Created);
        let path = dir.join("config.toml");
        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written, AppConfig::default_toml());

        std::fs::write(&path, "default_model = \"ollama:llama3\"\n").unwrap();
        assert_eq!(write_default_config(&dir).unwrap(), Written::AlreadyExists);
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "default_model = \"ollama:llama3\"\n"
        );
    }
}
