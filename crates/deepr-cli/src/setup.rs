use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::config::Config;

const CONFIG_TEMPLATE: &str = r#"# deepr configuration
#
# API keys are read from environment variables by default:
#   OPENROUTER_API_KEY, SERPAPI_API_KEY, JINA_API_KEY
# A .env file in the working directory is loaded too.
# Any value below can also be set with DEEPR_<SECTION>__<KEY>,
# e.g. DEEPR_RESEARCH__MAX_ITERATIONS=5

# ── Language model ───────────────────────────────────────────────
[llm]
# api_key = "sk-or-..."           # or set OPENROUTER_API_KEY env var
# base_url = "https://openrouter.ai/api/v1"
# default_model = "anthropic/claude-3.5-haiku"
# app_title = "deepr"

# ── Web search ───────────────────────────────────────────────────
[search]
# api_key = "..."                 # or set SERPAPI_API_KEY env var
# endpoint = "https://serpapi.com/search"
# engine = "google"

# ── Page reader ──────────────────────────────────────────────────
# backend = "jina" uses the reader endpoint, "direct" fetches pages
# and extracts text locally.
[reader]
# backend = "jina"
# api_key = "jina_..."            # or set JINA_API_KEY env var
# base_url = "https://r.jina.ai/"

[http]
# timeout_secs = 60
# user_agent = "deepr/0.1"

# ── Research loop ────────────────────────────────────────────────
[research]
# max_iterations = 10             # 1 to 20
# model = "Claude 3.5 Haiku"      # see `deepr models`
"#;

pub fn run() -> Result<()> {
    let config_dir = Config::config_dir()?;
    let config_path = config_dir.join("config.toml");

    std::fs::create_dir_all(&config_dir)
        .with_context(|| format!("Failed to create config directory: {}", config_dir.display()))?;

    if config_path.exists() {
        println!("Existing config file found:");
        println!("  {}", config_path.display());
        print!("\nOverwrite? (The existing file will be backed up) [y/N] ");

        use std::io::Write;
        std::io::stdout().flush()?;

        let mut input = String::new();
        std::io::stdin().read_line(&mut input)?;

        if !input.trim().eq_ignore_ascii_case("y") {
            println!("Setup cancelled.");
            return Ok(());
        }

        let backup = backup_file(&config_path)?;
        println!("  Backed up to {}", backup.display());
    }

    write_template(&config_path)?;
    println!("Created {}", config_path.display());

    println!("\nNext steps:");
    println!("  1. Set your API keys:  export OPENROUTER_API_KEY=\"sk-or-...\" SERPAPI_API_KEY=\"...\"");
    println!("  2. Check the result:   deepr config");
    println!("  3. Start researching:  deepr \"What changed in the latest Rust edition?\"");

    Ok(())
}

fn write_template(path: &Path) -> Result<()> {
    std::fs::write(path, CONFIG_TEMPLATE)
        .with_context(|| format!("Failed to write {}", path.display()))
}

/// Move a file to <name>.bak, appending a timestamp if .bak already exists.
fn backup_file(path: &Path) -> Result<PathBuf> {
    let mut backup = path.with_extension("toml.bak");

    if backup.exists() {
        let timestamp = chrono::Local::now().format("%Y%m%d-%H%M%S");
        backup = path.with_extension(format!("toml.bak.{}", timestamp));
    }

    std::fs::rename(path, &backup)
        .with_context(|| format!("Failed to back up {} to {}", path.display(), backup.display()))?;
    Ok(backup)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_loads_as_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        write_template(&path).unwrap();

        let parsed: Config = toml::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(parsed, Config::default());
    }

    #[test]
    fn test_backup_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        std::fs::write(&path, "first").unwrap();
        let first = backup_file(&path).unwrap();
        assert_eq!(first, dir.path().join("config.toml.bak"));
        assert!(!path.exists());

        std::fs::write(&path, "second").unwrap();
        let second = backup_file(&path).unwrap();
        assert_ne!(second, first);
        assert!(second
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("config.toml.bak."));
        assert_eq!(std::fs::read_to_string(&first).unwrap(), "first");
        assert_eq!(std::fs::read_to_string(&second).unwrap(), "second");
    }
}
