//! Configuration loading.

use std::fs;
use std::path::Path;

use super::Config;

/// Load configuration with the following precedence (highest first):
/// 1) File pointed at by the `WEREWOLF_CONFIG_PATH` env var
/// 2) `config.json` in the current working directory
/// 3) Defaults compiled into the binary
///
/// Any errors while reading or parsing are printed to stderr and defaults
/// are used; hard validation is the caller's job via
/// [`super::validation::validate`].
#[must_use]
pub fn load() -> Config {
    if let Ok(path) = std::env::var("WEREWOLF_CONFIG_PATH") {
        if let Some(config) = load_from_file(Path::new(&path)) {
            return config;
        }
        eprintln!("WEREWOLF_CONFIG_PATH set but unreadable, falling back");
    }

    let local = Path::new("config.json");
    if local.exists() {
        if let Some(config) = load_from_file(local) {
            return config;
        }
    }

    Config::default()
}

fn load_from_file(path: &Path) -> Option<Config> {
    match fs::read_to_string(path) {
        Ok(contents) => match serde_json::from_str::<Config>(&contents) {
            Ok(config) => Some(config),
            Err(e) => {
                eprintln!("Failed to parse {}: {e}", path.display());
                None
            }
        },
        Err(e) => {
            eprintln!("Failed to read {}: {e}", path.display());
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_parse_from_empty_object() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(config.port, Config::default().port);
        assert_eq!(config.game.hunter_grace_secs, 30);
    }

    #[test]
    fn partial_overrides_merge_with_defaults() {
        let config: Config = serde_json::from_str(
            r#"{"port": 9000, "game": {"little_girl_catch_chance": 0.25}}"#,
        )
        .unwrap();
        assert_eq!(config.port, 9000);
        assert!((config.game.little_girl_catch_chance - 0.25).abs() < f64::EPSILON);
        // Untouched sections keep their defaults.
        assert_eq!(config.server.disconnect_grace_secs, 60);
    }
}
