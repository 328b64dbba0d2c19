use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use std::path::Path;

use super::{types::Config, ConfigError};

/// Load configuration from file with environment variable overrides.
///
/// Overrides use the `STEWARD_` prefix and `__` between key segments, so
/// `STEWARD_RECONCILER__PASS_INTERVAL_SECS=30` sets `reconciler.pass_interval_secs`
/// and `STEWARD_LABELS__MANUAL_REVIEW=/data/review` adds the `manual_review` rule.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.display().to_string()));
    }

    let config: Config = Figment::new()
        .merge(Toml::file(path))
        .merge(Env::prefixed("STEWARD_").split("__"))
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))?;

    Ok(config)
}

/// Load configuration from TOML string (useful for testing)
pub fn load_config_from_str(toml_str: &str) -> Result<Config, ConfigError> {
    toml::from_str(toml_str).map_err(|e| ConfigError::ParseError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_config_from_str_valid() {
        let toml = r#"
[server]
port = 9000

[labels]
anime = "/data/anime"
"#;
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.labels.get("anime").unwrap(), "/data/anime");
    }

    #[test]
    fn test_load_config_from_str_empty_uses_defaults() {
        let config = load_config_from_str("").unwrap();
        assert_eq!(config.server.port, 8080);
        assert!(config.transmission.is_none());
        assert!(config.labels.is_empty());
    }

    #[test]
    fn test_load_config_from_str_bad_type() {
        let toml = r#"
[server]
port = "not a port"
"#;
        let result = load_config_from_str(toml);
        assert!(matches!(result.unwrap_err(), ConfigError::ParseError(_)));
    }

    #[test]
    fn test_load_config_file_not_found() {
        let result = load_config(Path::new("/nonexistent/config.toml"));
        assert!(matches!(result.unwrap_err(), ConfigError::FileNotFound(_)));
    }

    #[test]
    fn test_env_overrides_keys_with_underscores() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "config.toml",
                r#"
[labels]
anime = "/data/anime"
"#,
            )?;
            jail.set_env("STEWARD_RECONCILER__PASS_INTERVAL_SECS", "5");
            jail.set_env("STEWARD_CATALOGUE__RETRY__ATTEMPTS", "2");
            jail.set_env("STEWARD_LABELS__MANUAL_REVIEW", "/data/review");

            let config = load_config(Path::new("config.toml")).unwrap();
            assert_eq!(config.reconciler.pass_interval_secs, 5);
            assert_eq!(config.catalogue.retry.attempts, 2);
            assert_eq!(config.labels.get("anime").unwrap(), "/data/anime");
            assert_eq!(config.labels.get("manual_review").unwrap(), "/data/review");
            Ok(())
        });
    }

    #[test]
    fn test_load_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            r#"
[server]
host = "127.0.0.1"
port = 3000

[transmission]
url = "http://127.0.0.1:9091/transmission/rpc"

[catalogue]
refresh_interval_secs = 600
"#
        )
        .unwrap();

        let config = load_config(temp_file.path()).unwrap();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.server.host.to_string(), "127.0.0.1");
        assert_eq!(config.catalogue.refresh_interval_secs, 600);
        assert_eq!(
            config.transmission.unwrap().url,
            "http://127.0.0.1:9091/transmission/rpc"
        );
    }
}
