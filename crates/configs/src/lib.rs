//! # configs
//!
//! Layered settings: built-in defaults, then `config/default.toml`, then
//! `config/{APP_ENV}.toml`, then `APP_*` environment variables (after a
//! `.env` file, if present, has been loaded into the environment).
//!
//! Loaded once at startup and treated as read-only afterwards.

use std::path::Path;

use config::{Config, Environment, File, Map};
use secrecy::SecretString;
use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    pub auth: AuthSettings,
    pub ranking: RankingSettings,
    pub pagination: PaginationSettings,
    pub log: LogSettings,
}

#[derive(Debug, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize)]
pub struct DatabaseSettings {
    pub url: SecretString,
    pub max_connections: u32,
}

#[derive(Debug, Deserialize)]
pub struct AuthSettings {
    pub jwt_secret: SecretString,
}

#[derive(Debug, Deserialize)]
pub struct RankingSettings {
    /// Group ids whose topics rank by gravity decay.
    pub gravity_groups: Vec<i64>,
}

#[derive(Debug, Deserialize)]
pub struct PaginationSettings {
    pub default_limit: i64,
    pub max_limit: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Pretty,
}

#[derive(Debug, Deserialize)]
pub struct LogSettings {
    pub format: LogFormat,
    /// `EnvFilter` directive; `RUST_LOG` wins when set.
    pub filter: String,
}

impl Settings {
    /// Reads `.env`, then layers `./config` files and the environment.
    pub fn load() -> Result<Self, SettingsError> {
        dotenvy::dotenv().ok();
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());
        Self::load_from(Path::new("config"), &env)
    }

    /// Layers `dir` files over the defaults, then the process environment.
    pub fn load_from(dir: &Path, env: &str) -> Result<Self, SettingsError> {
        Self::load_with(dir, env, None)
    }

    /// Like [`Settings::load_from`], but reads `APP_*` variables from `vars`
    /// instead of the process environment when given.
    pub fn load_with(
        dir: &Path,
        env: &str,
        vars: Option<Map<String, String>>,
    ) -> Result<Self, SettingsError> {
        let settings: Settings = Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080)?
            .set_default("database.url", "postgres://localhost:5432/topic_board")?
            .set_default("database.max_connections", 10)?
            .set_default("auth.jwt_secret", "")?
            .set_default("ranking.gravity_groups", Vec::<i64>::new())?
            .set_default("pagination.default_limit", 30)?
            .set_default("pagination.max_limit", 100)?
            .set_default("log.format", "pretty")?
            .set_default("log.filter", "info")?
            .add_source(File::with_name(&dir.join("default").to_string_lossy()).required(false))
            .add_source(File::with_name(&dir.join(env).to_string_lossy()).required(false))
            .add_source(
                Environment::with_prefix("APP")
                    .prefix_separator("_")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("ranking.gravity_groups")
                    .try_parsing(true)
                    .source(vars),
            )
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), SettingsError> {
        let p = &self.pagination;
        if p.max_limit < 1 || p.default_limit < 0 || p.default_limit > p.max_limit {
            return Err(SettingsError::Invalid(format!(
                "pagination needs 0 <= default_limit ({}) <= max_limit ({}) and max_limit >= 1",
                p.default_limit, p.max_limit
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use std::fs;
    use std::path::PathBuf;

    fn load(dir: &Path, env: &str, vars: &[(&str, &str)]) -> Result<Settings, SettingsError> {
        let vars = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Settings::load_with(dir, env, Some(vars))
    }

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("topic-board-configs-{name}-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn defaults_apply_without_files() {
        let dir = scratch_dir("empty");
        let settings = load(&dir, "test", &[]).unwrap();
        assert_eq!(settings.server.port, 8080);
        assert_eq!(settings.pagination.max_limit, 100);
        assert!(settings.ranking.gravity_groups.is_empty());
        assert_eq!(settings.log.format, LogFormat::Pretty);
    }

    #[test]
    fn environment_file_overrides_default_file() {
        let dir = scratch_dir("layered");
        fs::write(
            dir.join("default.toml"),
            "[ranking]\ngravity_groups = [4]\n[database]\nurl = \"postgres://a\"\n",
        )
        .unwrap();
        fs::write(dir.join("staging.toml"), "[ranking]\ngravity_groups = [4, 11]\n").unwrap();

        let settings = load(&dir, "staging", &[]).unwrap();
        assert_eq!(settings.ranking.gravity_groups, vec![4, 11]);
        assert_eq!(settings.database.url.expose_secret(), "postgres://a");
    }

    #[test]
    fn default_limit_above_max_is_rejected() {
        let dir = scratch_dir("bad-page");
        fs::write(dir.join("default.toml"), "[pagination]\ndefault_limit = 50\nmax_limit = 20\n")
            .unwrap();
        assert!(matches!(
            load(&dir, "test", &[]),
            Err(SettingsError::Invalid(_))
        ));
    }

    #[test]
    fn environment_overrides_files() {
        let dir = scratch_dir("env");
        fs::write(dir.join("default.toml"), "[server]\nport = 7000\n").unwrap();

        let settings = load(
            &dir,
            "test",
            &[("APP_SERVER__PORT", "9000"), ("APP_RANKING__GRAVITY_GROUPS", "4,11")],
        )
        .unwrap();
        assert_eq!(settings.server.port, 9000);
        assert_eq!(settings.ranking.gravity_groups, vec![4, 11]);
    }
}
