use std::{env, path::PathBuf};

use anyhow::Context;
use dotenv::dotenv;
use serde::Deserialize;

use crate::{impl_display_for_enum, impl_from_str_for_enum};

pub const DEFAULT_DATABASE_URL: &str = "sqlite://arcade.db?mode=rwc";
pub const DEFAULT_LEDGER_PATH: &str = "arcade-storage.json";
pub const DEFAULT_WALLET_ADDRESS: &str = "BackpackWallet123";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerBackend {
    File,
    Redis,
    Memory,
}

impl_from_str_for_enum!(LedgerBackend, File => "file", Redis => "redis", Memory => "memory");
impl_display_for_enum!(LedgerBackend, File => "file", Redis => "redis", Memory => "memory");

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    // Remote store
    pub database_url: String,
    // Change relay and optional ledger backend
    pub redis_url: Option<String>,

    // Local key/value storage
    pub ledger_backend: LedgerBackend,
    pub ledger_path: PathBuf,

    pub wallet_address: String,
    pub game_rules_path: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let database_url =
            non_empty("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string());
        let redis_url = non_empty("REDIS_URL");

        let ledger_backend = match non_empty("LEDGER_BACKEND") {
            Some(value) => value
                .parse::<LedgerBackend>()
                .context("LEDGER_BACKEND must be one of file, redis, memory")?,
            None => LedgerBackend::File,
        };
        if ledger_backend == LedgerBackend::Redis && redis_url.is_none() {
            anyhow::bail!("LEDGER_BACKEND=redis requires REDIS_URL");
        }

        let ledger_path = non_empty("LEDGER_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_LEDGER_PATH));

        let wallet_address =
            non_empty("WALLET_ADDRESS").unwrap_or_else(|| DEFAULT_WALLET_ADDRESS.to_string());

        let game_rules_path = non_empty("GAME_RULES_PATH").map(PathBuf::from);

        Ok(Config {
            database_url,
            redis_url,
            ledger_backend,
            ledger_path,
            wallet_address,
            game_rules_path,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(pairs: &[(&str, &str)]) -> anyhow::Result<Config> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.database_url, DEFAULT_DATABASE_URL);
        assert_eq!(config.ledger_backend, LedgerBackend::File);
        assert_eq!(config.ledger_path, PathBuf::from(DEFAULT_LEDGER_PATH));
        assert_eq!(config.wallet_address, DEFAULT_WALLET_ADDRESS);
        assert!(config.redis_url.is_none());
        assert!(config.game_rules_path.is_none());
    }

    #[test]
    fn redis_backend_needs_url() {
        assert!(config_from(&[("LEDGER_BACKEND", "redis")]).is_err());

        let config = config_from(&[
            ("LEDGER_BACKEND", "Redis"),
            ("REDIS_URL", "redis://127.0.0.1/"),
        ])
        .unwrap();
        assert_eq!(config.ledger_backend, LedgerBackend::Redis);
    }

    #[test]
    fn malformed_backend_is_an_error() {
        assert!(config_from(&[("LEDGER_BACKEND", "s3")]).is_err());
    }
}
