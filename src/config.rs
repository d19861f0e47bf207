//! 環境変数からのアプリケーション設定

use ::config::{Config, Environment, Map};
use serde::Deserialize;
use std::str::FromStr;
use thiserror::Error;

const DEFAULT_DATABASE_URL: &str = "postgres://localhost/library";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// 設定読み込みのエラー
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Load(#[from] ::config::ConfigError),
}

/// 書籍・貸出データの保存先
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum StorageBackend {
    /// PostgreSQL（既定）
    Postgres,
    /// プロセス内メモリ。再起動でデータは消える
    Memory,
}

impl FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" => Ok(StorageBackend::Postgres),
            "memory" => Ok(StorageBackend::Memory),
            other => Err(format!("unknown storage backend: {}", other)),
        }
    }
}

impl TryFrom<String> for StorageBackend {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub database_max_connections: u32,
    pub port: u16,
    pub storage: StorageBackend,
}

impl AppConfig {
    /// プロセスの環境変数から設定を読み込む
    ///
    /// - `DATABASE_URL`
    /// - `DATABASE_MAX_CONNECTIONS`
    /// - `PORT`
    /// - `STORAGE` (`postgres` | `memory`)
    ///
    /// 未設定の項目は既定値になる。
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::build(Environment::default())
    }

    /// 環境変数の代わりに与えられた変数表から設定を読み込む
    pub fn from_vars<I, K, V>(vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let source: Map<String, String> = vars
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self::build(Environment::default().source(Some(source)))
    }

    fn build(environment: Environment) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .set_default("database_url", DEFAULT_DATABASE_URL)?
            .set_default("database_max_connections", i64::from(DEFAULT_MAX_CONNECTIONS))?
            .set_default("port", i64::from(DEFAULT_PORT))?
            .set_default("storage", "postgres")?
            .add_source(environment.try_parsing(true))
            .build()?;

        Ok(config.try_deserialize()?)
    }

    pub fn bind_address(&self) -> String {
        format!("0.0.0.0:{}", self.port)
    }
}
