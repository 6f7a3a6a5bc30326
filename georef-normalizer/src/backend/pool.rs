//! Pool borné de connexions PostGIS, utilisé pour l'interpolation des alturas

use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use deadpool_postgres::{Config, Pool, PoolConfig, Runtime, Timeouts};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio_postgres::NoTls;
use tokio_postgres_rustls::MakeRustlsConnect;

/// Attente maximale d'une connexion libre avant d'abandonner la requête
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SslMode {
    #[default]
    Disable,
    Prefer,
    Require,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown SSL mode {0:?} (expected disable, prefer or require)")]
pub struct UnknownSslMode(String);

impl FromStr for SslMode {
    type Err = UnknownSslMode;

    /// Valeurs de `PGSSLMODE`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "disable" => Ok(Self::Disable),
            "prefer" | "allow" => Ok(Self::Prefer),
            "require" => Ok(Self::Require),
            other => Err(UnknownSslMode(other.to_owned())),
        }
    }
}

/// Paramètres de la base des calles
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub dbname: String,
    pub user: String,
    pub password: Option<String>,
    /// Connexions simultanées au plus; au-delà, les requêtes attendent
    pub pool_size: usize,
    pub ssl_mode: SslMode,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: "localhost".into(),
            port: 5432,
            dbname: "georef".into(),
            user: "postgres".into(),
            password: None,
            pool_size: 10,
            ssl_mode: SslMode::Disable,
        }
    }
}

/// Variable d'environnement interprétée, ou `None` si absente ou illisible
fn env_parsed<T: FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok()?.parse().ok()
}

impl DatabaseConfig {
    /// Variables libpq (`PGHOST`, `PGPORT`...) et `POOL_SIZE`, sinon les défauts
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: env_parsed("PGHOST").unwrap_or(defaults.host),
            port: env_parsed("PGPORT").unwrap_or(defaults.port),
            dbname: env_parsed("PGDATABASE").unwrap_or(defaults.dbname),
            user: env_parsed("PGUSER").unwrap_or(defaults.user),
            password: env_parsed("PGPASSWORD"),
            pool_size: env_parsed("POOL_SIZE").unwrap_or(defaults.pool_size),
            ssl_mode: env_parsed("PGSSLMODE").unwrap_or(defaults.ssl_mode),
        }
    }

    fn pool_config(&self) -> Config {
        let mut cfg = Config::new();
        cfg.host = Some(self.host.clone());
        cfg.port = Some(self.port);
        cfg.dbname = Some(self.dbname.clone());
        cfg.user = Some(self.user.clone());
        cfg.password = self.password.clone();
        cfg.pool = Some(PoolConfig {
            max_size: self.pool_size,
            timeouts: Timeouts {
                wait: Some(ACQUIRE_TIMEOUT),
                ..Timeouts::default()
            },
            ..PoolConfig::default()
        });
        cfg
    }
}

fn rustls_connector() -> MakeRustlsConnect {
    let roots = rustls::RootCertStore::from_iter(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    MakeRustlsConnect::new(
        rustls::ClientConfig::builder()
            .with_root_certificates(roots)
            .with_no_client_auth(),
    )
}

/// Construit le pool sans ouvrir de connexion
pub fn create_pool(config: &DatabaseConfig) -> Result<Pool> {
    let cfg = config.pool_config();
    let pool = match config.ssl_mode {
        SslMode::Disable => cfg.create_pool(Some(Runtime::Tokio1), NoTls),
        SslMode::Prefer | SslMode::Require => {
            cfg.create_pool(Some(Runtime::Tokio1), rustls_connector())
        }
    };
    pool.with_context(|| {
        format!(
            "Failed to create pool for {}@{}:{}/{}",
            config.user, config.host, config.port, config.dbname
        )
    })
}

/// Ouvre une connexion et vérifie que PostGIS répond
pub async fn check_postgis(pool: &Pool) -> Result<String> {
    let client = pool.get().await.context("No connection available")?;
    let row = client
        .query_one("SELECT postgis_version()", &[])
        .await
        .context("PostGIS is not available")?;
    Ok(row.get(0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ssl_mode_from_str() {
        assert_eq!("disable".parse::<SslMode>(), Ok(SslMode::Disable));
        assert_eq!(" Require ".parse::<SslMode>(), Ok(SslMode::Require));
        assert_eq!("allow".parse::<SslMode>(), Ok(SslMode::Prefer));

        let err = "verify-full".parse::<SslMode>().unwrap_err();
        assert_eq!(err, UnknownSslMode("verify-full".into()));
        assert!(err.to_string().contains("verify-full"));
    }

    #[test]
    fn test_database_config_partial_json() {
        let config: DatabaseConfig =
            serde_json::from_str(r#"{"host": "db", "pool_size": 4, "ssl_mode": "require"}"#).unwrap();
        assert_eq!(config.host, "db");
        assert_eq!(config.port, 5432);
        assert_eq!(config.dbname, "georef");
        assert_eq!(config.pool_size, 4);
        assert_eq!(config.ssl_mode, SslMode::Require);
    }

    #[test]
    fn test_pool_config_bounds_acquisition() {
        let config = DatabaseConfig {
            password: Some("secret".into()),
            pool_size: 3,
            ..DatabaseConfig::default()
        };
        let cfg = config.pool_config();
        assert_eq!(cfg.dbname.as_deref(), Some("georef"));
        assert_eq!(cfg.password.as_deref(), Some("secret"));

        let pool = cfg.pool.unwrap();
        assert_eq!(pool.max_size, 3);
        assert_eq!(pool.timeouts.wait, Some(ACQUIRE_TIMEOUT));
        assert_eq!(pool.timeouts.create, None);
    }

    #[tokio::test]
    async fn test_create_pool_is_lazy() {
        let config = DatabaseConfig {
            host: "unreachable.invalid".into(),
            pool_size: 2,
            ..DatabaseConfig::default()
        };
        let pool = create_pool(&config).unwrap();
        assert_eq!(pool.status().max_size, 2);
        assert_eq!(pool.status().size, 0);
    }
}
