//! Configuration des backends
//!
//! Ordre de priorité: variables d'environnement, puis fichier JSON optionnel,
//! puis options de la ligne de commande (appliquées par la CLI).

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::backend::elasticsearch::SearchConfig;
use crate::backend::pool::DatabaseConfig;

/// Configuration principale
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub search: SearchConfig,
    pub database: DatabaseConfig,
}

impl Settings {
    pub fn from_env() -> Self {
        Self {
            search: SearchConfig::from_env(),
            database: DatabaseConfig::from_env(),
        }
    }

    /// Charge l'environnement puis applique le fichier, s'il y en a un
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let settings = Self::from_env();
        match path {
            Some(path) => {
                let content = std::fs::read_to_string(path)
                    .context(format!("Failed to read config file: {}", path.display()))?;
                settings.overlay(&content)
            }
            None => Ok(settings),
        }
    }

    /// Surcharge avec un document JSON partiel: seules les clés présentes changent
    pub fn overlay(self, json: &str) -> Result<Self> {
        let file: Value = serde_json::from_str(json).context("Failed to parse config JSON")?;
        let mut merged = serde_json::to_value(self).context("Failed to serialize settings")?;
        merge(&mut merged, file);
        serde_json::from_value(merged).context("Invalid config values")
    }
}

fn merge(base: &mut Value, patch: Value) {
    match (base, patch) {
        (Value::Object(base), Value::Object(patch)) => {
            for (key, value) in patch {
                match base.get_mut(&key) {
                    Some(slot) => merge(slot, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::pool::SslMode;

    #[test]
    fn test_overlay_partial() {
        let settings = Settings::default()
            .overlay(r#"{"database": {"host": "db.internal", "ssl_mode": "require"}}"#)
            .unwrap();

        assert_eq!(settings.database.host, "db.internal");
        assert_eq!(settings.database.ssl_mode, SslMode::Require);
        assert_eq!(settings.database.port, 5432);
        assert_eq!(settings.search, SearchConfig::default());
    }

    #[test]
    fn test_overlay_replaces_host_list() {
        let settings = Settings::default()
            .overlay(r#"{"search": {"hosts": ["http://es1:9200", "http://es2:9200"]}}"#)
            .unwrap();
        assert_eq!(settings.search.hosts.len(), 2);
        assert_eq!(settings.search.timeout_secs, 30);
    }

    #[test]
    fn test_overlay_invalid() {
        assert!(Settings::default().overlay("not json").is_err());
        assert!(Settings::default()
            .overlay(r#"{"database": {"port": "abc"}}"#)
            .is_err());
    }
}
