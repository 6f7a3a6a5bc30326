//! Traduction des clés utilisateur vers le vocabulaire des requêtes backend

use serde_json::{Map, Value};

/// Dictionnaire de paramètres (clé → valeur JSON)
pub type Params = Map<String, Value>;

/// Table de traduction (clé utilisateur → clé backend)
pub type KeyMap = [(&'static str, &'static str)];

/// Renomme les clés de `d` selon `translations` et retourne un nouveau dictionnaire.
///
/// Les clés absentes de la table sont conservées telles quelles, les clés
/// listées dans `ignore` sont omises. Les valeurs ne sont jamais modifiées.
pub fn translate_keys(d: &Params, translations: &KeyMap, ignore: &[&str]) -> Params {
    d.iter()
        .filter(|(key, _)| !ignore.iter().any(|i| *i == key.as_str()))
        .map(|(key, value)| {
            let target = translations
                .iter()
                .find(|(from, _)| *from == key.as_str())
                .map_or(key.as_str(), |(_, to)| *to);
            (target.to_string(), value.clone())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(value: Value) -> Params {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_translate_renames_known_keys() {
        let d = params(json!({"id": "02", "name": "Buenos Aires"}));
        let out = translate_keys(&d, &[("id", "entity_id")], &[]);

        assert_eq!(out.get("entity_id"), Some(&json!("02")));
        assert_eq!(out.get("name"), Some(&json!("Buenos Aires")));
        assert!(!out.contains_key("id"));
    }

    #[test]
    fn test_translate_drops_ignored_keys() {
        let d = params(json!({"name": "Callao", "flatten": true, "format": "csv"}));
        let out = translate_keys(&d, &[("name", "road_name")], &["flatten", "format"]);

        assert_eq!(out.len(), 1);
        assert_eq!(out.get("road_name"), Some(&json!("Callao")));
    }

    #[test]
    fn test_translate_keeps_values_untouched() {
        let d = params(json!({"fields": ["id", "name"], "offset": 10}));
        let out = translate_keys(&d, &[], &[]);
        assert_eq!(out, d);
    }

    #[test]
    fn test_translate_empty() {
        let out = translate_keys(&Params::new(), &[("id", "entity_id")], &["flatten"]);
        assert!(out.is_empty());
    }
}
