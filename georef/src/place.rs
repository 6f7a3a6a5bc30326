//! Composition d'une ubicación à partir des couches departamento et municipio

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::names::{self as n, Index, Source};
use crate::query::PlaceQuery;
use crate::result::Entity;

/// Champs demandés à la couche des departamentos (la provincia y est embarquée)
pub const DEPARTMENT_LAYER_FIELDS: [&str; 3] = [n::ID, n::NAME, n::STATE];

/// Champs demandés à la couche des municipios
pub const MUNICIPALITY_LAYER_FIELDS: [&str; 2] = [n::ID, n::NAME];

/// Entité administrative réduite à `{id, name}`; les deux sont `null` pour un stub
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Division {
    pub id: Option<String>,
    pub name: Option<String>,
}

impl Division {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.id.is_none() && self.name.is_none()
    }

    /// Lit `id` et `name` d'un hit; un identifiant numérique est converti en texte
    fn from_entity(entity: &Entity) -> Self {
        Self {
            id: text_field(entity, n::ID),
            name: text_field(entity, n::NAME),
        }
    }

    fn from_value(value: &Value) -> Self {
        match value {
            Value::Object(entity) => Self::from_entity(entity),
            Value::Null => Self::empty(),
            other => {
                warn!(value = %other, "Unreadable administrative division, using stub");
                Self::empty()
            }
        }
    }
}

fn text_field(entity: &Entity, key: &str) -> Option<String> {
    match entity.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(num) => Some(num.to_string()),
        Value::Null => None,
        other => {
            warn!(field = key, value = %other, "Unreadable division field");
            None
        }
    }
}

/// Ubicación dénormalisée d'un point
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Place {
    pub state: Division,
    pub department: Division,
    pub municipality: Division,
    pub lat: f64,
    pub lon: f64,
    pub source: Option<Source>,
}

impl Place {
    pub fn into_entity(self) -> Entity {
        let mut entity = Entity::new();
        entity.insert(n::STATE.into(), division_value(self.state));
        entity.insert(n::DEPT.into(), division_value(self.department));
        entity.insert(n::MUN.into(), division_value(self.municipality));
        entity.insert(n::LAT.into(), Value::from(self.lat));
        entity.insert(n::LON.into(), Value::from(self.lon));
        entity.insert(
            n::SOURCE.into(),
            self.source.map_or(Value::Null, |s| Value::from(s.as_str())),
        );
        entity
    }
}

fn division_value(division: Division) -> Value {
    let mut map = Entity::new();
    map.insert(n::ID.into(), division.id.map_or(Value::Null, Value::from));
    map.insert(n::NAME.into(), division.name.map_or(Value::Null, Value::from));
    Value::Object(map)
}

/// Compose l'ubicación d'un point à partir des correspondances trouvées.
///
/// Sans departamento, toutes les entités sont des stubs et `source` est nul.
/// Sinon la provincia est extraite du departamento (pas de requête sur
/// l'index des provincias) et un municipio absent devient un stub.
pub fn compose_place(query: &PlaceQuery, dept: Option<Entity>, muni: Option<Entity>) -> Place {
    let (state, department, municipality, source) = match dept {
        None => (Division::empty(), Division::empty(), Division::empty(), None),
        Some(mut dept) => {
            let state = match dept.remove(n::STATE) {
                Some(value) => Division::from_value(&value),
                None => {
                    warn!(lat = query.lat, lon = query.lon, "Department match without embedded state");
                    Division::empty()
                }
            };
            let municipality = muni
                .map(|m| Division::from_entity(&m))
                .unwrap_or_default();

            (
                state,
                Division::from_entity(&dept),
                municipality,
                Some(Index::Departments.source()),
            )
        }
    };

    Place {
        state,
        department,
        municipality,
        lat: query.lat,
        lon: query.lon,
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entity(value: Value) -> Entity {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    fn point() -> PlaceQuery {
        PlaceQuery {
            lat: -34.6,
            lon: -58.4,
            fields: vec![],
        }
    }

    #[test]
    fn test_place_full_match() {
        let dept = entity(json!({
            "id": "02007",
            "name": "Comuna 7",
            "state": {"id": "02", "name": "Ciudad Autónoma de Buenos Aires"}
        }));
        let muni = entity(json!({"id": "020007", "name": "Municipio 7"}));

        let place = compose_place(&point(), Some(dept), Some(muni));
        assert_eq!(place.state.id.as_deref(), Some("02"));
        assert_eq!(place.department.id.as_deref(), Some("02007"));
        assert_eq!(place.department.name.as_deref(), Some("Comuna 7"));
        assert_eq!(place.municipality.id.as_deref(), Some("020007"));
        assert_eq!(place.source, Some(Source::Ign));
    }

    #[test]
    fn test_place_without_municipality() {
        let dept = entity(json!({
            "id": "06028",
            "name": "Berazategui",
            "state": {"id": "06", "name": "Buenos Aires"}
        }));

        let place = compose_place(&point(), Some(dept), None);
        assert!(!place.department.is_empty());
        assert!(!place.state.is_empty());
        assert!(place.municipality.is_empty());
        assert_eq!(place.source, Some(Source::Ign));
    }

    #[test]
    fn test_place_without_department() {
        let muni = entity(json!({"id": "020007", "name": "Municipio 7"}));

        let place = compose_place(&point(), None, Some(muni));
        assert!(place.state.is_empty());
        assert!(place.department.is_empty());
        assert!(place.municipality.is_empty());
        assert_eq!(place.source, None);
        assert_eq!(place.lat, -34.6);
        assert_eq!(place.lon, -58.4);
    }

    #[test]
    fn test_place_numeric_ids() {
        let dept = entity(json!({
            "id": 2007,
            "name": "Comuna 7",
            "state": {"id": 2, "name": "CABA"}
        }));
        let muni = entity(json!({"id": 20007, "name": null}));

        let place = compose_place(&point(), Some(dept), Some(muni));
        assert_eq!(place.department.id.as_deref(), Some("2007"));
        assert_eq!(place.department.name.as_deref(), Some("Comuna 7"));
        assert_eq!(place.state.id.as_deref(), Some("2"));
        assert_eq!(place.state.name.as_deref(), Some("CABA"));
        assert_eq!(place.municipality.id.as_deref(), Some("20007"));
        assert_eq!(place.municipality.name, None);
    }

    #[test]
    fn test_place_unreadable_field_keeps_the_rest() {
        let dept = entity(json!({
            "id": "02007",
            "name": ["Comuna", "7"],
            "state": "02"
        }));

        let place = compose_place(&point(), Some(dept), None);
        assert_eq!(place.department.id.as_deref(), Some("02007"));
        assert_eq!(place.department.name, None);
        assert!(place.state.is_empty());
        assert_eq!(place.source, Some(Source::Ign));
    }

    #[test]
    fn test_place_into_entity_shape() {
        let place = compose_place(&point(), None, None).into_entity();
        assert_eq!(place["state"], json!({"id": null, "name": null}));
        assert_eq!(place["department"], json!({"id": null, "name": null}));
        assert_eq!(place["municipality"], json!({"id": null, "name": null}));
        assert_eq!(place["source"], Value::Null);
        assert_eq!(place["lat"], json!(-34.6));
    }
}
