//! Hauteurs de rue: bornes d'interpolation et nomenclature
//!
//! Un tronçon de rue porte deux séquences de numérotation indépendantes
//! (gauche et droite). Les données sont parfois incomplètes, on teste donc
//! plusieurs combinaisons de bornes dans un ordre fixe.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::names as n;
use crate::result::Entity;

/// Hauteurs d'une extrémité du tronçon
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DoorNumberSide {
    #[serde(default)]
    pub left: Option<u32>,
    #[serde(default)]
    pub right: Option<u32>,
}

/// Plage de hauteurs d'un tronçon
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DoorNumberRange {
    #[serde(default)]
    pub start: DoorNumberSide,
    #[serde(default)]
    pub end: DoorNumberSide,
}

impl DoorNumberRange {
    /// Bornes `(début, fin)` contenant `number`.
    ///
    /// Combinaisons essayées dans l'ordre: (début droite, fin gauche),
    /// (début gauche, fin droite), (début droite, fin droite),
    /// (début gauche, fin gauche). La première vérifiant
    /// `début <= number <= fin` est retournée; `None` si aucune ne convient.
    /// Une borne absente invalide la combinaison.
    pub fn extents(&self, number: u32) -> Option<(u32, u32)> {
        let DoorNumberRange { start, end } = *self;
        let combinations = [
            (start.right, end.left),
            (start.left, end.right),
            (start.right, end.right),
            (start.left, end.left),
        ];

        combinations.into_iter().find_map(|pair| match pair {
            (Some(s), Some(e)) if s <= number && number <= e => Some((s, e)),
            _ => None,
        })
    }
}

impl DoorNumberSide {
    fn from_value(value: Option<&Value>) -> Self {
        Self {
            left: bound(value, n::LEFT),
            right: bound(value, n::RIGHT),
        }
    }
}

impl DoorNumberRange {
    /// Lit chaque borne séparément: une borne illisible est seulement absente
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Object(range) => Self {
                start: DoorNumberSide::from_value(range.get(n::START)),
                end: DoorNumberSide::from_value(range.get(n::END)),
            },
            Value::Null => Self::default(),
            other => {
                warn!(value = %other, "Unreadable door number range");
                Self::default()
            }
        }
    }
}

/// Hauteur entière positive; `100.0` est accepté, `100.5` non
fn bound(side: Option<&Value>, key: &str) -> Option<u32> {
    let value = side?.get(key)?;
    if value.is_null() {
        return None;
    }

    let parsed = value
        .as_u64()
        .or_else(|| {
            value
                .as_f64()
                .filter(|f| f.fract() == 0.0 && *f >= 0.0)
                .map(|f| f as u64)
        })
        .and_then(|v| u32::try_from(v).ok());

    if parsed.is_none() {
        warn!(side = key, value = %value, "Unreadable door number bound");
    }
    parsed
}

/// Référence vers la géométrie (ligne) d'un tronçon, en EWKB hexadécimal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GeometryRef(pub String);

impl GeometryRef {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Calle trouvée lors d'une recherche d'adresse, séparée de ses données internes
#[derive(Debug, Clone, PartialEq)]
pub struct StreetMatch {
    /// Champs destinés à la réponse
    pub attributes: Entity,
    pub door_numbers: DoorNumberRange,
    pub geometry: Option<GeometryRef>,
}

impl StreetMatch {
    /// Retire la plage de hauteurs et la géométrie du hit.
    ///
    /// Une plage absente ou illisible donne une plage vide (aucune interpolation).
    pub fn from_hit(mut hit: Entity) -> Self {
        let door_numbers = hit
            .remove(n::DOOR_NUM)
            .map(|v| DoorNumberRange::from_value(&v))
            .unwrap_or_default();

        let geometry = match hit.remove(n::GEOM) {
            Some(Value::String(s)) if !s.is_empty() => Some(GeometryRef(s)),
            _ => None,
        };

        Self {
            attributes: hit,
            door_numbers,
            geometry,
        }
    }
}

/// Ajoute la hauteur au premier segment (nom de rue) d'une nomenclature.
///
/// `"Callao"` → `"Callao 123"`, `"Callao,CABA"` → `"Callao 123,CABA"`.
pub fn append_door_number(full_name: &str, number: u32) -> String {
    match full_name.split_once(',') {
        Some((street, rest)) => format!("{} {},{}", street, number, rest),
        None => format!("{} {}", full_name, number),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn range(start_left: u32, start_right: u32, end_left: u32, end_right: u32) -> DoorNumberRange {
        DoorNumberRange {
            start: DoorNumberSide {
                left: Some(start_left),
                right: Some(start_right),
            },
            end: DoorNumberSide {
                left: Some(end_left),
                right: Some(end_right),
            },
        }
    }

    #[test]
    fn test_extents_first_combination() {
        let r = range(100, 101, 200, 201);
        assert_eq!(r.extents(150), Some((101, 200)));
    }

    #[test]
    fn test_extents_out_of_range() {
        let r = range(100, 101, 200, 201);
        assert_eq!(r.extents(9999), None);
        assert_eq!(r.extents(0), None);
    }

    #[test]
    fn test_extents_inclusive_bounds() {
        let r = range(100, 101, 200, 201);
        assert_eq!(r.extents(101), Some((101, 200)));
        assert_eq!(r.extents(200), Some((101, 200)));
    }

    #[test]
    fn test_extents_fallback_order() {
        let r = range(100, 101, 200, 201);
        // 100 échoue sur (101, 200), réussit sur (début gauche, fin droite)
        assert_eq!(r.extents(100), Some((100, 201)));
        // 201 échoue sur (101, 200), réussit sur (100, 201)
        assert_eq!(r.extents(201), Some((100, 201)));

        // Numérotation inversée d'un côté: seul (début droite, fin droite) convient
        let r = range(300, 1, 0, 99);
        assert_eq!(r.extents(50), Some((1, 99)));

        // Seul (début gauche, fin gauche) convient
        let r = range(10, 500, 90, 0);
        assert_eq!(r.extents(50), Some((10, 90)));
    }

    #[test]
    fn test_extents_missing_bounds() {
        let r = DoorNumberRange {
            start: DoorNumberSide {
                left: None,
                right: Some(1),
            },
            end: DoorNumberSide {
                left: None,
                right: Some(99),
            },
        };
        assert_eq!(r.extents(50), Some((1, 99)));
        assert_eq!(DoorNumberRange::default().extents(50), None);
    }

    #[test]
    fn test_append_door_number() {
        assert_eq!(append_door_number("Callao", 123), "Callao 123");
        assert_eq!(append_door_number("Callao,CABA", 123), "Callao 123,CABA");
        assert_eq!(
            append_door_number("AV CALLAO, Comuna 1, CABA", 1500),
            "AV CALLAO 1500, Comuna 1, CABA"
        );
    }

    #[test]
    fn test_street_match_from_hit() {
        let hit = json!({
            "id": "0207001000045",
            "name": "CALLAO",
            "door_number": {
                "start": {"left": 0, "right": 1},
                "end": {"left": 98, "right": 99}
            },
            "geometry": "0102000020E6100000"
        });
        let hit = match hit {
            Value::Object(map) => map,
            _ => unreachable!(),
        };

        let street = StreetMatch::from_hit(hit);
        assert!(!street.attributes.contains_key("door_number"));
        assert!(!street.attributes.contains_key("geometry"));
        assert_eq!(street.door_numbers.extents(50), Some((1, 98)));
        assert_eq!(street.geometry.as_ref().map(GeometryRef::as_str), Some("0102000020E6100000"));
    }

    #[test]
    fn test_street_match_float_bounds() {
        let mut hit = Entity::new();
        hit.insert(
            "door_number".into(),
            json!({
                "start": {"left": 1.0, "right": 2.0},
                "end": {"left": 99.0, "right": 100.0}
            }),
        );

        let street = StreetMatch::from_hit(hit);
        assert_eq!(street.door_numbers, range(1, 2, 99, 100));
        assert_eq!(street.door_numbers.extents(50), Some((2, 99)));
    }

    #[test]
    fn test_street_match_unreadable_bound_is_missing() {
        let mut hit = Entity::new();
        hit.insert(
            "door_number".into(),
            json!({
                "start": {"left": "s/n", "right": 2},
                "end": {"left": 99.5, "right": 100}
            }),
        );

        let street = StreetMatch::from_hit(hit);
        assert_eq!(street.door_numbers.start.left, None);
        assert_eq!(street.door_numbers.end.left, None);
        // (début droite, fin droite) reste utilisable
        assert_eq!(street.door_numbers.extents(50), Some((2, 100)));
    }

    #[test]
    fn test_street_match_without_internal_fields() {
        let mut hit = Entity::new();
        hit.insert("id".into(), json!("1"));
        hit.insert("door_number".into(), json!("garbage"));

        let street = StreetMatch::from_hit(hit);
        assert_eq!(street.door_numbers, DoorNumberRange::default());
        assert!(street.geometry.is_none());
    }
}
