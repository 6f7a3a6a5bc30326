//! Résultat d'une requête, remis au formateur

use serde_json::{Map, Value};

/// Entité retournée (champ → valeur)
pub type Entity = Map<String, Value>;

/// Résultat d'une requête: une entité singulière ou une liste paginée
///
/// Une liste contient au plus `total` entités; `offset` indique combien de
/// résultats ont été sautés.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryResult {
    Single(Entity),
    List {
        entities: Vec<Entity>,
        total: u64,
        offset: u64,
    },
}

impl QueryResult {
    pub fn from_single_entity(entity: Entity) -> Self {
        Self::Single(entity)
    }

    pub fn from_entity_list(entities: Vec<Entity>, total: u64, offset: u64) -> Self {
        Self::List {
            entities,
            total,
            offset,
        }
    }

    pub fn entities(&self) -> &[Entity] {
        match self {
            Self::Single(entity) => std::slice::from_ref(entity),
            Self::List { entities, .. } => entities,
        }
    }

    pub fn first_entity(&self) -> Option<&Entity> {
        self.entities().first()
    }

    /// Nombre total de correspondances (1 pour un résultat singulier)
    pub fn total(&self) -> u64 {
        match self {
            Self::Single(_) => 1,
            Self::List { total, .. } => *total,
        }
    }

    pub fn offset(&self) -> u64 {
        match self {
            Self::Single(_) => 0,
            Self::List { offset, .. } => *offset,
        }
    }

    pub fn is_iterable(&self) -> bool {
        matches!(self, Self::List { .. })
    }

    /// Représentation JSON brute (sans règles de format)
    pub fn to_json(&self, key: &str) -> Value {
        match self {
            Self::Single(entity) => {
                let mut out = Map::new();
                out.insert(key.to_string(), Value::Object(entity.clone()));
                Value::Object(out)
            }
            Self::List {
                entities,
                total,
                offset,
            } => {
                let mut out = Map::new();
                out.insert(
                    key.to_string(),
                    Value::Array(entities.iter().cloned().map(Value::Object).collect()),
                );
                out.insert("total".to_string(), Value::from(*total));
                out.insert("offset".to_string(), Value::from(*offset));
                out.insert("count".to_string(), Value::from(entities.len()));
                Value::Object(out)
            }
        }
    }
}
