//! Requêtes typées (vocabulaire backend) et règles de format
//!
//! Chaque ressource traduit ses paramètres utilisateur avec sa propre table
//! de clés, puis désérialise le résultat dans une requête typée. Une clé mal
//! traduite est rejetée par `deny_unknown_fields` au lieu d'être ignorée par
//! le backend.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::QueryBuildError;
use crate::names::{self as n, Resource};
use crate::translate::{translate_keys, KeyMap, Params};

/// Requête sur un index d'entités administratives (provincias, departamentos, ...)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EntityQuery {
    pub entity_id: Option<String>,
    pub name: Option<String>,
    pub state: Option<String>,
    pub department: Option<String>,
    pub municipality: Option<String>,
    #[serde(default)]
    pub exact: bool,
    pub order: Option<String>,
    #[serde(default)]
    pub fields: Vec<String>,
    pub offset: Option<u64>,
    pub max: Option<u64>,
}

/// Requête sur l'index des calles
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StreetQuery {
    pub street_id: Option<String>,
    pub road_name: Option<String>,
    pub state: Option<String>,
    pub department: Option<String>,
    pub road_type: Option<String>,
    #[serde(default)]
    pub exact: bool,
    pub order: Option<String>,
    #[serde(default)]
    pub fields: Vec<String>,
    pub offset: Option<u64>,
    pub max: Option<u64>,
}

/// Requête de normalisation d'une adresse (nom de rue + hauteur)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AddressQuery {
    pub road_name: String,
    pub number: u32,
    pub state: Option<String>,
    pub department: Option<String>,
    pub road_type: Option<String>,
    #[serde(default)]
    pub exact: bool,
    pub order: Option<String>,
    /// Champs demandés par l'utilisateur (sans les champs internes)
    #[serde(default)]
    pub fields: Vec<String>,
    pub offset: Option<u64>,
    pub max: Option<u64>,
}

/// Champs internes nécessaires à l'interpolation, jamais exposés tels quels
pub const ADDRESS_INTERNAL_FIELDS: [&str; 5] = [n::GEOM, n::START_R, n::START_L, n::END_R, n::END_L];

impl AddressQuery {
    pub fn requests(&self, field: &str) -> bool {
        self.fields.iter().any(|f| f == field)
    }

    pub fn requests_location(&self) -> bool {
        self.requests(n::LOCATION_LAT) || self.requests(n::LOCATION_LON)
    }

    /// Requête de recherche de calles correspondante, avec les champs internes
    pub fn street_query(&self) -> StreetQuery {
        let mut fields = self.fields.clone();
        fields.extend(ADDRESS_INTERNAL_FIELDS.iter().map(|f| f.to_string()));

        StreetQuery {
            street_id: None,
            road_name: Some(self.road_name.clone()),
            state: self.state.clone(),
            department: self.department.clone(),
            road_type: self.road_type.clone(),
            exact: self.exact,
            order: self.order.clone(),
            fields,
            offset: self.offset,
            max: self.max,
        }
    }
}

/// Requête ponctuelle (lat, lon) sur une couche administrative
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlaceQuery {
    pub lat: f64,
    pub lon: f64,
    #[serde(default)]
    pub fields: Vec<String>,
}

impl PlaceQuery {
    pub fn point(&self) -> geo::Point<f64> {
        geo::Point::new(self.lon, self.lat)
    }

    /// Même point, interrogé sur une couche avec ses propres champs
    pub fn for_layer(&self, fields: &[&str]) -> PlaceQuery {
        PlaceQuery {
            lat: self.lat,
            lon: self.lon,
            fields: fields.iter().map(|f| f.to_string()).collect(),
        }
    }
}

/// Encodage de sortie demandé
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Json,
    Csv,
    Geojson,
}

/// Règles de présentation transmises au formateur
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FormatSpec {
    pub flatten: bool,
    pub fields: Option<Vec<String>>,
    pub format: Option<OutputFormat>,
    /// Colonnes CSV, utilisées seulement quand `format` vaut csv
    pub csv_fields: Option<Vec<&'static str>>,
}

impl FormatSpec {
    /// Extrait les règles de format d'un jeu de paramètres parsé
    pub fn from_params(params: &Params) -> Self {
        let flatten = params
            .get(n::FLATTEN)
            .and_then(Value::as_bool)
            .unwrap_or(false);

        let fields = params.get(n::FIELDS).and_then(Value::as_array).map(|list| {
            list.iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        });

        let format = params
            .get(n::FORMAT)
            .and_then(|v| serde_json::from_value(v.clone()).ok());

        Self {
            flatten,
            fields,
            format,
            csv_fields: None,
        }
    }

    pub fn with_csv_fields(mut self, resource: Resource) -> Self {
        self.csv_fields = Some(csv_fields(resource).to_vec());
        self
    }

    /// Les réponses bulk sont toujours en JSON
    pub fn for_bulk(mut self) -> Self {
        self.format = None;
        self.csv_fields = None;
        self
    }
}

/// Colonnes CSV par ressource
pub fn csv_fields(resource: Resource) -> &'static [&'static str] {
    match resource {
        Resource::States => &["id", "name", "centroid.lat", "centroid.lon", "source"],
        Resource::Departments => &[
            "id", "name", "centroid.lat", "centroid.lon", "state.id", "state.name", "source",
        ],
        Resource::Municipalities => &[
            "id", "name", "centroid.lat", "centroid.lon", "state.id", "state.name",
            "department.id", "department.name", "source",
        ],
        Resource::Localities => &[
            "id", "name", "centroid.lat", "centroid.lon", "state.id", "state.name",
            "department.id", "department.name", "municipality.id", "municipality.name",
            "source",
        ],
        Resource::Streets => &[
            "id", "name", "full_name", "road_type", "door_number.start.right",
            "door_number.start.left", "door_number.end.right", "door_number.end.left",
            "state.id", "state.name", "department.id", "department.name", "source",
        ],
        Resource::Addresses => &[
            "id", "name", "full_name", "road_type", "door_number", "location.lat",
            "location.lon", "state.id", "state.name", "department.id", "department.name",
            "source",
        ],
        Resource::Place => &[
            "state.id", "state.name", "department.id", "department.name", "municipality.id",
            "municipality.name", "lat", "lon", "source",
        ],
    }
}

// Tables de traduction des clés (utilisateur → backend)

pub const STATE_KEYS: &KeyMap = &[
    (n::ID, "entity_id"),
    (n::NAME, "name"),
    (n::EXACT, "exact"),
    (n::ORDER, "order"),
    (n::FIELDS, "fields"),
    (n::OFFSET, "offset"),
];

pub const DEPARTMENT_KEYS: &KeyMap = &[
    (n::ID, "entity_id"),
    (n::NAME, "name"),
    (n::STATE, "state"),
    (n::EXACT, "exact"),
    (n::ORDER, "order"),
    (n::FIELDS, "fields"),
    (n::OFFSET, "offset"),
];

pub const MUNICIPALITY_KEYS: &KeyMap = &[
    (n::ID, "entity_id"),
    (n::NAME, "name"),
    (n::STATE, "state"),
    (n::DEPT, "department"),
    (n::EXACT, "exact"),
    (n::ORDER, "order"),
    (n::FIELDS, "fields"),
    (n::OFFSET, "offset"),
];

pub const LOCALITY_KEYS: &KeyMap = &[
    (n::ID, "entity_id"),
    (n::NAME, "name"),
    (n::STATE, "state"),
    (n::DEPT, "department"),
    (n::MUN, "municipality"),
    (n::EXACT, "exact"),
    (n::ORDER, "order"),
    (n::FIELDS, "fields"),
    (n::OFFSET, "offset"),
];

pub const STREET_KEYS: &KeyMap = &[
    (n::ID, "street_id"),
    (n::NAME, "road_name"),
    (n::STATE, "state"),
    (n::DEPT, "department"),
    (n::EXACT, "exact"),
    (n::FIELDS, "fields"),
    (n::ROAD_TYPE, "road_type"),
    (n::OFFSET, "offset"),
    (n::ORDER, "order"),
];

pub const ADDRESS_KEYS: &KeyMap = &[
    (n::DEPT, "department"),
    (n::STATE, "state"),
    (n::EXACT, "exact"),
    (n::ROAD_TYPE, "road_type"),
    (n::OFFSET, "offset"),
    (n::ORDER, "order"),
];

/// Table de clés d'une ressource d'entités simples
pub fn entity_keys(resource: Resource) -> &'static KeyMap {
    match resource {
        Resource::States => STATE_KEYS,
        Resource::Departments => DEPARTMENT_KEYS,
        Resource::Municipalities => MUNICIPALITY_KEYS,
        Resource::Localities => LOCALITY_KEYS,
        Resource::Streets => STREET_KEYS,
        Resource::Addresses => ADDRESS_KEYS,
        Resource::Place => &[],
    }
}

const FORMAT_KEYS: [&str; 2] = [n::FLATTEN, n::FORMAT];

fn from_translated<T: DeserializeOwned>(
    map: Params,
    query: &'static str,
) -> Result<T, QueryBuildError> {
    serde_json::from_value(Value::Object(map)).map_err(|source| QueryBuildError { query, source })
}

/// Construit la requête et les règles de format d'une ressource d'entités simples
pub fn build_entity_query(
    resource: Resource,
    params: &Params,
    keys: &KeyMap,
) -> Result<(EntityQuery, FormatSpec), QueryBuildError> {
    let query = from_translated(translate_keys(params, keys, &FORMAT_KEYS), "entity")?;
    let fmt = FormatSpec::from_params(params).with_csv_fields(resource);
    Ok((query, fmt))
}

pub fn build_street_query(params: &Params) -> Result<(StreetQuery, FormatSpec), QueryBuildError> {
    let query = from_translated(translate_keys(params, STREET_KEYS, &FORMAT_KEYS), "street")?;
    let fmt = FormatSpec::from_params(params).with_csv_fields(Resource::Streets);
    Ok((query, fmt))
}

/// Le paramètre `address` parsé est une paire `[nom, hauteur]`
pub fn build_address_query(
    params: &Params,
) -> Result<(AddressQuery, FormatSpec), QueryBuildError> {
    let mut map = translate_keys(params, ADDRESS_KEYS, &[n::FLATTEN, n::FORMAT, n::ADDRESS]);

    if let Some(Value::Array(parts)) = params.get(n::ADDRESS) {
        if let [road_name, number] = parts.as_slice() {
            map.insert("road_name".into(), road_name.clone());
            map.insert("number".into(), number.clone());
        }
    }

    let query = from_translated(map, "address")?;
    let fmt = FormatSpec::from_params(params).with_csv_fields(Resource::Addresses);
    Ok((query, fmt))
}

pub fn build_place_query(params: &Params) -> Result<(PlaceQuery, FormatSpec), QueryBuildError> {
    let query = from_translated(translate_keys(params, &[], &FORMAT_KEYS), "place")?;
    let fmt = FormatSpec::from_params(params).with_csv_fields(Resource::Place);
    Ok((query, fmt))
}
