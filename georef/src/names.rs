//! Vocabulaire partagé: noms de paramètres, de champs, de ressources et de sources

use std::fmt;

use serde::{Deserialize, Serialize};

// Paramètres et champs exposés aux utilisateurs
pub const ID: &str = "id";
pub const NAME: &str = "name";
pub const STATE: &str = "state";
pub const DEPT: &str = "department";
pub const MUN: &str = "municipality";
pub const EXACT: &str = "exact";
pub const ORDER: &str = "order";
pub const FIELDS: &str = "fields";
pub const OFFSET: &str = "offset";
pub const MAX: &str = "max";
pub const FLATTEN: &str = "flatten";
pub const FORMAT: &str = "format";
pub const CSV_FIELDS: &str = "csv_fields";
pub const ADDRESS: &str = "address";
pub const ROAD_TYPE: &str = "road_type";
pub const FULL_NAME: &str = "full_name";
pub const SOURCE: &str = "source";
pub const LAT: &str = "lat";
pub const LON: &str = "lon";
pub const CENTROID_LAT: &str = "centroid.lat";
pub const CENTROID_LON: &str = "centroid.lon";

// Champs propres aux calles
pub const DOOR_NUM: &str = "door_number";
pub const LOCATION: &str = "location";
pub const LOCATION_LAT: &str = "location.lat";
pub const LOCATION_LON: &str = "location.lon";
pub const GEOM: &str = "geometry";
pub const START: &str = "start";
pub const END: &str = "end";
pub const LEFT: &str = "left";
pub const RIGHT: &str = "right";
pub const START_R: &str = "door_number.start.right";
pub const START_L: &str = "door_number.start.left";
pub const END_R: &str = "door_number.end.right";
pub const END_L: &str = "door_number.end.left";

/// Source (provenance) des données retournées
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Source {
    #[serde(rename = "IGN")]
    Ign,
    #[serde(rename = "BAHRA")]
    Bahra,
    #[serde(rename = "INDEC")]
    Indec,
}

impl Source {
    pub fn as_str(self) -> &'static str {
        match self {
            Source::Ign => "IGN",
            Source::Bahra => "BAHRA",
            Source::Indec => "INDEC",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Index du moteur de recherche
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Index {
    States,
    Departments,
    Municipalities,
    Localities,
    Streets,
}

impl Index {
    pub fn name(self) -> &'static str {
        match self {
            Index::States => "states",
            Index::Departments => "departments",
            Index::Municipalities => "municipalities",
            Index::Localities => "localities",
            Index::Streets => "streets",
        }
    }

    /// Source des entités stockées dans l'index
    pub fn source(self) -> Source {
        match self {
            Index::States | Index::Departments | Index::Municipalities => Source::Ign,
            Index::Localities => Source::Bahra,
            Index::Streets => Source::Indec,
        }
    }
}

impl fmt::Display for Index {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Ressource exposée par l'API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    States,
    Departments,
    Municipalities,
    Localities,
    Streets,
    Addresses,
    Place,
}

impl Resource {
    pub const ALL: [Resource; 7] = [
        Resource::States,
        Resource::Departments,
        Resource::Municipalities,
        Resource::Localities,
        Resource::Streets,
        Resource::Addresses,
        Resource::Place,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Resource::States => "states",
            Resource::Departments => "departments",
            Resource::Municipalities => "municipalities",
            Resource::Localities => "localities",
            Resource::Streets => "streets",
            Resource::Addresses => "addresses",
            Resource::Place => "place",
        }
    }

    /// Clé attendue dans le corps d'une requête bulk
    pub fn bulk_key(self) -> &'static str {
        match self {
            Resource::Place => "places",
            other => other.name(),
        }
    }

    /// Index interrogé pour la ressource (les ubicaciones passent par deux index)
    pub fn index(self) -> Option<Index> {
        match self {
            Resource::States => Some(Index::States),
            Resource::Departments => Some(Index::Departments),
            Resource::Municipalities => Some(Index::Municipalities),
            Resource::Localities => Some(Index::Localities),
            Resource::Streets | Resource::Addresses => Some(Index::Streets),
            Resource::Place => None,
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for Resource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Resource::ALL
            .into_iter()
            .find(|r| r.name() == s || r.bulk_key() == s)
            .ok_or_else(|| {
                format!(
                    "Unknown resource: {}. Use: states, departments, municipalities, localities, streets, addresses, place",
                    s
                )
            })
    }
}
