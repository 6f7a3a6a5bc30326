//! # georef
//!
//! Normalisation de requêtes géographiques: entités administratives, calles,
//! adresses et ubicaciones (point dans un territoire).
//!
//! ## Features
//!
//! - Traduction des paramètres utilisateur vers des requêtes backend typées
//! - Parsing des requêtes simples (query string) et bulk (JSON)
//! - Bornes d'interpolation d'une hauteur sur un tronçon de rue
//! - Composition d'une ubicación à partir des couches departamento et municipio
//!
//! Ce crate ne fait aucune I/O: les appels au moteur de recherche et à la base
//! relationnelle vivent dans `georef-normalizer`.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use georef::{build_address_query, ParameterSet, Resource};
//!
//! let set = ParameterSet::for_resource(Resource::Addresses);
//! let params = set.parse_single(&raw)?;
//! let (query, fmt) = build_address_query(&params)?;
//! ```

pub mod address;
pub mod error;
pub mod names;
pub mod params;
pub mod place;
pub mod query;
pub mod result;
pub mod translate;

pub use address::{append_door_number, DoorNumberRange, DoorNumberSide, GeometryRef, StreetMatch};
pub use error::{ParamError, ParameterParsingError, QueryBuildError};
pub use names::{Index, Resource, Source};
pub use params::ParameterSet;
pub use place::{compose_place, Division, Place};
pub use query::{
    build_address_query, build_entity_query, build_place_query, build_street_query, entity_keys,
    AddressQuery, EntityQuery, FormatSpec, OutputFormat, PlaceQuery, StreetQuery,
};
pub use result::{Entity, QueryResult};
pub use translate::{translate_keys, KeyMap, Params};
