//! Normalisation d'adresses: recherche de calles puis interpolation de la hauteur
//!
//! Une seule connexion à la base relationnelle est empruntée par requête
//! (simple ou bulk), au premier hit qui en a besoin, et rendue au pool à la fin
//! du traitement de tous les hits, y compris quand une interpolation échoue.

use async_trait::async_trait;
use georef::names as n;
use georef::{
    append_door_number, build_address_query, AddressQuery, Entity, FormatSpec, Index, Params,
    QueryBuildError, QueryResult, Resource, StreetMatch, StreetQuery,
};
use serde_json::{json, Value};
use tracing::{debug, trace};

use super::QueryProcessor;
use crate::backend::{
    ensure_batch_len, DataConnectionError, Location, LocationConnection, LocationStore,
    SearchBackend,
};

/// Connexion empruntée à la demande, rendue au pool au drop
pub struct ScopedConnection<'a, L: LocationStore> {
    store: &'a L,
    connection: Option<L::Connection>,
}

impl<'a, L: LocationStore> ScopedConnection<'a, L> {
    pub fn new(store: &'a L) -> Self {
        Self {
            store,
            connection: None,
        }
    }

    pub fn is_acquired(&self) -> bool {
        self.connection.is_some()
    }

    /// Connexion courante, empruntée au pool au premier appel
    pub async fn get(&mut self) -> Result<&mut L::Connection, DataConnectionError> {
        if self.connection.is_none() {
            debug!("Acquiring relational store connection");
            self.connection = Some(self.store.acquire().await?);
        }

        self.connection
            .as_mut()
            .ok_or_else(|| DataConnectionError::Store("connection unavailable".into()))
    }
}

/// Géocodeur d'adresses
pub struct StreetGeocoder<'a, S, L> {
    search: &'a S,
    store: &'a L,
}

impl<'a, S: SearchBackend, L: LocationStore> StreetGeocoder<'a, S, L> {
    pub fn new(search: &'a S, store: &'a L) -> Self {
        Self { search, store }
    }

    /// Enrichit un hit de l'index des calles: nomenclature avec hauteur,
    /// hauteur demandée, ubicación interpolée et source.
    async fn geocode_hit(
        &self,
        hit: Entity,
        query: &AddressQuery,
        connection: &mut ScopedConnection<'_, L>,
    ) -> Result<Entity, DataConnectionError> {
        let StreetMatch {
            mut attributes,
            door_numbers,
            geometry,
        } = StreetMatch::from_hit(hit);
        let number = query.number;

        if query.requests(n::FULL_NAME) {
            if let Some(Value::String(full_name)) = attributes.get_mut(n::FULL_NAME) {
                *full_name = append_door_number(full_name, number);
            }
        }

        if query.requests(n::DOOR_NUM) {
            attributes.insert(n::DOOR_NUM.into(), Value::from(number));
        }

        if query.requests_location() {
            let location = match (door_numbers.extents(number), geometry) {
                (Some((start, end)), Some(geometry)) => {
                    trace!(number, start, end, "Door number within street extents");
                    let conn = connection.get().await?;
                    Some(conn.street_number_location(&geometry, number, start, end).await?)
                }
                _ => None,
            };
            attributes.insert(n::LOCATION.into(), location_value(location));
        }

        attributes.insert(n::SOURCE.into(), Value::from(Index::Streets.source().as_str()));
        Ok(attributes)
    }
}

/// `{lat, lon}`, ou deux `null` quand la hauteur n'a pas pu être interpolée
fn location_value(location: Option<Location>) -> Value {
    match location {
        Some(Location { lat, lon }) => json!({ "lat": lat, "lon": lon }),
        None => json!({ "lat": null, "lon": null }),
    }
}

#[async_trait]
impl<'a, S: SearchBackend, L: LocationStore> QueryProcessor for StreetGeocoder<'a, S, L> {
    type Query = AddressQuery;

    fn resource(&self) -> Resource {
        Resource::Addresses
    }

    fn build(&self, params: &Params) -> Result<(AddressQuery, FormatSpec), QueryBuildError> {
        build_address_query(params)
    }

    async fn execute(
        &self,
        queries: Vec<AddressQuery>,
    ) -> Result<Vec<QueryResult>, DataConnectionError> {
        let street_queries: Vec<StreetQuery> =
            queries.iter().map(AddressQuery::street_query).collect();
        let results = self.search.search_streets(&street_queries).await?;
        let results = ensure_batch_len(Index::Streets.name(), queries.len(), results)?;

        // Rendue au pool au drop, y compris sur `?`
        let mut connection = ScopedConnection::new(self.store);

        let mut query_results = Vec::with_capacity(results.len());
        for (query, result) in queries.iter().zip(results) {
            let mut hits = Vec::with_capacity(result.hits.len());
            for hit in result.hits {
                hits.push(self.geocode_hit(hit, query, &mut connection).await?);
            }
            query_results.push(QueryResult::from_entity_list(hits, result.total, result.offset));
        }

        Ok(query_results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_value() {
        assert_eq!(
            location_value(Some(Location {
                lat: -34.6,
                lon: -58.4
            })),
            json!({"lat": -34.6, "lon": -58.4})
        );
        assert_eq!(location_value(None), json!({"lat": null, "lon": null}));
    }
}
