//! Backends de données: moteur de recherche et base relationnelle
//!
//! Les deux sont exposés par des traits pour que les processeurs restent
//! indépendants des clients concrets (Elasticsearch, PostGIS).

pub mod elasticsearch;
pub mod pool;
pub mod postgres;

use async_trait::async_trait;
use georef::{Entity, EntityQuery, GeometryRef, Index, PlaceQuery, StreetQuery};
use serde::Serialize;
use thiserror::Error;

/// Erreur de connexion ou de protocole avec un backend de données
#[derive(Debug, Error)]
pub enum DataConnectionError {
    /// Moteur de recherche injoignable ou réponse illisible
    #[error("search backend error: {0}")]
    Search(String),

    /// Base relationnelle injoignable ou requête échouée
    #[error("relational store error: {0}")]
    Store(String),

    /// Référence de géométrie non décodable
    #[error("invalid geometry reference: {0}")]
    Geometry(String),

    /// Le backend n'a pas retourné un résultat par requête
    #[error("batch mismatch on {target}: {expected} queries, {got} results")]
    BatchMismatch {
        target: &'static str,
        expected: usize,
        got: usize,
    },
}

/// Résultat d'une requête du batch
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchResult {
    pub hits: Vec<Entity>,
    pub total: u64,
    pub offset: u64,
}

/// Vérifie le contrat des appels batch: un résultat par requête
pub fn ensure_batch_len<T>(
    target: &'static str,
    expected: usize,
    results: Vec<T>,
) -> Result<Vec<T>, DataConnectionError> {
    if results.len() != expected {
        return Err(DataConnectionError::BatchMismatch {
            target,
            expected,
            got: results.len(),
        });
    }
    Ok(results)
}

/// Moteur de recherche interrogé par lots (une requête multi-search par appel).
///
/// Pour N requêtes, chaque méthode retourne exactement N résultats, dans le
/// même ordre.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    async fn search_entities(
        &self,
        index: Index,
        queries: &[EntityQuery],
    ) -> Result<Vec<SearchResult>, DataConnectionError>;

    async fn search_streets(
        &self,
        queries: &[StreetQuery],
    ) -> Result<Vec<SearchResult>, DataConnectionError>;

    /// Requêtes ponctuelles: au plus un hit par point
    async fn search_places(
        &self,
        index: Index,
        queries: &[PlaceQuery],
    ) -> Result<Vec<SearchResult>, DataConnectionError>;

    /// Vérifie que le moteur répond
    async fn ping(&self) -> Result<(), DataConnectionError>;
}

/// Coordonnées calculées pour une hauteur
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Location {
    pub lat: f64,
    pub lon: f64,
}

impl From<geo::Point<f64>> for Location {
    fn from(point: geo::Point<f64>) -> Self {
        Self {
            lat: point.y(),
            lon: point.x(),
        }
    }
}

/// Pool de connexions vers la base relationnelle.
///
/// La connexion retournée par `acquire` est rendue au pool quand elle est
/// droppée, quel que soit le chemin de sortie.
#[async_trait]
pub trait LocationStore: Send + Sync {
    type Connection: LocationConnection;

    async fn acquire(&self) -> Result<Self::Connection, DataConnectionError>;
}

/// Connexion capable d'interpoler une hauteur sur la géométrie d'un tronçon
#[async_trait]
pub trait LocationConnection: Send {
    /// Point situé à la fraction `(number - start) / (end - start)` de la ligne
    async fn street_number_location(
        &mut self,
        geometry: &GeometryRef,
        number: u32,
        start: u32,
        end: u32,
    ) -> Result<Location, DataConnectionError>;
}
