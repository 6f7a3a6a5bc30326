//! Traitement des requêtes: parsing, construction des requêtes backend,
//! exécution par lot et mise en forme des résultats
//!
//! Chaque ressource fournit un [`QueryProcessor`]; les chemins simple (GET)
//! et bulk (POST) sont communs à toutes les ressources.

pub mod address;
pub mod entity;
pub mod place;

use async_trait::async_trait;
use georef::{
    FormatSpec, Index, ParamError, ParameterParsingError, ParameterSet, Params, QueryBuildError,
    QueryResult, Resource,
};
use thiserror::Error;
use tracing::{debug, error};

use crate::backend::{ensure_batch_len, DataConnectionError, LocationStore, SearchBackend};

pub use address::StreetGeocoder;
pub use entity::{EntityQueryProcessor, StreetSearchProcessor};
pub use place::PlaceResolver;

/// Requête entrante: un jeu de paramètres (GET) ou une liste ordonnée (POST)
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    Single(Params),
    Bulk(Vec<Params>),
}

/// Réponse remise au formateur ou au gestionnaire d'erreurs
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    Ok {
        resource: Resource,
        result: QueryResult,
        format: FormatSpec,
    },
    OkBulk {
        resource: Resource,
        results: Vec<QueryResult>,
        formats: Vec<FormatSpec>,
    },
    /// Erreur client, requête simple: liste plate
    ParamErrors(Vec<ParamError>),
    /// Erreur client, requête bulk: une liste par position
    BulkParamErrors(Vec<Vec<ParamError>>),
    /// Erreur serveur générique, sans détail des backends
    InternalError,
}

/// Erreurs du traitement d'une requête
#[derive(Debug, Error)]
pub enum NormalizerError {
    #[error(transparent)]
    Params(#[from] ParameterParsingError),

    #[error(transparent)]
    Data(#[from] DataConnectionError),

    #[error(transparent)]
    Query(#[from] QueryBuildError),
}

/// Traitement propre à une ressource
#[async_trait]
pub trait QueryProcessor: Send + Sync {
    type Query: Send + Sync;

    fn resource(&self) -> Resource;

    /// Construit la requête backend et les règles de format d'un jeu de paramètres parsé
    fn build(&self, params: &Params) -> Result<(Self::Query, FormatSpec), QueryBuildError>;

    /// Exécute toutes les requêtes en un seul lot; un résultat par requête, dans l'ordre
    async fn execute(
        &self,
        queries: Vec<Self::Query>,
    ) -> Result<Vec<QueryResult>, DataConnectionError>;
}

/// Chemin GET: un jeu de paramètres, une requête, un résultat
pub async fn process_single<P: QueryProcessor>(
    processor: &P,
    parameters: &ParameterSet,
    raw: &Params,
) -> Result<Response, NormalizerError> {
    let parsed = parameters.parse_single(raw)?;
    let (query, format) = processor.build(&parsed)?;

    let result = match <[QueryResult; 1]>::try_from(processor.execute(vec![query]).await?) {
        Ok([result]) => result,
        Err(results) => {
            return Err(DataConnectionError::BatchMismatch {
                target: processor.resource().name(),
                expected: 1,
                got: results.len(),
            }
            .into())
        }
    };

    Ok(Response::Ok {
        resource: processor.resource(),
        result,
        format,
    })
}

/// Chemin POST: N jeux de paramètres, un seul appel batch, N résultats dans l'ordre
pub async fn process_bulk<P: QueryProcessor>(
    processor: &P,
    parameters: &ParameterSet,
    items: &[Params],
) -> Result<Response, NormalizerError> {
    let parsed = parameters.parse_bulk(items)?;

    let mut queries = Vec::with_capacity(parsed.len());
    let mut formats = Vec::with_capacity(parsed.len());
    for params in &parsed {
        let (query, format) = processor.build(params)?;
        queries.push(query);
        formats.push(format.for_bulk());
    }

    let expected = queries.len();
    let results = ensure_batch_len(
        processor.resource().name(),
        expected,
        processor.execute(queries).await?,
    )?;

    Ok(Response::OkBulk {
        resource: processor.resource(),
        results,
        formats,
    })
}

/// Aiguille selon le type de requête et convertit les erreurs en réponses
pub async fn process<P: QueryProcessor>(
    processor: &P,
    parameters: &ParameterSet,
    request: &Request,
) -> Response {
    let resource = processor.resource();
    let outcome = match request {
        Request::Single(raw) => process_single(processor, parameters, raw).await,
        Request::Bulk(items) => process_bulk(processor, parameters, items).await,
    };

    match outcome {
        Ok(response) => response,
        Err(NormalizerError::Params(ParameterParsingError::Single(errors))) => {
            debug!(resource = %resource, errors = errors.len(), "Invalid parameters");
            Response::ParamErrors(errors)
        }
        Err(NormalizerError::Params(ParameterParsingError::Bulk(errors))) => {
            debug!(resource = %resource, items = errors.len(), "Invalid bulk parameters");
            Response::BulkParamErrors(errors)
        }
        Err(e) => {
            error!(resource = %resource, error = %e, "Error handling query for resource");
            Response::InternalError
        }
    }
}

/// Service de normalisation: détient les connexions aux backends pour toute
/// la durée du processus et les prête à chaque requête.
pub struct Normalizer<S, L> {
    search: S,
    store: L,
}

impl<S: SearchBackend, L: LocationStore> Normalizer<S, L> {
    pub fn new(search: S, store: L) -> Self {
        Self { search, store }
    }

    pub fn search(&self) -> &S {
        &self.search
    }

    pub fn store(&self) -> &L {
        &self.store
    }

    /// Traite une requête sur une ressource
    pub async fn process(&self, resource: Resource, request: &Request) -> Response {
        let parameters = ParameterSet::for_resource(resource);
        let search = &self.search;

        match resource {
            Resource::States => {
                let processor = EntityQueryProcessor::new(search, resource, Index::States);
                process(&processor, &parameters, request).await
            }
            Resource::Departments => {
                let processor = EntityQueryProcessor::new(search, resource, Index::Departments);
                process(&processor, &parameters, request).await
            }
            Resource::Municipalities => {
                let processor = EntityQueryProcessor::new(search, resource, Index::Municipalities);
                process(&processor, &parameters, request).await
            }
            Resource::Localities => {
                let processor = EntityQueryProcessor::new(search, resource, Index::Localities);
                process(&processor, &parameters, request).await
            }
            Resource::Streets => {
                process(&StreetSearchProcessor::new(search), &parameters, request).await
            }
            Resource::Addresses => {
                let processor = StreetGeocoder::new(search, &self.store);
                process(&processor, &parameters, request).await
            }
            Resource::Place => process(&PlaceResolver::new(search), &parameters, request).await,
        }
    }
}
