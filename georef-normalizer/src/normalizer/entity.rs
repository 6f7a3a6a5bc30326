//! Entités simples: provincias, departamentos, municipios, localidades et calles

use async_trait::async_trait;
use georef::names as n;
use georef::query::entity_keys;
use georef::{
    build_entity_query, build_street_query, EntityQuery, FormatSpec, Index, KeyMap, Params,
    QueryBuildError, QueryResult, Resource, Source, StreetQuery,
};
use serde_json::Value;

use super::QueryProcessor;
use crate::backend::{ensure_batch_len, DataConnectionError, SearchBackend, SearchResult};

/// Ajoute la source à chaque hit et enveloppe le résultat en liste
pub(crate) fn into_list_result(result: SearchResult, source: Source) -> QueryResult {
    let SearchResult {
        mut hits,
        total,
        offset,
    } = result;

    for hit in &mut hits {
        hit.insert(n::SOURCE.into(), Value::from(source.as_str()));
    }

    QueryResult::from_entity_list(hits, total, offset)
}

/// Requêtes sur un index d'entités administratives
pub struct EntityQueryProcessor<'a, S> {
    search: &'a S,
    resource: Resource,
    index: Index,
    keys: &'static KeyMap,
}

impl<'a, S: SearchBackend> EntityQueryProcessor<'a, S> {
    pub fn new(search: &'a S, resource: Resource, index: Index) -> Self {
        Self {
            search,
            resource,
            index,
            keys: entity_keys(resource),
        }
    }
}

#[async_trait]
impl<'a, S: SearchBackend> QueryProcessor for EntityQueryProcessor<'a, S> {
    type Query = EntityQuery;

    fn resource(&self) -> Resource {
        self.resource
    }

    fn build(&self, params: &Params) -> Result<(EntityQuery, FormatSpec), QueryBuildError> {
        build_entity_query(self.resource, params, self.keys)
    }

    async fn execute(
        &self,
        queries: Vec<EntityQuery>,
    ) -> Result<Vec<QueryResult>, DataConnectionError> {
        let results = self.search.search_entities(self.index, &queries).await?;
        let results = ensure_batch_len(self.index.name(), queries.len(), results)?;

        let source = self.index.source();
        Ok(results
            .into_iter()
            .map(|result| into_list_result(result, source))
            .collect())
    }
}

/// Recherche de calles, sans géocodage
pub struct StreetSearchProcessor<'a, S> {
    search: &'a S,
}

impl<'a, S: SearchBackend> StreetSearchProcessor<'a, S> {
    pub fn new(search: &'a S) -> Self {
        Self { search }
    }
}

#[async_trait]
impl<'a, S: SearchBackend> QueryProcessor for StreetSearchProcessor<'a, S> {
    type Query = StreetQuery;

    fn resource(&self) -> Resource {
        Resource::Streets
    }

    fn build(&self, params: &Params) -> Result<(StreetQuery, FormatSpec), QueryBuildError> {
        build_street_query(params)
    }

    async fn execute(
        &self,
        queries: Vec<StreetQuery>,
    ) -> Result<Vec<QueryResult>, DataConnectionError> {
        let results = self.search.search_streets(&queries).await?;
        let results = ensure_batch_len(Index::Streets.name(), queries.len(), results)?;

        Ok(results
            .into_iter()
            .map(|result| into_list_result(result, Index::Streets.source()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use georef::Entity;
    use serde_json::json;

    #[test]
    fn test_into_list_result_tags_source() {
        let mut hit = Entity::new();
        hit.insert("id".into(), json!("14"));
        let result = SearchResult {
            hits: vec![hit.clone(), hit],
            total: 7,
            offset: 2,
        };

        let result = into_list_result(result, Source::Bahra);
        assert!(result.is_iterable());
        assert_eq!(result.total(), 7);
        assert_eq!(result.offset(), 2);
        assert!(result.entities().iter().all(|e| e["source"] == json!("BAHRA")));
    }
}
