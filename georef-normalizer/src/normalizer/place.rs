//! Ubicación d'un point: couches departamento et municipio, provincia embarquée

use async_trait::async_trait;
use georef::place::{DEPARTMENT_LAYER_FIELDS, MUNICIPALITY_LAYER_FIELDS};
use georef::{
    build_place_query, compose_place, Entity, FormatSpec, Index, Params, PlaceQuery,
    QueryBuildError, QueryResult, Resource,
};

use super::QueryProcessor;
use crate::backend::{ensure_batch_len, DataConnectionError, SearchBackend, SearchResult};

pub struct PlaceResolver<'a, S> {
    search: &'a S,
}

impl<'a, S: SearchBackend> PlaceResolver<'a, S> {
    pub fn new(search: &'a S) -> Self {
        Self { search }
    }

    /// Un lot de requêtes ponctuelles sur une couche, un résultat par point
    async fn search_layer(
        &self,
        index: Index,
        queries: &[PlaceQuery],
        fields: &[&str],
    ) -> Result<Vec<SearchResult>, DataConnectionError> {
        let layer_queries: Vec<PlaceQuery> = queries.iter().map(|q| q.for_layer(fields)).collect();
        let results = self.search.search_places(index, &layer_queries).await?;
        ensure_batch_len(index.name(), queries.len(), results)
    }
}

fn first_hit(result: SearchResult) -> Option<Entity> {
    result.hits.into_iter().next()
}

#[async_trait]
impl<'a, S: SearchBackend> QueryProcessor for PlaceResolver<'a, S> {
    type Query = PlaceQuery;

    fn resource(&self) -> Resource {
        Resource::Place
    }

    fn build(&self, params: &Params) -> Result<(PlaceQuery, FormatSpec), QueryBuildError> {
        build_place_query(params)
    }

    async fn execute(
        &self,
        queries: Vec<PlaceQuery>,
    ) -> Result<Vec<QueryResult>, DataConnectionError> {
        let departments = self
            .search_layer(Index::Departments, &queries, &DEPARTMENT_LAYER_FIELDS)
            .await?;
        let municipalities = self
            .search_layer(Index::Municipalities, &queries, &MUNICIPALITY_LAYER_FIELDS)
            .await?;

        Ok(queries
            .iter()
            .zip(departments.into_iter().zip(municipalities))
            .map(|(query, (dept, muni))| {
                let place = compose_place(query, first_hit(dept), first_hit(muni));
                QueryResult::from_single_entity(place.into_entity())
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_first_hit() {
        assert_eq!(first_hit(SearchResult::default()), None);

        let mut a = Entity::new();
        a.insert("id".into(), json!("02007"));
        let mut b = Entity::new();
        b.insert("id".into(), json!("02014"));
        let result = SearchResult {
            hits: vec![a.clone(), b],
            total: 2,
            offset: 0,
        };
        assert_eq!(first_hit(result), Some(a));
    }
}
