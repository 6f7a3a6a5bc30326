//! Client Elasticsearch (API `_msearch`)
//!
//! Chaque appel batch envoie toutes les requêtes en un seul aller-retour
//! NDJSON; les réponses reviennent dans le même ordre.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, trace};

use georef::{Entity, EntityQuery, Index, PlaceQuery, StreetQuery};

use super::{ensure_batch_len, DataConnectionError, SearchBackend, SearchResult};

/// Taille de page quand `max` n'est pas précisé
pub const DEFAULT_PAGE_SIZE: u64 = 10;

/// Configuration du moteur de recherche
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub hosts: Vec<String>,
    pub timeout_secs: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            hosts: vec!["http://localhost:9200".into()],
            timeout_secs: 30,
        }
    }
}

impl SearchConfig {
    /// Charge la configuration depuis les variables d'environnement
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            hosts: std::env::var("ES_HOSTS")
                .ok()
                .map(|hosts| parse_hosts(&hosts))
                .filter(|hosts| !hosts.is_empty())
                .unwrap_or(defaults.hosts),
            timeout_secs: std::env::var("ES_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.timeout_secs),
        }
    }
}

/// "a:9200, b:9200" → ["http://a:9200", "http://b:9200"]
pub fn parse_hosts(hosts: &str) -> Vec<String> {
    hosts
        .split(',')
        .map(str::trim)
        .filter(|h| !h.is_empty())
        .map(|h| {
            let h = h.trim_end_matches('/');
            if h.starts_with("http://") || h.starts_with("https://") {
                h.to_string()
            } else {
                format!("http://{}", h)
            }
        })
        .collect()
}

/// Connexion au cluster, partagée par toutes les requêtes du processus
pub struct ElasticsearchBackend {
    client: reqwest::Client,
    hosts: Vec<String>,
    next_host: AtomicUsize,
}

impl ElasticsearchBackend {
    pub fn new(config: &SearchConfig) -> Result<Self, DataConnectionError> {
        if config.hosts.is_empty() {
            return Err(DataConnectionError::Search("no Elasticsearch host configured".into()));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| DataConnectionError::Search(e.to_string()))?;

        Ok(Self {
            client,
            hosts: config.hosts.clone(),
            next_host: AtomicUsize::new(0),
        })
    }

    /// Hôte suivant (round-robin, pas de nouvel essai en cas d'échec)
    fn host(&self) -> &str {
        let i = self.next_host.fetch_add(1, Ordering::Relaxed) % self.hosts.len();
        &self.hosts[i]
    }

    /// Exécute un lot de requêtes sur un index. `searches` contient le corps
    /// de chaque requête et l'offset demandé (non renvoyé par Elasticsearch).
    async fn msearch(
        &self,
        index: Index,
        searches: Vec<(Value, u64)>,
    ) -> Result<Vec<SearchResult>, DataConnectionError> {
        if searches.is_empty() {
            return Ok(Vec::new());
        }

        let header = json!({ "index": index.name() }).to_string();
        let mut body = String::new();
        for (search, _) in &searches {
            body.push_str(&header);
            body.push('\n');
            body.push_str(&search.to_string());
            body.push('\n');
        }

        let url = format!("{}/_msearch", self.host());
        debug!(index = %index, queries = searches.len(), url = %url, "Elasticsearch msearch");
        trace!(body = %body, "msearch body");

        let response = self
            .client
            .post(&url)
            .header(reqwest::header::CONTENT_TYPE, "application/x-ndjson")
            .body(body)
            .send()
            .await
            .map_err(|e| DataConnectionError::Search(e.to_string()))?
            .error_for_status()
            .map_err(|e| DataConnectionError::Search(e.to_string()))?;

        let parsed: MultiSearchResponse = response
            .json()
            .await
            .map_err(|e| DataConnectionError::Search(format!("invalid msearch response: {}", e)))?;

        let responses = ensure_batch_len(index.name(), searches.len(), parsed.responses)?;

        responses
            .into_iter()
            .zip(searches)
            .map(|(item, (_, offset))| item.into_result(offset))
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct MultiSearchResponse {
    responses: Vec<SearchResponse>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    hits: Option<HitsEnvelope>,
    error: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct HitsEnvelope {
    total: Total,
    hits: Vec<Hit>,
}

/// `total` vaut un entier (ES 6) ou `{ "value": n }` (ES 7+)
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Total {
    Count(u64),
    Object { value: u64 },
}

#[derive(Debug, Deserialize)]
struct Hit {
    #[serde(rename = "_source", default)]
    source: Entity,
}

impl SearchResponse {
    fn into_result(self, offset: u64) -> Result<SearchResult, DataConnectionError> {
        if let Some(error) = self.error {
            return Err(DataConnectionError::Search(error.to_string()));
        }
        let hits = self
            .hits
            .ok_or_else(|| DataConnectionError::Search("msearch response without hits".into()))?;

        let total = match hits.total {
            Total::Count(n) | Total::Object { value: n } => n,
        };

        Ok(SearchResult {
            hits: hits.hits.into_iter().map(|h| h.source).collect(),
            total,
            offset,
        })
    }
}

#[async_trait]
impl SearchBackend for ElasticsearchBackend {
    async fn search_entities(
        &self,
        index: Index,
        queries: &[EntityQuery],
    ) -> Result<Vec<SearchResult>, DataConnectionError> {
        let searches = queries
            .iter()
            .map(|q| (entity_search(q), q.offset.unwrap_or(0)))
            .collect();
        self.msearch(index, searches).await
    }

    async fn search_streets(
        &self,
        queries: &[StreetQuery],
    ) -> Result<Vec<SearchResult>, DataConnectionError> {
        let searches = queries
            .iter()
            .map(|q| (street_search(q), q.offset.unwrap_or(0)))
            .collect();
        self.msearch(Index::Streets, searches).await
    }

    async fn search_places(
        &self,
        index: Index,
        queries: &[PlaceQuery],
    ) -> Result<Vec<SearchResult>, DataConnectionError> {
        let searches = queries.iter().map(|q| (place_search(q), 0)).collect();
        self.msearch(index, searches).await
    }

    async fn ping(&self) -> Result<(), DataConnectionError> {
        self.client
            .get(self.host())
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map(|_| ())
            .map_err(|e| DataConnectionError::Search(e.to_string()))
    }
}

// Construction des requêtes (query DSL)

fn text_match(field: &str, value: &str, exact: bool) -> Value {
    if exact {
        json!({ "term": { format!("{}.exact", field): value.to_lowercase() } })
    } else {
        json!({
            "match": {
                field: { "query": value, "operator": "and", "fuzziness": "AUTO" }
            }
        })
    }
}

/// Filtre sur une entité parente: par identifiant si la valeur est numérique,
/// par nom sinon
fn parent_match(parent: &str, value: &str, exact: bool) -> Value {
    if !value.is_empty() && value.chars().all(|c| c.is_ascii_digit()) {
        json!({ "term": { format!("{}.id", parent): value } })
    } else {
        text_match(&format!("{}.name", parent), value, exact)
    }
}

fn sort_clause(order: Option<&str>) -> Value {
    match order {
        Some("id") => json!([{ "id": "asc" }]),
        Some("name") => json!([{ "name.exact": "asc" }]),
        _ => json!(["_score"]),
    }
}

fn search_body(
    must: Vec<Value>,
    fields: &[String],
    order: Option<&str>,
    offset: Option<u64>,
    max: Option<u64>,
) -> Value {
    json!({
        "query": { "bool": { "must": must } },
        "_source": { "includes": fields },
        "sort": sort_clause(order),
        "from": offset.unwrap_or(0),
        "size": max.unwrap_or(DEFAULT_PAGE_SIZE),
    })
}

fn entity_search(q: &EntityQuery) -> Value {
    let mut must = Vec::new();
    if let Some(id) = &q.entity_id {
        must.push(json!({ "term": { "id": id } }));
    }
    if let Some(name) = &q.name {
        must.push(text_match("name", name, q.exact));
    }
    if let Some(state) = &q.state {
        must.push(parent_match("state", state, q.exact));
    }
    if let Some(department) = &q.department {
        must.push(parent_match("department", department, q.exact));
    }
    if let Some(municipality) = &q.municipality {
        must.push(parent_match("municipality", municipality, q.exact));
    }

    search_body(must, &q.fields, q.order.as_deref(), q.offset, q.max)
}

fn street_search(q: &StreetQuery) -> Value {
    let mut must = Vec::new();
    if let Some(id) = &q.street_id {
        must.push(json!({ "term": { "id": id } }));
    }
    if let Some(name) = &q.road_name {
        must.push(text_match("name", name, q.exact));
    }
    if let Some(road_type) = &q.road_type {
        must.push(json!({ "match": { "road_type": road_type } }));
    }
    if let Some(state) = &q.state {
        must.push(parent_match("state", state, q.exact));
    }
    if let Some(department) = &q.department {
        must.push(parent_match("department", department, q.exact));
    }

    search_body(must, &q.fields, q.order.as_deref(), q.offset, q.max)
}

fn place_search(q: &PlaceQuery) -> Value {
    let point = q.point();
    json!({
        "query": {
            "bool": {
                "filter": {
                    "geo_shape": {
                        "geometry": {
                            "shape": { "type": "point", "coordinates": [point.x(), point.y()] },
                            "relation": "intersects"
                        }
                    }
                }
            }
        },
        "_source": { "includes": q.fields },
        "size": 1,
    })
}
