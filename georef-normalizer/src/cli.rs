//! Définition et implémentation des commandes CLI
//!
//! - `query`: requête simple, paramètres `-p clé=valeur`
//! - `bulk`: requête bulk depuis un fichier JSON
//! - `check`: vérifie que les deux backends répondent

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::{Args, Subcommand};
use georef::{Entity, FormatSpec, Params, QueryResult, Resource};
use serde_json::{json, Map, Value};
use tracing::{info, warn};

use georef_normalizer::backend::pool::check_postgis;
use georef_normalizer::{
    create_pool, ElasticsearchBackend, Normalizer, Request, Response, SearchBackend, Settings,
};

const EXIT_OK: u8 = 0;
const EXIT_INTERNAL: u8 = 1;
/// Paramètres invalides (faute du client)
const EXIT_PARAMS: u8 = 2;

#[derive(Subcommand)]
pub enum Commands {
    /// Single request against one resource
    Query {
        /// states, departments, municipalities, localities, streets, addresses, place
        resource: Resource,

        /// Request parameter (repeatable), e.g. -p name=cordoba -p max=5
        #[arg(short = 'p', long = "param", value_parser = parse_key_value)]
        params: Vec<(String, String)>,
    },

    /// Bulk request from a JSON file
    Bulk {
        /// states, departments, municipalities, localities, streets, addresses, place
        resource: Resource,

        /// JSON array of parameter objects, or {"<resource>": [...]}
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Check that Elasticsearch and PostgreSQL are reachable
    Check,
}

/// Surcharges des backends (priment sur l'environnement et le fichier)
#[derive(Args, Debug, Default)]
pub struct BackendArgs {
    /// Elasticsearch hosts, comma separated (défaut : env ES_HOSTS / localhost:9200)
    #[arg(long, global = true)]
    es_host: Option<String>,

    /// PostgreSQL host (défaut : env PGHOST / localhost)
    #[arg(long, global = true)]
    host: Option<String>,

    /// PostgreSQL port (défaut : env PGPORT / 5432)
    #[arg(long, global = true)]
    port: Option<u16>,

    /// PostgreSQL database name (défaut : env PGDATABASE / georef)
    #[arg(long, global = true)]
    database: Option<String>,

    /// PostgreSQL user (défaut : env PGUSER / postgres)
    #[arg(long, global = true)]
    user: Option<String>,

    /// PostgreSQL password (défaut : env PGPASSWORD)
    #[arg(long, global = true)]
    password: Option<String>,

    /// SSL mode: disable, prefer, require (défaut : env PGSSLMODE / disable)
    #[arg(long, global = true)]
    ssl: Option<String>,
}

/// Environnement, puis fichier de configuration, puis options CLI
pub fn load_settings(config: Option<&Path>, args: &BackendArgs) -> Result<Settings> {
    let mut settings = Settings::load(config)?;
    apply_overrides(&mut settings, args);
    Ok(settings)
}

fn apply_overrides(settings: &mut Settings, args: &BackendArgs) {
    if let Some(hosts) = &args.es_host {
        let hosts = georef_normalizer::backend::elasticsearch::parse_hosts(hosts);
        if !hosts.is_empty() {
            settings.search.hosts = hosts;
        }
    }

    let db = &mut settings.database;
    if let Some(host) = &args.host {
        db.host = host.clone();
    }
    if let Some(port) = args.port {
        db.port = port;
    }
    if let Some(database) = &args.database {
        db.dbname = database.clone();
    }
    if let Some(user) = &args.user {
        db.user = user.clone();
    }
    if let Some(password) = &args.password {
        db.password = Some(password.clone());
    }
    if let Some(ssl) = &args.ssl {
        match ssl.parse() {
            Ok(mode) => db.ssl_mode = mode,
            Err(e) => warn!(error = %e, "Ignoring --ssl override"),
        }
    }
}

fn parse_key_value(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .map(|(k, v)| (k.trim().to_string(), v.to_string()))
        .filter(|(k, _)| !k.is_empty())
        .ok_or_else(|| format!("Invalid parameter: {}. Use: key=value", s))
}

fn build_normalizer(
    settings: &Settings,
) -> Result<Normalizer<ElasticsearchBackend, deadpool_postgres::Pool>> {
    let search = ElasticsearchBackend::new(&settings.search)
        .context("Failed to create Elasticsearch client")?;
    let pool = create_pool(&settings.database)?;
    Ok(Normalizer::new(search, pool))
}

/// Exécute une requête simple
pub async fn cmd_query(
    settings: &Settings,
    resource: Resource,
    params: Vec<(String, String)>,
) -> Result<ExitCode> {
    let raw: Params = params
        .into_iter()
        .map(|(k, v)| (k, Value::String(v)))
        .collect();

    let normalizer = build_normalizer(settings)?;
    info!(resource = %resource, params = raw.len(), "Single request");
    let response = normalizer.process(resource, &Request::Single(raw)).await;

    emit(&response)
}

/// Exécute une requête bulk
pub async fn cmd_bulk(settings: &Settings, resource: Resource, input: &Path) -> Result<ExitCode> {
    let content = std::fs::read_to_string(input)
        .context(format!("Failed to read input file: {}", input.display()))?;
    let document: Value = serde_json::from_str(&content).context("Failed to parse input JSON")?;
    let items = bulk_items(resource, document)?;

    let normalizer = build_normalizer(settings)?;
    info!(resource = %resource, items = items.len(), "Bulk request");
    let response = normalizer.process(resource, &Request::Bulk(items)).await;

    emit(&response)
}

/// Vérifie les deux backends
pub async fn cmd_check(settings: &Settings) -> Result<ExitCode> {
    let normalizer = build_normalizer(settings)?;

    normalizer
        .search()
        .ping()
        .await
        .context("Elasticsearch is not reachable")?;
    println!("Elasticsearch: OK ({})", settings.search.hosts.join(", "));

    let postgis = check_postgis(normalizer.store()).await?;
    println!(
        "PostgreSQL: OK, PostGIS {} ({}@{}:{}/{}, SSL: {:?})",
        postgis,
        settings.database.user,
        settings.database.host,
        settings.database.port,
        settings.database.dbname,
        settings.database.ssl_mode
    );

    Ok(ExitCode::SUCCESS)
}

/// Tableau d'objets, ou objet `{"<ressource>": [...]}`
fn bulk_items(resource: Resource, document: Value) -> Result<Vec<Params>> {
    let list = match document {
        Value::Array(list) => list,
        Value::Object(mut map) => match map.remove(resource.bulk_key()) {
            Some(Value::Array(list)) => list,
            _ => bail!("Expected a \"{}\" array in input", resource.bulk_key()),
        },
        _ => bail!("Bulk input must be a JSON array or object"),
    };

    list.into_iter()
        .enumerate()
        .map(|(i, item)| match item {
            Value::Object(params) => Ok(params),
            _ => bail!("Bulk item {} is not a JSON object", i),
        })
        .collect()
}

fn emit(response: &Response) -> Result<ExitCode> {
    let (body, code) = render(response);
    let text = serde_json::to_string_pretty(&body).context("Failed to serialize response")?;
    println!("{}", text);
    Ok(ExitCode::from(code))
}

/// Enveloppe JSON et code de sortie d'une réponse
fn render(response: &Response) -> (Value, u8) {
    match response {
        Response::Ok {
            resource,
            result,
            format,
        } => (
            apply_format(result, format).to_json(resource.name()),
            EXIT_OK,
        ),
        Response::OkBulk {
            resource,
            results,
            formats,
        } => {
            let results: Vec<Value> = results
                .iter()
                .zip(formats)
                .map(|(result, format)| apply_format(result, format).to_json(resource.name()))
                .collect();
            (json!({ "results": results }), EXIT_OK)
        }
        Response::ParamErrors(errors) => (json!({ "errors": errors }), EXIT_PARAMS),
        Response::BulkParamErrors(errors) => (json!({ "errors": errors }), EXIT_PARAMS),
        Response::InternalError => (json!({ "error": "internal" }), EXIT_INTERNAL),
    }
}

fn apply_format(result: &QueryResult, format: &FormatSpec) -> QueryResult {
    if !format.flatten {
        return result.clone();
    }

    match result {
        QueryResult::Single(entity) => QueryResult::from_single_entity(flatten(entity)),
        QueryResult::List {
            entities,
            total,
            offset,
        } => QueryResult::from_entity_list(entities.iter().map(flatten).collect(), *total, *offset),
    }
}

/// `{"state": {"id": "06"}}` → `{"state_id": "06"}`
fn flatten(entity: &Entity) -> Entity {
    fn walk(prefix: Option<&str>, map: &Map<String, Value>, out: &mut Entity) {
        for (key, value) in map {
            let key = match prefix {
                Some(prefix) => format!("{}_{}", prefix, key),
                None => key.clone(),
            };
            match value {
                Value::Object(inner) => walk(Some(&key), inner, out),
                other => {
                    out.insert(key, other.clone());
                }
            }
        }
    }

    let mut out = Entity::new();
    walk(None, entity, &mut out);
    out
}
