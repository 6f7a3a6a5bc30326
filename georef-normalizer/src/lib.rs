//! # georef-normalizer
//!
//! Service de normalisation georef: branche les requêtes parsées par `georef`
//! sur Elasticsearch (entités, calles, couches ponctuelles) et PostGIS
//! (interpolation des hauteurs).
//!
//! ## Usage CLI
//!
//! ```bash
//! # Requête simple
//! georef-normalizer query states -p name=cordoba -p max=5
//!
//! # Requête bulk
//! georef-normalizer bulk addresses --input addresses.json
//!
//! # Vérification des backends
//! georef-normalizer check
//! ```

pub mod backend;
pub mod config;
pub mod normalizer;

pub use backend::elasticsearch::{ElasticsearchBackend, SearchConfig};
pub use backend::pool::{create_pool, DatabaseConfig, SslMode};
pub use backend::{DataConnectionError, LocationConnection, LocationStore, SearchBackend};
pub use config::Settings;
pub use normalizer::{Normalizer, NormalizerError, Request, Response};
