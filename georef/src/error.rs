//! Types d'erreurs pour le crate georef

use serde::Serialize;
use thiserror::Error;

/// Erreur de validation d'un paramètre reçu
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ParamError {
    /// Paramètre inconnu pour la ressource
    #[error("unknown parameter: {param}")]
    Unknown { param: String },

    /// Paramètre obligatoire absent
    #[error("missing required parameter: {param}")]
    Missing { param: String },

    /// Valeur invalide
    #[error("invalid value for {param}: {reason}")]
    Invalid { param: String, reason: String },

    /// Trop d'éléments dans une requête bulk
    #[error("bulk request exceeds {max} items")]
    BulkLimit { max: usize },
}

impl ParamError {
    pub fn invalid(param: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            param: param.into(),
            reason: reason.into(),
        }
    }

    /// Nom du paramètre concerné, si l'erreur en vise un
    pub fn param(&self) -> Option<&str> {
        match self {
            Self::Unknown { param } | Self::Missing { param } | Self::Invalid { param, .. } => {
                Some(param)
            }
            Self::BulkLimit { .. } => None,
        }
    }
}

/// Échec du parsing des paramètres d'une requête
///
/// Une requête simple produit une liste plate d'erreurs; une requête bulk
/// produit une liste par position (vide pour les éléments valides).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParameterParsingError {
    #[error("invalid parameters ({} errors)", .0.len())]
    Single(Vec<ParamError>),

    #[error("invalid bulk parameters ({} items)", .0.len())]
    Bulk(Vec<Vec<ParamError>>),
}

/// Le dictionnaire traduit ne correspond pas à la requête typée attendue
#[derive(Debug, Error)]
#[error("cannot build {query} query: {source}")]
pub struct QueryBuildError {
    pub query: &'static str,
    #[source]
    pub source: serde_json::Error,
}
