//! Parsing et validation des paramètres de requête
//!
//! Les requêtes simples arrivent sous forme de query string (valeurs texte),
//! les requêtes bulk sous forme d'objets JSON. Les deux sont acceptées ici:
//! une valeur texte est convertie vers le type déclaré du paramètre.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::{Number, Value};

use crate::error::{ParamError, ParameterParsingError};
use crate::names::{self as n, Resource};
use crate::translate::Params;

/// Nombre maximal d'éléments dans une requête bulk
pub const BULK_LEN_MAX: usize = 5000;

/// Nombre maximal de résultats par requête
pub const MAX_RESULTS: u64 = 5000;

const FORMATS: &[&str] = &["json", "csv", "geojson"];
const ORDERS: &[&str] = &[n::ID, n::NAME];

/// Type d'un paramètre
#[derive(Debug, Clone)]
pub enum ParamKind {
    Str,
    Int { min: u64, max: u64 },
    Float { min: f64, max: f64 },
    Bool,
    Choice(&'static [&'static str]),
    /// Liste de champs (séparés par des virgules en query string)
    FieldList(&'static [&'static str]),
    /// Adresse "nom hauteur", parsée en `[nom, hauteur]`
    Address,
}

/// Déclaration d'un paramètre accepté
#[derive(Debug, Clone)]
pub struct ParamSpec {
    pub name: &'static str,
    pub kind: ParamKind,
    pub required: bool,
    pub default: Option<Value>,
}

impl ParamSpec {
    pub fn optional(name: &'static str, kind: ParamKind) -> Self {
        Self {
            name,
            kind,
            required: false,
            default: None,
        }
    }

    pub fn required(name: &'static str, kind: ParamKind) -> Self {
        Self {
            required: true,
            ..Self::optional(name, kind)
        }
    }

    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    fn parse(&self, raw: &Value) -> Result<Value, ParamError> {
        let invalid = |reason: &str| ParamError::invalid(self.name, reason);

        match &self.kind {
            ParamKind::Str => match raw {
                Value::String(s) if !s.trim().is_empty() => Ok(Value::from(s.trim())),
                Value::Number(num) => Ok(Value::from(num.to_string())),
                _ => Err(invalid("expected a non-empty string")),
            },
            ParamKind::Int { min, max } => {
                let value = match raw {
                    Value::Number(num) => num.as_u64(),
                    Value::String(s) => s.trim().parse::<u64>().ok(),
                    _ => None,
                }
                .ok_or_else(|| invalid("expected a non-negative integer"))?;

                if value < *min || value > *max {
                    return Err(invalid(&format!("must be between {} and {}", min, max)));
                }
                Ok(Value::from(value))
            }
            ParamKind::Float { min, max } => {
                let value = match raw {
                    Value::Number(num) => num.as_f64(),
                    Value::String(s) => s.trim().parse::<f64>().ok(),
                    _ => None,
                }
                .filter(|v| v.is_finite())
                .ok_or_else(|| invalid("expected a number"))?;

                if value < *min || value > *max {
                    return Err(invalid(&format!("must be between {} and {}", min, max)));
                }
                Number::from_f64(value)
                    .map(Value::Number)
                    .ok_or_else(|| invalid("expected a number"))
            }
            ParamKind::Bool => match raw {
                Value::Bool(b) => Ok(Value::Bool(*b)),
                Value::String(s) => match s.trim().to_lowercase().as_str() {
                    "true" | "1" | "yes" => Ok(Value::Bool(true)),
                    "false" | "0" | "no" => Ok(Value::Bool(false)),
                    _ => Err(invalid("expected true or false")),
                },
                _ => Err(invalid("expected true or false")),
            },
            ParamKind::Choice(choices) => match raw.as_str().map(str::trim) {
                Some(s) if choices.iter().any(|c| *c == s) => Ok(Value::from(s)),
                _ => Err(invalid(&format!("must be one of: {}", choices.join(", ")))),
            },
            ParamKind::FieldList(allowed) => {
                let fields: Vec<String> = match raw {
                    Value::String(s) => s
                        .split(',')
                        .map(str::trim)
                        .filter(|f| !f.is_empty())
                        .map(str::to_string)
                        .collect(),
                    Value::Array(items) => items
                        .iter()
                        .map(|v| v.as_str().map(str::to_string))
                        .collect::<Option<_>>()
                        .ok_or_else(|| invalid("expected a list of field names"))?,
                    _ => return Err(invalid("expected a list of field names")),
                };

                if fields.is_empty() {
                    return Err(invalid("expected at least one field"));
                }
                if let Some(unknown) = fields.iter().find(|f| !allowed.iter().any(|a| *a == f.as_str())) {
                    return Err(invalid(&format!("unknown field: {}", unknown)));
                }

                let mut unique: Vec<String> = Vec::with_capacity(fields.len());
                for field in fields {
                    if !unique.contains(&field) {
                        unique.push(field);
                    }
                }
                Ok(Value::from(unique))
            }
            ParamKind::Address => {
                let text = raw.as_str().ok_or_else(|| invalid("expected a string"))?;
                let (road_name, number) =
                    split_address(text).ok_or_else(|| invalid("expected \"<street name> <number>\""))?;
                Ok(Value::Array(vec![Value::from(road_name), Value::from(number)]))
            }
        }
    }
}

fn address_regex() -> &'static Regex {
    static ADDRESS_RE: OnceLock<Regex> = OnceLock::new();
    ADDRESS_RE.get_or_init(|| {
        Regex::new(r"^\s*(?P<name>\S.*?)\s+(?:N[°º]?\s*)?(?P<number>\d{1,6})\s*$")
            .expect("address regex is valid")
    })
}

/// Sépare une adresse en nom de rue et hauteur: "Callao 123" → ("Callao", 123)
pub fn split_address(text: &str) -> Option<(String, u32)> {
    let caps = address_regex().captures(text)?;
    let number = caps.name("number")?.as_str().parse().ok()?;
    Some((caps.name("name")?.as_str().to_string(), number))
}

/// Ensemble des paramètres acceptés par une ressource
#[derive(Debug, Clone)]
pub struct ParameterSet {
    specs: Vec<ParamSpec>,
}

impl ParameterSet {
    pub fn new(specs: Vec<ParamSpec>) -> Self {
        Self { specs }
    }

    /// Paramètres d'une ressource
    pub fn for_resource(resource: Resource) -> Self {
        let fields = available_fields(resource);
        let basic = basic_fields(resource);

        let mut specs = match resource {
            Resource::Place => vec![
                ParamSpec::required(n::LAT, ParamKind::Float { min: -90.0, max: 90.0 }),
                ParamSpec::required(n::LON, ParamKind::Float { min: -180.0, max: 180.0 }),
            ],
            Resource::Addresses => vec![ParamSpec::required(n::ADDRESS, ParamKind::Address)],
            _ => vec![
                ParamSpec::optional(n::ID, ParamKind::Str),
                ParamSpec::optional(n::NAME, ParamKind::Str),
            ],
        };

        let filters: &[&'static str] = match resource {
            Resource::States | Resource::Place => &[],
            Resource::Departments => &[n::STATE],
            Resource::Municipalities => &[n::STATE, n::DEPT],
            Resource::Localities => &[n::STATE, n::DEPT, n::MUN],
            Resource::Streets | Resource::Addresses => &[n::STATE, n::DEPT, n::ROAD_TYPE],
        };
        specs.extend(filters.iter().map(|f| ParamSpec::optional(*f, ParamKind::Str)));

        if resource != Resource::Place {
            specs.push(ParamSpec::optional(n::EXACT, ParamKind::Bool));
            specs.push(ParamSpec::optional(n::ORDER, ParamKind::Choice(ORDERS)));
            specs.push(ParamSpec::optional(
                n::MAX,
                ParamKind::Int {
                    min: 1,
                    max: MAX_RESULTS,
                },
            ));
            specs.push(ParamSpec::optional(
                n::OFFSET,
                ParamKind::Int {
                    min: 0,
                    max: MAX_RESULTS,
                },
            ));
        }

        specs.push(
            ParamSpec::optional(n::FIELDS, ParamKind::FieldList(fields)).with_default(Value::from(basic)),
        );
        specs.push(ParamSpec::optional(n::FLATTEN, ParamKind::Bool).with_default(Value::Bool(false)));
        specs.push(ParamSpec::optional(n::FORMAT, ParamKind::Choice(FORMATS)).with_default(Value::from("json")));

        Self::new(specs)
    }

    fn parse_params(&self, raw: &Params) -> Result<Params, Vec<ParamError>> {
        let mut errors = Vec::new();

        for key in raw.keys() {
            if !self.specs.iter().any(|spec| spec.name == key.as_str()) {
                errors.push(ParamError::Unknown { param: key.clone() });
            }
        }

        let mut parsed = Params::new();
        for spec in &self.specs {
            match raw.get(spec.name) {
                Some(value) => match spec.parse(value) {
                    Ok(value) => {
                        parsed.insert(spec.name.to_string(), value);
                    }
                    Err(e) => errors.push(e),
                },
                None if spec.required => errors.push(ParamError::Missing {
                    param: spec.name.to_string(),
                }),
                None => {
                    if let Some(default) = &spec.default {
                        parsed.insert(spec.name.to_string(), default.clone());
                    }
                }
            }
        }

        if errors.is_empty() {
            Ok(parsed)
        } else {
            Err(errors)
        }
    }

    /// Parse les paramètres d'une requête simple
    pub fn parse_single(&self, raw: &Params) -> Result<Params, ParameterParsingError> {
        self.parse_params(raw).map_err(ParameterParsingError::Single)
    }

    /// Parse les paramètres d'une requête bulk.
    ///
    /// En cas d'échec, chaque position reçoit sa propre liste d'erreurs
    /// (vide pour les éléments valides).
    pub fn parse_bulk(&self, items: &[Params]) -> Result<Vec<Params>, ParameterParsingError> {
        let mut parsed = Vec::with_capacity(items.len());
        let mut errors = Vec::with_capacity(items.len());
        let mut failed = false;

        for (position, raw) in items.iter().enumerate() {
            if position >= BULK_LEN_MAX {
                errors.push(vec![ParamError::BulkLimit { max: BULK_LEN_MAX }]);
                failed = true;
                continue;
            }

            match self.parse_params(raw) {
                Ok(params) => {
                    parsed.push(params);
                    errors.push(Vec::new());
                }
                Err(item_errors) => {
                    errors.push(item_errors);
                    failed = true;
                }
            }
        }

        if failed {
            Err(ParameterParsingError::Bulk(errors))
        } else {
            Ok(parsed)
        }
    }
}

/// Champs sélectionnables par ressource
pub fn available_fields(resource: Resource) -> &'static [&'static str] {
    match resource {
        Resource::States => &[n::ID, n::NAME, n::CENTROID_LAT, n::CENTROID_LON, n::SOURCE],
        Resource::Departments => &[
            n::ID, n::NAME, n::CENTROID_LAT, n::CENTROID_LON, "state.id", "state.name", n::SOURCE,
        ],
        Resource::Municipalities => &[
            n::ID, n::NAME, n::CENTROID_LAT, n::CENTROID_LON, "state.id", "state.name",
            "department.id", "department.name", n::SOURCE,
        ],
        Resource::Localities => &[
            n::ID, n::NAME, n::CENTROID_LAT, n::CENTROID_LON, "state.id", "state.name",
            "department.id", "department.name", "municipality.id", "municipality.name",
            n::SOURCE,
        ],
        Resource::Streets => &[
            n::ID, n::NAME, n::FULL_NAME, n::ROAD_TYPE, n::START_R, n::START_L, n::END_R,
            n::END_L, "state.id", "state.name", "department.id", "department.name", n::SOURCE,
        ],
        Resource::Addresses => &[
            n::ID, n::NAME, n::FULL_NAME, n::ROAD_TYPE, n::DOOR_NUM, n::LOCATION_LAT,
            n::LOCATION_LON, "state.id", "state.name", "department.id", "department.name",
            n::SOURCE,
        ],
        Resource::Place => &[
            "state.id", "state.name", "department.id", "department.name", "municipality.id",
            "municipality.name", n::LAT, n::LON, n::SOURCE,
        ],
    }
}

/// Champs retournés quand `fields` n'est pas précisé
pub fn basic_fields(resource: Resource) -> &'static [&'static str] {
    match resource {
        Resource::States | Resource::Departments | Resource::Municipalities | Resource::Localities => {
            &[n::ID, n::NAME]
        }
        Resource::Streets => &[n::ID, n::NAME, n::FULL_NAME],
        Resource::Addresses => &[
            n::ID, n::FULL_NAME, n::DOOR_NUM, n::LOCATION_LAT, n::LOCATION_LON,
        ],
        Resource::Place => available_fields(Resource::Place),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(value: Value) -> Params {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_split_address() {
        assert_eq!(split_address("Callao 123"), Some(("Callao".into(), 123)));
        assert_eq!(
            split_address("  Av. Santa Fe   1500 "),
            Some(("Av. Santa Fe".into(), 1500))
        );
        assert_eq!(split_address("Corrientes N° 348"), Some(("Corrientes".into(), 348)));
        assert_eq!(split_address("Callao"), None);
        assert_eq!(split_address("123"), None);
    }

    #[test]
    fn test_parse_single_query_string() {
        let set = ParameterSet::for_resource(Resource::States);
        let parsed = set
            .parse_single(&params(json!({"name": "Córdoba", "max": "5", "exact": "true"})))
            .unwrap();

        assert_eq!(parsed["name"], json!("Córdoba"));
        assert_eq!(parsed["max"], json!(5));
        assert_eq!(parsed["exact"], json!(true));
        assert_eq!(parsed["fields"], json!(["id", "name"]));
        assert_eq!(parsed["flatten"], json!(false));
        assert_eq!(parsed["format"], json!("json"));
    }

    #[test]
    fn test_parse_single_collects_errors() {
        let set = ParameterSet::for_resource(Resource::States);
        let err = set
            .parse_single(&params(json!({"colour": "red", "max": "0", "order": "size"})))
            .unwrap_err();

        match err {
            ParameterParsingError::Single(errors) => {
                assert_eq!(errors.len(), 3);
                assert_eq!(errors[0], ParamError::Unknown { param: "colour".into() });
                assert_eq!(errors[1].param(), Some("order"));
                assert_eq!(errors[2].param(), Some("max"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_parse_fields() {
        let set = ParameterSet::for_resource(Resource::Addresses);
        let parsed = set
            .parse_single(&params(json!({
                "address": "Callao 123",
                "fields": "id, full_name,id,location.lat"
            })))
            .unwrap();

        assert_eq!(parsed["address"], json!(["Callao", 123]));
        assert_eq!(parsed["fields"], json!(["id", "full_name", "location.lat"]));

        let err = set
            .parse_single(&params(json!({"address": "Callao 123", "fields": "geometry"})))
            .unwrap_err();
        assert!(matches!(err, ParameterParsingError::Single(ref e) if e.len() == 1));
    }

    #[test]
    fn test_parse_required() {
        let set = ParameterSet::for_resource(Resource::Place);
        let err = set.parse_single(&params(json!({"lat": "-34.6"}))).unwrap_err();
        assert_eq!(
            err,
            ParameterParsingError::Single(vec![ParamError::Missing { param: "lon".into() }])
        );

        let err = set
            .parse_single(&params(json!({"lat": 95, "lon": 0})))
            .unwrap_err();
        assert!(matches!(err, ParameterParsingError::Single(ref e) if e[0].param() == Some("lat")));
    }

    #[test]
    fn test_parse_bulk_errors_by_position() {
        let set = ParameterSet::for_resource(Resource::Addresses);
        let items = vec![
            params(json!({"address": "Callao 123"})),
            params(json!({"address": "Callao"})),
            params(json!({"address": "Corrientes 348", "max": 10})),
        ];

        match set.parse_bulk(&items).unwrap_err() {
            ParameterParsingError::Bulk(errors) => {
                assert_eq!(errors.len(), 3);
                assert!(errors[0].is_empty());
                assert_eq!(errors[1].len(), 1);
                assert!(errors[2].is_empty());
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_parse_bulk_ok_preserves_order() {
        let set = ParameterSet::for_resource(Resource::States);
        let items = vec![
            params(json!({"name": "Salta"})),
            params(json!({"name": "Jujuy"})),
        ];
        let parsed = set.parse_bulk(&items).unwrap();
        assert_eq!(parsed[0]["name"], json!("Salta"));
        assert_eq!(parsed[1]["name"], json!("Jujuy"));
    }

    #[test]
    fn test_parse_bulk_limit() {
        let set = ParameterSet::for_resource(Resource::States);
        let items = vec![Params::new(); BULK_LEN_MAX + 2];

        match set.parse_bulk(&items).unwrap_err() {
            ParameterParsingError::Bulk(errors) => {
                assert_eq!(errors.len(), BULK_LEN_MAX + 2);
                assert!(errors[0].is_empty());
                assert_eq!(
                    errors[BULK_LEN_MAX],
                    vec![ParamError::BulkLimit { max: BULK_LEN_MAX }]
                );
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
