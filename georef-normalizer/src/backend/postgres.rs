//! Interpolation des hauteurs sur PostGIS

use async_trait::async_trait;
use deadpool_postgres::{Object, Pool};
use georef::GeometryRef;
use tracing::trace;

use super::{DataConnectionError, Location, LocationConnection, LocationStore};

/// Point à la fraction `(number - start) / (end - start)` de la ligne du tronçon,
/// bornée à [0, 1]. Une plage de longueur nulle donne le début de la ligne.
const STREET_NUMBER_LOCATION_SQL: &str = r#"
    SELECT ST_X(point) AS lon, ST_Y(point) AS lat
    FROM (
        SELECT ST_LineInterpolatePoint(
            ST_GeometryN(ST_LineMerge(ST_GeomFromEWKB($1::bytea)), 1),
            LEAST(GREATEST(COALESCE(($2::float8 - $3::float8) / NULLIF($4::float8 - $3::float8, 0), 0), 0), 1)
        ) AS point
    ) AS located
"#;

#[async_trait]
impl LocationStore for Pool {
    type Connection = Object;

    async fn acquire(&self) -> Result<Object, DataConnectionError> {
        self.get()
            .await
            .map_err(|e| DataConnectionError::Store(e.to_string()))
    }
}

#[async_trait]
impl LocationConnection for Object {
    async fn street_number_location(
        &mut self,
        geometry: &GeometryRef,
        number: u32,
        start: u32,
        end: u32,
    ) -> Result<Location, DataConnectionError> {
        let ewkb = hex::decode(geometry.as_str())
            .map_err(|e| DataConnectionError::Geometry(e.to_string()))?;

        trace!(number, start, end, "Interpolating street number");

        let row = self
            .query_one(
                STREET_NUMBER_LOCATION_SQL,
                &[&ewkb, &f64::from(number), &f64::from(start), &f64::from(end)],
            )
            .await
            .map_err(|e| DataConnectionError::Store(e.to_string()))?;

        let lon: f64 = row
            .try_get("lon")
            .map_err(|e| DataConnectionError::Store(e.to_string()))?;
        let lat: f64 = row
            .try_get("lat")
            .map_err(|e| DataConnectionError::Store(e.to_string()))?;

        Ok(Location::from(geo::Point::new(lon, lat)))
    }
}
