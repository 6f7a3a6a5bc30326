//! Tests d'intégration PostGIS
//!
//! Ces tests nécessitent une base PostgreSQL avec l'extension PostGIS.
//! Configuration via variables d'environnement:
//! - PGHOST, PGPORT, PGUSER, PGPASSWORD, PGDATABASE
//!
//! Exécution:
//! ```bash
//! docker run -d --name postgis-test -e POSTGRES_PASSWORD=test -p 5432:5432 postgis/postgis
//! PGPASSWORD=test PGDATABASE=postgres cargo test --test postgres_integration -- --ignored
//! ```

use anyhow::Result;
use deadpool_postgres::Pool;
use georef::GeometryRef;
use georef_normalizer::backend::{DataConnectionError, LocationConnection, LocationStore};
use georef_normalizer::{create_pool, DatabaseConfig};

fn create_test_pool() -> Result<Pool> {
    create_pool(&DatabaseConfig::from_env())
}

/// Ligne horizontale de (0, 0) à (10, 0), en EWKB hexadécimal
async fn line_ewkb(pool: &Pool) -> Result<GeometryRef> {
    let client = pool.get().await?;
    client
        .batch_execute("CREATE EXTENSION IF NOT EXISTS postgis")
        .await?;
    let row = client
        .query_one(
            "SELECT encode(ST_AsEWKB(ST_GeomFromText('LINESTRING(0 0, 10 0)', 4326)), 'hex')",
            &[],
        )
        .await?;
    Ok(GeometryRef(row.get(0)))
}

#[tokio::test]
#[ignore = "Requires PostgreSQL database"]
async fn test_street_number_location() -> Result<()> {
    let pool = create_test_pool()?;
    let geometry = line_ewkb(&pool).await?;
    let mut conn = pool.acquire().await?;

    let location = conn.street_number_location(&geometry, 25, 0, 100).await?;
    assert!((location.lon - 2.5).abs() < 1e-9);
    assert!(location.lat.abs() < 1e-9);

    let end = conn.street_number_location(&geometry, 100, 0, 100).await?;
    assert!((end.lon - 10.0).abs() < 1e-9);

    Ok(())
}

#[tokio::test]
#[ignore = "Requires PostgreSQL database"]
async fn test_street_number_location_empty_range() -> Result<()> {
    let pool = create_test_pool()?;
    let geometry = line_ewkb(&pool).await?;
    let mut conn = pool.acquire().await?;

    // Plage de longueur nulle: début de la ligne
    let location = conn.street_number_location(&geometry, 40, 40, 40).await?;
    assert!(location.lon.abs() < 1e-9);

    Ok(())
}

#[tokio::test]
#[ignore = "Requires PostgreSQL database"]
async fn test_invalid_geometry_reference() -> Result<()> {
    let pool = create_test_pool()?;
    let mut conn = pool.acquire().await?;

    let err = conn
        .street_number_location(&GeometryRef("not-hex".into()), 10, 0, 100)
        .await
        .unwrap_err();
    assert!(matches!(err, DataConnectionError::Geometry(_)));

    Ok(())
}
