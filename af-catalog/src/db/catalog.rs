//! Joined catalog reads

use crate::models::CatalogRow;
use crate::query::{build_catalog_query, Filter};
use af_common::Result;
use sqlx::SqlitePool;

/// Run the joined catalog query for `filter`, reading every row before returning
pub async fn fetch_catalog(pool: &SqlitePool, filter: &Filter) -> Result<Vec<CatalogRow>> {
    let query = build_catalog_query(filter);

    let mut statement = sqlx::query_as::<_, CatalogRow>(&query.sql);
    for param in &query.params {
        statement = statement.bind(param);
    }

    let rows = statement.fetch_all(pool).await?;
    tracing::debug!(terms = filter.len(), rows = rows.len(), "Catalog query");
    Ok(rows)
}
