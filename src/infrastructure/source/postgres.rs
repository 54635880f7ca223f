//! PostgreSQL candidate source with connection pooling

use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::{Postgres, QueryBuilder, Row};
use tracing::debug;

use crate::domain::search::{CandidateFilters, CandidateSource, Listing, ResultKind};
use crate::domain::DomainError;

const LISTING_COLUMNS: &str = "id, kind, name, description, categories, verified, price, \
     latitude, longitude, city, state, postal_code";

/// PostgreSQL source configuration
#[derive(Debug, Clone)]
pub struct PostgresSourceConfig {
    /// Database connection URL
    pub url: String,
    /// Maximum number of connections in the pool
    pub max_connections: u32,
    /// Connection timeout in seconds
    pub connect_timeout_secs: u64,
    /// Upper bound on rows returned per search
    pub max_results: usize,
}

impl PostgresSourceConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_connections: 10,
            connect_timeout_secs: 30,
            max_results: 200,
        }
    }

    pub fn with_max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn with_max_results(mut self, max: usize) -> Self {
        self.max_results = max;
        self
    }
}

/// Reads listings from a `listings` table
#[derive(Debug, Clone)]
pub struct PostgresCandidateSource {
    pool: PgPool,
    max_results: usize,
}

impl PostgresCandidateSource {
    pub fn new(pool: PgPool, max_results: usize) -> Self {
        Self { pool, max_results }
    }

    /// Creates a source backed by a fresh connection pool
    pub async fn connect(config: &PostgresSourceConfig) -> Result<Self, DomainError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
            .connect(&config.url)
            .await
            .map_err(|e| {
                DomainError::configuration(format!("Failed to connect to PostgreSQL: {}", e))
            })?;

        Ok(Self::new(pool, config.max_results))
    }

    /// Ensures the listings table exists
    pub async fn ensure_table(&self) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS listings (
                id VARCHAR(255) PRIMARY KEY,
                kind VARCHAR(16) NOT NULL,
                name TEXT NOT NULL,
                description TEXT,
                categories TEXT[] NOT NULL DEFAULT '{}',
                verified BOOLEAN NOT NULL DEFAULT FALSE,
                price DOUBLE PRECISION,
                latitude DOUBLE PRECISION,
                longitude DOUBLE PRECISION,
                city TEXT,
                state TEXT,
                postal_code TEXT
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::configuration(format!("Failed to create table: {}", e)))?;

        Ok(())
    }
}

/// Escapes LIKE wildcards and wraps the term for a substring match
fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");

    format!("%{}%", escaped)
}

fn build_query(filters: &CandidateFilters, limit: usize) -> QueryBuilder<'static, Postgres> {
    let mut builder = QueryBuilder::new(format!(
        "SELECT {} FROM listings WHERE TRUE",
        LISTING_COLUMNS
    ));

    if let Some(kind) = filters.kind {
        builder.push(" AND kind = ").push_bind(kind.as_str());
    }

    if filters.verified_only {
        builder.push(" AND verified");
    }

    if !filters.term.is_empty() {
        let pattern = like_pattern(&filters.term);
        builder
            .push(" AND (LOWER(name) LIKE ")
            .push_bind(pattern.clone())
            .push(" OR LOWER(COALESCE(description, '')) LIKE ")
            .push_bind(pattern.clone())
            .push(" OR EXISTS (SELECT 1 FROM unnest(categories) c WHERE LOWER(c) LIKE ")
            .push_bind(pattern)
            .push("))");
    }

    if !filters.categories.is_empty() {
        builder
            .push(" AND EXISTS (SELECT 1 FROM unnest(categories) c WHERE LOWER(c) = ANY(")
            .push_bind(filters.categories.clone())
            .push("))");
    }

    if let Some(min) = filters.min_price {
        builder.push(" AND price >= ").push_bind(min);
    }

    if let Some(max) = filters.max_price {
        builder.push(" AND price <= ").push_bind(max);
    }

    for (column, value) in [
        ("postal_code", &filters.postal_code),
        ("city", &filters.city),
        ("state", &filters.state),
    ] {
        if let Some(value) = value {
            builder
                .push(format!(" AND LOWER(TRIM({})) = ", column))
                .push_bind(value.clone());
        }
    }

    builder
        .push(" ORDER BY LOWER(name), id LIMIT ")
        .push_bind(i64::try_from(limit).unwrap_or(i64::MAX));

    builder
}

fn listing_from_row(row: &PgRow) -> Result<Listing, sqlx::Error> {
    let kind: String = row.try_get("kind")?;
    let kind = kind.parse::<ResultKind>().map_err(|e| sqlx::Error::ColumnDecode {
        index: "kind".to_string(),
        source: e.into(),
    })?;

    Ok(Listing {
        id: row.try_get("id")?,
        kind,
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        categories: row.try_get("categories")?,
        verified: row.try_get("verified")?,
        price: row.try_get("price")?,
        latitude: row.try_get("latitude")?,
        longitude: row.try_get("longitude")?,
        city: row.try_get("city")?,
        state: row.try_get("state")?,
        postal_code: row.try_get("postal_code")?,
    })
}

#[async_trait]
impl CandidateSource for PostgresCandidateSource {
    async fn fetch_candidates(
        &self,
        filters: &CandidateFilters,
    ) -> Result<Vec<Listing>, DomainError> {
        let mut query = build_query(filters, self.max_results);

        let rows = query
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DomainError::fetch_failed(format!("Failed to query listings: {}", e)))?;

        debug!(rows = rows.len(), "Fetched candidate listings");

        rows.iter()
            .map(listing_from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| DomainError::fetch_failed(format!("Failed to decode listing: {}", e)))
    }
}
