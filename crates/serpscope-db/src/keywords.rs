//! Database operations for the `keywords` table.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::DbError;

/// A row from the `keywords` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct KeywordRow {
    pub id: i64,
    pub keyword: String,
    pub marketplace: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Returns all active keywords, ordered by keyword text.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_active_keywords(pool: &PgPool) -> Result<Vec<KeywordRow>, DbError> {
    let rows = sqlx::query_as::<_, KeywordRow>(
        "SELECT id, keyword, marketplace, is_active, created_at \
         FROM keywords \
         WHERE is_active = TRUE \
         ORDER BY keyword",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Returns a keyword by its (text, marketplace) natural key, or `None`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_keyword(
    pool: &PgPool,
    text: &str,
    marketplace: &str,
) -> Result<Option<KeywordRow>, DbError> {
    let row = sqlx::query_as::<_, KeywordRow>(
        "SELECT id, keyword, marketplace, is_active, created_at \
         FROM keywords \
         WHERE keyword = $1 AND marketplace = $2",
    )
    .bind(text)
    .bind(marketplace)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}
