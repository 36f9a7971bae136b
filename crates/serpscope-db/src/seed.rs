use serpscope_core::KeywordConfig;
use sqlx::PgPool;

use crate::DbError;

/// Upsert keywords from config into the database.
///
/// Returns the number of keywords processed (inserted or updated).
/// All upserts run inside a single transaction; if any operation fails
/// the entire batch is rolled back. Deactivation flows through the config's
/// `active` flag — rows are never deleted.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any database operation fails.
pub async fn seed_keywords(pool: &PgPool, keywords: &[KeywordConfig]) -> Result<usize, DbError> {
    let mut tx = pool.begin().await?;
    let mut count = 0usize;

    for entry in keywords {
        sqlx::query(
            "INSERT INTO keywords (keyword, marketplace, is_active) \
             VALUES ($1, $2, $3) \
             ON CONFLICT (keyword, marketplace) DO UPDATE SET \
                 is_active = EXCLUDED.is_active",
        )
        .bind(&entry.text)
        .bind(&entry.marketplace)
        .bind(entry.active)
        .execute(&mut *tx)
        .await?;

        count += 1;
    }

    tx.commit().await?;
    Ok(count)
}
