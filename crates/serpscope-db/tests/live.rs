//! Live integration tests for serpscope-db using `#[sqlx::test]`.
//!
//! Each test gets a fresh, fully-migrated Postgres database spun up by the
//! sqlx test harness. The `migrations` path is relative to the crate root
//! (`crates/serpscope-db/`), so `"../../migrations"` resolves to the
//! workspace migration directory.

use chrono::{NaiveDate, TimeZone, Utc};
use serde_json::json;
use serpscope_core::{EnrichmentPayload, RawReview, SerpResult};
use serpscope_db::{
    apply_enrichment, compute_daily_metric, create_snapshot, get_keyword, get_product_by_asin,
    get_seller_by_brand, ingest_reviews, insert_result, list_daily_metrics, list_price_history,
    list_reviews, metrics_window, reconcile_result, DbError, EnrichOutcome,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Insert a keyword row and return its generated `id`.
async fn insert_test_keyword(pool: &sqlx::PgPool, text: &str, is_active: bool) -> i64 {
    sqlx::query_scalar::<_, i64>(
        "INSERT INTO keywords (keyword, marketplace, is_active) \
         VALUES ($1, 'US', $2) RETURNING id",
    )
    .bind(text)
    .bind(is_active)
    .fetch_one(pool)
    .await
    .unwrap_or_else(|e| panic!("insert_test_keyword failed for '{text}': {e}"))
}

fn make_result(asin: &str, position: i32, price: Option<f64>, sponsored: bool) -> SerpResult {
    SerpResult {
        asin: asin.to_string(),
        position,
        is_sponsored: sponsored,
        title: Some(format!("Product {asin}")),
        price,
        currency: Some("USD".to_string()),
        rating: Some(4.2),
        review_count: Some(100),
        image_url: None,
    }
}

/// Persist one snapshot with the given results on a specific capture day.
async fn seed_snapshot(
    pool: &sqlx::PgPool,
    keyword_id: i64,
    day: NaiveDate,
    results: &[SerpResult],
) {
    let capture_date = Utc.from_utc_datetime(&day.and_hms_opt(6, 0, 0).expect("valid time"));

    let mut tx = pool.begin().await.expect("begin failed");
    let snapshot = create_snapshot(
        &mut tx,
        keyword_id,
        "US",
        capture_date,
        i32::try_from(results.len()).expect("result count fits i32"),
    )
    .await
    .expect("create_snapshot failed");

    for result in results {
        insert_result(&mut tx, snapshot.id, result)
            .await
            .expect("insert_result failed");
    }
    tx.commit().await.expect("commit failed");
}

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

// ---------------------------------------------------------------------------
// Reconciler
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn reconcile_creates_then_updates(pool: sqlx::PgPool) {
    let mut conn = pool.acquire().await.expect("acquire failed");

    let (product, created) = reconcile_result(&mut conn, &make_result("B0AAA", 1, Some(19.99), false))
        .await
        .expect("first reconcile failed");
    assert!(created);
    assert_eq!(product.current_price, Some(19.99));
    assert_eq!(product.title.as_deref(), Some("Product B0AAA"));

    let (product, created) = reconcile_result(&mut conn, &make_result("B0AAA", 2, Some(17.49), true))
        .await
        .expect("second reconcile failed");
    assert!(!created);
    assert_eq!(product.current_price, Some(17.49));
}

#[sqlx::test(migrations = "../../migrations")]
async fn reconcile_appends_one_price_row_per_priced_call(pool: sqlx::PgPool) {
    let mut conn = pool.acquire().await.expect("acquire failed");

    let result = make_result("B0BBB", 1, Some(24.99), false);
    reconcile_result(&mut conn, &result)
        .await
        .expect("first reconcile failed");
    reconcile_result(&mut conn, &result)
        .await
        .expect("second reconcile failed");
    drop(conn);

    // Two priced reconciliations produce two history rows, never merged.
    let history = list_price_history(&pool, "B0BBB", 10)
        .await
        .expect("list_price_history failed");
    assert_eq!(history.len(), 2);
    assert!(history.iter().all(|h| (h.price - 24.99).abs() < f64::EPSILON));
    assert!(history.iter().all(|h| h.currency == "USD"));
}

#[sqlx::test(migrations = "../../migrations")]
async fn reconcile_null_never_erases_known_values(pool: sqlx::PgPool) {
    let mut conn = pool.acquire().await.expect("acquire failed");

    reconcile_result(&mut conn, &make_result("B0CCC", 1, Some(29.99), false))
        .await
        .expect("first reconcile failed");

    let bare = SerpResult {
        asin: "B0CCC".to_string(),
        position: 3,
        is_sponsored: false,
        title: None,
        price: None,
        currency: None,
        rating: None,
        review_count: None,
        image_url: None,
    };
    let (product, created) = reconcile_result(&mut conn, &bare)
        .await
        .expect("bare reconcile failed");

    assert!(!created);
    assert_eq!(product.current_price, Some(29.99));
    assert_eq!(product.current_rating, Some(4.2));
    assert_eq!(product.current_review_count, Some(100));
    assert_eq!(product.title.as_deref(), Some("Product B0CCC"));
    drop(conn);

    // The unpriced observation must not have produced a history row.
    let history = list_price_history(&pool, "B0CCC", 10)
        .await
        .expect("list_price_history failed");
    assert_eq!(history.len(), 1);
}

#[sqlx::test(migrations = "../../migrations")]
async fn reconcile_backfills_title_only_when_unset(pool: sqlx::PgPool) {
    let mut conn = pool.acquire().await.expect("acquire failed");

    let untitled = SerpResult {
        title: None,
        ..make_result("B0DDD", 1, None, false)
    };
    let (product, _) = reconcile_result(&mut conn, &untitled)
        .await
        .expect("untitled reconcile failed");
    assert!(product.title.is_none());

    let (product, _) = reconcile_result(&mut conn, &make_result("B0DDD", 1, None, false))
        .await
        .expect("titled reconcile failed");
    assert_eq!(product.title.as_deref(), Some("Product B0DDD"));

    let renamed = SerpResult {
        title: Some("A different listing title".to_string()),
        ..make_result("B0DDD", 1, None, false)
    };
    let (product, _) = reconcile_result(&mut conn, &renamed)
        .await
        .expect("renamed reconcile failed");
    assert_eq!(product.title.as_deref(), Some("Product B0DDD"));
}

#[sqlx::test(migrations = "../../migrations")]
async fn reconcile_rejects_missing_asin(pool: sqlx::PgPool) {
    let mut conn = pool.acquire().await.expect("acquire failed");

    let malformed = SerpResult {
        asin: "  ".to_string(),
        ..make_result("ignored", 1, None, false)
    };
    let result = reconcile_result(&mut conn, &malformed).await;
    assert!(matches!(result, Err(DbError::MissingAsin)));
}

// ---------------------------------------------------------------------------
// Enrichment + sellers
// ---------------------------------------------------------------------------

fn enrichment(brand: &str) -> EnrichmentPayload {
    EnrichmentPayload {
        brand: Some(brand.to_string()),
        category: Some("Electronics".to_string()),
        subcategory: Some("Mice".to_string()),
        rating: Some(json!("4.6")),
        review_count: Some(json!(2048)),
        ..EnrichmentPayload::default()
    }
}

#[sqlx::test(migrations = "../../migrations")]
async fn enrichment_merges_fields_and_builds_rollup(pool: sqlx::PgPool) {
    let mut conn = pool.acquire().await.expect("acquire failed");
    reconcile_result(&mut conn, &make_result("B0EEE", 1, Some(9.99), false))
        .await
        .expect("reconcile failed");

    let outcome = apply_enrichment(&mut conn, "B0EEE", &enrichment("Logi"), "US")
        .await
        .expect("apply_enrichment failed");
    assert!(matches!(
        outcome,
        EnrichOutcome::Applied {
            brand_changed: true,
            ..
        }
    ));
    drop(conn);

    let product = get_product_by_asin(&pool, "B0EEE")
        .await
        .expect("get_product_by_asin failed")
        .expect("product missing");
    assert_eq!(product.brand.as_deref(), Some("Logi"));
    assert_eq!(product.category.as_deref(), Some("Electronics"));
    assert_eq!(product.marketplace.as_deref(), Some("US"));
    assert_eq!(product.current_rating, Some(4.6));
    assert_eq!(product.current_review_count, Some(2048));

    let seller = get_seller_by_brand(&pool, "Logi")
        .await
        .expect("get_seller_by_brand failed")
        .expect("seller missing");
    assert_eq!(seller.product_count, 1);
    assert_eq!(seller.avg_rating, Some(4.6));
    assert_eq!(seller.total_reviews, 2048);
}

#[sqlx::test(migrations = "../../migrations")]
async fn enrichment_empty_payload_is_a_guarded_noop(pool: sqlx::PgPool) {
    let mut conn = pool.acquire().await.expect("acquire failed");
    reconcile_result(&mut conn, &make_result("B0FFF", 1, None, false))
        .await
        .expect("reconcile failed");

    let outcome = apply_enrichment(&mut conn, "B0FFF", &EnrichmentPayload::default(), "US")
        .await
        .expect("apply_enrichment failed");
    assert_eq!(outcome, EnrichOutcome::Skipped);
}

#[sqlx::test(migrations = "../../migrations")]
async fn enrichment_unknown_asin_is_not_found(pool: sqlx::PgPool) {
    let mut conn = pool.acquire().await.expect("acquire failed");
    let result = apply_enrichment(&mut conn, "B0MISSING", &enrichment("Logi"), "US").await;
    assert!(matches!(result, Err(DbError::NotFound)));
}

#[sqlx::test(migrations = "../../migrations")]
async fn enrichment_unparsable_numerics_keep_prior_values(pool: sqlx::PgPool) {
    let mut conn = pool.acquire().await.expect("acquire failed");
    reconcile_result(&mut conn, &make_result("B0GGG", 1, Some(9.99), false))
        .await
        .expect("reconcile failed");

    let payload = EnrichmentPayload {
        brand: Some("Logi".to_string()),
        rating: Some(json!("four and a half")),
        review_count: Some(json!({"count": 7})),
        ..EnrichmentPayload::default()
    };
    apply_enrichment(&mut conn, "B0GGG", &payload, "US")
        .await
        .expect("apply_enrichment failed");
    drop(conn);

    let product = get_product_by_asin(&pool, "B0GGG")
        .await
        .expect("get_product_by_asin failed")
        .expect("product missing");
    assert_eq!(product.current_rating, Some(4.2));
    assert_eq!(product.current_review_count, Some(100));
}

#[sqlx::test(migrations = "../../migrations")]
async fn seller_rollup_tracks_brand_reassignment(pool: sqlx::PgPool) {
    let mut conn = pool.acquire().await.expect("acquire failed");
    reconcile_result(&mut conn, &make_result("B0HH1", 1, None, false))
        .await
        .expect("reconcile failed");
    reconcile_result(&mut conn, &make_result("B0HH2", 2, None, false))
        .await
        .expect("reconcile failed");

    apply_enrichment(&mut conn, "B0HH1", &enrichment("BrandA"), "US")
        .await
        .expect("enrich B0HH1 failed");
    apply_enrichment(&mut conn, "B0HH2", &enrichment("BrandA"), "US")
        .await
        .expect("enrich B0HH2 failed");

    // Reassign one product to BrandB; BrandA's count must shrink to match
    // the live product population.
    apply_enrichment(&mut conn, "B0HH2", &enrichment("BrandB"), "US")
        .await
        .expect("reassign failed");
    drop(conn);

    let brand_a = get_seller_by_brand(&pool, "BrandA")
        .await
        .expect("get BrandA failed")
        .expect("BrandA missing");
    assert_eq!(brand_a.product_count, 1);

    let brand_b = get_seller_by_brand(&pool, "BrandB")
        .await
        .expect("get BrandB failed")
        .expect("BrandB missing");
    assert_eq!(brand_b.product_count, 1);
}

// ---------------------------------------------------------------------------
// Reviews
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn review_ingestion_is_idempotent_and_selective(pool: sqlx::PgPool) {
    let mut conn = pool.acquire().await.expect("acquire failed");
    reconcile_result(&mut conn, &make_result("B0JJJ", 1, None, false))
        .await
        .expect("reconcile failed");

    let reviews = vec![
        RawReview {
            review_id: Some("R1".to_string()),
            rating: Some(json!(4.7)),
            title: Some("Great".to_string()),
            body: Some("Works well".to_string()),
            verified_purchase: true,
            review_date: Some("2026-01-02".to_string()),
            helpful_votes: None,
        },
        // No review id: skipped silently.
        RawReview {
            rating: Some(json!(5)),
            ..RawReview::default()
        },
        // No rating: skipped silently.
        RawReview {
            review_id: Some("R2".to_string()),
            ..RawReview::default()
        },
        // Uncoercible rating: skipped.
        RawReview {
            review_id: Some("R3".to_string()),
            rating: Some(json!("five stars")),
            ..RawReview::default()
        },
    ];

    let inserted = ingest_reviews(&mut conn, "B0JJJ", &reviews)
        .await
        .expect("first ingest failed");
    assert_eq!(inserted, 1);

    // Resubmitting the same batch inserts nothing new.
    let inserted = ingest_reviews(&mut conn, "B0JJJ", &reviews)
        .await
        .expect("second ingest failed");
    assert_eq!(inserted, 0);
    drop(conn);

    let stored = list_reviews(&pool, "B0JJJ", 10)
        .await
        .expect("list_reviews failed");
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].review_id, "R1");
    assert_eq!(stored[0].rating, 4);
    assert_eq!(stored[0].helpful_votes, 0);
    assert!(stored[0].review_date.is_some());
}

// ---------------------------------------------------------------------------
// Daily metrics
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn daily_metric_matches_worked_example(pool: sqlx::PgPool) {
    let keyword_id = insert_test_keyword(&pool, "wireless mouse", true).await;
    let day1 = day(2026, 1, 15);

    seed_snapshot(
        &pool,
        keyword_id,
        day1,
        &[
            make_result("A1", 1, Some(19.99), true),
            make_result("A2", 2, Some(24.99), true),
            make_result("A3", 3, Some(14.99), false),
            make_result("A4", 4, Some(29.99), false),
            make_result("A5", 5, Some(9.99), false),
        ],
    )
    .await;

    let mut conn = pool.acquire().await.expect("acquire failed");
    let metric = compute_daily_metric(&mut conn, keyword_id, day1)
        .await
        .expect("compute failed")
        .expect("expected a metric row");

    assert_eq!(metric.median_price, Some(19.99));
    assert_eq!(metric.total_products, 5);
    assert_eq!(metric.sponsored_count, 2);
    assert_eq!(metric.organic_count, 3);
    assert_eq!(metric.new_entrants, 5);
}

#[sqlx::test(migrations = "../../migrations")]
async fn daily_metric_second_day_new_entrants(pool: sqlx::PgPool) {
    let keyword_id = insert_test_keyword(&pool, "wireless mouse", true).await;
    let day1 = day(2026, 1, 15);
    let day2 = day(2026, 1, 16);

    seed_snapshot(
        &pool,
        keyword_id,
        day1,
        &[
            make_result("A1", 1, None, false),
            make_result("A2", 2, None, false),
            make_result("A3", 3, None, false),
            make_result("A4", 4, None, false),
            make_result("A5", 5, None, false),
        ],
    )
    .await;
    // Day 2: four returning ASINs plus two new ones; A5 disappearing is
    // irrelevant to the count.
    seed_snapshot(
        &pool,
        keyword_id,
        day2,
        &[
            make_result("A1", 1, None, false),
            make_result("A2", 2, None, false),
            make_result("A3", 3, None, false),
            make_result("A4", 4, None, false),
            make_result("B1", 5, None, false),
            make_result("B2", 6, None, false),
        ],
    )
    .await;

    let mut conn = pool.acquire().await.expect("acquire failed");
    let metric = compute_daily_metric(&mut conn, keyword_id, day2)
        .await
        .expect("compute failed")
        .expect("expected a metric row");

    assert_eq!(metric.new_entrants, 2);
    assert_eq!(metric.total_products, 6);
}

#[sqlx::test(migrations = "../../migrations")]
async fn daily_metric_recompute_replaces_not_duplicates(pool: sqlx::PgPool) {
    let keyword_id = insert_test_keyword(&pool, "usb c hub", true).await;
    let d = day(2026, 1, 15);
    seed_snapshot(&pool, keyword_id, d, &[make_result("A1", 1, Some(12.0), false)]).await;

    let mut conn = pool.acquire().await.expect("acquire failed");
    compute_daily_metric(&mut conn, keyword_id, d)
        .await
        .expect("first compute failed");
    compute_daily_metric(&mut conn, keyword_id, d)
        .await
        .expect("second compute failed");
    drop(conn);

    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM daily_metrics WHERE keyword_id = $1 AND date = $2",
    )
    .bind(keyword_id)
    .bind(d)
    .fetch_one(&pool)
    .await
    .expect("count failed");
    assert_eq!(count, 1);
}

#[sqlx::test(migrations = "../../migrations")]
async fn daily_metric_empty_day_writes_nothing(pool: sqlx::PgPool) {
    let keyword_id = insert_test_keyword(&pool, "laptop stand", true).await;

    let mut conn = pool.acquire().await.expect("acquire failed");
    let metric = compute_daily_metric(&mut conn, keyword_id, day(2026, 1, 15))
        .await
        .expect("compute failed");
    assert!(metric.is_none());
    drop(conn);

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM daily_metrics")
        .fetch_one(&pool)
        .await
        .expect("count failed");
    assert_eq!(count, 0);
}

// ---------------------------------------------------------------------------
// Opportunity window
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn keyword_lookup_and_metric_listing(pool: sqlx::PgPool) {
    let keyword_id = insert_test_keyword(&pool, "mechanical keyboard", true).await;
    let d1 = day(2026, 1, 15);
    let d2 = day(2026, 1, 16);
    seed_snapshot(&pool, keyword_id, d1, &[make_result("A1", 1, Some(10.0), false)]).await;
    seed_snapshot(&pool, keyword_id, d2, &[make_result("A1", 1, Some(12.0), false)]).await;

    let mut conn = pool.acquire().await.expect("acquire failed");
    compute_daily_metric(&mut conn, keyword_id, d1)
        .await
        .expect("compute d1 failed");
    compute_daily_metric(&mut conn, keyword_id, d2)
        .await
        .expect("compute d2 failed");
    drop(conn);

    let keyword = get_keyword(&pool, "mechanical keyboard", "US")
        .await
        .expect("get_keyword failed")
        .expect("keyword missing");
    assert_eq!(keyword.id, keyword_id);
    assert!(get_keyword(&pool, "mechanical keyboard", "UK")
        .await
        .expect("get_keyword failed")
        .is_none());

    // Oldest first, so window summaries see a date-ascending run.
    let metrics = list_daily_metrics(&pool, keyword_id, d1)
        .await
        .expect("list_daily_metrics failed");
    assert_eq!(metrics.len(), 2);
    assert_eq!(metrics[0].date, d1);
    assert_eq!(metrics[1].median_price, Some(12.0));
}

#[sqlx::test(migrations = "../../migrations")]
async fn metrics_window_excludes_inactive_keywords(pool: sqlx::PgPool) {
    let active_id = insert_test_keyword(&pool, "wireless mouse", true).await;
    let inactive_id = insert_test_keyword(&pool, "fidget spinner", false).await;
    let d = day(2026, 1, 15);

    seed_snapshot(&pool, active_id, d, &[make_result("A1", 1, None, false)]).await;
    seed_snapshot(&pool, inactive_id, d, &[make_result("Z1", 1, None, false)]).await;

    let mut conn = pool.acquire().await.expect("acquire failed");
    compute_daily_metric(&mut conn, active_id, d)
        .await
        .expect("compute active failed");
    compute_daily_metric(&mut conn, inactive_id, d)
        .await
        .expect("compute inactive failed");
    drop(conn);

    let window = metrics_window(&pool, day(2026, 1, 10))
        .await
        .expect("metrics_window failed");
    assert_eq!(window.len(), 1);
    assert_eq!(window[0].keyword, "wireless mouse");
}
