//! Integration tests for the annotation repositories.
//!
//! `#[sqlx::test]` creates a fresh database per test from `DATABASE_URL`,
//! which must point at a PostgreSQL server with PostGIS available.

use std::collections::BTreeMap;

use serde_json::{json, Value};
use sqlx::PgPool;
use tessera_core::lifecycle::{source_states, AnnotationStatus, ValidationOutcome};
use tessera_core::types::DbId;
use tessera_db::models::annotation::{AnnotationPatch, AnnotationScope, NewAnnotation};
use tessera_db::models::image::CreateImage;
use tessera_db::models::taxonomy::{CreateTaxonomy, CreateTaxonomyClass};
use tessera_db::repositories::{
    AnnotationLogRepo, AnnotationRepo, ImageRepo, TaxonomyRepo, ValidationEventRepo,
};
use tessera_db::spatial::srid_is_known;

const OWNER: DbId = 7;
const OTHER: DbId = 8;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn square(x: f64, y: f64, size: f64) -> Value {
    json!({
        "type": "Polygon",
        "coordinates": [[[x, y], [x + size, y], [x + size, y + size], [x, y + size], [x, y]]]
    })
}

async fn seed_class(pool: &PgPool) -> DbId {
    let taxonomy = TaxonomyRepo::create(
        pool,
        &CreateTaxonomy {
            name: "landcover".to_string(),
            version: None,
            description: None,
        },
    )
    .await
    .unwrap();
    TaxonomyRepo::create_class(
        pool,
        &CreateTaxonomyClass {
            taxonomy_id: taxonomy.id,
            parent_id: None,
            code: "bld".to_string(),
            names: BTreeMap::from([("en".to_string(), "Building".to_string())]),
        },
    )
    .await
    .unwrap()
    .id
}

async fn seed_image(pool: &PgPool, filename: &str, trace: Value) -> DbId {
    ImageRepo::create(
        pool,
        &CreateImage {
            filename: filename.to_string(),
            sensor: "pleiades".to_string(),
            bands: "RGB".to_string(),
            bit_depth: 8,
            trace,
            srid: 3857,
        },
    )
    .await
    .unwrap()
    .id
}

async fn seed_annotations(pool: &PgPool, class_id: DbId, statuses: &[AnnotationStatus]) -> Vec<DbId> {
    let items: Vec<NewAnnotation> = statuses
        .iter()
        .enumerate()
        .map(|(i, _)| NewAnnotation {
            taxonomy_class_id: class_id,
            image_id: None,
            geometry: square(i as f64 * 10.0, 0.0, 5.0).to_string(),
        })
        .collect();
    let mut tx = pool.begin().await.unwrap();
    let created = AnnotationRepo::create_batch(&mut tx, OWNER, &items, 3857).await.unwrap();
    tx.commit().await.unwrap();

    for (annotation, status) in created.iter().zip(statuses) {
        sqlx::query("UPDATE annotations SET status_id = $1 WHERE id = $2")
            .bind(status.id())
            .bind(annotation.id)
            .execute(pool)
            .await
            .unwrap();
    }
    created.into_iter().map(|a| a.id).collect()
}

async fn statuses_of(pool: &PgPool, ids: &[DbId]) -> Vec<AnnotationStatus> {
    let mut out = Vec::new();
    for &id in ids {
        let a = AnnotationRepo::find_by_id(pool, id).await.unwrap().unwrap();
        out.push(a.status().unwrap());
    }
    out
}

// ---------------------------------------------------------------------------
// Test: batch insert keeps input order and reprojects
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn batch_insert_preserves_order(pool: PgPool) {
    let class_id = seed_class(&pool).await;
    let ids = seed_annotations(&pool, class_id, &[AnnotationStatus::New; 3]).await;

    assert_eq!(ids.len(), 3);
    assert!(ids.windows(2).all(|w| w[0] < w[1]));
    let first = AnnotationRepo::find_by_id(&pool, ids[0]).await.unwrap().unwrap();
    assert_eq!(first.annotator_id, OWNER);
    assert_eq!(first.status().unwrap(), AnnotationStatus::New);
    assert_eq!(first.geometry["type"], "Polygon");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn wgs84_input_is_stored_in_web_mercator(pool: PgPool) {
    let class_id = seed_class(&pool).await;
    let item = NewAnnotation {
        taxonomy_class_id: class_id,
        image_id: None,
        geometry: square(10.0, 45.0, 0.001).to_string(),
    };
    let mut tx = pool.begin().await.unwrap();
    let created = AnnotationRepo::create_batch(&mut tx, OWNER, &[item], 4326).await.unwrap();
    tx.commit().await.unwrap();

    let x = created[0].geometry["coordinates"][0][0][0].as_f64().unwrap();
    // 10 degrees east is roughly 1_113_195 m in EPSG:3857.
    assert!((x - 1_113_194.9).abs() < 1.0, "x = {x}");
}

// ---------------------------------------------------------------------------
// Test: conditional status update follows the transition table
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn conditional_update_only_touches_legal_rows(pool: PgPool) {
    use AnnotationStatus::*;

    let class_id = seed_class(&pool).await;
    let ids = seed_annotations(&pool, class_id, &[New, Deleted, Released]).await;

    let sources = source_states(Deleted);
    let mut tx = pool.begin().await.unwrap();
    let updated = AnnotationRepo::update_status_conditional(
        &mut tx,
        &AnnotationScope::Classes(vec![class_id]),
        Deleted.id(),
        OWNER,
        &sources.any_user_ids(),
        &sources.owner_only_ids(),
    )
    .await
    .unwrap();
    tx.commit().await.unwrap();

    assert_eq!(updated, vec![ids[0]]);
    assert_eq!(statuses_of(&pool, &ids).await, vec![Deleted, Deleted, Released]);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn owner_only_edges_ignore_other_users(pool: PgPool) {
    use AnnotationStatus::*;

    let class_id = seed_class(&pool).await;
    let ids = seed_annotations(&pool, class_id, &[New, Released]).await;

    let sources = source_states(Released);
    let mut tx = pool.begin().await.unwrap();
    let updated = AnnotationRepo::update_status_conditional(
        &mut tx,
        &AnnotationScope::Ids(ids.clone()),
        Released.id(),
        OTHER,
        &sources.any_user_ids(),
        &sources.owner_only_ids(),
    )
    .await
    .unwrap();
    tx.commit().await.unwrap();

    assert!(updated.is_empty());
    assert_eq!(statuses_of(&pool, &ids).await, vec![New, Released]);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn lock_states_returns_rows_in_id_order(pool: PgPool) {
    use AnnotationStatus::*;

    let class_id = seed_class(&pool).await;
    let ids = seed_annotations(&pool, class_id, &[Released, New]).await;

    let mut tx = pool.begin().await.unwrap();
    let rows = AnnotationRepo::lock_states(&mut tx, &AnnotationScope::Ids(vec![ids[1], ids[0]]))
        .await
        .unwrap();
    tx.rollback().await.unwrap();

    assert_eq!(rows.iter().map(|r| r.id).collect::<Vec<_>>(), ids);
    assert_eq!(rows[0].status_id, Released.id());
}

// ---------------------------------------------------------------------------
// Test: validation events and logs are written one per row
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn records_one_event_and_log_per_annotation(pool: PgPool) {
    let class_id = seed_class(&pool).await;
    let ids = seed_annotations(&pool, class_id, &[AnnotationStatus::Released; 2]).await;

    let mut tx = pool.begin().await.unwrap();
    let events = ValidationEventRepo::record(&mut tx, &ids, OTHER, ValidationOutcome::Validated)
        .await
        .unwrap();
    let logs = AnnotationLogRepo::record_many(&mut tx, &ids, OTHER, &json!({"status": "validated"}))
        .await
        .unwrap();
    tx.commit().await.unwrap();

    assert_eq!(events, 2);
    assert_eq!(logs, 2);
    let history = ValidationEventRepo::list_for_annotation(&pool, ids[0]).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].outcome, "validated");
    assert_eq!(history[0].validator_id, OTHER);
    let log = AnnotationLogRepo::list_for_annotation(&pool, ids[1]).await.unwrap();
    assert_eq!(log[0].changes, json!({"status": "validated"}));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn rolled_back_events_leave_no_trace(pool: PgPool) {
    let class_id = seed_class(&pool).await;
    let ids = seed_annotations(&pool, class_id, &[AnnotationStatus::Released]).await;

    let mut tx = pool.begin().await.unwrap();
    ValidationEventRepo::record(&mut tx, &ids, OTHER, ValidationOutcome::Rejected)
        .await
        .unwrap();
    tx.rollback().await.unwrap();

    assert!(ValidationEventRepo::list_for_annotation(&pool, ids[0])
        .await
        .unwrap()
        .is_empty());
}

// ---------------------------------------------------------------------------
// Test: batched containment query
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn containment_is_aligned_with_input(pool: PgPool) {
    let a = seed_image(&pool, "a.tif", square(0.0, 0.0, 100.0)).await;
    let b = seed_image(&pool, "b.tif", square(200.0, 0.0, 100.0)).await;

    let geometries = vec![
        square(10.0, 10.0, 10.0).to_string(),
        square(50.0, 50.0, 10.0).to_string(),
        square(210.0, 10.0, 10.0).to_string(),
        square(90.0, 10.0, 120.0).to_string(),
    ];
    let candidates = ImageRepo::resolve_containment(&pool, &geometries, 3857).await.unwrap();

    assert_eq!(candidates, vec![vec![a], vec![a], vec![b], vec![]]);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn overlapping_footprints_yield_all_candidates(pool: PgPool) {
    let a = seed_image(&pool, "a.tif", square(0.0, 0.0, 100.0)).await;
    let b = seed_image(&pool, "b.tif", square(0.0, 0.0, 50.0)).await;

    let geometries = vec![square(10.0, 10.0, 5.0).to_string()];
    let candidates = ImageRepo::resolve_containment(&pool, &geometries, 3857).await.unwrap();

    assert_eq!(candidates, vec![vec![a.min(b), a.max(b)]]);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn existing_image_ids_filter_unknown_ones(pool: PgPool) {
    let a = seed_image(&pool, "a.tif", square(0.0, 0.0, 100.0)).await;
    let b = seed_image(&pool, "b.tif", square(200.0, 0.0, 100.0)).await;

    let found = ImageRepo::existing_ids(&pool, &[b, 999_999, a, a]).await.unwrap();
    assert_eq!(found, vec![a, b]);
    assert!(ImageRepo::existing_ids(&pool, &[]).await.unwrap().is_empty());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn spatial_reference_lookup(pool: PgPool) {
    assert!(srid_is_known(&pool, 3857).await.unwrap());
    assert!(srid_is_known(&pool, 4326).await.unwrap());
    assert!(!srid_is_known(&pool, 990_001).await.unwrap());
}

// ---------------------------------------------------------------------------
// Test: direct edits and counts
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn update_fields_keeps_absent_values(pool: PgPool) {
    let class_id = seed_class(&pool).await;
    let ids = seed_annotations(&pool, class_id, &[AnnotationStatus::New]).await;

    let mut tx = pool.begin().await.unwrap();
    let before = AnnotationRepo::find_for_update(&mut tx, ids[0]).await.unwrap().unwrap();
    let patch = AnnotationPatch {
        review_requested: Some(true),
        ..Default::default()
    };
    let after = AnnotationRepo::update_fields(&mut tx, ids[0], &patch).await.unwrap();
    tx.commit().await.unwrap();

    assert!(after.review_requested);
    assert_eq!(after.taxonomy_class_id, before.taxonomy_class_id);
    assert_eq!(after.geometry, before.geometry);
    assert_eq!(after.image_id, None);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn counts_group_by_class_and_status(pool: PgPool) {
    use AnnotationStatus::*;

    let class_id = seed_class(&pool).await;
    seed_annotations(&pool, class_id, &[New, Released, Deleted]).await;

    let live: Vec<i16> = vec![New.id(), Released.id()];
    let rows = AnnotationRepo::count_by_class(&pool, &[class_id], &live).await.unwrap();

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].taxonomy_class_id, class_id);
    assert_eq!(rows[0].count, 2);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn duplicate_class_code_violates_unique_constraint(pool: PgPool) {
    let class_id = seed_class(&pool).await;
    let class = TaxonomyRepo::find_class(&pool, class_id).await.unwrap().unwrap();

    let err = TaxonomyRepo::create_class(
        &pool,
        &CreateTaxonomyClass {
            taxonomy_id: class.taxonomy_id,
            parent_id: None,
            code: "bld".to_string(),
            names: BTreeMap::from([("en".to_string(), "Again".to_string())]),
        },
    )
    .await
    .unwrap_err();

    let db_err = err.as_database_error().unwrap();
    assert_eq!(db_err.constraint(), Some("uq_taxonomy_classes_taxonomy_code"));
}
