//! HTTP behaviour that does not depend on stored data.
//!
//! The router runs over a lazily connected pool pointing at a closed port,
//! so every request here must be answered before storage is reached.

mod common;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use common::{body_json, build_offline_app, get, get_auth, json_auth, post_json};
use serde_json::json;

const USER: i64 = 7;

// ---------------------------------------------------------------------------
// Authentication
// ---------------------------------------------------------------------------

#[tokio::test]
async fn missing_token_is_rejected() {
    let response = get(build_offline_app(), "/api/v1/annotations/annotation.1").await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = body_json(response).await;
    assert_eq!(json["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn malformed_authorization_header_is_rejected() {
    let request = Request::builder()
        .uri("/api/v1/taxonomies")
        .header("authorization", "Token abc")
        .body(Body::empty())
        .unwrap();
    let response = common::send(build_offline_app(), request).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn invalid_token_is_rejected() {
    let request = Request::builder()
        .uri("/api/v1/images")
        .header("authorization", "Bearer not-a-jwt")
        .body(Body::empty())
        .unwrap();
    let response = common::send(build_offline_app(), request).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = body_json(response).await;
    assert_eq!(json["error"], "Invalid or expired token");
}

// ---------------------------------------------------------------------------
// Annotation references
// ---------------------------------------------------------------------------

#[tokio::test]
async fn malformed_reference_in_path_is_400() {
    for uri in [
        "/api/v1/annotations/12",
        "/api/v1/annotations/annotation.abc",
        "/api/v1/annotations/image.12/logs",
        "/api/v1/annotations/annotation.-3/validations",
    ] {
        let response = get_auth(build_offline_app(), uri, USER).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{uri}");
        let json = body_json(response).await;
        assert_eq!(json["code"], "VALIDATION_ERROR", "{uri}");
    }
}

#[tokio::test]
async fn malformed_reference_in_selector_is_400() {
    let body = json!({"ids": ["annotation.1", "annotation.x"], "status": "validated"});
    let response = post_json(build_offline_app(), "/api/v1/annotations/status", USER, body).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn patch_with_malformed_reference_is_400() {
    let response = json_auth(
        build_offline_app(),
        Method::PATCH,
        "/api/v1/annotations/nope",
        USER,
        json!({"review_requested": true}),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ---------------------------------------------------------------------------
// Status change requests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unknown_target_status_is_400() {
    let body = json!({"ids": ["annotation.1"], "status": "archived"});
    let response = post_json(build_offline_app(), "/api/v1/annotations/status", USER, body).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert!(json["error"].as_str().unwrap().contains("archived"));
}

#[tokio::test]
async fn target_without_incoming_edge_is_400() {
    for status in ["new", "pre_released"] {
        let body = json!({"taxonomy_class_id": 4, "status": status});
        let response =
            post_json(build_offline_app(), "/api/v1/annotations/status", USER, body).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{status}");
    }
}

#[tokio::test]
async fn selector_needs_exactly_one_form() {
    let both = json!({"ids": ["annotation.1"], "taxonomy_class_id": 4, "status": "deleted"});
    let response = post_json(build_offline_app(), "/api/v1/annotations/status", USER, both).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let neither = json!({"status": "deleted"});
    let response =
        post_json(build_offline_app(), "/api/v1/annotations/status", USER, neither).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let empty = json!({"ids": [], "status": "deleted"});
    let response = post_json(build_offline_app(), "/api/v1/annotations/status", USER, empty).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ---------------------------------------------------------------------------
// Geometry and import payloads
// ---------------------------------------------------------------------------

#[tokio::test]
async fn import_rejects_non_feature_collection() {
    let body = json!({"type": "Feature", "geometry": null});
    let response = post_json(
        build_offline_app(),
        "/api/v1/annotations/import?taxonomy_id=1",
        USER,
        body,
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn import_rejects_open_rings_with_feature_index() {
    let body = json!({
        "type": "FeatureCollection",
        "features": [{
            "type": "Feature",
            "geometry": {"type": "Polygon", "coordinates": [[[0, 0], [1, 0], [1, 1], [0, 1]]]},
            "properties": {"code": "bld"}
        }]
    });
    let response = post_json(
        build_offline_app(),
        "/api/v1/annotations/import?taxonomy_id=1",
        USER,
        body,
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert!(json["error"].as_str().unwrap().starts_with("Feature 0"));
}

#[tokio::test]
async fn import_rejects_unsupported_crs() {
    let body = json!({
        "type": "FeatureCollection",
        "crs": {"type": "name", "properties": {"name": "WGS84"}},
        "features": []
    });
    let response = post_json(
        build_offline_app(),
        "/api/v1/annotations/import?taxonomy_id=1",
        USER,
        body,
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn import_rejects_crs_code_outside_srid_range() {
    let body = json!({
        "type": "FeatureCollection",
        "crs": {"type": "name", "properties": {"name": "EPSG:123456789"}},
        "features": []
    });
    let response = post_json(
        build_offline_app(),
        "/api/v1/annotations/import?taxonomy_id=1",
        USER,
        body,
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn create_rejects_negative_srid() {
    let body = json!({
        "taxonomy_class_id": 1,
        "geometry": {
            "type": "Polygon",
            "coordinates": [[[0, 0], [10, 0], [10, 10], [0, 10], [0, 0]]]
        },
        "srid": -1
    });
    let response = post_json(build_offline_app(), "/api/v1/annotations", USER, body).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["code"], "VALIDATION_ERROR");
    assert!(json["error"].as_str().unwrap().contains("SRID -1"));
}

#[tokio::test]
async fn edit_rejects_zero_srid() {
    let response = json_auth(
        build_offline_app(),
        Method::PATCH,
        "/api/v1/annotations/annotation.5",
        USER,
        json!({
            "geometry": {
                "type": "Polygon",
                "coordinates": [[[0, 0], [10, 0], [10, 10], [0, 10], [0, 0]]]
            },
            "srid": 0
        }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn containment_rejects_out_of_range_srid() {
    let body = json!({
        "geometries": [{
            "type": "Polygon",
            "coordinates": [[[0, 0], [10, 0], [10, 10], [0, 10], [0, 0]]]
        }],
        "srid": 1_000_000
    });
    let response =
        post_json(build_offline_app(), "/api/v1/images/containment", USER, body).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn image_registration_rejects_zero_srid() {
    let body = json!({
        "filename": "scene.tif",
        "sensor": "pleiades",
        "bands": "rgb",
        "bit_depth": 8,
        "trace": {
            "type": "Polygon",
            "coordinates": [[[0, 0], [10, 0], [10, 10], [0, 10], [0, 0]]]
        },
        "srid": 0
    });
    let response = post_json(build_offline_app(), "/api/v1/images", USER, body).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn containment_rejects_non_polygon_geometry() {
    let body = json!({"geometries": [{"type": "Point", "coordinates": [1.0, 2.0]}]});
    let response =
        post_json(build_offline_app(), "/api/v1/images/containment", USER, body).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert!(json["error"].as_str().unwrap().starts_with("Geometry 0"));
}

#[tokio::test]
async fn create_rejects_invalid_polygon() {
    let body = json!({
        "taxonomy_class_id": 1,
        "geometry": {"type": "Polygon", "coordinates": []}
    });
    let response = post_json(build_offline_app(), "/api/v1/annotations", USER, body).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn empty_patch_is_400() {
    let response = json_auth(
        build_offline_app(),
        Method::PATCH,
        "/api/v1/annotations/annotation.5",
        USER,
        json!({}),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ---------------------------------------------------------------------------
// Health and middleware
// ---------------------------------------------------------------------------

#[tokio::test]
async fn health_reports_degraded_without_database() {
    let response = get(build_offline_app(), "/health").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get("x-request-id").is_some());
    let json = body_json(response).await;
    assert_eq!(json["status"], "degraded");
    assert_eq!(json["db_healthy"], false);
    assert!(json["version"].is_string());
}

#[tokio::test]
async fn unknown_route_returns_404() {
    let response = get(build_offline_app(), "/api/v1/does-not-exist").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
