//! Route definitions for taxonomies and taxonomy classes.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::taxonomy;
use crate::state::AppState;

/// Taxonomy routes, nested under `/taxonomies`.
///
/// ```text
/// GET    /                    list_taxonomies
/// POST   /                    create_taxonomy
/// POST   /{id}/classes        create_class
/// GET    /{id}/tree           get_taxonomy_tree
/// GET    /{id}/statistics     get_statistics
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(taxonomy::list_taxonomies).post(taxonomy::create_taxonomy),
        )
        .route("/{id}/classes", post(taxonomy::create_class))
        .route("/{id}/tree", get(taxonomy::get_taxonomy_tree))
        .route("/{id}/statistics", get(taxonomy::get_statistics))
}

/// Class routes, nested under `/taxonomy-classes`.
///
/// ```text
/// GET    /{id}/tree           get_class_tree
/// ```
pub fn class_router() -> Router<AppState> {
    Router::new().route("/{id}/tree", get(taxonomy::get_class_tree))
}
