pub mod annotation;
pub mod health;
pub mod image;
pub mod taxonomy;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /taxonomies                                 list, create
/// /taxonomies/{id}/classes                    create class (POST)
/// /taxonomies/{id}/tree                       one nested tree per root
/// /taxonomies/{id}/statistics                 aggregated counts (?status=&root_id=)
///
/// /taxonomy-classes/{id}/tree                 subtree rooted at a class
///
/// /images                                     list, register
/// /images/{id}                                get
/// /images/containment                         candidate images per geometry (POST)
///
/// /annotations                                create (POST)
/// /annotations/import                         import FeatureCollection (POST)
/// /annotations/status                         status transition (POST)
/// /annotations/{ref}                          get, edit (PATCH)
/// /annotations/{ref}/validations              validation history
/// /annotations/{ref}/logs                     change log
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/taxonomies", taxonomy::router())
        .nest("/taxonomy-classes", taxonomy::class_router())
        .nest("/images", image::router())
        .nest("/annotations", annotation::router())
}
