//! Route definitions for images.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::image;
use crate::state::AppState;

/// Image routes, nested under `/images`.
///
/// ```text
/// GET    /                    list_images
/// POST   /                    create_image
/// POST   /containment         resolve_containment
/// GET    /{id}                get_image
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(image::list_images).post(image::create_image))
        .route("/containment", post(image::resolve_containment))
        .route("/{id}", get(image::get_image))
}
