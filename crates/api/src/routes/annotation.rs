//! Route definitions for annotations.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::annotation;
use crate::state::AppState;

/// Annotation routes, nested under `/annotations`.
///
/// ```text
/// POST   /                    create_annotation
/// POST   /import              import_annotations
/// POST   /status              change_status
/// GET    /{ref}               get_annotation
/// PATCH  /{ref}               update_annotation
/// GET    /{ref}/validations   list_validations
/// GET    /{ref}/logs          list_logs
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(annotation::create_annotation))
        .route("/import", post(annotation::import_annotations))
        .route("/status", post(annotation::change_status))
        .route(
            "/{reference}",
            get(annotation::get_annotation).patch(annotation::update_annotation),
        )
        .route("/{reference}/validations", get(annotation::list_validations))
        .route("/{reference}/logs", get(annotation::list_logs))
}
