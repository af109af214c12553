//! Taxonomy tree loading.

use sqlx::PgConnection;
use tessera_core::error::CoreError;
use tessera_core::taxonomy::{build_tree, root_ids, select_root, TaxonomyNode, TaxonomyRow, TaxonomyTree};
use tessera_core::types::DbId;
use tessera_db::models::taxonomy::TaxonomyClass;
use tessera_db::repositories::TaxonomyRepo;

use crate::error::{AppError, AppResult};

/// All class rows of a taxonomy, failing with 404 when it does not exist.
pub async fn load_rows(conn: &mut PgConnection, taxonomy_id: DbId) -> AppResult<Vec<TaxonomyRow>> {
    TaxonomyRepo::find_by_id(&mut *conn, taxonomy_id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "Taxonomy",
            id: taxonomy_id,
        })?;
    let classes = TaxonomyRepo::list_classes(&mut *conn, taxonomy_id).await?;
    Ok(classes.into_iter().map(TaxonomyRow::from).collect())
}

/// Load a class, failing with 404 when it does not exist.
pub async fn find_class(conn: &mut PgConnection, class_id: DbId) -> AppResult<TaxonomyClass> {
    let class = TaxonomyRepo::find_class(&mut *conn, class_id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "TaxonomyClass",
            id: class_id,
        })?;
    Ok(class)
}

/// The tree of a taxonomy rooted at `root_id`, or at its only root.
pub async fn load_taxonomy_tree(
    conn: &mut PgConnection,
    taxonomy_id: DbId,
    root_id: Option<DbId>,
) -> AppResult<TaxonomyTree> {
    let rows = load_rows(conn, taxonomy_id).await?;
    let root = select_root(&rows, root_id)?;
    let tree = build_tree(rows, root).map_err(CoreError::from)?;
    tracing::debug!(taxonomy_id, root_id = root, classes = tree.class_count(), "Taxonomy tree loaded");
    Ok(tree)
}

/// The subtree rooted at `class_id`, assembled from its whole taxonomy.
pub async fn load_class_tree(conn: &mut PgConnection, class_id: DbId) -> AppResult<TaxonomyTree> {
    let class = find_class(conn, class_id).await?;
    let rows: Vec<TaxonomyRow> = TaxonomyRepo::list_classes(&mut *conn, class.taxonomy_id)
        .await?
        .into_iter()
        .map(TaxonomyRow::from)
        .collect();
    Ok(build_tree(rows, class_id).map_err(CoreError::from)?)
}

/// Nested view of every tree of a taxonomy, one per root, ordered by root id.
pub async fn load_forest(conn: &mut PgConnection, taxonomy_id: DbId) -> AppResult<Vec<TaxonomyNode>> {
    let rows = load_rows(conn, taxonomy_id).await?;
    root_ids(&rows)
        .into_iter()
        .map(|root| {
            build_tree(rows.clone(), root)
                .map(|tree| tree.to_nested())
                .map_err(|e| AppError::from(CoreError::from(e)))
        })
        .collect()
}
