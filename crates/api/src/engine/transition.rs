//! Status transitions over a selection of annotations.
//!
//! The selection is locked, planned against the transition table in memory,
//! then written with one conditional set-based update. The update predicate
//! is derived from the same table, so the rows it touches must be exactly
//! the planned ones; anything else aborts the transaction.

use serde::Serialize;
use sqlx::PgConnection;
use tessera_core::change_log::status_snapshot;
use tessera_core::error::CoreError;
use tessera_core::lifecycle::{
    plan_transition, source_states, validate_target, AnnotationState, AnnotationStatus,
};
use tessera_core::selector::{format_annotation_ref, AnnotationSelector};
use tessera_core::types::DbId;
use tessera_db::models::annotation::AnnotationScope;
use tessera_db::repositories::{AnnotationLogRepo, AnnotationRepo, ValidationEventRepo};
use tessera_db::DbPool;

use crate::engine::taxonomy::{find_class, load_class_tree};
use crate::error::AppResult;

/// Outcome of a status change request.
#[derive(Debug, Clone, Serialize)]
pub struct TransitionSummary {
    pub status: AnnotationStatus,
    /// Number of annotations whose status changed.
    pub updated: usize,
    /// Public references of the changed annotations, sorted by id.
    pub updated_ids: Vec<String>,
    /// Selected annotations already at the target status.
    pub unchanged: usize,
    /// Selected annotations left out because no legal edge applies.
    pub skipped: usize,
    /// Validation events recorded alongside the change.
    pub validation_events: u64,
}

/// Apply `target` to the annotations chosen by `selector` on behalf of `acting_user`.
pub async fn apply_transition(
    pool: &DbPool,
    selector: &AnnotationSelector,
    target: AnnotationStatus,
    acting_user: DbId,
) -> AppResult<TransitionSummary> {
    validate_target(target)?;

    let mut tx = pool.begin().await?;
    sqlx::query("SET TRANSACTION ISOLATION LEVEL SERIALIZABLE")
        .execute(&mut *tx)
        .await?;

    let scope = resolve_scope(&mut tx, selector).await?;
    let states = AnnotationRepo::lock_states(&mut tx, &scope)
        .await?
        .into_iter()
        .map(AnnotationState::try_from)
        .collect::<Result<Vec<_>, _>>()?;

    let plan = plan_transition(selector, &states, target, acting_user)?;

    let mut validation_events = 0;
    if !plan.to_update.is_empty() {
        let sources = source_states(target);
        let updated = AnnotationRepo::update_status_conditional(
            &mut tx,
            &scope,
            target.id(),
            acting_user,
            &sources.any_user_ids(),
            &sources.owner_only_ids(),
        )
        .await?;

        if updated != plan.to_update {
            return Err(CoreError::Internal(format!(
                "Status update touched {} rows, {} were planned",
                updated.len(),
                plan.to_update.len()
            ))
            .into());
        }

        if let Some(outcome) = plan.outcome {
            validation_events =
                ValidationEventRepo::record(&mut tx, &updated, acting_user, outcome).await?;
        }
        AnnotationLogRepo::record_many(&mut tx, &updated, acting_user, &status_snapshot(target))
            .await?;
    }

    tx.commit().await?;

    tracing::info!(
        user_id = acting_user,
        status = %target,
        updated = plan.to_update.len(),
        unchanged = plan.unchanged.len(),
        skipped = plan.excluded.len(),
        validation_events,
        "Annotation status transition applied"
    );

    Ok(TransitionSummary {
        status: target,
        updated: plan.to_update.len(),
        updated_ids: plan.to_update.iter().map(|&id| format_annotation_ref(id)).collect(),
        unchanged: plan.unchanged.len(),
        skipped: plan.excluded.len(),
        validation_events,
    })
}

/// Turn a selector into the row scope the store filters on.
async fn resolve_scope(
    conn: &mut PgConnection,
    selector: &AnnotationSelector,
) -> AppResult<AnnotationScope> {
    match selector {
        AnnotationSelector::ExplicitIds(ids) => Ok(AnnotationScope::Ids(ids.clone())),
        AnnotationSelector::TaxonomyScope {
            class_id,
            include_descendants: false,
        } => {
            find_class(conn, *class_id).await?;
            Ok(AnnotationScope::Classes(vec![*class_id]))
        }
        AnnotationSelector::TaxonomyScope {
            class_id,
            include_descendants: true,
        } => {
            let tree = load_class_tree(conn, *class_id).await?;
            let ids = tree
                .descendant_ids(*class_id)
                .unwrap_or_else(|| vec![*class_id]);
            Ok(AnnotationScope::Classes(ids))
        }
    }
}
