//! Annotation moderation lifecycle.
//!
//! The status of an annotation only moves along the edges of
//! [`TRANSITIONS`]. Storage applies transitions as one conditional
//! set-based write whose predicate comes from [`source_states`];
//! [`plan_transition`] evaluates the same rules over rows already loaded
//! and decides whether an all-or-nothing request may proceed.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::selector::AnnotationSelector;
use crate::types::DbId;

/// Status ID type matching SMALLINT in the `annotation_statuses` table.
pub type StatusId = i16;

/// Annotation moderation status. Discriminants match the seed data of the
/// `annotation_statuses` lookup table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(i16)]
pub enum AnnotationStatus {
    New = 1,
    PreReleased = 2,
    Released = 3,
    Validated = 4,
    Rejected = 5,
    Deleted = 6,
}

impl AnnotationStatus {
    pub const ALL: [AnnotationStatus; 6] = [
        Self::New,
        Self::PreReleased,
        Self::Released,
        Self::Validated,
        Self::Rejected,
        Self::Deleted,
    ];

    /// Return the database status ID.
    pub fn id(self) -> StatusId {
        self as StatusId
    }

    pub fn from_id(id: StatusId) -> Result<Self, CoreError> {
        Self::ALL
            .into_iter()
            .find(|s| s.id() == id)
            .ok_or_else(|| CoreError::Internal(format!("Unknown annotation status id {id}")))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::PreReleased => "pre_released",
            Self::Released => "released",
            Self::Validated => "validated",
            Self::Rejected => "rejected",
            Self::Deleted => "deleted",
        }
    }

    /// Whether geometry, class and review flag may still be edited directly.
    pub fn is_editable(self) -> bool {
        matches!(self, Self::New | Self::PreReleased)
    }
}

impl fmt::Display for AnnotationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnnotationStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| {
                let valid: Vec<&str> = Self::ALL.iter().map(|s| s.as_str()).collect();
                CoreError::Validation(format!(
                    "Invalid annotation status '{s}'. Must be one of: {}",
                    valid.join(", ")
                ))
            })
    }
}

// ---------------------------------------------------------------------------
// Transition table
// ---------------------------------------------------------------------------

/// One legal edge of the lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionRule {
    pub from: AnnotationStatus,
    pub to: AnnotationStatus,
    /// Only the annotation's annotator may take this edge.
    pub owner_only: bool,
}

/// Every legal status transition. Anything not listed is refused.
pub const TRANSITIONS: &[TransitionRule] = &[
    TransitionRule {
        from: AnnotationStatus::New,
        to: AnnotationStatus::Deleted,
        owner_only: true,
    },
    TransitionRule {
        from: AnnotationStatus::New,
        to: AnnotationStatus::Released,
        owner_only: true,
    },
    TransitionRule {
        from: AnnotationStatus::Released,
        to: AnnotationStatus::Rejected,
        owner_only: false,
    },
    TransitionRule {
        from: AnnotationStatus::Released,
        to: AnnotationStatus::Validated,
        owner_only: false,
    },
];

/// Look up the rule for `from -> to`.
pub fn find_rule(from: AnnotationStatus, to: AnnotationStatus) -> Option<&'static TransitionRule> {
    TRANSITIONS.iter().find(|r| r.from == from && r.to == to)
}

/// Whether a user (owner or not) may move an annotation from `from` to `to`.
pub fn can_transition(from: AnnotationStatus, to: AnnotationStatus, is_owner: bool) -> bool {
    find_rule(from, to).is_some_and(|r| is_owner || !r.owner_only)
}

/// Reject targets that no edge of the table leads to.
pub fn validate_target(to: AnnotationStatus) -> Result<(), CoreError> {
    if TRANSITIONS.iter().any(|r| r.to == to) {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "Annotations cannot be moved to status '{to}'"
        )))
    }
}

/// Statuses with an edge into a target, split by ownership requirement.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceStates {
    /// Any user may take the edge from these.
    pub any_user: Vec<AnnotationStatus>,
    /// Only the annotator may take the edge from these.
    pub owner_only: Vec<AnnotationStatus>,
}

impl SourceStates {
    pub fn any_user_ids(&self) -> Vec<StatusId> {
        self.any_user.iter().map(|s| s.id()).collect()
    }

    pub fn owner_only_ids(&self) -> Vec<StatusId> {
        self.owner_only.iter().map(|s| s.id()).collect()
    }
}

/// Source statuses for `to`, used to build the conditional update predicate.
pub fn source_states(to: AnnotationStatus) -> SourceStates {
    let mut sources = SourceStates::default();
    for rule in TRANSITIONS.iter().filter(|r| r.to == to) {
        if rule.owner_only {
            sources.owner_only.push(rule.from);
        } else {
            sources.any_user.push(rule.from);
        }
    }
    sources
}

// ---------------------------------------------------------------------------
// Validation outcomes
// ---------------------------------------------------------------------------

/// Moderation decision recorded in `validation_events`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationOutcome {
    Validated,
    Rejected,
}

impl ValidationOutcome {
    /// The outcome recorded when moving to `target`, if any.
    pub fn from_target(target: AnnotationStatus) -> Option<Self> {
        match target {
            AnnotationStatus::Validated => Some(Self::Validated),
            AnnotationStatus::Rejected => Some(Self::Rejected),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Validated => "validated",
            Self::Rejected => "rejected",
        }
    }
}

impl fmt::Display for ValidationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Planning
// ---------------------------------------------------------------------------

/// The lifecycle-relevant part of an annotation row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnnotationState {
    pub id: DbId,
    pub status: AnnotationStatus,
    pub annotator_id: DbId,
}

/// Result of evaluating a transition request against current rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionPlan {
    pub target: AnnotationStatus,
    /// Rows with a legal edge into the target; these get written.
    pub to_update: Vec<DbId>,
    /// Rows already at the target; they qualify but are left untouched.
    pub unchanged: Vec<DbId>,
    /// Rows that do not qualify (only populated for filter selectors).
    pub excluded: Vec<DbId>,
    /// Decision to record for every updated row.
    pub outcome: Option<ValidationOutcome>,
}

impl TransitionPlan {
    pub fn qualifying_count(&self) -> usize {
        self.to_update.len() + self.unchanged.len()
    }
}

/// Evaluate `target` for `rows` on behalf of `acting_user`.
///
/// `rows` are the annotations matched by `selector`. For an explicit
/// selector every requested id must be present and qualify, otherwise the
/// request is refused as a whole; a taxonomy scope keeps whatever subset
/// qualifies.
pub fn plan_transition(
    selector: &AnnotationSelector,
    rows: &[AnnotationState],
    target: AnnotationStatus,
    acting_user: DbId,
) -> Result<TransitionPlan, CoreError> {
    validate_target(target)?;

    if let AnnotationSelector::ExplicitIds(ids) = selector {
        let present: HashSet<DbId> = rows.iter().map(|r| r.id).collect();
        if let Some(&missing) = ids.iter().find(|id| !present.contains(id)) {
            return Err(CoreError::NotFound {
                entity: "Annotation",
                id: missing,
            });
        }
    }

    let mut plan = TransitionPlan {
        target,
        to_update: Vec::new(),
        unchanged: Vec::new(),
        excluded: Vec::new(),
        outcome: ValidationOutcome::from_target(target),
    };

    for row in rows {
        if row.status == target {
            plan.unchanged.push(row.id);
        } else if can_transition(row.status, target, row.annotator_id == acting_user) {
            plan.to_update.push(row.id);
        } else {
            plan.excluded.push(row.id);
        }
    }

    if selector.is_all_or_nothing() && !plan.excluded.is_empty() {
        return Err(CoreError::Forbidden(format!(
            "{} of {} annotations cannot be moved to '{target}'; no annotation was changed",
            plan.excluded.len(),
            rows.len()
        )));
    }

    Ok(plan)
}
