//! Annotation selectors for bulk status changes.
//!
//! Clients address annotations either by an explicit list of
//! `annotation.<integer>` references or by a taxonomy class scope.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::CoreError;
use crate::types::DbId;

/// Prefix of public annotation references.
pub const ANNOTATION_REF_PREFIX: &str = "annotation";

/// Maximum number of explicit references in one request.
pub const MAX_EXPLICIT_IDS: usize = 10_000;

static ANNOTATION_REF_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^annotation\.([0-9]{1,18})$").expect("valid regex"));

/// Parse an `annotation.<integer>` reference into its database id.
pub fn parse_annotation_ref(reference: &str) -> Result<DbId, CoreError> {
    ANNOTATION_REF_RE
        .captures(reference)
        .and_then(|caps| caps[1].parse::<DbId>().ok())
        .ok_or_else(|| {
            CoreError::Validation(format!(
                "Invalid annotation identifier '{reference}'. Expected '{ANNOTATION_REF_PREFIX}.<integer>'"
            ))
        })
}

/// Format a database id as a public annotation reference.
pub fn format_annotation_ref(id: DbId) -> String {
    format!("{ANNOTATION_REF_PREFIX}.{id}")
}

/// Which annotations a status change applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnnotationSelector {
    /// An explicit enumeration; all-or-nothing semantics.
    ExplicitIds(Vec<DbId>),
    /// Every annotation labelled with a class (optionally with its
    /// descendants); acts as a filter.
    TaxonomyScope {
        class_id: DbId,
        include_descendants: bool,
    },
}

impl AnnotationSelector {
    /// Build an explicit selector from public references.
    ///
    /// Duplicates are collapsed, first occurrence wins the ordering.
    pub fn from_refs<S: AsRef<str>>(refs: &[S]) -> Result<Self, CoreError> {
        if refs.is_empty() {
            return Err(CoreError::Validation(
                "At least one annotation identifier is required".to_string(),
            ));
        }
        if refs.len() > MAX_EXPLICIT_IDS {
            return Err(CoreError::Validation(format!(
                "Too many annotation identifiers ({}), maximum is {MAX_EXPLICIT_IDS}",
                refs.len()
            )));
        }

        let mut seen = HashSet::with_capacity(refs.len());
        let mut ids = Vec::with_capacity(refs.len());
        for r in refs {
            let id = parse_annotation_ref(r.as_ref())?;
            if seen.insert(id) {
                ids.push(id);
            }
        }
        Ok(Self::ExplicitIds(ids))
    }

    /// Build a selector from the optional request fields.
    ///
    /// Exactly one of `refs` and `class_id` must be given.
    pub fn from_parts(
        refs: Option<&[String]>,
        class_id: Option<DbId>,
        include_descendants: bool,
    ) -> Result<Self, CoreError> {
        match (refs, class_id) {
            (Some(refs), None) => Self::from_refs(refs),
            (None, Some(class_id)) => Ok(Self::TaxonomyScope {
                class_id,
                include_descendants,
            }),
            (Some(_), Some(_)) => Err(CoreError::Validation(
                "Provide either 'ids' or 'taxonomy_class_id', not both".to_string(),
            )),
            (None, None) => Err(CoreError::Validation(
                "Either 'ids' or 'taxonomy_class_id' is required".to_string(),
            )),
        }
    }

    /// True when every selected id must qualify for the request to proceed.
    pub fn is_all_or_nothing(&self) -> bool {
        matches!(self, Self::ExplicitIds(_))
    }
}
