//! Taxonomy and taxonomy class models.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use tessera_core::taxonomy::TaxonomyRow;
use tessera_core::types::{DbId, Timestamp};

/// A row from the `taxonomies` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Taxonomy {
    pub id: DbId,
    pub name: String,
    pub version: i32,
    pub description: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating a taxonomy.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateTaxonomy {
    pub name: String,
    pub version: Option<i32>,
    pub description: Option<String>,
}

/// A row from the `taxonomy_classes` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct TaxonomyClass {
    pub id: DbId,
    pub taxonomy_id: DbId,
    pub parent_id: Option<DbId>,
    pub code: String,
    pub names: Json<BTreeMap<String, String>>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl From<TaxonomyClass> for TaxonomyRow {
    fn from(class: TaxonomyClass) -> Self {
        TaxonomyRow {
            id: class.id,
            parent_id: class.parent_id,
            names: class.names.0,
            code: class.code,
        }
    }
}

/// DTO for creating a taxonomy class.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateTaxonomyClass {
    pub taxonomy_id: DbId,
    pub parent_id: Option<DbId>,
    pub code: String,
    pub names: BTreeMap<String, String>,
}
