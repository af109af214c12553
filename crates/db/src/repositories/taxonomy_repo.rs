//! Repository for the `taxonomies` and `taxonomy_classes` tables.

use sqlx::{PgExecutor, PgPool};
use tessera_core::types::DbId;

use crate::models::taxonomy::{CreateTaxonomy, CreateTaxonomyClass, Taxonomy, TaxonomyClass};

/// Column list for taxonomies queries.
const TAXONOMY_COLUMNS: &str = "id, name, version, description, created_at, updated_at";

/// Column list for taxonomy_classes queries.
const CLASS_COLUMNS: &str = "id, taxonomy_id, parent_id, code, names, created_at, updated_at";

/// Provides CRUD operations for taxonomies and their classes.
pub struct TaxonomyRepo;

impl TaxonomyRepo {
    /// List all taxonomies, ordered by name then version.
    pub async fn list(pool: &PgPool) -> Result<Vec<Taxonomy>, sqlx::Error> {
        let query = format!("SELECT {TAXONOMY_COLUMNS} FROM taxonomies ORDER BY name, version");
        sqlx::query_as::<_, Taxonomy>(&query).fetch_all(pool).await
    }

    pub async fn find_by_id<'e, E>(executor: E, id: DbId) -> Result<Option<Taxonomy>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!("SELECT {TAXONOMY_COLUMNS} FROM taxonomies WHERE id = $1");
        sqlx::query_as::<_, Taxonomy>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Insert a taxonomy. Version defaults to 1.
    pub async fn create(pool: &PgPool, input: &CreateTaxonomy) -> Result<Taxonomy, sqlx::Error> {
        let query = format!(
            "INSERT INTO taxonomies (name, version, description)
             VALUES ($1, COALESCE($2, 1), $3)
             RETURNING {TAXONOMY_COLUMNS}"
        );
        sqlx::query_as::<_, Taxonomy>(&query)
            .bind(&input.name)
            .bind(input.version)
            .bind(&input.description)
            .fetch_one(pool)
            .await
    }

    /// All classes of a taxonomy, in storage order.
    ///
    /// No ordering is imposed: tree assembly does not depend on it.
    pub async fn list_classes<'e, E>(
        executor: E,
        taxonomy_id: DbId,
    ) -> Result<Vec<TaxonomyClass>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query =
            format!("SELECT {CLASS_COLUMNS} FROM taxonomy_classes WHERE taxonomy_id = $1");
        sqlx::query_as::<_, TaxonomyClass>(&query)
            .bind(taxonomy_id)
            .fetch_all(executor)
            .await
    }

    pub async fn find_class<'e, E>(executor: E, id: DbId) -> Result<Option<TaxonomyClass>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!("SELECT {CLASS_COLUMNS} FROM taxonomy_classes WHERE id = $1");
        sqlx::query_as::<_, TaxonomyClass>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Insert a class. The parent, when given, must already exist.
    pub async fn create_class(
        pool: &PgPool,
        input: &CreateTaxonomyClass,
    ) -> Result<TaxonomyClass, sqlx::Error> {
        let query = format!(
            "INSERT INTO taxonomy_classes (taxonomy_id, parent_id, code, names)
             VALUES ($1, $2, $3, $4)
             RETURNING {CLASS_COLUMNS}"
        );
        sqlx::query_as::<_, TaxonomyClass>(&query)
            .bind(input.taxonomy_id)
            .bind(input.parent_id)
            .bind(&input.code)
            .bind(sqlx::types::Json(&input.names))
            .fetch_one(pool)
            .await
    }
}
