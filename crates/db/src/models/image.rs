//! Image models. The footprint (`trace`) stays in the database; listing
//! queries never ship it.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use tessera_core::types::{DbId, Timestamp};

/// A row from the `images` table, without its footprint.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Image {
    pub id: DbId,
    pub filename: String,
    pub sensor: String,
    pub bands: String,
    pub bit_depth: i16,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for registering an image with its footprint.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateImage {
    pub filename: String,
    pub sensor: String,
    pub bands: String,
    pub bit_depth: i16,
    /// GeoJSON polygon of the footprint.
    pub trace: serde_json::Value,
    /// SRID the footprint is expressed in.
    pub srid: i32,
}
