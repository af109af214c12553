//! Domain rules for the Tessera annotation backend.
//!
//! Everything in this crate is pure computation over values already fetched
//! from storage: taxonomy tree assembly, count aggregation, the annotation
//! status lifecycle, selector parsing, GeoJSON handling, and image
//! containment resolution. No I/O happens here.

pub mod aggregation;
pub mod change_log;
pub mod containment;
pub mod error;
pub mod geometry;
pub mod import;
pub mod lifecycle;
pub mod selector;
pub mod taxonomy;
pub mod types;
