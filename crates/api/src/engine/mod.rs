//! Operations spanning several repositories inside one transaction.
//!
//! Handlers parse and authenticate; the engine loads what the pure rules in
//! `tessera_core` need, evaluates them, and writes the outcome. Any error
//! drops the open transaction, which rolls it back.

pub mod edit;
pub mod footprint;
pub mod import;
pub mod taxonomy;
pub mod transition;
