//! Persistence layer for orderable items.
//!
//! # Responsibility
//! - Define the position store contract consumed by the service layer.
//! - Isolate SQLite query details from placement logic.
//!
//! # Invariants
//! - Repository writes validate positions before persistence.
//! - Repository APIs return semantic errors (`NotFound`) in addition to DB
//!   transport errors.

pub mod item_repo;
