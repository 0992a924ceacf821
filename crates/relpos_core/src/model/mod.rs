//! Domain model for orderable records.
//!
//! # Invariants
//! - Every item is identified by a stable `ItemId` and belongs to exactly
//!   one container for its whole lifetime.
//! - `position = None` means "unplaced"; the field is updated, never removed.

pub mod item;
