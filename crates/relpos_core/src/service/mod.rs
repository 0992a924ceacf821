//! Use-case services layered over repositories and the placement engine.

pub mod positioning_service;
