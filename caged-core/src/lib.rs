//! CAGED Core: domain types and the acquisition/normalization pipeline.
//!
//! This crate turns one monthly CAGED release into canonical records:
//! - Domain types (reference months, raw tables, canonical records, datasets)
//! - Cache-first archive fetching over FTP, FTPS or an HTTP mirror
//! - 7z extraction into a flat cache directory
//! - Semicolon-delimited flat-file loading with a row cap
//! - Header normalization, column resolution and numeric coercion
//! - Static code → label tables and the canonical columnar schema
//!
//! Orchestration across months lives in `caged-runner`.

pub mod data;
pub mod domain;
