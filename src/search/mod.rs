//! Search Service Module
//!
//! The entry point for lookups: one call per search kind, each fanning out
//! to the datasets that can answer it.
//!
//! ## Overview
//! This module bridges callers (CLI or an outer web layer) with the dataset
//! adapters. It owns input normalization and result shaping, and never
//! talks to SQLite directly.
//!
//! ## Responsibilities
//! - **Normalization**: CPF/CEP/phone digit rules, accent-free names, plates.
//! - **Fan-out**: concurrent lookups, with per-dataset failure isolation.
//! - **Policy**: access-level field filtering (`basic`, `medium`, `advanced`).
//! - **Enrichment**: reference expansion of vehicle records.
//!
//! ## Submodules
//! - **`engine`**: The `SearchService` orchestrator.
//! - **`normalizer`**: Input normalization and validation.
//! - **`policy`**: Access levels and per-dataset field lists.
//! - **`types`**: Search kinds, results and errors.

pub mod engine;
pub mod normalizer;
pub mod policy;
pub mod types;
