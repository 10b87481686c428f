//! Multi-Source Lookup Engine Library
//!
//! This library crate defines the core modules of the person/vehicle lookup
//! engine. It serves as the foundation for the binary executable (`main.rs`).
//!
//! ## Architecture Modules
//! The system is composed of four loosely coupled subsystems:
//!
//! - **`executor`**: The worker pool. A coordinator task dispatches parameterized
//!   statements to isolated worker threads, each with private read-only SQLite
//!   connections, and recovers from worker crashes.
//! - **`datasets`**: One adapter per dataset file, exposing typed finders
//!   (`find_by_cpf`, `find_by_name`, ...) built on fixed statement templates.
//! - **`reference`**: The in-memory reference cache used to expand coded
//!   vehicle columns.
//! - **`search`**: The orchestrator. Normalizes input, fans out to datasets,
//!   filters by access level and merges the results.
//!
//! `config` and `context` wire these together at startup.

pub mod config;
pub mod context;
pub mod datasets;
pub mod executor;
pub mod reference;
pub mod search;

#[cfg(test)]
pub(crate) mod test_support;
