//! Reference Data Module
//!
//! In-memory lookup tables used to expand coded vehicle columns
//! (`marca_modelo = 12345` becomes `{id, descricao, marca: {...}}`).
//!
//! ## Submodules
//! - **`cache`**: The immutable `category -> id -> entry` store.
//! - **`enrich`**: Vehicle record enrichment and UF to region mapping.

pub mod cache;
pub mod enrich;
