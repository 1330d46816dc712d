//! Champion catalog for the draft coordination service
//!
//! The catalog is the static list of selectable champion identifiers, fetched
//! once at startup and read-only afterward. Timeout auto-picks draw from it.

pub mod loader;

// Re-export commonly used types
pub use loader::{load_catalog, CatalogProvider, ChampionCatalog};
