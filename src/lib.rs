//! Draft Room - real-time champion draft coordination service
//!
//! This crate coordinates turn-based ban/pick drafts between two teams over
//! persistent WebSocket channels, progressing best-of-N series with side
//! swapping between games.

pub mod catalog;
pub mod config;
pub mod error;
pub mod metrics;
pub mod protocol;
pub mod service;
pub mod session;
pub mod types;
pub mod utils;

// Re-export commonly used types and traits
pub use error::{DraftRoomError, Result};
pub use types::*;

// Re-export key components
pub use catalog::{CatalogProvider, ChampionCatalog};
pub use protocol::{Broadcaster, ClientEvent, ServerEvent};
pub use session::{DraftTiming, SessionRegistry};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
