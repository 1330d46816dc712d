//! Session management for the draft coordination service
//!
//! This module owns live session state: the per-session draft state machine,
//! series progression, the in-memory registry routing participant events, and
//! the reconnection grace manager.

pub mod grace;
pub mod instance;
pub mod registry;
pub mod series;

// Re-export commonly used types
pub use grace::GraceTable;
pub use instance::{ban_pick_order, DraftSession, SelectionOutcome, SessionPhase, DRAFT_TURNS};
pub use registry::{DraftTiming, RegistryStats, SessionRegistry};
pub use series::{wins_needed, ResultOutcome, SeriesScore, SideChoiceOutcome};
