//! Broadcast protocol for the draft coordination service
//!
//! This module defines the bidirectional event vocabulary spoken over each
//! participant channel and the broadcaster used to fan state changes out to
//! every channel subscribed to a session.

pub mod broadcaster;
pub mod messages;

// Re-export commonly used types
pub use broadcaster::{Broadcaster, ChannelBroadcaster, RecordingBroadcaster};
pub use messages::{ClientEvent, ServerEvent};
