//! Session broadcast fan-out
//!
//! The registry publishes state changes through the [`Broadcaster`] trait.
//! `ChannelBroadcaster` is the production implementation: every connected
//! participant registers an unbounded sender, and a broadcast clones the
//! event into each sender subscribed to the session. `RecordingBroadcaster`
//! captures events for assertions in tests.

use crate::error::{DraftRoomError, Result};
use crate::protocol::messages::ServerEvent;
use crate::types::{ParticipantId, SessionId};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, RwLock};
use tokio::sync::mpsc;
use tracing::debug;

/// Trait for publishing events to every channel of a session
#[async_trait]
pub trait Broadcaster: Send + Sync {
    /// Deliver `event` to all channels subscribed to `session_id`
    async fn broadcast(&self, session_id: &str, event: ServerEvent) -> Result<()>;
}

/// Production broadcaster backed by per-participant mpsc senders
#[derive(Default)]
pub struct ChannelBroadcaster {
    subscribers:
        RwLock<HashMap<SessionId, HashMap<ParticipantId, mpsc::UnboundedSender<ServerEvent>>>>,
}

impl ChannelBroadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a participant channel; a reconnect replaces the old sender
    pub fn subscribe(
        &self,
        session_id: &str,
        participant_id: &str,
        sender: mpsc::UnboundedSender<ServerEvent>,
    ) {
        if let Ok(mut subscribers) = self.subscribers.write() {
            subscribers
                .entry(session_id.to_string())
                .or_default()
                .insert(participant_id.to_string(), sender);
        }
    }

    /// Remove a participant channel, dropping the session entry when empty
    pub fn unsubscribe(&self, session_id: &str, participant_id: &str) {
        if let Ok(mut subscribers) = self.subscribers.write() {
            if let Some(channels) = subscribers.get_mut(session_id) {
                channels.remove(participant_id);
                if channels.is_empty() {
                    subscribers.remove(session_id);
                }
            }
        }
    }

    /// Number of channels currently subscribed to a session
    pub fn subscriber_count(&self, session_id: &str) -> usize {
        self.subscribers
            .read()
            .map(|subscribers| {
                subscribers
                    .get(session_id)
                    .map(|channels| channels.len())
                    .unwrap_or(0)
            })
            .unwrap_or(0)
    }
}

#[async_trait]
impl Broadcaster for ChannelBroadcaster {
    async fn broadcast(&self, session_id: &str, event: ServerEvent) -> Result<()> {
        let senders: Vec<(ParticipantId, mpsc::UnboundedSender<ServerEvent>)> = {
            let subscribers =
                self.subscribers
                    .read()
                    .map_err(|_| DraftRoomError::InternalError {
                        message: "Failed to acquire subscribers lock".to_string(),
                    })?;

            subscribers
                .get(session_id)
                .map(|channels| {
                    channels
                        .iter()
                        .map(|(id, tx)| (id.clone(), tx.clone()))
                        .collect()
                })
                .unwrap_or_default()
        };

        for (participant_id, sender) in senders {
            // A closed receiver just means the socket died before its grace
            // timer fired; the event is dropped for that channel only.
            if sender.send(event.clone()).is_err() {
                debug!(
                    "Dropping {} for disconnected participant '{}' in session {}",
                    event.name(),
                    participant_id,
                    session_id
                );
            }
        }

        Ok(())
    }
}

/// Recording broadcaster for tests
#[derive(Debug, Default)]
pub struct RecordingBroadcaster {
    events: Mutex<Vec<(SessionId, ServerEvent)>>,
}

impl RecordingBroadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    /// All events broadcast to a session, in order
    pub fn events_for(&self, session_id: &str) -> Vec<ServerEvent> {
        self.events
            .lock()
            .map(|events| {
                events
                    .iter()
                    .filter(|(id, _)| id == session_id)
                    .map(|(_, event)| event.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Count of events with the given wire name broadcast to a session
    pub fn count_of(&self, session_id: &str, name: &str) -> usize {
        self.events_for(session_id)
            .iter()
            .filter(|event| event.name() == name)
            .count()
    }

    /// Last event with the given wire name broadcast to a session
    pub fn last_of(&self, session_id: &str, name: &str) -> Option<ServerEvent> {
        self.events_for(session_id)
            .into_iter()
            .rev()
            .find(|event| event.name() == name)
    }

    /// Clear recorded events
    pub fn clear(&self) {
        if let Ok(mut events) = self.events.lock() {
            events.clear();
        }
    }
}

#[async_trait]
impl Broadcaster for RecordingBroadcaster {
    async fn broadcast(&self, session_id: &str, event: ServerEvent) -> Result<()> {
        if let Ok(mut events) = self.events.lock() {
            events.push((session_id.to_string(), event));
        }
        Ok(())
    }
}
