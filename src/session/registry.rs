//! Session registry and event routing
//!
//! This module provides the core SessionRegistry that owns all live draft
//! sessions, routes participant events into the state machine and series
//! progression, drives turn deadlines, and manages disconnect grace windows.
//!
//! Locking discipline: the session table is the only shared mutable
//! structure. Every operation mutates under the write lock in a short
//! critical section, collects the events to publish, and broadcasts after
//! the lock is released.

use crate::catalog::CatalogProvider;
use crate::config::DraftSettings;
use crate::error::{DraftRoomError, Result};
use crate::metrics::MetricsCollector;
use crate::protocol::broadcaster::Broadcaster;
use crate::protocol::messages::ServerEvent;
use crate::session::grace::GraceTable;
use crate::session::instance::{DraftSession, SelectionOutcome, SessionPhase};
use crate::session::series::{ResultOutcome, SideChoiceOutcome};
use crate::types::{
    DraftStarted, JoinRequest, MatchResult, SelectChampion, SessionId, SessionSnapshot, Side,
    SideChosen, TurnPhase, UserLeave, UserLeft,
};
use crate::utils::current_timestamp;
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockWriteGuard};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Timing knobs for the turn sequencer and grace manager
#[derive(Debug, Clone)]
pub struct DraftTiming {
    /// Wall-clock budget per ban/pick turn
    pub turn_time: Duration,
    /// Grace window after an implicit channel loss
    pub disconnect_grace: Duration,
    /// Grace window after an explicit leave signal
    pub leave_grace: Duration,
    /// Countdown broadcast interval
    pub tick_interval: Duration,
}

impl Default for DraftTiming {
    fn default() -> Self {
        Self {
            turn_time: Duration::from_secs(30),
            disconnect_grace: Duration::from_secs(10),
            leave_grace: Duration::from_secs(60),
            tick_interval: Duration::from_secs(1),
        }
    }
}

impl DraftTiming {
    pub fn from_settings(settings: &DraftSettings) -> Self {
        Self {
            turn_time: Duration::from_secs(settings.turn_seconds),
            disconnect_grace: Duration::from_secs(settings.disconnect_grace_seconds),
            leave_grace: Duration::from_secs(settings.leave_grace_seconds),
            tick_interval: Duration::from_millis(settings.tick_interval_ms),
        }
    }

    /// Turn budget as a chrono duration for deadline arithmetic
    fn turn_budget(&self) -> chrono::Duration {
        chrono::Duration::from_std(self.turn_time)
            .unwrap_or_else(|_| chrono::Duration::seconds(30))
    }
}

/// Statistics about registry operations
#[derive(Debug, Clone, Default)]
pub struct RegistryStats {
    /// Total number of sessions created
    pub sessions_created: u64,
    /// Total number of sessions destroyed
    pub sessions_torn_down: u64,
    /// Total number of drafts entered
    pub drafts_started: u64,
    /// Total number of drafts that resolved all turns
    pub drafts_completed: u64,
    /// Total number of completed series
    pub series_completed: u64,
    /// Current number of active sessions
    pub active_sessions: usize,
}

/// Outcome of one countdown tick
enum TickOutcome {
    /// Keep the timer chain alive
    Continue,
    /// Draft over, session gone, or this chain was superseded
    Stop,
}

/// The main session registry
pub struct SessionRegistry {
    /// Map of active sessions by identifier
    sessions: RwLock<HashMap<SessionId, DraftSession>>,
    /// Broadcast fan-out for session events
    broadcaster: Arc<dyn Broadcaster>,
    /// Read-only champion pool for timeout auto-picks
    catalog: Arc<dyn CatalogProvider>,
    /// Sequencer and grace timing
    timing: DraftTiming,
    /// Pending disconnect/leave grace timers
    grace: GraceTable,
    /// Registry statistics
    stats: RwLock<RegistryStats>,
    /// Metrics collector for recording lifecycle data
    metrics: Arc<MetricsCollector>,
}

impl SessionRegistry {
    /// Create a new session registry
    pub fn new(
        broadcaster: Arc<dyn Broadcaster>,
        catalog: Arc<dyn CatalogProvider>,
        timing: DraftTiming,
    ) -> Self {
        Self::with_metrics(broadcaster, catalog, timing, Arc::new(MetricsCollector::default()))
    }

    /// Create a new session registry with an explicit metrics collector
    pub fn with_metrics(
        broadcaster: Arc<dyn Broadcaster>,
        catalog: Arc<dyn CatalogProvider>,
        timing: DraftTiming,
        metrics: Arc<MetricsCollector>,
    ) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            broadcaster,
            catalog,
            timing,
            grace: GraceTable::new(),
            stats: RwLock::new(RegistryStats::default()),
            metrics,
        }
    }

    fn lock_sessions(
        &self,
    ) -> Result<RwLockWriteGuard<'_, HashMap<SessionId, DraftSession>>> {
        self.sessions
            .write()
            .map_err(|_| {
                DraftRoomError::InternalError {
                    message: "Failed to acquire sessions lock".to_string(),
                }
                .into()
            })
    }

    /// Handle a join: create-or-attach and broadcast the session status
    ///
    /// A rejoin with a previously-seen participant identifier cancels any
    /// pending grace timer for that participant.
    pub async fn join(self: &Arc<Self>, request: JoinRequest) -> Result<()> {
        if self
            .grace
            .cancel(&request.session_id, &request.participant_id)
        {
            debug!(
                "Cancelled pending grace timer for participant '{}' in session {}",
                request.participant_id, request.session_id
            );
        }

        let (snapshot, created) = {
            let mut sessions = self.lock_sessions()?;
            let created = !sessions.contains_key(&request.session_id);
            let session = sessions
                .entry(request.session_id.clone())
                .or_insert_with(|| DraftSession::new(&request));
            session.register_participant(&request.participant_id, request.side);
            (session.snapshot(), created)
        };

        if created {
            if let Ok(mut stats) = self.stats.write() {
                stats.sessions_created += 1;
                stats.active_sessions += 1;
            }
            self.metrics.record_session_created();
            info!(
                "Created session {} - {} vs {}, best of {}",
                request.session_id, request.team_blue, request.team_red, request.best_of
            );
        }

        info!(
            "Participant '{}' joined session {} as {}",
            request.participant_id, request.session_id, request.side
        );

        self.broadcaster
            .broadcast(&request.session_id, ServerEvent::RoomStatus(snapshot))
            .await
    }

    /// Mark a side ready; starts the draft when both sides are ready
    pub async fn ready(self: &Arc<Self>, session_id: &str, side: Side) -> Result<()> {
        let (snapshot, start) = {
            let mut sessions = self.lock_sessions()?;
            let Some(session) = sessions.get_mut(session_id) else {
                debug!("Ignoring ready for unknown session {}", session_id);
                return Ok(());
            };

            session.mark_ready(side);

            let start = if session.phase() == SessionPhase::AwaitingReady && session.both_ready()
            {
                session.begin_draft(self.timing.turn_budget(), current_timestamp());
                Some((
                    DraftStarted {
                        order: session.order().to_vec(),
                        current_game: session.series().current_game,
                        host_secret: session.host_secret().to_string(),
                    },
                    session.timer_generation(),
                ))
            } else {
                None
            };

            (session.snapshot(), start)
        };

        info!("Side {} ready in session {}", side, session_id);
        self.broadcaster
            .broadcast(session_id, ServerEvent::RoomStatus(snapshot))
            .await?;

        if let Some((started, generation)) = start {
            if let Ok(mut stats) = self.stats.write() {
                stats.drafts_started += 1;
            }
            self.metrics.record_draft_started();
            info!(
                "Draft started for session {} (game {})",
                session_id, started.current_game
            );

            self.broadcaster
                .broadcast(session_id, ServerEvent::StartDraft(started))
                .await?;

            let registry = Arc::clone(self);
            let session_id = session_id.to_string();
            tokio::spawn(async move {
                registry.run_turn_timer(session_id, generation).await;
            });
        }

        Ok(())
    }

    /// Handle a manual champion selection
    ///
    /// Applied only when the submitting side and phase match the active
    /// turn; mismatches are dropped without a reply.
    pub async fn select_champion(&self, request: SelectChampion) -> Result<()> {
        let applied = {
            let mut sessions = self.lock_sessions()?;
            let Some(session) = sessions.get_mut(&request.session_id) else {
                debug!(
                    "Ignoring selection for unknown session {}",
                    request.session_id
                );
                return Ok(());
            };

            match session.apply_selection(
                Some(request.champion.clone()),
                request.side,
                request.phase,
                self.timing.turn_budget(),
                current_timestamp(),
            ) {
                SelectionOutcome::Applied { resolved, finished } => {
                    let history = finished.then(|| session.history().to_vec());
                    Some((resolved, history))
                }
                SelectionOutcome::Ignored => {
                    debug!(
                        "Dropping out-of-turn selection in session {} - {} {} '{}'",
                        request.session_id, request.side, request.phase, request.champion
                    );
                    None
                }
            }
        };

        let Some((resolved, history)) = applied else {
            return Ok(());
        };

        self.metrics.record_turn_resolved("manual");
        self.broadcaster
            .broadcast(&request.session_id, ServerEvent::UpdateDraft(resolved))
            .await?;

        if let Some(history) = history {
            self.finish_draft(&request.session_id, history).await?;
        }

        Ok(())
    }

    /// Handle a game result posted by the host
    pub async fn match_result(&self, request: MatchResult) -> Result<()> {
        let outcome = {
            let mut sessions = self.lock_sessions()?;
            let Some(session) = sessions.get_mut(&request.session_id) else {
                debug!(
                    "Ignoring match result for unknown session {}",
                    request.session_id
                );
                return Ok(());
            };
            session.record_result(&request.winner_team_id, &request.host_secret)
        };

        match outcome {
            ResultOutcome::SeriesOver(final_score) => {
                if let Ok(mut stats) = self.stats.write() {
                    stats.series_completed += 1;
                }
                self.metrics.record_series_completed();
                info!(
                    "Series finished in session {} - blue {} : {} red",
                    request.session_id, final_score.wins_blue, final_score.wins_red
                );

                self.broadcaster
                    .broadcast(
                        &request.session_id,
                        ServerEvent::SeriesFinished(final_score),
                    )
                    .await?;

                // The session is a transient coordination artifact; with the
                // series decided nothing can reference it again.
                self.remove_session(&request.session_id, "completed");
            }
            ResultOutcome::AwaitSideChoice(prompt) => {
                info!(
                    "Game {} decided in session {}; {} side chooses colors",
                    prompt.next_game - 1,
                    request.session_id,
                    prompt.loser_side
                );
                self.broadcaster
                    .broadcast(&request.session_id, ServerEvent::ChooseSide(prompt))
                    .await?;
            }
            ResultOutcome::Ignored => {
                debug!(
                    "Dropping match result for session {} (bad secret, duplicate, or unknown team)",
                    request.session_id
                );
            }
        }

        Ok(())
    }

    /// Handle the loser's side choice for the next game
    pub async fn side_chosen(&self, request: SideChosen) -> Result<()> {
        let outcome = {
            let mut sessions = self.lock_sessions()?;
            let Some(session) = sessions.get_mut(&request.session_id) else {
                debug!(
                    "Ignoring side choice for unknown session {}",
                    request.session_id
                );
                return Ok(());
            };
            session.choose_side(
                request.loser_side,
                request.chosen_side,
                &request.host_secret,
            )
        };

        match outcome {
            SideChoiceOutcome::Advanced(next) => {
                info!(
                    "Session {} advancing to game {} - blue: {}, red: {}",
                    request.session_id, next.current_game, next.side_map.blue, next.side_map.red
                );
                self.broadcaster
                    .broadcast(&request.session_id, ServerEvent::NextDraft(next))
                    .await?;
            }
            SideChoiceOutcome::Ignored => {
                debug!(
                    "Dropping side choice for session {} (bad secret or none pending)",
                    request.session_id
                );
            }
        }

        Ok(())
    }

    /// Start the short grace window after an implicit channel loss
    pub async fn connection_lost(self: &Arc<Self>, session_id: &str, participant_id: &str) {
        self.start_grace(session_id, participant_id, self.timing.disconnect_grace)
            .await;
    }

    /// Start the long grace window after an explicit leave signal
    pub async fn user_leave(self: &Arc<Self>, request: UserLeave) {
        self.start_grace(
            &request.session_id,
            &request.participant_id,
            self.timing.leave_grace,
        )
        .await;
    }

    /// Arm a grace timer for a participant, replacing any pending one
    async fn start_grace(
        self: &Arc<Self>,
        session_id: &str,
        participant_id: &str,
        window: Duration,
    ) {
        let known = self
            .sessions
            .read()
            .map(|sessions| sessions.contains_key(session_id))
            .unwrap_or(false);
        if !known {
            debug!(
                "No grace timer for unknown session {} (participant '{}')",
                session_id, participant_id
            );
            return;
        }

        let generation = self.grace.arm(session_id, participant_id);
        debug!(
            "Armed {:?} grace timer for participant '{}' in session {}",
            window, participant_id, session_id
        );

        let registry = Arc::clone(self);
        let session_id = session_id.to_string();
        let participant_id = participant_id.to_string();
        tokio::spawn(async move {
            tokio::time::sleep(window).await;
            registry
                .expire_grace(&session_id, &participant_id, generation)
                .await;
        });
    }

    /// Tear the session down after an unanswered grace window
    ///
    /// Safe under reentrancy: a timer that was cancelled, replaced, or whose
    /// session is already gone detects it here and does nothing.
    async fn expire_grace(&self, session_id: &str, participant_id: &str, generation: u64) {
        if !self.grace.try_expire(session_id, participant_id, generation) {
            return;
        }

        let side = {
            let Ok(sessions) = self.sessions.read() else {
                return;
            };
            match sessions.get(session_id) {
                Some(session) => session.side_of_participant(participant_id),
                // Torn down through another path while we slept
                None => return,
            }
        };

        warn!(
            "Grace window expired for participant '{}' in session {}",
            participant_id, session_id
        );

        if let Some(side) = side {
            if let Err(e) = self
                .broadcaster
                .broadcast(session_id, ServerEvent::UserLeft(UserLeft { side }))
                .await
            {
                warn!("Failed to broadcast departure for session {}: {}", session_id, e);
            }
        }

        self.remove_session(session_id, "grace_expired");
    }

    /// Remove a session from the registry, updating stats and metrics
    fn remove_session(&self, session_id: &str, reason: &str) {
        let removed = self
            .sessions
            .write()
            .ok()
            .and_then(|mut sessions| sessions.remove(session_id));

        if removed.is_some() {
            if let Ok(mut stats) = self.stats.write() {
                stats.sessions_torn_down += 1;
                stats.active_sessions = stats.active_sessions.saturating_sub(1);
            }
            self.metrics.record_session_torn_down(reason);
            info!("Session {} torn down ({})", session_id, reason);
        }
    }

    /// Record a completed draft and broadcast the full history
    async fn finish_draft(
        &self,
        session_id: &str,
        history: Vec<crate::types::ResolvedTurn>,
    ) -> Result<()> {
        if let Ok(mut stats) = self.stats.write() {
            stats.drafts_completed += 1;
        }
        self.metrics.record_draft_completed();
        info!(
            "Draft finished for session {} with {} resolved turns",
            session_id,
            history.len()
        );

        self.broadcaster
            .broadcast(session_id, ServerEvent::DraftFinished(history))
            .await
    }

    /// Countdown loop for one draft
    ///
    /// Ticks immediately, then at the configured interval. The generation
    /// pins this chain to one draft: a later draft (or teardown) invalidates
    /// it, so a stale chain observes the mismatch and exits.
    async fn run_turn_timer(self: Arc<Self>, session_id: String, generation: u64) {
        loop {
            match self.turn_tick(&session_id, generation).await {
                TickOutcome::Continue => tokio::time::sleep(self.timing.tick_interval).await,
                TickOutcome::Stop => break,
            }
        }
    }

    /// One countdown tick: broadcast the remaining seconds and auto-resolve
    /// the turn once its deadline has passed
    async fn turn_tick(&self, session_id: &str, generation: u64) -> TickOutcome {
        let mut events: Vec<ServerEvent> = Vec::new();
        let mut outcome = TickOutcome::Continue;
        let mut timed_out = false;
        let mut draft_completed = false;
        let mut pool_exhausted = false;

        {
            let Ok(mut sessions) = self.sessions.write() else {
                return TickOutcome::Stop;
            };
            let Some(session) = sessions.get_mut(session_id) else {
                return TickOutcome::Stop;
            };
            if session.timer_generation() != generation
                || session.phase() != SessionPhase::Drafting
            {
                return TickOutcome::Stop;
            }

            let now = current_timestamp();
            events.push(ServerEvent::Timer(session.remaining_seconds(now)));

            if session.deadline_passed(now) {
                if let Some(slot) = session.current_slot() {
                    let champion = match slot.phase {
                        TurnPhase::Ban => Some(None),
                        TurnPhase::Pick => {
                            let choice = {
                                let taken = session.taken_champions();
                                self.catalog.random_excluding(&taken)
                            };
                            choice.map(Some)
                        }
                    };

                    match champion {
                        Some(champion) => {
                            if let SelectionOutcome::Applied { resolved, finished } = session
                                .apply_selection(
                                    champion,
                                    slot.side,
                                    slot.phase,
                                    self.timing.turn_budget(),
                                    now,
                                )
                            {
                                timed_out = true;
                                events.push(ServerEvent::UpdateDraft(resolved));
                                if finished {
                                    draft_completed = true;
                                    events.push(ServerEvent::DraftFinished(
                                        session.history().to_vec(),
                                    ));
                                    outcome = TickOutcome::Stop;
                                }
                            }
                        }
                        None => {
                            pool_exhausted = true;
                            outcome = TickOutcome::Stop;
                        }
                    }
                }
            }

            if pool_exhausted {
                sessions.remove(session_id);
            }
        }

        if pool_exhausted {
            error!(
                "{}",
                DraftRoomError::ChampionPoolExhausted {
                    session_id: session_id.to_string(),
                }
            );
            if let Ok(mut stats) = self.stats.write() {
                stats.sessions_torn_down += 1;
                stats.active_sessions = stats.active_sessions.saturating_sub(1);
            }
            self.metrics.record_session_torn_down("pool_exhausted");
            return TickOutcome::Stop;
        }

        if timed_out {
            self.metrics.record_turn_resolved("timeout");
        }
        if draft_completed {
            if let Ok(mut stats) = self.stats.write() {
                stats.drafts_completed += 1;
            }
            self.metrics.record_draft_completed();
            info!("Draft finished for session {} (turn timeout)", session_id);
        }

        for event in events {
            if let Err(e) = self.broadcaster.broadcast(session_id, event).await {
                warn!("Broadcast failed for session {}: {}", session_id, e);
            }
        }

        outcome
    }

    /// Whether a session identifier is currently active
    pub fn contains_session(&self, session_id: &str) -> bool {
        self.sessions
            .read()
            .map(|sessions| sessions.contains_key(session_id))
            .unwrap_or(false)
    }

    /// Number of currently active sessions
    pub fn session_count(&self) -> usize {
        self.sessions
            .read()
            .map(|sessions| sessions.len())
            .unwrap_or(0)
    }

    /// Snapshot of a session, if active
    pub fn snapshot(&self, session_id: &str) -> Option<SessionSnapshot> {
        self.sessions
            .read()
            .ok()
            .and_then(|sessions| sessions.get(session_id).map(|session| session.snapshot()))
    }

    /// Number of grace timers currently pending
    pub fn pending_grace_timers(&self) -> usize {
        self.grace.pending_count()
    }

    /// Get current registry statistics
    pub fn get_stats(&self) -> Result<RegistryStats> {
        let stats = self.stats.read().map_err(|_| {
            DraftRoomError::InternalError {
                message: "Failed to acquire stats lock".to_string(),
            }
        })?;

        Ok(stats.clone())
    }
}
