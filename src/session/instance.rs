//! Draft session state machine
//!
//! This module contains the per-session state: ready gating, the fixed
//! ban/pick turn order, turn resolution with deadlines, and series
//! progression hooks. All methods are pure state transitions; timers and
//! broadcasts are driven by the registry.

use crate::session::series::{
    wins_needed, ResultOutcome, SeriesScore, SideChoiceOutcome,
};
use crate::types::{
    ChooseSide, JoinRequest, NextDraft, ParticipantId, ResolvedTurn, SeriesFinished,
    SessionId, SessionSnapshot, Side, SideMap, TeamId, TurnPhase, TurnSlot,
};
use crate::utils::{current_timestamp, remaining_whole_seconds};
use chrono::{DateTime, Duration, Utc};
use std::collections::{HashMap, HashSet};

/// Length of the fixed ban/pick order
pub const DRAFT_TURNS: usize = 20;

/// The fixed tournament ban/pick order: three ban/pick cycles with
/// alternating starting sides, twenty turns in total.
pub fn ban_pick_order() -> Vec<TurnSlot> {
    vec![
        TurnSlot::ban(Side::Blue),
        TurnSlot::ban(Side::Red),
        TurnSlot::ban(Side::Blue),
        TurnSlot::ban(Side::Red),
        TurnSlot::ban(Side::Blue),
        TurnSlot::ban(Side::Red),
        TurnSlot::pick(Side::Blue),
        TurnSlot::pick(Side::Red),
        TurnSlot::pick(Side::Red),
        TurnSlot::pick(Side::Blue),
        TurnSlot::pick(Side::Blue),
        TurnSlot::pick(Side::Red),
        TurnSlot::ban(Side::Red),
        TurnSlot::ban(Side::Blue),
        TurnSlot::ban(Side::Red),
        TurnSlot::ban(Side::Blue),
        TurnSlot::pick(Side::Red),
        TurnSlot::pick(Side::Blue),
        TurnSlot::pick(Side::Blue),
        TurnSlot::pick(Side::Red),
    ]
}

/// Possible states of a session
///
/// A session is never in more than one of these at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Waiting for both sides to signal ready
    AwaitingReady,
    /// Working through the ban/pick order
    Drafting,
    /// Draft complete, waiting for the host to post the game result
    AwaitingResult,
    /// Series continues, waiting for the loser's side choice
    ChoosingSide,
    /// Series decided (terminal state)
    SeriesFinished,
}

impl SessionPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionPhase::AwaitingReady => "awaiting-ready",
            SessionPhase::Drafting => "drafting",
            SessionPhase::AwaitingResult => "awaiting-result",
            SessionPhase::ChoosingSide => "choosing-side",
            SessionPhase::SeriesFinished => "series-finished",
        }
    }
}

/// Outcome of submitting a turn resolution
#[derive(Debug, Clone, PartialEq)]
pub enum SelectionOutcome {
    /// The turn matched `order[turn_index]` and was appended to the history
    Applied {
        resolved: ResolvedTurn,
        /// True when this was the final turn of the draft
        finished: bool,
    },
    /// Wrong side, wrong phase, or not drafting; state unchanged
    Ignored,
}

/// One coordinated draft-and-series unit
#[derive(Debug, Clone)]
pub struct DraftSession {
    session_id: SessionId,
    host_secret: String,
    best_of: u32,
    mode: String,
    team_blue: TeamId,
    team_red: TeamId,
    side_map: SideMap,
    blue_ready: bool,
    red_ready: bool,
    phase: SessionPhase,
    order: Vec<TurnSlot>,
    turn_index: usize,
    history: Vec<ResolvedTurn>,
    deadline: Option<DateTime<Utc>>,
    series: SeriesScore,
    participants: HashMap<ParticipantId, Side>,
    timer_generation: u64,
    created_at: DateTime<Utc>,
}

impl DraftSession {
    /// Create a session from the first join request it sees
    pub fn new(request: &JoinRequest) -> Self {
        Self {
            session_id: request.session_id.clone(),
            host_secret: request.host_secret.clone(),
            best_of: request.best_of,
            mode: request.mode.clone(),
            team_blue: request.team_blue.clone(),
            team_red: request.team_red.clone(),
            side_map: SideMap::new(request.team_blue.clone(), request.team_red.clone()),
            blue_ready: false,
            red_ready: false,
            phase: SessionPhase::AwaitingReady,
            order: Vec::new(),
            turn_index: 0,
            history: Vec::new(),
            deadline: None,
            series: SeriesScore::new(&request.team_blue, &request.team_red),
            participants: HashMap::new(),
            timer_generation: 0,
            created_at: current_timestamp(),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn host_secret(&self) -> &str {
        &self.host_secret
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn order(&self) -> &[TurnSlot] {
        &self.order
    }

    pub fn turn_index(&self) -> usize {
        self.turn_index
    }

    pub fn history(&self) -> &[ResolvedTurn] {
        &self.history
    }

    pub fn series(&self) -> &SeriesScore {
        &self.series
    }

    pub fn side_map(&self) -> &SideMap {
        &self.side_map
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Generation of the currently valid timer chain; a scheduled tick
    /// carrying an older generation must treat itself as cancelled
    pub fn timer_generation(&self) -> u64 {
        self.timer_generation
    }

    /// Record (or re-record) a participant's asserted side
    ///
    /// The participant identifier is the stable key that survives
    /// reconnects; the caller's role is trusted as-is.
    pub fn register_participant(&mut self, participant_id: &str, side: Side) {
        self.participants.insert(participant_id.to_string(), side);
    }

    /// Side attributed to a participant, if it ever joined this session
    pub fn side_of_participant(&self, participant_id: &str) -> Option<Side> {
        self.participants.get(participant_id).copied()
    }

    /// Mark a side ready; only meaningful while awaiting readiness
    pub fn mark_ready(&mut self, side: Side) {
        if self.phase != SessionPhase::AwaitingReady {
            return;
        }
        match side {
            Side::Blue => self.blue_ready = true,
            Side::Red => self.red_ready = true,
        }
    }

    pub fn both_ready(&self) -> bool {
        self.blue_ready && self.red_ready
    }

    /// Enter the drafting state
    ///
    /// Generates the fixed order, resets the cursor and history, arms the
    /// first deadline and invalidates any previous timer chain.
    pub fn begin_draft(&mut self, turn_budget: Duration, now: DateTime<Utc>) {
        self.phase = SessionPhase::Drafting;
        self.order = ban_pick_order();
        self.turn_index = 0;
        self.history.clear();
        self.deadline = Some(now + turn_budget);
        self.series.result_posted = false;
        self.timer_generation += 1;
    }

    /// The turn descriptor the session currently expects, if drafting
    pub fn current_slot(&self) -> Option<TurnSlot> {
        if self.phase != SessionPhase::Drafting {
            return None;
        }
        self.order.get(self.turn_index).copied()
    }

    /// Whole seconds left on the current turn
    pub fn remaining_seconds(&self, now: DateTime<Utc>) -> u64 {
        self.deadline
            .map(|deadline| remaining_whole_seconds(deadline, now))
            .unwrap_or(0)
    }

    /// Whether the current turn's deadline has passed
    pub fn deadline_passed(&self, now: DateTime<Utc>) -> bool {
        self.deadline.is_some_and(|deadline| now >= deadline)
    }

    /// Champions no longer available for auto-picks
    pub fn taken_champions(&self) -> HashSet<&str> {
        self.history
            .iter()
            .filter_map(|turn| turn.champion.as_deref())
            .collect()
    }

    /// Resolve the current turn
    ///
    /// Applied only when `(side, phase)` matches `order[turn_index]` exactly;
    /// anything else leaves the session untouched. On the final turn the
    /// session moves to awaiting the game result and the timer chain is
    /// invalidated.
    pub fn apply_selection(
        &mut self,
        champion: Option<String>,
        side: Side,
        phase: TurnPhase,
        turn_budget: Duration,
        now: DateTime<Utc>,
    ) -> SelectionOutcome {
        let Some(slot) = self.current_slot() else {
            return SelectionOutcome::Ignored;
        };

        if slot.side != side || slot.phase != phase {
            return SelectionOutcome::Ignored;
        }

        let resolved = ResolvedTurn {
            champion,
            side,
            phase,
        };
        self.history.push(resolved.clone());
        self.turn_index += 1;

        let finished = self.turn_index >= self.order.len();
        if finished {
            self.phase = SessionPhase::AwaitingResult;
            self.deadline = None;
            self.timer_generation += 1;
        } else {
            self.deadline = Some(now + turn_budget);
        }

        SelectionOutcome::Applied { resolved, finished }
    }

    /// Post a game result
    ///
    /// No-op unless the host secret matches and no result has been posted
    /// for the current game (a second post is ignored, making the operation
    /// idempotent). Results naming a team outside this series are dropped.
    pub fn record_result(&mut self, winner_team_id: &str, host_secret: &str) -> ResultOutcome {
        if host_secret != self.host_secret
            || self.series.result_posted
            || self.series.over
            || !self.series.knows_team(winner_team_id)
        {
            return ResultOutcome::Ignored;
        }

        self.series.result_posted = true;
        self.series.record_win(winner_team_id);

        if self.series.wins_for(winner_team_id) >= wins_needed(self.best_of) {
            self.series.over = true;
            self.phase = SessionPhase::SeriesFinished;
            self.timer_generation += 1;

            return ResultOutcome::SeriesOver(SeriesFinished {
                wins_blue: self.series.wins_for(self.side_map.team_on(Side::Blue)),
                wins_red: self.series.wins_for(self.side_map.team_on(Side::Red)),
            });
        }

        let loser_team = if winner_team_id == self.team_blue {
            self.team_red.clone()
        } else {
            self.team_blue.clone()
        };
        let Some(loser_side) = self.side_map.side_of(&loser_team) else {
            return ResultOutcome::Ignored;
        };

        self.blue_ready = false;
        self.red_ready = false;
        self.phase = SessionPhase::ChoosingSide;

        ResultOutcome::AwaitSideChoice(ChooseSide {
            loser_side,
            next_game: self.series.current_game + 1,
        })
    }

    /// Apply the loser's side choice for the next game
    ///
    /// Accepted only with the host secret and only while a choice is
    /// pending. Choosing the side the loser already occupies keeps the
    /// current colors; anything else swaps the side map exactly once. Team
    /// identifiers in the win table are never touched.
    pub fn choose_side(
        &mut self,
        loser_side: Side,
        chosen_side: Side,
        host_secret: &str,
    ) -> SideChoiceOutcome {
        if host_secret != self.host_secret || self.phase != SessionPhase::ChoosingSide {
            return SideChoiceOutcome::Ignored;
        }

        if chosen_side != loser_side {
            self.side_map.swap();
        }

        self.series.current_game += 1;
        self.phase = SessionPhase::AwaitingReady;

        SideChoiceOutcome::Advanced(NextDraft {
            current_game: self.series.current_game,
            side_map: self.side_map.clone(),
        })
    }

    /// Full session view for the `room-status` broadcast
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            session_id: self.session_id.clone(),
            team_blue: self.team_blue.clone(),
            team_red: self.team_red.clone(),
            best_of: self.best_of,
            mode: self.mode.clone(),
            blue_ready: self.blue_ready,
            red_ready: self.red_ready,
            side_map: self.side_map.clone(),
            phase: self.phase.as_str().to_string(),
            order: self.order.clone(),
            turn_index: self.turn_index,
            history: self.history.clone(),
            series: self.series.snapshot(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_join_request() -> JoinRequest {
        JoinRequest {
            session_id: "R1".to_string(),
            side: Side::Blue,
            participant_id: "p-blue".to_string(),
            team_blue: "T1".to_string(),
            team_red: "GEN".to_string(),
            best_of: 3,
            mode: "tournament".to_string(),
            host_secret: "s3cret".to_string(),
        }
    }

    fn drafting_session() -> DraftSession {
        let mut session = DraftSession::new(&test_join_request());
        session.mark_ready(Side::Blue);
        session.mark_ready(Side::Red);
        session.begin_draft(Duration::seconds(30), current_timestamp());
        session
    }

    /// Resolve every turn in order with distinct champions
    fn run_full_draft(session: &mut DraftSession) {
        for i in 0..DRAFT_TURNS {
            let slot = session.current_slot().unwrap();
            let outcome = session.apply_selection(
                Some(format!("Champ{}", i)),
                slot.side,
                slot.phase,
                Duration::seconds(30),
                current_timestamp(),
            );
            assert!(matches!(outcome, SelectionOutcome::Applied { .. }));
        }
    }

    #[test]
    fn test_ban_pick_order_pattern() {
        let order = ban_pick_order();
        assert_eq!(order.len(), DRAFT_TURNS);

        let expected: Vec<(TurnPhase, Side)> = vec![
            (TurnPhase::Ban, Side::Blue),
            (TurnPhase::Ban, Side::Red),
            (TurnPhase::Ban, Side::Blue),
            (TurnPhase::Ban, Side::Red),
            (TurnPhase::Ban, Side::Blue),
            (TurnPhase::Ban, Side::Red),
            (TurnPhase::Pick, Side::Blue),
            (TurnPhase::Pick, Side::Red),
            (TurnPhase::Pick, Side::Red),
            (TurnPhase::Pick, Side::Blue),
            (TurnPhase::Pick, Side::Blue),
            (TurnPhase::Pick, Side::Red),
            (TurnPhase::Ban, Side::Red),
            (TurnPhase::Ban, Side::Blue),
            (TurnPhase::Ban, Side::Red),
            (TurnPhase::Ban, Side::Blue),
            (TurnPhase::Pick, Side::Red),
            (TurnPhase::Pick, Side::Blue),
            (TurnPhase::Pick, Side::Blue),
            (TurnPhase::Pick, Side::Red),
        ];
        let actual: Vec<(TurnPhase, Side)> =
            order.iter().map(|slot| (slot.phase, slot.side)).collect();
        assert_eq!(actual, expected);
    }

    #[test]
    fn test_session_starts_awaiting_ready() {
        let session = DraftSession::new(&test_join_request());
        assert_eq!(session.phase(), SessionPhase::AwaitingReady);
        assert!(!session.both_ready());
        assert!(session.current_slot().is_none());
        assert_eq!(session.series().current_game, 1);
    }

    #[test]
    fn test_ready_gating_and_draft_entry() {
        let mut session = DraftSession::new(&test_join_request());
        session.mark_ready(Side::Blue);
        assert!(!session.both_ready());

        session.mark_ready(Side::Red);
        assert!(session.both_ready());

        let before = session.timer_generation();
        session.begin_draft(Duration::seconds(30), current_timestamp());
        assert_eq!(session.phase(), SessionPhase::Drafting);
        assert_eq!(session.order().len(), DRAFT_TURNS);
        assert_eq!(session.turn_index(), 0);
        assert!(session.history().is_empty());
        assert!(!session.series().result_posted);
        assert_eq!(session.timer_generation(), before + 1);
        assert_eq!(
            session.current_slot(),
            Some(TurnSlot::ban(Side::Blue))
        );
    }

    #[test]
    fn test_mismatched_selection_is_ignored() {
        let mut session = drafting_session();
        let budget = Duration::seconds(30);
        let now = current_timestamp();

        // First slot is ban(blue): wrong side, then wrong phase
        let wrong_side = session.apply_selection(
            Some("Ahri".to_string()),
            Side::Red,
            TurnPhase::Ban,
            budget,
            now,
        );
        assert_eq!(wrong_side, SelectionOutcome::Ignored);

        let wrong_phase = session.apply_selection(
            Some("Ahri".to_string()),
            Side::Blue,
            TurnPhase::Pick,
            budget,
            now,
        );
        assert_eq!(wrong_phase, SelectionOutcome::Ignored);

        assert_eq!(session.turn_index(), 0);
        assert!(session.history().is_empty());
    }

    #[test]
    fn test_history_length_tracks_turn_index() {
        let mut session = drafting_session();
        let budget = Duration::seconds(30);

        for i in 0..6 {
            let slot = session.current_slot().unwrap();
            session.apply_selection(
                Some(format!("Ban{}", i)),
                slot.side,
                slot.phase,
                budget,
                current_timestamp(),
            );
            assert_eq!(session.history().len(), session.turn_index());
        }
        assert_eq!(session.turn_index(), 6);
    }

    #[test]
    fn test_full_draft_reaches_awaiting_result() {
        let mut session = drafting_session();
        run_full_draft(&mut session);

        assert_eq!(session.turn_index(), DRAFT_TURNS);
        assert_eq!(session.history().len(), DRAFT_TURNS);
        assert_eq!(session.phase(), SessionPhase::AwaitingResult);
        assert!(session.current_slot().is_none());

        // Further selections are dropped
        let outcome = session.apply_selection(
            Some("Late".to_string()),
            Side::Red,
            TurnPhase::Pick,
            Duration::seconds(30),
            current_timestamp(),
        );
        assert_eq!(outcome, SelectionOutcome::Ignored);
        assert_eq!(session.history().len(), DRAFT_TURNS);
    }

    #[test]
    fn test_taken_champions_skips_null_bans() {
        let mut session = drafting_session();
        let budget = Duration::seconds(30);
        let now = current_timestamp();

        // Timed-out ban records no champion
        session.apply_selection(None, Side::Blue, TurnPhase::Ban, budget, now);
        session.apply_selection(Some("Jinx".to_string()), Side::Red, TurnPhase::Ban, budget, now);

        let taken = session.taken_champions();
        assert_eq!(taken.len(), 1);
        assert!(taken.contains("Jinx"));
    }

    #[test]
    fn test_deadline_tracking() {
        let mut session = DraftSession::new(&test_join_request());
        let now = current_timestamp();
        session.mark_ready(Side::Blue);
        session.mark_ready(Side::Red);
        session.begin_draft(Duration::seconds(30), now);

        assert_eq!(session.remaining_seconds(now), 30);
        assert!(!session.deadline_passed(now));
        assert!(session.deadline_passed(now + Duration::seconds(30)));
        assert_eq!(session.remaining_seconds(now + Duration::seconds(31)), 0);
    }

    #[test]
    fn test_result_requires_secret_and_is_idempotent() {
        let mut session = drafting_session();
        run_full_draft(&mut session);

        assert_eq!(
            session.record_result("T1", "wrong"),
            ResultOutcome::Ignored
        );
        assert_eq!(
            session.record_result("DRX", "s3cret"),
            ResultOutcome::Ignored
        );

        let outcome = session.record_result("T1", "s3cret");
        assert_eq!(
            outcome,
            ResultOutcome::AwaitSideChoice(ChooseSide {
                loser_side: Side::Red,
                next_game: 2,
            })
        );
        assert_eq!(session.phase(), SessionPhase::ChoosingSide);
        assert!(!session.both_ready());

        // Second post for the same game is ignored
        assert_eq!(
            session.record_result("GEN", "s3cret"),
            ResultOutcome::Ignored
        );
        assert_eq!(session.series().wins_for("GEN"), 0);
    }

    #[test]
    fn test_series_over_at_threshold() {
        let mut session = drafting_session();
        run_full_draft(&mut session);

        // Game 1: T1 wins
        session.record_result("T1", "s3cret");
        session.choose_side(Side::Red, Side::Red, "s3cret");

        // Game 2: T1 wins again, reaching ceil(3/2) = 2
        session.mark_ready(Side::Blue);
        session.mark_ready(Side::Red);
        session.begin_draft(Duration::seconds(30), current_timestamp());
        run_full_draft(&mut session);

        let outcome = session.record_result("T1", "s3cret");
        assert_eq!(
            outcome,
            ResultOutcome::SeriesOver(SeriesFinished {
                wins_blue: 2,
                wins_red: 0,
            })
        );
        assert_eq!(session.phase(), SessionPhase::SeriesFinished);
        assert!(session.series().over);
    }

    #[test]
    fn test_side_swap_applied_exactly_once() {
        let mut session = drafting_session();
        run_full_draft(&mut session);

        // GEN (red side) loses and chooses blue for game 2
        session.record_result("T1", "s3cret");
        let outcome = session.choose_side(Side::Red, Side::Blue, "s3cret");

        match outcome {
            SideChoiceOutcome::Advanced(next) => {
                assert_eq!(next.current_game, 2);
                assert_eq!(next.side_map.blue, "GEN");
                assert_eq!(next.side_map.red, "T1");
            }
            SideChoiceOutcome::Ignored => panic!("side choice should advance the series"),
        }

        // Win table still keyed by team identifiers
        assert_eq!(session.series().wins_for("T1"), 1);
        assert_eq!(session.phase(), SessionPhase::AwaitingReady);

        // A second choice without a pending prompt is ignored
        assert_eq!(
            session.choose_side(Side::Red, Side::Red, "s3cret"),
            SideChoiceOutcome::Ignored
        );
        assert_eq!(session.series().current_game, 2);
    }

    #[test]
    fn test_keeping_sides_skips_swap() {
        let mut session = drafting_session();
        run_full_draft(&mut session);

        session.record_result("T1", "s3cret");
        let outcome = session.choose_side(Side::Red, Side::Red, "s3cret");

        match outcome {
            SideChoiceOutcome::Advanced(next) => {
                assert_eq!(next.side_map.blue, "T1");
                assert_eq!(next.side_map.red, "GEN");
            }
            SideChoiceOutcome::Ignored => panic!("side choice should advance the series"),
        }
    }

    #[test]
    fn test_side_choice_requires_secret() {
        let mut session = drafting_session();
        run_full_draft(&mut session);
        session.record_result("T1", "s3cret");

        assert_eq!(
            session.choose_side(Side::Red, Side::Blue, "guess"),
            SideChoiceOutcome::Ignored
        );
        assert_eq!(session.side_map().blue, "T1");
    }

    #[test]
    fn test_series_finished_counts_follow_side_map() {
        let mut session = drafting_session();
        run_full_draft(&mut session);

        // Game 1: T1 (blue) wins; loser GEN takes blue for game 2
        session.record_result("T1", "s3cret");
        session.choose_side(Side::Red, Side::Blue, "s3cret");

        session.mark_ready(Side::Blue);
        session.mark_ready(Side::Red);
        session.begin_draft(Duration::seconds(30), current_timestamp());
        run_full_draft(&mut session);

        // Game 2: T1 wins from the red side; winsRed reports T1's total
        let outcome = session.record_result("T1", "s3cret");
        assert_eq!(
            outcome,
            ResultOutcome::SeriesOver(SeriesFinished {
                wins_blue: 0,
                wins_red: 2,
            })
        );
    }

    #[test]
    fn test_participant_attribution() {
        let mut session = DraftSession::new(&test_join_request());
        session.register_participant("p-blue", Side::Blue);
        session.register_participant("p-red", Side::Red);

        assert_eq!(session.side_of_participant("p-blue"), Some(Side::Blue));
        assert_eq!(session.side_of_participant("p-red"), Some(Side::Red));
        assert_eq!(session.side_of_participant("ghost"), None);
    }

    #[test]
    fn test_ready_ignored_outside_awaiting_ready() {
        let mut session = drafting_session();
        assert_eq!(session.phase(), SessionPhase::Drafting);

        // Drafting already started; stray ready signals must not disturb it
        session.mark_ready(Side::Blue);
        assert_eq!(session.phase(), SessionPhase::Drafting);
        assert_eq!(session.turn_index(), 0);
    }

    #[test]
    fn test_snapshot_carries_full_view() {
        let session = drafting_session();
        let snapshot = session.snapshot();

        assert_eq!(snapshot.session_id, "R1");
        assert_eq!(snapshot.team_blue, "T1");
        assert_eq!(snapshot.team_red, "GEN");
        assert_eq!(snapshot.best_of, 3);
        assert_eq!(snapshot.phase, "drafting");
        assert!(snapshot.blue_ready && snapshot.red_ready);
        assert_eq!(snapshot.order.len(), DRAFT_TURNS);
        assert_eq!(snapshot.turn_index, 0);
        assert!(snapshot.history.is_empty());
        assert_eq!(snapshot.series.current_game, 1);
    }
}
