//! Common types used throughout the draft coordination service

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Opaque identifier for a draft/series session
pub type SessionId = String;

/// Stable identifier a participant keeps across reconnects
pub type ParticipantId = String;

/// Identifier of a competing team; never changes during a series
pub type TeamId = String;

/// The color a team currently occupies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Blue,
    Red,
}

impl Side {
    pub fn opposite(self) -> Side {
        match self {
            Side::Blue => Side::Red,
            Side::Red => Side::Blue,
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Blue => write!(f, "blue"),
            Side::Red => write!(f, "red"),
        }
    }
}

/// Kind of action a turn expects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnPhase {
    Ban,
    Pick,
}

impl std::fmt::Display for TurnPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TurnPhase::Ban => write!(f, "ban"),
            TurnPhase::Pick => write!(f, "pick"),
        }
    }
}

/// One entry of the fixed ban/pick order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnSlot {
    pub phase: TurnPhase,
    pub side: Side,
}

impl TurnSlot {
    pub fn ban(side: Side) -> Self {
        Self {
            phase: TurnPhase::Ban,
            side,
        }
    }

    pub fn pick(side: Side) -> Self {
        Self {
            phase: TurnPhase::Pick,
            side,
        }
    }
}

/// A resolved turn as recorded in the draft history
///
/// `champion` is `None` only for turns auto-resolved by timeout on a ban slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedTurn {
    pub champion: Option<String>,
    pub side: Side,
    pub phase: TurnPhase,
}

/// Current color assignment: which team occupies which side
///
/// Swapping sides mutates this map; the team identifiers used for series
/// scoring never change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SideMap {
    pub blue: TeamId,
    pub red: TeamId,
}

impl SideMap {
    pub fn new(blue: TeamId, red: TeamId) -> Self {
        Self { blue, red }
    }

    /// Exchange the teams' colors
    pub fn swap(&mut self) {
        std::mem::swap(&mut self.blue, &mut self.red);
    }

    /// Team currently occupying the given side
    pub fn team_on(&self, side: Side) -> &TeamId {
        match side {
            Side::Blue => &self.blue,
            Side::Red => &self.red,
        }
    }

    /// Side the given team currently occupies, if it is part of this session
    pub fn side_of(&self, team: &str) -> Option<Side> {
        if self.blue == team {
            Some(Side::Blue)
        } else if self.red == team {
            Some(Side::Red)
        } else {
            None
        }
    }
}

/// Inbound Event Payloads
/// Request to create or attach to a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinRequest {
    pub session_id: SessionId,
    pub side: Side,
    pub participant_id: ParticipantId,
    pub team_blue: TeamId,
    pub team_red: TeamId,
    pub best_of: u32,
    pub mode: String,
    pub host_secret: String,
}

/// Manual turn selection submitted by a participant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectChampion {
    pub session_id: SessionId,
    pub champion: String,
    pub side: Side,
    pub phase: TurnPhase,
}

/// Game result posted by the host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchResult {
    pub session_id: SessionId,
    pub winner_team_id: TeamId,
    pub host_secret: String,
}

/// Side choice for the next game, posted by the host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SideChosen {
    pub session_id: SessionId,
    pub loser_side: Side,
    pub chosen_side: Side,
    pub host_secret: String,
}

/// Explicit leave signal from a participant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserLeave {
    pub session_id: SessionId,
    pub side: Side,
    pub participant_id: ParticipantId,
}

/// Outbound Event Payloads
/// Series standing as carried in the session snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesSnapshot {
    pub team_wins: HashMap<TeamId, u32>,
    pub current_game: u32,
    pub result_posted: bool,
    pub over: bool,
}

/// Full session view broadcast as `room-status`
///
/// Carries the live draft state as well, so a participant rejoining
/// mid-draft can resynchronize from this event alone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub session_id: SessionId,
    pub team_blue: TeamId,
    pub team_red: TeamId,
    pub best_of: u32,
    pub mode: String,
    pub blue_ready: bool,
    pub red_ready: bool,
    pub side_map: SideMap,
    pub phase: String,
    pub order: Vec<TurnSlot>,
    pub turn_index: usize,
    pub history: Vec<ResolvedTurn>,
    pub series: SeriesSnapshot,
}

/// Payload of the `start-draft` broadcast
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftStarted {
    pub order: Vec<TurnSlot>,
    pub current_game: u32,
    pub host_secret: String,
}

/// Payload of the `choose-side` broadcast
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChooseSide {
    pub loser_side: Side,
    pub next_game: u32,
}

/// Payload of the `next-draft` broadcast
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NextDraft {
    pub current_game: u32,
    pub side_map: SideMap,
}

/// Payload of the `series-finished` broadcast
///
/// Win counts are attributed through the current side map, so `wins_blue` is
/// the total of whichever team finished the series on the blue side.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesFinished {
    pub wins_blue: u32,
    pub wins_red: u32,
}

/// Payload of the `user-left` broadcast
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserLeft {
    pub side: Side,
}
