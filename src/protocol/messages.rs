//! Event vocabulary for the draft channel
//!
//! Events are JSON objects tagged with a kebab-case `event` name and a `data`
//! payload with camelCase fields, e.g.
//! `{"event":"select-champion","data":{"sessionId":"R1",...}}`.

use crate::types::*;
use serde::{Deserialize, Serialize};

/// Events a participant channel may deliver to the service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ClientEvent {
    /// Create or attach to a session
    JoinRoom(JoinRequest),
    /// Mark the sender's side ready; session and side are inferred from the
    /// channel's earlier join
    Ready,
    /// Resolve the current turn manually
    SelectChampion(SelectChampion),
    /// Post a game result (host only)
    MatchResult(MatchResult),
    /// Choose sides for the next game (host only)
    SideChosen(SideChosen),
    /// Announce an intentional departure
    UserLeave(UserLeave),
}

/// Events the service broadcasts to every channel of a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ServerEvent {
    /// Full session snapshot, sent after join and ready changes
    RoomStatus(SessionSnapshot),
    /// Drafting has begun
    StartDraft(DraftStarted),
    /// Seconds remaining on the current turn
    Timer(u64),
    /// One turn resolved
    UpdateDraft(ResolvedTurn),
    /// All twenty turns resolved; carries the complete history
    DraftFinished(Vec<ResolvedTurn>),
    /// Series continues; the named side's team picks a color
    ChooseSide(ChooseSide),
    /// The next draft is about to start
    NextDraft(NextDraft),
    /// Series terminal; final win counts per current side
    SeriesFinished(SeriesFinished),
    /// A participant's grace window expired
    UserLeft(UserLeft),
}

impl ServerEvent {
    /// Wire name of the event, for logging and test assertions
    pub fn name(&self) -> &'static str {
        match self {
            ServerEvent::RoomStatus(_) => "room-status",
            ServerEvent::StartDraft(_) => "start-draft",
            ServerEvent::Timer(_) => "timer",
            ServerEvent::UpdateDraft(_) => "update-draft",
            ServerEvent::DraftFinished(_) => "draft-finished",
            ServerEvent::ChooseSide(_) => "choose-side",
            ServerEvent::NextDraft(_) => "next-draft",
            ServerEvent::SeriesFinished(_) => "series-finished",
            ServerEvent::UserLeft(_) => "user-left",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_event_tags() {
        let event = ClientEvent::SelectChampion(SelectChampion {
            session_id: "R1".to_string(),
            champion: "Ahri".to_string(),
            side: Side::Blue,
            phase: TurnPhase::Pick,
        });

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "select-champion");
        assert_eq!(json["data"]["sessionId"], "R1");
        assert_eq!(json["data"]["phase"], "pick");
    }

    #[test]
    fn test_ready_event_without_payload() {
        let event: ClientEvent = serde_json::from_str(r#"{"event":"ready"}"#).unwrap();
        assert_eq!(event, ClientEvent::Ready);
    }

    #[test]
    fn test_server_event_round_trip() {
        let event = ServerEvent::ChooseSide(ChooseSide {
            loser_side: Side::Red,
            next_game: 2,
        });

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""event":"choose-side""#));
        assert!(json.contains(r#""loserSide":"red""#));

        let parsed: ServerEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, event);
        assert_eq!(parsed.name(), "choose-side");
    }

    #[test]
    fn test_timer_event_payload_is_bare_integer() {
        let json = serde_json::to_value(ServerEvent::Timer(27)).unwrap();
        assert_eq!(json["event"], "timer");
        assert_eq!(json["data"], 27);
    }

    #[test]
    fn test_unknown_event_rejected() {
        let parsed = serde_json::from_str::<ClientEvent>(r#"{"event":"format-disk"}"#);
        assert!(parsed.is_err());
    }
}
