//! Domain types for live matches and timeline events.
//!
//! Everything here mirrors what the feed reports. Match metadata is fixed at
//! first sight; event records are rebuilt from scratch on every fetch and
//! deduplicated on `id` alone, never on content. Event and period codes are
//! small integers owned by upstream and new values show up without notice, so
//! both enums keep an `Unrecognized` variant instead of refusing to parse.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Player id → short display name, pooled across all live matches in a poll.
pub type PlayerDirectory = HashMap<String, String>;

/// Composite identifier for a match.
///
/// `match_id` alone is unique across the feed and keys all persisted state;
/// the other three components are carried so the timeline endpoint can be
/// re-queried for a match the live listing no longer shows.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MatchKey {
    pub competition_id: String,
    pub season_id: String,
    pub stage_id: String,
    pub match_id: String,
}

/// Match metadata captured when the match is first observed. Team names are
/// never re-derived afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub key: MatchKey,
    pub home_team_id: String,
    pub home_team_name: String,
    pub away_team_id: String,
    pub away_team_name: String,
}

/// A match as listed by the live snapshot, with its current rosters.
#[derive(Debug, Clone)]
pub struct LiveMatch {
    pub record: MatchRecord,
    pub players: PlayerDirectory,
}

/// One timeline event as reported right now.
#[derive(Debug, Clone)]
pub struct EventRecord {
    pub id: String,
    pub event_type: EventType,
    pub team_id: String,
    pub player_id: Option<String>,
    pub sub_player_id: Option<String>,
    /// Match-clock string as the feed renders it, e.g. "45'+2".
    pub minute: String,
    pub home_goals: i64,
    pub away_goals: i64,
    pub period: Period,
    pub home_penalty_goals: Option<i64>,
    pub away_penalty_goals: Option<i64>,
}

/// Timeline event codes.
///
/// The feed emits more codes than anyone announces. Codes that carry no story
/// (shots, fouls, set pieces) map to quiet variants the formatter ignores;
/// codes this build has never seen land in `Unrecognized` so contract drift
/// stays observable instead of becoming a parse failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventType {
    Goal,
    OwnGoal,
    FreeKickGoal,
    PenaltyGoal,
    PenaltyMissed,
    YellowCard,
    RedCard,
    SecondYellow,
    Substitution,
    MatchStart,
    HalfEnd,
    MatchEnd,
    BlockedShot,
    Foul,
    Offside,
    CornerKick,
    Crossbar,
    /// Filler codes the feed emits that never warrant a notification.
    Routine,
    /// A code this build does not know about.
    Unrecognized(i64),
}

impl EventType {
    pub fn from_raw(raw: i64) -> Self {
        match raw {
            0 => EventType::Goal,
            2 => EventType::YellowCard,
            3 => EventType::RedCard,
            4 => EventType::SecondYellow,
            5 => EventType::Substitution,
            6 | 22 | 23 => EventType::Routine,
            7 => EventType::MatchStart,
            8 => EventType::HalfEnd,
            12 | 17 => EventType::BlockedShot,
            14 | 18 => EventType::Foul,
            15 => EventType::Offside,
            16 => EventType::CornerKick,
            26 => EventType::MatchEnd,
            32 | 33 => EventType::Crossbar,
            34 => EventType::OwnGoal,
            39 => EventType::FreeKickGoal,
            41 => EventType::PenaltyGoal,
            60 => EventType::PenaltyMissed,
            other => EventType::Unrecognized(other),
        }
    }

    /// The terminal event: once seen, the match is over and its ledger
    /// footprint must go.
    pub fn is_terminal(&self) -> bool {
        matches!(self, EventType::MatchEnd)
    }
}

/// Match period codes, open for the same reason as [`EventType`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    FirstHalf,
    SecondHalf,
    Shootout,
    Unrecognized(i64),
}

impl Period {
    pub fn from_raw(raw: i64) -> Self {
        match raw {
            3 => Period::FirstHalf,
            5 => Period::SecondHalf,
            11 => Period::Shootout,
            other => Period::Unrecognized(other),
        }
    }
}
