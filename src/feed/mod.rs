//! FIFA live-feed client.
//!
//! Three endpoints:
//!   /live/football/now                                 → matches live right now
//!   /timelines/{comp}/{season}/{stage}/{match}         → full event list for a match
//!   /calendar/matches                                  → today's fixtures (digest path)
//!
//! Upstream has no delta API — the timeline endpoint always returns the full
//! current event list, so callers diff it against persisted state themselves.
//! Every call carries a request timeout, and every failure (transport, status,
//! decode) is a [`FeedError`] distinct from an empty result, so callers can
//! skip a poll rather than wrongly conclude a match has no events.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use crate::event::{EventRecord, EventType, LiveMatch, MatchKey, MatchRecord, Period, PlayerDirectory};

#[derive(Error, Debug)]
pub enum FeedError {
    #[error("feed request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("feed returned {status} for {url}")]
    Status {
        status: reqwest::StatusCode,
        url: String,
    },
}

/// A scheduled fixture from the calendar endpoint.
#[derive(Debug, Clone)]
pub struct Fixture {
    pub record: MatchRecord,
    pub kickoff: Option<DateTime<Utc>>,
}

/// The snapshot interface the reconciliation engine consumes.
///
/// Implemented by [`FifaFeed`] (HTTP) and by scripted doubles in engine tests.
#[async_trait]
pub trait SnapshotFeed: Send + Sync {
    /// All matches upstream lists as live right now, with current rosters.
    async fn live_matches(&self) -> Result<Vec<LiveMatch>, FeedError>;

    /// The full current event list for one match, in upstream's order.
    async fn match_events(&self, key: &MatchKey) -> Result<Vec<EventRecord>, FeedError>;

    /// Today's fixtures for a competition. Digest path only.
    async fn daily_matches(&self, competition_id: &str) -> Result<Vec<Fixture>, FeedError>;
}

// Also implemented for Arc<F> so tests can keep a handle for scripting.
#[async_trait]
impl<F: SnapshotFeed + ?Sized> SnapshotFeed for std::sync::Arc<F> {
    async fn live_matches(&self) -> Result<Vec<LiveMatch>, FeedError> {
        (**self).live_matches().await
    }

    async fn match_events(&self, key: &MatchKey) -> Result<Vec<EventRecord>, FeedError> {
        (**self).match_events(key).await
    }

    async fn daily_matches(&self, competition_id: &str) -> Result<Vec<Fixture>, FeedError> {
        (**self).daily_matches(competition_id).await
    }
}

// ─── Raw payloads ────────────────────────────────────────────────────────────
//
// Field names follow the feed's PascalCase JSON. These types stay private;
// everything is converted into domain types at the module boundary.

#[derive(Debug, Deserialize)]
struct ListingPayload {
    #[serde(rename = "Results", default)]
    results: Vec<RawMatch>,
}

#[derive(Debug, Deserialize)]
struct RawMatch {
    #[serde(rename = "IdCompetition", default)]
    id_competition: Option<String>,
    #[serde(rename = "IdSeason", default)]
    id_season: Option<String>,
    #[serde(rename = "IdStage", default)]
    id_stage: Option<String>,
    #[serde(rename = "IdMatch", default)]
    id_match: Option<String>,
    #[serde(rename = "HomeTeam", default)]
    home_team: Option<RawTeam>,
    #[serde(rename = "AwayTeam", default)]
    away_team: Option<RawTeam>,
    #[serde(rename = "Date", default)]
    date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawTeam {
    #[serde(rename = "IdTeam", default)]
    id_team: Option<String>,
    #[serde(rename = "TeamName", default)]
    team_name: Vec<RawLocalized>,
    #[serde(rename = "Players", default)]
    players: Vec<RawPlayer>,
}

#[derive(Debug, Deserialize)]
struct RawLocalized {
    #[serde(rename = "Description", default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct RawPlayer {
    #[serde(rename = "IdPlayer", default)]
    id_player: Option<String>,
    #[serde(rename = "ShortName", default)]
    short_name: Vec<RawLocalized>,
}

#[derive(Debug, Deserialize)]
struct TimelinePayload {
    #[serde(rename = "Event", default)]
    events: Vec<RawEvent>,
}

#[derive(Debug, Deserialize)]
struct RawEvent {
    #[serde(rename = "EventId")]
    event_id: String,
    #[serde(rename = "Type")]
    event_type: i64,
    #[serde(rename = "IdTeam", default)]
    id_team: Option<String>,
    #[serde(rename = "IdPlayer", default)]
    id_player: Option<String>,
    #[serde(rename = "IdSubPlayer", default)]
    id_sub_player: Option<String>,
    #[serde(rename = "MatchMinute", default)]
    match_minute: String,
    #[serde(rename = "HomeGoals", default)]
    home_goals: i64,
    #[serde(rename = "AwayGoals", default)]
    away_goals: i64,
    #[serde(rename = "Period", default)]
    period: i64,
    #[serde(rename = "HomePenaltyGoals", default)]
    home_penalty_goals: Option<i64>,
    #[serde(rename = "AwayPenaltyGoals", default)]
    away_penalty_goals: Option<i64>,
}

impl RawMatch {
    /// Pull out the composite key, or None if any component is missing.
    fn key(&self) -> Option<MatchKey> {
        Some(MatchKey {
            competition_id: self.id_competition.clone().filter(|s| !s.is_empty())?,
            season_id: self.id_season.clone().filter(|s| !s.is_empty())?,
            stage_id: self.id_stage.clone().filter(|s| !s.is_empty())?,
            match_id: self.id_match.clone().filter(|s| !s.is_empty())?,
        })
    }

    fn record(&self) -> Option<MatchRecord> {
        let key = self.key()?;
        let home = self.home_team.as_ref()?;
        let away = self.away_team.as_ref()?;
        Some(MatchRecord {
            key,
            home_team_id: home.id_team.clone().unwrap_or_default(),
            home_team_name: home.display_name(),
            away_team_id: away.id_team.clone().unwrap_or_default(),
            away_team_name: away.display_name(),
        })
    }

    fn roster(&self) -> PlayerDirectory {
        let mut players = PlayerDirectory::new();
        for team in [&self.home_team, &self.away_team].into_iter().flatten() {
            for player in &team.players {
                let (Some(id), Some(name)) = (&player.id_player, player.short_name.last()) else {
                    continue;
                };
                players.insert(id.clone(), name.description.clone());
            }
        }
        players
    }
}

impl RawTeam {
    /// The feed lists one name entry per locale; the last one wins.
    fn display_name(&self) -> String {
        self.team_name
            .last()
            .map(|n| n.description.clone())
            .unwrap_or_default()
    }
}

impl RawEvent {
    fn into_record(self) -> EventRecord {
        EventRecord {
            id: self.event_id,
            event_type: EventType::from_raw(self.event_type),
            team_id: self.id_team.unwrap_or_default(),
            player_id: self.id_player.filter(|s| !s.is_empty()),
            sub_player_id: self.id_sub_player.filter(|s| !s.is_empty()),
            minute: self.match_minute,
            home_goals: self.home_goals,
            away_goals: self.away_goals,
            period: Period::from_raw(self.period),
            home_penalty_goals: self.home_penalty_goals,
            away_penalty_goals: self.away_penalty_goals,
        }
    }
}

// ─── HTTP client ─────────────────────────────────────────────────────────────

pub struct FifaFeed {
    client: reqwest::Client,
    base_url: String,
    /// Only report matches from this competition when set.
    competition_filter: Option<String>,
    language: String,
}

impl FifaFeed {
    pub fn new(
        base_url: String,
        competition_filter: Option<String>,
        request_timeout: Duration,
    ) -> Result<Self, FeedError> {
        let client = reqwest::Client::builder().timeout(request_timeout).build()?;
        Ok(Self {
            client,
            base_url,
            competition_filter,
            language: "en-US".to_string(),
        })
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T, FeedError> {
        let resp = self.client.get(url).send().await?;
        if !resp.status().is_success() {
            return Err(FeedError::Status {
                status: resp.status(),
                url: url.to_string(),
            });
        }
        Ok(resp.json().await?)
    }

    fn listing_to_matches(&self, payload: ListingPayload) -> Vec<LiveMatch> {
        let mut matches = Vec::new();
        for raw in payload.results {
            if let (Some(filter), Some(comp)) =
                (&self.competition_filter, &raw.id_competition)
            {
                if filter != comp {
                    continue;
                }
            }
            let Some(record) = raw.record() else {
                warn!("live listing entry missing match identifiers, skipping");
                continue;
            };
            let players = raw.roster();
            matches.push(LiveMatch { record, players });
        }
        matches
    }
}

#[async_trait]
impl SnapshotFeed for FifaFeed {
    async fn live_matches(&self) -> Result<Vec<LiveMatch>, FeedError> {
        let url = format!("{}/live/football/now", self.base_url);
        let payload: ListingPayload = self.get_json(&url).await?;
        let matches = self.listing_to_matches(payload);
        debug!(matches = matches.len(), "fetched live listing");
        Ok(matches)
    }

    async fn match_events(&self, key: &MatchKey) -> Result<Vec<EventRecord>, FeedError> {
        let url = format!(
            "{}/timelines/{}/{}/{}/{}?language={}",
            self.base_url,
            key.competition_id,
            key.season_id,
            key.stage_id,
            key.match_id,
            self.language,
        );
        let payload: TimelinePayload = self.get_json(&url).await?;
        let events: Vec<EventRecord> = payload
            .events
            .into_iter()
            .map(RawEvent::into_record)
            .collect();
        debug!(match_id = %key.match_id, events = events.len(), "fetched timeline");
        Ok(events)
    }

    async fn daily_matches(&self, competition_id: &str) -> Result<Vec<Fixture>, FeedError> {
        let today = Utc::now().date_naive();
        let url = format!(
            "{}/calendar/matches?from={}T00:00:00Z&to={}T23:59:59Z&idCompetition={}&language={}&count=100",
            self.base_url, today, today, competition_id, self.language,
        );
        let payload: ListingPayload = self.get_json(&url).await?;
        let fixtures: Vec<Fixture> = payload
            .results
            .into_iter()
            .filter_map(|raw| {
                let record = raw.record()?;
                let kickoff = raw
                    .date
                    .as_deref()
                    .and_then(|d| DateTime::parse_from_rfc3339(d).ok())
                    .map(|d| d.with_timezone(&Utc));
                Some(Fixture { record, kickoff })
            })
            .collect();
        debug!(
            competition = competition_id,
            fixtures = fixtures.len(),
            "fetched calendar"
        );
        Ok(fixtures)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing_json() -> &'static str {
        r#"{
            "Results": [
                {
                    "IdCompetition": "17",
                    "IdSeason": "254645",
                    "IdStage": "275073",
                    "IdMatch": "300331498",
                    "HomeTeam": {
                        "IdTeam": "43921",
                        "TeamName": [{"Description": "France"}],
                        "Players": [
                            {"IdPlayer": "229397", "ShortName": [{"Description": "MBAPPE"}]}
                        ]
                    },
                    "AwayTeam": {
                        "IdTeam": "43935",
                        "TeamName": [{"Description": "Croatia"}],
                        "Players": [
                            {"IdPlayer": "201200", "ShortName": [{"Description": "MODRIC"}]}
                        ]
                    }
                },
                {
                    "IdCompetition": "17",
                    "IdSeason": "254645",
                    "IdStage": "275073",
                    "IdMatch": null,
                    "HomeTeam": {"TeamName": [], "Players": []},
                    "AwayTeam": {"TeamName": [], "Players": []}
                }
            ]
        }"#
    }

    #[test]
    fn test_listing_decodes_and_skips_incomplete_entries() {
        let payload: ListingPayload = serde_json::from_str(listing_json()).unwrap();
        let feed = FifaFeed::new(
            "https://api.fifa.com/api/v1".into(),
            None,
            Duration::from_secs(5),
        )
        .unwrap();
        let matches = feed.listing_to_matches(payload);
        assert_eq!(matches.len(), 1);
        let m = &matches[0];
        assert_eq!(m.record.key.match_id, "300331498");
        assert_eq!(m.record.home_team_name, "France");
        assert_eq!(m.record.away_team_name, "Croatia");
        assert_eq!(m.players.get("229397").unwrap(), "MBAPPE");
        assert_eq!(m.players.get("201200").unwrap(), "MODRIC");
    }

    #[test]
    fn test_competition_filter_applies() {
        let payload: ListingPayload = serde_json::from_str(listing_json()).unwrap();
        let feed = FifaFeed::new(
            "https://api.fifa.com/api/v1".into(),
            Some("2000000104".into()),
            Duration::from_secs(5),
        )
        .unwrap();
        assert!(feed.listing_to_matches(payload).is_empty());
    }

    #[test]
    fn test_timeline_event_decodes_with_nullable_fields() {
        let json = r#"{
            "Event": [
                {
                    "EventId": "ev-1",
                    "Type": 0,
                    "IdTeam": "43921",
                    "IdPlayer": "229397",
                    "IdSubPlayer": null,
                    "MatchMinute": "45'+2",
                    "HomeGoals": 1,
                    "AwayGoals": 0,
                    "Period": 3,
                    "HomePenaltyGoals": null,
                    "AwayPenaltyGoals": null
                }
            ]
        }"#;
        let payload: TimelinePayload = serde_json::from_str(json).unwrap();
        let events: Vec<EventRecord> = payload
            .events
            .into_iter()
            .map(RawEvent::into_record)
            .collect();
        assert_eq!(events.len(), 1);
        let e = &events[0];
        assert_eq!(e.id, "ev-1");
        assert_eq!(e.event_type, EventType::Goal);
        assert_eq!(e.period, Period::FirstHalf);
        assert_eq!(e.minute, "45'+2");
        assert!(e.sub_player_id.is_none());
    }
}
