//! Daily fixture digest.
//!
//! A much simpler path than live reconciliation: pull today's calendar for
//! each configured competition and fold it into one message. Per-competition
//! feed failures are skipped so one broken calendar does not blank the digest.

use tracing::warn;

use crate::feed::{Fixture, SnapshotFeed};

/// Build the digest text for today's fixtures across the given competitions.
pub async fn daily_digest<F: SnapshotFeed>(feed: &F, competition_ids: &[String]) -> String {
    let mut fixtures: Vec<Fixture> = Vec::new();
    for competition_id in competition_ids {
        match feed.daily_matches(competition_id).await {
            Ok(batch) => fixtures.extend(batch),
            Err(e) => warn!(
                competition = %competition_id,
                error = %e,
                "calendar fetch failed, competition left out of digest"
            ),
        }
    }

    if fixtures.is_empty() {
        return "No matches scheduled today.".to_string();
    }

    fixtures.sort_by_key(|f| f.kickoff);

    let mut lines = vec![format!("Today's matches ({}):", fixtures.len())];
    for fixture in &fixtures {
        let record = &fixture.record;
        match fixture.kickoff {
            Some(kickoff) => lines.push(format!(
                ":soccer: {} vs {} — {} UTC",
                record.home_team_name,
                record.away_team_name,
                kickoff.format("%H:%M"),
            )),
            None => lines.push(format!(
                ":soccer: {} vs {}",
                record.home_team_name, record.away_team_name,
            )),
        }
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{EventRecord, LiveMatch, MatchKey, MatchRecord};
    use crate::feed::FeedError;
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};

    struct FixedCalendar;

    #[async_trait]
    impl SnapshotFeed for FixedCalendar {
        async fn live_matches(&self) -> Result<Vec<LiveMatch>, FeedError> {
            Ok(Vec::new())
        }

        async fn match_events(&self, _key: &MatchKey) -> Result<Vec<EventRecord>, FeedError> {
            Ok(Vec::new())
        }

        async fn daily_matches(&self, competition_id: &str) -> Result<Vec<Fixture>, FeedError> {
            if competition_id == "broken" {
                return Err(FeedError::Status {
                    status: reqwest::StatusCode::BAD_GATEWAY,
                    url: "scripted".into(),
                });
            }
            Ok(vec![Fixture {
                record: MatchRecord {
                    key: MatchKey {
                        competition_id: competition_id.into(),
                        season_id: "s".into(),
                        stage_id: "st".into(),
                        match_id: format!("{competition_id}-m"),
                    },
                    home_team_id: "h".into(),
                    home_team_name: "France".into(),
                    away_team_id: "a".into(),
                    away_team_name: "Croatia".into(),
                },
                kickoff: Some(Utc.with_ymd_and_hms(2022, 12, 18, 15, 0, 0).unwrap()),
            }])
        }
    }

    #[tokio::test]
    async fn test_digest_lists_fixtures_with_kickoff() {
        let text = daily_digest(&FixedCalendar, &["17".to_string()]).await;
        assert!(text.starts_with("Today's matches (1):"));
        assert!(text.contains(":soccer: France vs Croatia — 15:00 UTC"));
    }

    #[tokio::test]
    async fn test_digest_skips_broken_competition() {
        let text =
            daily_digest(&FixedCalendar, &["broken".to_string(), "17".to_string()]).await;
        assert!(text.contains("France vs Croatia"));
    }

    #[tokio::test]
    async fn test_empty_digest_has_fallback_text() {
        let text = daily_digest(&FixedCalendar, &[]).await;
        assert_eq!(text, "No matches scheduled today.");
    }
}
