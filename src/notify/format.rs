//! Event → message text.
//!
//! Returns None for event codes that are known but not worth announcing
//! (shots, fouls, set pieces). Unrecognized codes render a diagnostic routed
//! to the debug channel so upstream contract drift stays visible.

use crate::event::{EventRecord, EventType, MatchRecord, Period, PlayerDirectory};

use super::{Channel, RenderedNotification};

/// Render a timeline event for delivery.
pub fn render(
    event: &EventRecord,
    record: &MatchRecord,
    players: &PlayerDirectory,
) -> Option<RenderedNotification> {
    let home = &record.home_team_name;
    let away = &record.away_team_name;
    let score = format!("{} *{}:{}* {}", home, event.home_goals, event.away_goals, away);
    let shootout_score = format!(
        "{} *{} ({}):{} ({})* {}",
        home,
        event.home_goals,
        event.home_penalty_goals.unwrap_or(0),
        event.away_goals,
        event.away_penalty_goals.unwrap_or(0),
        away,
    );

    // Player-level attribution line for goal and card events.
    let mut attributed = false;
    let mut text = match event.event_type {
        EventType::Goal | EventType::FreeKickGoal => {
            attributed = true;
            format!(":soccer: {} GOOOOAL! {}", event.minute, score)
        }
        EventType::OwnGoal => {
            attributed = true;
            format!(":soccer: {} Own Goal! {}", event.minute, score)
        }
        EventType::PenaltyGoal => {
            attributed = true;
            if event.period == Period::Shootout {
                format!(":soccer: Penalty goal! {}", shootout_score)
            } else {
                format!(":soccer: {} Penalty goal! {}", event.minute, score)
            }
        }
        EventType::PenaltyMissed => {
            attributed = true;
            if event.period == Period::Shootout {
                format!(":no_entry_sign: Penalty missed! {}", shootout_score)
            } else {
                format!(":no_entry_sign: {} Penalty missed!", event.minute)
            }
        }
        EventType::YellowCard => {
            attributed = true;
            format!(":yellow_card_new: {} Yellow card.", event.minute)
        }
        EventType::RedCard => {
            attributed = true;
            format!(":red_card_new: {} Red card.", event.minute)
        }
        EventType::SecondYellow => {
            attributed = true;
            format!(
                ":yellow_card_new: :red_card_new: {} Second yellow card.",
                event.minute
            )
        }
        EventType::Substitution => {
            let mut text = format!(
                ":arrows_counterclockwise: {} Substitution for {}.",
                event.minute,
                active_team(event, record),
            );
            let player = event.player_id.as_ref().and_then(|id| players.get(id));
            let sub = event.sub_player_id.as_ref().and_then(|id| players.get(id));
            if let (Some(player), Some(sub)) = (player, sub) {
                text.push_str(&format!("\n> {} comes on for {}.", sub, player));
            }
            text
        }
        EventType::MatchStart => match event.period {
            Period::FirstHalf => {
                format!(":clock12: The match between {} and {} has begun!", home, away)
            }
            Period::SecondHalf => format!(
                ":clock12: The second half of the match between {} and {} has begun!",
                home, away
            ),
            Period::Shootout => format!(
                ":clock12: The penalty shootout is starting between {} and {}!",
                home, away
            ),
            Period::Unrecognized(_) => format!(
                ":clock12: The match between {} and {} is starting again!",
                home, away
            ),
        },
        EventType::HalfEnd => match event.period {
            Period::FirstHalf => format!(":clock1230: End of the first half. {}.", score),
            Period::SecondHalf => format!(":clock1230: End of the second half. {}.", score),
            Period::Shootout => ":clock1230: The penalty shootout is over.".to_string(),
            Period::Unrecognized(_) => format!(":clock1230: End of the half. {}.", score),
        },
        EventType::MatchEnd => format!(
            ":clock12: The match between {} and {} has ended. {}.",
            home, away, score
        ),
        EventType::BlockedShot
        | EventType::Foul
        | EventType::Offside
        | EventType::CornerKick
        | EventType::Crossbar
        | EventType::Routine => return None,
        EventType::Unrecognized(raw) => {
            return Some(RenderedNotification {
                text: format!(
                    "Missing event information for {} vs {}: event type {} (event {})",
                    home, away, raw, event.id
                ),
                channel: Channel::Debug,
                event_id: event.id.clone(),
                match_id: record.key.match_id.clone(),
            });
        }
    };

    if attributed {
        let team = active_team(event, record);
        let player = event.player_id.as_ref().and_then(|id| players.get(id));
        match (player, team.is_empty()) {
            (Some(player), false) => text.push_str(&format!("\n> {} ({})", player, team)),
            (None, false) => text.push_str(&format!("\n> {}", team)),
            _ => {}
        }
    }

    Some(RenderedNotification {
        text,
        channel: Channel::Main,
        event_id: event.id.clone(),
        match_id: record.key.match_id.clone(),
    })
}

/// The team an event belongs to. The feed tags events with a team id; anything
/// that is not the home side is reported against the away side.
fn active_team<'a>(event: &EventRecord, record: &'a MatchRecord) -> &'a str {
    if event.team_id == record.home_team_id {
        &record.home_team_name
    } else {
        &record.away_team_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::MatchKey;
    use std::collections::HashMap;

    fn match_record() -> MatchRecord {
        MatchRecord {
            key: MatchKey {
                competition_id: "17".into(),
                season_id: "s".into(),
                stage_id: "st".into(),
                match_id: "m1".into(),
            },
            home_team_id: "h".into(),
            home_team_name: "France".into(),
            away_team_id: "a".into(),
            away_team_name: "Croatia".into(),
        }
    }

    fn event(event_type: EventType, period: Period) -> EventRecord {
        EventRecord {
            id: "ev-1".into(),
            event_type,
            team_id: "h".into(),
            player_id: None,
            sub_player_id: None,
            minute: "12'".into(),
            home_goals: 1,
            away_goals: 0,
            period,
            home_penalty_goals: None,
            away_penalty_goals: None,
        }
    }

    #[test]
    fn test_match_start_first_half() {
        let n = render(
            &event(EventType::MatchStart, Period::FirstHalf),
            &match_record(),
            &HashMap::new(),
        )
        .unwrap();
        assert_eq!(
            n.text,
            ":clock12: The match between France and Croatia has begun!"
        );
        assert_eq!(n.channel, Channel::Main);
    }

    #[test]
    fn test_goal_carries_score_and_attribution() {
        let mut players = HashMap::new();
        players.insert("p9".to_string(), "MBAPPE".to_string());
        let mut e = event(EventType::Goal, Period::FirstHalf);
        e.player_id = Some("p9".into());
        let n = render(&e, &match_record(), &players).unwrap();
        assert_eq!(
            n.text,
            ":soccer: 12' GOOOOAL! France *1:0* Croatia\n> MBAPPE (France)"
        );
    }

    #[test]
    fn test_substitution_names_both_players() {
        let mut players = HashMap::new();
        players.insert("off".to_string(), "GIROUD".to_string());
        players.insert("on".to_string(), "THURAM".to_string());
        let mut e = event(EventType::Substitution, Period::SecondHalf);
        e.player_id = Some("off".into());
        e.sub_player_id = Some("on".into());
        let n = render(&e, &match_record(), &players).unwrap();
        assert_eq!(
            n.text,
            ":arrows_counterclockwise: 12' Substitution for France.\n> THURAM comes on for GIROUD."
        );
    }

    #[test]
    fn test_shootout_penalty_includes_penalty_score() {
        let mut e = event(EventType::PenaltyGoal, Period::Shootout);
        e.home_penalty_goals = Some(3);
        e.away_penalty_goals = Some(2);
        let n = render(&e, &match_record(), &HashMap::new()).unwrap();
        assert!(n.text.starts_with(":soccer: Penalty goal! France *1 (3):0 (2)* Croatia"));
    }

    #[test]
    fn test_quiet_codes_render_nothing() {
        for t in [
            EventType::CornerKick,
            EventType::Foul,
            EventType::Offside,
            EventType::BlockedShot,
            EventType::Crossbar,
            EventType::Routine,
        ] {
            assert!(render(&event(t, Period::FirstHalf), &match_record(), &HashMap::new()).is_none());
        }
    }

    #[test]
    fn test_unrecognized_code_goes_to_debug_channel() {
        let n = render(
            &event(EventType::Unrecognized(77), Period::FirstHalf),
            &match_record(),
            &HashMap::new(),
        )
        .unwrap();
        assert_eq!(n.channel, Channel::Debug);
        assert!(n.text.contains("event type 77"));
        assert!(n.text.contains("France vs Croatia"));
    }

    #[test]
    fn test_match_end_text() {
        let mut e = event(EventType::MatchEnd, Period::SecondHalf);
        e.home_goals = 4;
        e.away_goals = 2;
        let n = render(&e, &match_record(), &HashMap::new()).unwrap();
        assert_eq!(
            n.text,
            ":clock12: The match between France and Croatia has ended. France *4:2* Croatia."
        );
    }
}
