//! Incremental event reconciliation.
//!
//! Each invocation is stateless: the ledger is the only memory between polls.
//! Upstream has no delta API, so novelty is computed as a set difference —
//! the ids in a match's current timeline minus the ids the ledger already
//! knows. New events are rendered and delivered in upstream's listed order,
//! then the batch is written back; a batch containing the terminal match-end
//! event clears the match from the ledger instead, so a finished match leaves
//! no residue.
//!
//! Failure policy: a feed error on one match skips that match for this poll
//! and never touches the others; a delivery error is logged and the event is
//! still marked reported; a ledger error fails the whole run — the next
//! invocation retries from persisted truth. Overlapping invocations racing on
//! the same match can each see the same new event before either records it,
//! which yields at most one duplicate notification, never a lost one.

use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use tracing::{debug, info, warn};

use crate::event::{MatchRecord, PlayerDirectory};
use crate::feed::SnapshotFeed;
use crate::ledger::{EventLedger, LedgerError};
use crate::notify::{format, Notifier, RenderedNotification};

pub struct Reconciler<F, L, N> {
    feed: F,
    ledger: L,
    notifier: N,
    /// Upper bound on matches reconciled concurrently within one pass.
    max_concurrent: usize,
}

impl<F, L, N> Reconciler<F, L, N>
where
    F: SnapshotFeed,
    L: EventLedger,
    N: Notifier,
{
    pub fn new(feed: F, ledger: L, notifier: N, max_concurrent: usize) -> Self {
        Self {
            feed,
            ledger,
            notifier,
            max_concurrent: max_concurrent.max(1),
        }
    }

    /// One reconciliation pass. Returns everything that was rendered, in
    /// delivery order per match (cross-match ordering is not specified —
    /// concurrent matches are independent).
    pub async fn reconcile(&self) -> Result<Vec<RenderedNotification>, LedgerError> {
        let live = match self.feed.live_matches().await {
            Ok(matches) => matches,
            Err(e) => {
                warn!(error = %e, "live snapshot unavailable, continuing from ledger only");
                Vec::new()
            }
        };

        // One pooled directory: substitutions may reference a player from
        // either side, and ledger-recovered matches carry no roster.
        let mut players = PlayerDirectory::new();
        for m in &live {
            players.extend(m.players.iter().map(|(id, name)| (id.clone(), name.clone())));
        }

        let live_ids: HashSet<String> = live
            .iter()
            .map(|m| m.record.key.match_id.clone())
            .collect();
        let mut working: Vec<MatchRecord> = live.into_iter().map(|m| m.record).collect();

        // Matches the ledger still tracks but the live listing omitted: the
        // feed sometimes drops an in-progress match for a poll or two, and
        // events posted meanwhile must not be lost.
        for key in self.ledger.tracked_matches().await? {
            if live_ids.contains(&key.match_id) {
                continue; // live copy wins, it has fresher data
            }
            match self.ledger.match_metadata(&key).await? {
                Some(record) => {
                    debug!(match_id = %key.match_id, "recovered tracked match absent from live listing");
                    working.push(record);
                }
                None => warn!(
                    match_id = %key.match_id,
                    "tracked match has no stored metadata, skipping this poll"
                ),
            }
        }

        let match_count = working.len();
        let outcomes: Vec<Result<Vec<RenderedNotification>, LedgerError>> = stream::iter(
            working
                .into_iter()
                .map(|record| self.reconcile_match(record, &players)),
        )
        .buffer_unordered(self.max_concurrent)
        .collect()
        .await;

        let mut notifications = Vec::new();
        let mut failure = None;
        for outcome in outcomes {
            match outcome {
                Ok(sent) => notifications.extend(sent),
                Err(e) => failure = Some(e),
            }
        }
        // Any ledger failure fails the run; matches that completed keep their
        // writes and deliveries, the rest retry next invocation.
        if let Some(e) = failure {
            return Err(e);
        }

        info!(
            matches = match_count,
            notifications = notifications.len(),
            "reconcile pass complete"
        );
        Ok(notifications)
    }

    async fn reconcile_match(
        &self,
        record: MatchRecord,
        players: &PlayerDirectory,
    ) -> Result<Vec<RenderedNotification>, LedgerError> {
        let events = match self.feed.match_events(&record.key).await {
            Ok(events) => events,
            Err(e) => {
                warn!(
                    match_id = %record.key.match_id,
                    error = %e,
                    "timeline fetch failed, no new information for this match"
                );
                return Ok(Vec::new());
            }
        };

        let known = self.ledger.known_event_ids(&record.key).await?;
        let new_events: Vec<_> = events.iter().filter(|e| !known.contains(&e.id)).collect();
        if new_events.is_empty() {
            return Ok(Vec::new());
        }

        // Upstream's listed order is delivery order: a second-half kickoff
        // must land before the full-time whistle even when both are new.
        let mut sent = Vec::new();
        for event in &new_events {
            let Some(notification) = format::render(event, &record, players) else {
                continue; // not notable, but still recorded as seen below
            };
            if let Err(e) = self.notifier.deliver(&notification).await {
                warn!(
                    event_id = %event.id,
                    match_id = %record.key.match_id,
                    error = %e,
                    "delivery failed, event stays marked as reported"
                );
            }
            sent.push(notification);
        }

        if new_events.iter().any(|e| e.event_type.is_terminal()) {
            // A finished match leaves no residue: clear instead of writing
            // this batch. Upstream stops listing finished matches, so the
            // cleared ids cannot come back.
            self.ledger.clear_match(&record.key).await?;
            info!(
                match_id = %record.key.match_id,
                home = %record.home_team_name,
                away = %record.away_team_name,
                "match ended, cleared from ledger"
            );
        } else {
            let ids: Vec<String> = new_events.iter().map(|e| e.id.clone()).collect();
            self.ledger.record_events(&record, &ids).await?;
            debug!(
                match_id = %record.key.match_id,
                new_events = ids.len(),
                "recorded new events"
            );
        }

        Ok(sent)
    }
}
