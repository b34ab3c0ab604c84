//! Valkey (Redis-compatible) event ledger.
//!
//! Data model:
//!   match:{match_id}         → JSON MatchRecord
//!   match_events:{match_id}  → SET of already-reported event ids
//!
//! The ledger holds in-progress matches only. A row pair appears when a
//! match's first event is reported and is deleted wholesale when the terminal
//! event arrives, so completion is modeled as absence. The metadata value and
//! the dedup set are two key families behind this one adapter: the `match:*`
//! scan that lists tracked matches is the same scan that recovers a match's
//! display names when the live feed stops listing it.

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Client};
use std::collections::HashSet;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::event::{MatchKey, MatchRecord};

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("ledger store unavailable: {0}")]
    Store(#[from] redis::RedisError),
    #[error("ledger row corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// The persistence contract the reconciliation engine runs against.
///
/// Implemented by [`ValkeyLedger`] and by an in-memory double in engine tests.
/// All operations are idempotent: re-recording a known event id and clearing
/// an absent match are no-ops, never errors.
#[async_trait]
pub trait EventLedger: Send + Sync {
    /// Keys of every match the ledger still considers in-progress.
    async fn tracked_matches(&self) -> Result<Vec<MatchKey>, LedgerError>;

    /// Event ids already reported for a match; empty if untracked.
    async fn known_event_ids(&self, key: &MatchKey) -> Result<HashSet<String>, LedgerError>;

    /// Record a batch of reported event ids, upserting the match metadata
    /// alongside so the match can be re-described from the ledger alone.
    async fn record_events(
        &self,
        record: &MatchRecord,
        event_ids: &[String],
    ) -> Result<(), LedgerError>;

    /// Delete every row for a match.
    async fn clear_match(&self, key: &MatchKey) -> Result<(), LedgerError>;

    /// Stored metadata for a match the live feed no longer lists.
    async fn match_metadata(&self, key: &MatchKey) -> Result<Option<MatchRecord>, LedgerError>;
}

// Also implemented for Arc<L> so tests can keep a handle for assertions.
#[async_trait]
impl<L: EventLedger + ?Sized> EventLedger for std::sync::Arc<L> {
    async fn tracked_matches(&self) -> Result<Vec<MatchKey>, LedgerError> {
        (**self).tracked_matches().await
    }

    async fn known_event_ids(&self, key: &MatchKey) -> Result<HashSet<String>, LedgerError> {
        (**self).known_event_ids(key).await
    }

    async fn record_events(
        &self,
        record: &MatchRecord,
        event_ids: &[String],
    ) -> Result<(), LedgerError> {
        (**self).record_events(record, event_ids).await
    }

    async fn clear_match(&self, key: &MatchKey) -> Result<(), LedgerError> {
        (**self).clear_match(key).await
    }

    async fn match_metadata(&self, key: &MatchKey) -> Result<Option<MatchRecord>, LedgerError> {
        (**self).match_metadata(key).await
    }
}

/// Valkey-backed ledger.
///
/// All keys are namespaced under a configurable prefix so multiple instances
/// (e.g. staging vs live) can share one Valkey without collisions. Default
/// prefix: "pitchside" → keys like "pitchside:match:{id}".
#[derive(Clone)]
pub struct ValkeyLedger {
    conn: MultiplexedConnection,
    prefix: String,
}

impl ValkeyLedger {
    /// Connect to Valkey/Redis.
    pub async fn connect(url: &str, prefix: &str) -> Result<Self, LedgerError> {
        let client = Client::open(url)?;
        let conn = client.get_multiplexed_async_connection().await?;
        info!(url = url, prefix = prefix, "connected to Valkey");
        Ok(Self {
            conn,
            prefix: prefix.to_string(),
        })
    }

    /// Build a namespaced key: "{prefix}:{suffix}"
    fn key(&self, suffix: &str) -> String {
        format!("{}:{}", self.prefix, suffix)
    }

    fn meta_key(&self, match_id: &str) -> String {
        self.key(&format!("match:{}", match_id))
    }

    fn events_key(&self, match_id: &str) -> String {
        self.key(&format!("match_events:{}", match_id))
    }

    /// Test connectivity.
    pub async fn ping(&self) -> Result<(), LedgerError> {
        let mut conn = self.conn.clone();
        let pong: String = redis::cmd("PING").query_async(&mut conn).await?;
        debug!(response = %pong, "Valkey ping");
        Ok(())
    }
}

#[async_trait]
impl EventLedger for ValkeyLedger {
    async fn tracked_matches(&self) -> Result<Vec<MatchKey>, LedgerError> {
        let mut conn = self.conn.clone();
        let pattern = self.key("match:*");
        let keys: Vec<String> = redis::cmd("KEYS").arg(&pattern).query_async(&mut conn).await?;

        let mut tracked = Vec::new();
        for key in keys {
            let json: Option<String> = conn.get(&key).await?;
            let Some(json) = json else { continue };
            match serde_json::from_str::<MatchRecord>(&json) {
                Ok(record) => tracked.push(record.key),
                Err(e) => warn!(key = %key, error = %e, "unreadable match row, skipping"),
            }
        }
        Ok(tracked)
    }

    async fn known_event_ids(&self, key: &MatchKey) -> Result<HashSet<String>, LedgerError> {
        let mut conn = self.conn.clone();
        let ids: HashSet<String> = conn.smembers(self.events_key(&key.match_id)).await?;
        Ok(ids)
    }

    async fn record_events(
        &self,
        record: &MatchRecord,
        event_ids: &[String],
    ) -> Result<(), LedgerError> {
        if event_ids.is_empty() {
            return Ok(());
        }
        let mut conn = self.conn.clone();
        let json = serde_json::to_string(record)?;
        conn.set::<_, _, ()>(self.meta_key(&record.key.match_id), &json)
            .await?;
        conn.sadd::<_, _, ()>(self.events_key(&record.key.match_id), event_ids)
            .await?;
        debug!(
            match_id = %record.key.match_id,
            events = event_ids.len(),
            "recorded reported events"
        );
        Ok(())
    }

    async fn clear_match(&self, key: &MatchKey) -> Result<(), LedgerError> {
        let mut conn = self.conn.clone();
        conn.del::<_, ()>(&[
            self.meta_key(&key.match_id),
            self.events_key(&key.match_id),
        ])
        .await?;
        debug!(match_id = %key.match_id, "cleared match from ledger");
        Ok(())
    }

    async fn match_metadata(&self, key: &MatchKey) -> Result<Option<MatchRecord>, LedgerError> {
        let mut conn = self.conn.clone();
        let json: Option<String> = conn.get(self.meta_key(&key.match_id)).await?;
        match json {
            Some(j) => Ok(Some(serde_json::from_str(&j)?)),
            None => Ok(None),
        }
    }
}
