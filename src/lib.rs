//! Shared library modules for the pitchside match notifier.
//!
//! Re-exports modules needed by the poller daemon and standalone binaries
//! (e.g. `digest`) without duplicating code.

pub mod config;
pub mod digest;
pub mod engine;
pub mod event;
pub mod feed;
pub mod ledger;
pub mod notify;
