// src/pipeline/mod.rs

//! Pipeline entry points for sync operations.
//!
//! - `classify`: Decide whether a shipment is submitted or skipped
//! - `SyncEngine`: Drive fetch, filter and submit across accounts
//! - `run_sync`: Wire the engine to the live eBay and Parcel clients

pub mod filter;
pub mod sync;

pub use filter::{Decision, SkipReason, classify};
pub use sync::{
    AccountReport, AccountState, RunOutcome, RunReport, RunResult, SyncEngine, run_sync,
};
