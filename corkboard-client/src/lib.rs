//! # Corkboard Client State Mirror
//!
//! An explicit, constructor-injected mirror of one board's server state.
//! Multiple independent instances (e.g. under test) never share state.
//!
//! The store applies local mutations optimistically before the server
//! round-trip completes, journaling the inverse of each one. On server
//! confirmation the journal entry is dropped; on rejection the inverse is
//! applied, or, when later mutations have been layered on top and the
//! inverse can no longer be computed safely, the store flags itself for a
//! re-fetch of authoritative state (the documented fallback).
//!
//! Remote broadcasts from other clients replay through the same board
//! engine the server uses, so the mirror's column/task_ids model satisfies
//! the server's structural invariants at all times modulo network delay.

pub mod journal;
pub mod store;

pub use journal::{Inverse, Journal, OpId};
pub use store::{BoardStore, LocalMutation, StoreError};
