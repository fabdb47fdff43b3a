//! Field resolution engine for spreadsheet takeoff imports.
//!
//! Raw spreadsheet fields are normalized, resolved onto the canonical bid
//! taxonomy (either by score-based intent rules or by ordered classification
//! rules), aggregated into an [`ImportReport`](workflows::report::ImportReport),
//! and triaged through the QA resolution ledger.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
