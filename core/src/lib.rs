//! Duty assignment and compliance engine for a fellowship duty roster.
//!
//! Assigns weekend call and night-float duties, picks clinic-coverage
//! substitutes for trainees on nights, and audits the combined schedule
//! against duty-hour rules. Everything is an in-process, single-threaded
//! computation over an immutable program snapshot.

pub mod assigner;
pub mod calendar;
pub mod compliance;
pub mod config;
pub mod conflicts;
pub mod coverage;
pub mod eligibility;
pub mod engine;
pub mod error;
pub mod rng;
pub mod roster;
pub mod rotation;
pub mod snapshot;
pub mod types;
