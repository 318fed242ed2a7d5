//! Overnight Core: domain types, scenario classifier, inversion tripwires,
//! and quote providers for the pre-market dashboard.
//!
//! - Domain types (quotes, snapshots, instruments and their roles)
//! - Stateless scenario classifier with first-rule-wins priority
//! - Tripwire session state machine (UNLOCKED → LOCKED → ARMED)
//! - Quote provider trait with Yahoo Finance, scripted and CSV replay feeds

pub mod classifier;
pub mod data;
pub mod domain;
pub mod tripwire;
