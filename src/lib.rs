//! Lead-distribution admin server.
//!
//! Staff create agent accounts and upload spreadsheets of sales leads; the
//! server fans leads out round-robin across the roster and re-runs the
//! distribution whenever the roster changes. See [`distributor`] for the
//! assignment core and [`db::Database`] for the three orchestrations built
//! on it (bulk import, full redistribution on agent creation, partial
//! redistribution on agent deletion).

pub mod api;
pub mod auth;
pub mod db;
pub mod distributor;
pub mod error;
pub mod importer;
pub mod models;
