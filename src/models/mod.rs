//! Domain models for leadline.
//!
//! # Core Concepts
//!
//! - [`Agent`]: a staff account that can own leads. The roster is small and
//!   every roster change (creation, deletion) re-runs lead distribution.
//! - [`Lead`]: a prospective-customer record owned by at most one agent via
//!   `assigned_agent`. Ownership is stored only on the lead side; the
//!   agent's lead list is a derived view, never a second copy.
//! - [`ImportRow`] / [`ImportReport`]: the bulk-import boundary — rows that
//!   survived the minimal-field check, and the counts reported back.

mod agent;
mod lead;

pub use agent::*;
pub use lead::*;
