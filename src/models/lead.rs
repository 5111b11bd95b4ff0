use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::AgentSummary;

/// A prospective-customer record with at most one owning agent.
///
/// `assigned_agent` is the single source of truth for ownership. Leads are
/// always assigned at creation when any agent exists; an unassigned lead can
/// only occur on an empty roster, and the last-agent deletion path removes
/// leads rather than orphaning them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lead {
    pub id: Uuid,
    pub first_name: String,
    pub phone: String,
    pub notes: Option<String>,
    pub assigned_agent: Option<Uuid>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a single lead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateLeadInput {
    pub first_name: String,
    pub phone: String,
    pub notes: Option<String>,
}

/// A lead with its owning agent expanded, used for lead listings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeadWithAgent {
    #[serde(flatten)]
    pub lead: Lead,
    pub agent: Option<AgentSummary>,
}

/// One valid spreadsheet row, produced by the importer after the
/// minimal-field check (name and phone present).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportRow {
    pub first_name: String,
    pub phone: String,
    pub notes: Option<String>,
}

/// Outcome of a bulk import.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportReport {
    /// Leads created and assigned.
    pub imported: usize,
    /// Rows silently dropped by the minimal-field check.
    pub skipped: usize,
}
