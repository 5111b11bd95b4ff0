use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Lead;

/// A staff account that can own leads.
///
/// Agents do not store their lead list; ownership lives on the lead side
/// (`Lead::assigned_agent`) and "leads owned by this agent" is a query-time
/// view. The argon2 credential hash is stored in the database but never
/// carried on this struct, so it cannot leak into API responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub mobile: String,
    /// The staff caller that registered this agent. Only this caller may
    /// delete the agent.
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for registering a new agent.
///
/// Registration triggers a full redistribution of all existing leads across
/// the enlarged roster.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAgentInput {
    pub name: String,
    pub email: String,
    pub mobile: String,
    /// Plaintext credential, hashed with argon2id before storage.
    pub password: String,
}

/// An agent with its owned leads expanded, used for roster listings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentWithLeads {
    #[serde(flatten)]
    pub agent: Agent,
    /// Owned leads in assignment-stable (insertion) order.
    pub leads: Vec<Lead>,
}

/// The subset of agent fields embedded in lead responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}
