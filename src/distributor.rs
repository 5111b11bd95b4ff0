//! Round-robin lead distribution.
//!
//! The single piece of real logic in the system: given an ordered roster
//! and an ordered batch of leads, lead `i` goes to agent `i mod m`. The
//! split is maximally even — every agent receives either `⌊n/m⌋` or
//! `⌈n/m⌉` leads — and the output is fully determined by the two input
//! orders. No weighting, no capacity limits, no randomness.

use uuid::Uuid;

/// One agent's share of a distribution: the agent id and the lead ids it
/// receives, in batch order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Share {
    pub agent_id: Uuid,
    pub lead_ids: Vec<Uuid>,
}

/// Assign `leads` across `agents` round-robin and group the result per
/// agent, in roster order. Agents past the end of a short batch still get
/// a (possibly empty) share, so callers can rely on one entry per agent.
///
/// An empty roster has no valid assignment; callers must reject or
/// special-case that before calling (see the import and deletion paths).
pub fn distribute(agents: &[Uuid], leads: &[Uuid]) -> Vec<Share> {
    let mut shares: Vec<Share> = agents
        .iter()
        .map(|&agent_id| Share {
            agent_id,
            lead_ids: Vec::new(),
        })
        .collect();

    if shares.is_empty() {
        return shares;
    }

    for (i, &lead_id) in leads.iter().enumerate() {
        shares[i % agents.len()].lead_ids.push(lead_id);
    }

    shares
}

/// The agent each lead in a batch would be assigned to, in batch order.
/// Used by bulk import to precompute owners before inserting rows.
pub fn owners_for_batch(agents: &[Uuid], batch_len: usize) -> Vec<Uuid> {
    (0..batch_len).map(|i| agents[i % agents.len()]).collect()
}
