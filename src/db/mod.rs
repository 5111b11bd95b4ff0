mod schema;

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, Transaction};
use uuid::Uuid;

use crate::auth;
use crate::distributor::{self, Share};
use crate::error::{Error, Result};
use crate::models::*;

/// Handle to the embedded store.
///
/// The single `Mutex<Connection>` serializes every store access, and each
/// multi-step sequence (agent creation, agent deletion, bulk import) runs
/// inside one SQLite transaction, so concurrent readers observe either the
/// pre- or post-redistribution state, never a torn one.
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    pub fn open(path: PathBuf) -> anyhow::Result<Self> {
        let parent = path
            .parent()
            .ok_or_else(|| anyhow::anyhow!("Database path has no parent directory"))?;
        std::fs::create_dir_all(parent)?;
        let conn = Connection::open(&path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn open_default() -> anyhow::Result<Self> {
        let dirs = directories::ProjectDirs::from("", "", "leadline")
            .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?;
        let db_path = dirs.data_dir().join("leadline.db");
        Self::open(db_path)
    }

    pub fn open_memory() -> anyhow::Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn migrate(&self) -> anyhow::Result<()> {
        let conn = self.conn.lock().expect("database lock poisoned");
        schema::run_migrations(&conn)
    }

    // ============================================================
    // Agent operations
    // ============================================================

    pub fn get_all_agents(&self) -> Result<Vec<Agent>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(&format!(
            "SELECT {AGENT_COLUMNS} FROM agents ORDER BY rowid"
        ))?;

        let agents = stmt
            .query_map([], map_agent)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(agents)
    }

    pub fn get_agent(&self, id: Uuid) -> Result<Option<Agent>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(&format!(
            "SELECT {AGENT_COLUMNS} FROM agents WHERE id = ?"
        ))?;

        let mut rows = stmt.query([id.to_string()])?;
        match rows.next()? {
            Some(row) => Ok(Some(map_agent(row)?)),
            None => Ok(None),
        }
    }

    /// All agents with their owned leads expanded, in roster order.
    ///
    /// Assembled under one lock acquisition so the result reflects a single
    /// point-in-time state even while roster changes are in flight.
    pub fn get_agents_with_leads(&self) -> Result<Vec<AgentWithLeads>> {
        let conn = self.conn.lock().expect("database lock poisoned");

        let agents = conn
            .prepare(&format!(
                "SELECT {AGENT_COLUMNS} FROM agents ORDER BY rowid"
            ))?
            .query_map([], map_agent)?
            .collect::<Result<Vec<_>, _>>()?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {LEAD_COLUMNS} FROM leads WHERE assigned_agent = ? ORDER BY rowid"
        ))?;

        let mut result = Vec::with_capacity(agents.len());
        for agent in agents {
            let leads = stmt
                .query_map([agent.id.to_string()], map_lead)?
                .collect::<Result<Vec<_>, _>>()?;
            result.push(AgentWithLeads { agent, leads });
        }

        Ok(result)
    }

    /// Leads owned by one agent, in insertion order. This is the derived
    /// replacement for a stored per-agent lead list.
    pub fn get_agent_leads(&self, agent_id: Uuid) -> Result<Vec<Lead>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(&format!(
            "SELECT {LEAD_COLUMNS} FROM leads WHERE assigned_agent = ? ORDER BY rowid"
        ))?;

        let leads = stmt
            .query_map([agent_id.to_string()], map_lead)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(leads)
    }

    /// Register a new agent and redistribute every lead across the
    /// enlarged roster.
    ///
    /// The insert and the full redistribution commit together: a failure
    /// anywhere rolls back to the pre-registration state.
    pub fn create_agent(&self, caller: Uuid, input: CreateAgentInput) -> Result<Agent> {
        let password_hash = auth::hash_password(&input.password)?;

        let mut conn = self.conn.lock().expect("database lock poisoned");
        let tx = conn.transaction()?;

        let duplicates: i64 = tx.query_row(
            "SELECT COUNT(*) FROM agents WHERE email = ?",
            [&input.email],
            |row| row.get(0),
        )?;
        if duplicates > 0 {
            return Err(Error::validation("Agent already exists"));
        }

        let id = Uuid::new_v4();
        let now = Utc::now();

        tx.execute(
            "INSERT INTO agents (id, name, email, mobile, password_hash, created_by, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            (
                id.to_string(),
                &input.name,
                &input.email,
                &input.mobile,
                &password_hash,
                caller.to_string(),
                now.to_rfc3339(),
                now.to_rfc3339(),
            ),
        )?;

        // Full reshuffle: recompute the whole Lead -> Agent mapping over the
        // roster including the new agent. Reassigning every lead replaces
        // the prior mapping outright, so no clearing step is needed.
        let lead_ids = all_lead_ids(&tx)?;
        if !lead_ids.is_empty() {
            let agent_ids = all_agent_ids(&tx)?;
            tracing::info!(
                leads = lead_ids.len(),
                agents = agent_ids.len(),
                "redistributing leads after agent registration"
            );
            apply_shares(&tx, &distributor::distribute(&agent_ids, &lead_ids))?;
        }

        tx.commit()?;

        Ok(Agent {
            id,
            name: input.name,
            email: input.email,
            mobile: input.mobile,
            created_by: caller,
            created_at: now,
            updated_at: now,
        })
    }

    /// Delete an agent, handing its leads to the remaining roster.
    ///
    /// Only the caller that registered the agent may delete it. The
    /// departing agent's leads are redistributed round-robin over the
    /// remaining agents in one transaction; when no agents remain they are
    /// deleted outright rather than left unassigned.
    pub fn delete_agent(&self, caller: Uuid, id: Uuid) -> Result<()> {
        let mut conn = self.conn.lock().expect("database lock poisoned");
        let tx = conn.transaction()?;

        let created_by: Option<String> = tx
            .query_row(
                "SELECT created_by FROM agents WHERE id = ?",
                [id.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        let Some(created_by) = created_by else {
            return Err(Error::NotFound("Agent"));
        };
        if parse_uuid(created_by) != caller {
            return Err(Error::forbidden(
                "Only the staff member that created an agent can delete it",
            ));
        }

        let owned = agent_lead_ids(&tx, id)?;
        let remaining: Vec<Uuid> = tx
            .prepare("SELECT id FROM agents WHERE id != ? ORDER BY rowid")?
            .query_map([id.to_string()], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .map(parse_uuid)
            .collect();

        if remaining.is_empty() {
            if !owned.is_empty() {
                // Orphaned leads are not retained unassigned.
                let purged = tx.execute(
                    "DELETE FROM leads WHERE assigned_agent = ?",
                    [id.to_string()],
                )?;
                tracing::info!(leads = purged, "deleted leads of last remaining agent");
            }
        } else if !owned.is_empty() {
            tracing::info!(
                leads = owned.len(),
                agents = remaining.len(),
                "redistributing leads of departing agent"
            );
            apply_shares(&tx, &distributor::distribute(&remaining, &owned))?;
        }

        tx.execute("DELETE FROM agents WHERE id = ?", [id.to_string()])?;
        tx.commit()?;

        Ok(())
    }

    // ============================================================
    // Lead operations
    // ============================================================

    pub fn get_all_leads(&self) -> Result<Vec<Lead>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt =
            conn.prepare(&format!("SELECT {LEAD_COLUMNS} FROM leads ORDER BY rowid"))?;

        let leads = stmt
            .query_map([], map_lead)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(leads)
    }

    /// All leads with their owning agent expanded, in insertion order.
    pub fn get_leads_with_agents(&self) -> Result<Vec<LeadWithAgent>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT l.id, l.first_name, l.phone, l.notes, l.assigned_agent, l.created_by,
                    l.created_at, l.updated_at, a.id, a.name, a.email
             FROM leads l
             LEFT JOIN agents a ON a.id = l.assigned_agent
             ORDER BY l.rowid",
        )?;

        let leads = stmt
            .query_map([], |row| {
                let agent = match row.get::<_, Option<String>>(8)? {
                    Some(agent_id) => Some(AgentSummary {
                        id: parse_uuid(agent_id),
                        name: row.get(9)?,
                        email: row.get(10)?,
                    }),
                    None => None,
                };
                Ok(LeadWithAgent {
                    lead: map_lead(row)?,
                    agent,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(leads)
    }

    /// Create a single lead, assigned to the least-loaded agent.
    ///
    /// Leads are always owned at creation; with an empty roster the
    /// creation is rejected instead of inserting an unassigned lead.
    pub fn create_lead(&self, caller: Uuid, input: CreateLeadInput) -> Result<Lead> {
        let mut conn = self.conn.lock().expect("database lock poisoned");
        let tx = conn.transaction()?;

        let owner: Option<String> = tx
            .query_row(
                "SELECT a.id FROM agents a
                 LEFT JOIN leads l ON l.assigned_agent = a.id
                 GROUP BY a.id
                 ORDER BY COUNT(l.id), a.rowid
                 LIMIT 1",
                [],
                |row| row.get(0),
            )
            .optional()?;
        let Some(owner) = owner else {
            return Err(Error::NoAgents);
        };
        let owner = parse_uuid(owner);

        let id = Uuid::new_v4();
        let now = Utc::now();

        tx.execute(
            "INSERT INTO leads (id, first_name, phone, notes, assigned_agent, created_by, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            (
                id.to_string(),
                &input.first_name,
                &input.phone,
                &input.notes,
                owner.to_string(),
                caller.to_string(),
                now.to_rfc3339(),
                now.to_rfc3339(),
            ),
        )?;
        tx.commit()?;

        Ok(Lead {
            id,
            first_name: input.first_name,
            phone: input.phone,
            notes: input.notes,
            assigned_agent: Some(owner),
            created_by: caller,
            created_at: now,
            updated_at: now,
        })
    }

    /// Bulk-insert valid import rows, each owned round-robin against the
    /// roster as it stood at call time. All-or-nothing: with no agents (or
    /// no valid rows) nothing is inserted.
    pub fn import_leads(&self, caller: Uuid, rows: &[ImportRow]) -> Result<Vec<Lead>> {
        if rows.is_empty() {
            return Err(Error::validation("Invalid file format or empty file"));
        }

        let mut conn = self.conn.lock().expect("database lock poisoned");
        let tx = conn.transaction()?;

        let agent_ids = all_agent_ids(&tx)?;
        if agent_ids.is_empty() {
            return Err(Error::NoAgents);
        }

        let owners = distributor::owners_for_batch(&agent_ids, rows.len());
        let now = Utc::now();
        let mut inserted = Vec::with_capacity(rows.len());

        {
            let mut stmt = tx.prepare(
                "INSERT INTO leads (id, first_name, phone, notes, assigned_agent, created_by, created_at, updated_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            )?;
            for (row, &owner) in rows.iter().zip(&owners) {
                let id = Uuid::new_v4();
                stmt.execute((
                    id.to_string(),
                    &row.first_name,
                    &row.phone,
                    &row.notes,
                    owner.to_string(),
                    caller.to_string(),
                    now.to_rfc3339(),
                    now.to_rfc3339(),
                ))?;
                inserted.push(Lead {
                    id,
                    first_name: row.first_name.clone(),
                    phone: row.phone.clone(),
                    notes: row.notes.clone(),
                    assigned_agent: Some(owner),
                    created_by: caller,
                    created_at: now,
                    updated_at: now,
                });
            }
        }

        tx.commit()?;

        tracing::info!(
            leads = inserted.len(),
            agents = agent_ids.len(),
            "imported and distributed leads"
        );

        Ok(inserted)
    }

    /// Delete one lead. No redistribution: remaining leads keep their
    /// owners, and with derived ownership there is no back-reference to
    /// repair.
    pub fn delete_lead(&self, id: Uuid) -> Result<()> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let deleted = conn.execute("DELETE FROM leads WHERE id = ?", [id.to_string()])?;
        if deleted == 0 {
            return Err(Error::NotFound("Lead"));
        }
        Ok(())
    }

    // ============================================================
    // Integrity
    // ============================================================

    /// Leads whose `assigned_agent` references no existing agent. Always
    /// zero when mutations go through this store; exposed for the `check`
    /// remediation command.
    pub fn count_orphaned_leads(&self) -> Result<usize> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM leads l
             WHERE l.assigned_agent IS NOT NULL
               AND NOT EXISTS (SELECT 1 FROM agents a WHERE a.id = l.assigned_agent)",
            [],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self {
            conn: self.conn.clone(),
        }
    }
}

// ============================================================
// Row mapping and batch helpers
// ============================================================

const AGENT_COLUMNS: &str = "id, name, email, mobile, created_by, created_at, updated_at";
const LEAD_COLUMNS: &str =
    "id, first_name, phone, notes, assigned_agent, created_by, created_at, updated_at";

fn map_agent(row: &rusqlite::Row<'_>) -> rusqlite::Result<Agent> {
    Ok(Agent {
        id: parse_uuid(row.get::<_, String>(0)?),
        name: row.get(1)?,
        email: row.get(2)?,
        mobile: row.get(3)?,
        created_by: parse_uuid(row.get::<_, String>(4)?),
        created_at: parse_datetime(row.get::<_, String>(5)?),
        updated_at: parse_datetime(row.get::<_, String>(6)?),
    })
}

fn map_lead(row: &rusqlite::Row<'_>) -> rusqlite::Result<Lead> {
    Ok(Lead {
        id: parse_uuid(row.get::<_, String>(0)?),
        first_name: row.get(1)?,
        phone: row.get(2)?,
        notes: row.get(3)?,
        assigned_agent: row.get::<_, Option<String>>(4)?.map(parse_uuid),
        created_by: parse_uuid(row.get::<_, String>(5)?),
        created_at: parse_datetime(row.get::<_, String>(6)?),
        updated_at: parse_datetime(row.get::<_, String>(7)?),
    })
}

/// Lead ids in insertion order, the order full redistribution walks.
fn all_lead_ids(tx: &Transaction<'_>) -> Result<Vec<Uuid>> {
    let ids = tx
        .prepare("SELECT id FROM leads ORDER BY rowid")?
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?
        .into_iter()
        .map(parse_uuid)
        .collect();
    Ok(ids)
}

/// Agent ids in roster (insertion) order, so a newly registered agent
/// always sits last.
fn all_agent_ids(tx: &Transaction<'_>) -> Result<Vec<Uuid>> {
    let ids = tx
        .prepare("SELECT id FROM agents ORDER BY rowid")?
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?
        .into_iter()
        .map(parse_uuid)
        .collect();
    Ok(ids)
}

/// The departing agent's owned lead ids, in the order they entered its
/// collection.
fn agent_lead_ids(tx: &Transaction<'_>, agent_id: Uuid) -> Result<Vec<Uuid>> {
    let ids = tx
        .prepare("SELECT id FROM leads WHERE assigned_agent = ? ORDER BY rowid")?
        .query_map([agent_id.to_string()], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?
        .into_iter()
        .map(parse_uuid)
        .collect();
    Ok(ids)
}

/// Apply a computed distribution as one batched update per agent.
fn apply_shares(tx: &Transaction<'_>, shares: &[Share]) -> Result<()> {
    let now = Utc::now().to_rfc3339();

    for share in shares {
        if share.lead_ids.is_empty() {
            continue;
        }

        let placeholders = vec!["?"; share.lead_ids.len()].join(", ");
        let sql = format!(
            "UPDATE leads SET assigned_agent = ?, updated_at = ? WHERE id IN ({placeholders})"
        );

        let mut params: Vec<Box<dyn rusqlite::ToSql>> =
            vec![Box::new(share.agent_id.to_string()), Box::new(now.clone())];
        for lead_id in &share.lead_ids {
            params.push(Box::new(lead_id.to_string()));
        }
        let params_ref: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();
        tx.execute(&sql, params_ref.as_slice())?;
    }

    Ok(())
}

fn parse_uuid(s: String) -> Uuid {
    Uuid::parse_str(&s).unwrap_or_else(|_| Uuid::nil())
}

fn parse_datetime(s: String) -> chrono::DateTime<Utc> {
    chrono::DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}
