use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use uuid::Uuid;

use crate::api::middleware::Caller;
use crate::db::Database;
use crate::error::Error;
use crate::importer;
use crate::models::*;

// ============================================================
// Error Handling
// ============================================================

/// Map a domain error to an HTTP response.
///
/// Validation-class failures carry their message to the client; store and
/// credential failures are logged server-side and sanitized so internals
/// never leak.
fn error_response(e: Error) -> (StatusCode, String) {
    match e {
        Error::Validation(_) => (StatusCode::BAD_REQUEST, e.to_string()),
        Error::NoAgents => (StatusCode::BAD_REQUEST, e.to_string()),
        Error::NotFound(_) => (StatusCode::NOT_FOUND, e.to_string()),
        Error::Forbidden(_) => (StatusCode::FORBIDDEN, e.to_string()),
        Error::Store(_) | Error::Credential => {
            tracing::error!("Internal error: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            )
        }
    }
}

// ============================================================
// Health
// ============================================================

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

// ============================================================
// Agents
// ============================================================

pub async fn list_agents(
    State(db): State<Database>,
) -> Result<Json<Vec<AgentWithLeads>>, (StatusCode, String)> {
    db.get_agents_with_leads()
        .map(Json)
        .map_err(error_response)
}

pub async fn create_agent(
    State(db): State<Database>,
    Extension(Caller(caller)): Extension<Caller>,
    Json(input): Json<CreateAgentInput>,
) -> Result<(StatusCode, Json<Agent>), (StatusCode, String)> {
    db.create_agent(caller, input)
        .map(|a| (StatusCode::CREATED, Json(a)))
        .map_err(error_response)
}

pub async fn delete_agent(
    State(db): State<Database>,
    Extension(Caller(caller)): Extension<Caller>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, (StatusCode, String)> {
    db.delete_agent(caller, id)
        .map(|()| StatusCode::NO_CONTENT)
        .map_err(error_response)
}

// ============================================================
// Leads
// ============================================================

pub async fn list_leads(
    State(db): State<Database>,
) -> Result<Json<Vec<LeadWithAgent>>, (StatusCode, String)> {
    db.get_leads_with_agents()
        .map(Json)
        .map_err(error_response)
}

pub async fn create_lead(
    State(db): State<Database>,
    Extension(Caller(caller)): Extension<Caller>,
    Json(input): Json<CreateLeadInput>,
) -> Result<(StatusCode, Json<Lead>), (StatusCode, String)> {
    db.create_lead(caller, input)
        .map(|l| (StatusCode::CREATED, Json(l)))
        .map_err(error_response)
}

pub async fn delete_lead(
    State(db): State<Database>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, (StatusCode, String)> {
    db.delete_lead(id)
        .map(|()| StatusCode::NO_CONTENT)
        .map_err(error_response)
}

// ============================================================
// Bulk import
// ============================================================

/// Accept a multipart CSV upload (field `file`), extract the valid rows,
/// and distribute them round-robin across the current roster.
pub async fn upload_leads(
    State(db): State<Database>,
    Extension(Caller(caller)): Extension<Caller>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<ImportReport>), (StatusCode, String)> {
    let mut file: Option<Vec<u8>> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| (StatusCode::BAD_REQUEST, format!("Invalid multipart field: {e}")))?
    {
        if field.name() == Some("file") {
            let bytes = field.bytes().await.map_err(|e| {
                (StatusCode::BAD_REQUEST, format!("Invalid file upload: {e}"))
            })?;
            file = Some(bytes.to_vec());
        }
    }

    let Some(file) = file else {
        return Err((StatusCode::BAD_REQUEST, "No file uploaded".to_string()));
    };

    let (rows, skipped) = importer::parse_csv(&file).map_err(error_response)?;

    let inserted = db.import_leads(caller, &rows).map_err(error_response)?;

    Ok((
        StatusCode::CREATED,
        Json(ImportReport {
            imported: inserted.len(),
            skipped,
        }),
    ))
}
