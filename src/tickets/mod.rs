//! Ticket endpoints: role-aware listing, creation, assignment, technician
//! status updates, notes and evidence.

pub mod lifecycle;
pub mod policy;

use std::sync::Arc;

use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::Actor;
use crate::error::ApiError;
use crate::notify::{broadcast_stored, fanout};
use crate::shared::enums::{Role, TicketPriority, TicketStatus};
use crate::shared::models::{Evidence, Ticket, TicketNote};
use crate::shared::schema::{evidences, ticket_notes, tickets};
use crate::shared::state::AppState;

use lifecycle::{AssignTarget, NewTicket, StatusUpdate};
use policy::Operation;

#[derive(Debug, Deserialize)]
pub struct CreateTicketRequest {
    pub requester_name: String,
    pub requester_office_id: Option<Uuid>,
    pub requester_office_text: Option<String>,
    pub description: String,
    pub priority: Option<TicketPriority>,
    pub assigned_office_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct AssignRequest {
    /// Absent means the supervisor takes the ticket themself.
    pub technician_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: TicketStatus,
    pub equipment_code: Option<String>,
    pub note: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AddNoteRequest {
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub status: Option<String>,
    pub priority: Option<String>,
    pub office: Option<String>,
    pub tech: Option<String>,
    pub q: Option<String>,
    pub sort: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct TicketDetail {
    pub ticket: Ticket,
    pub notes: Vec<TicketNote>,
    pub evidences: Vec<Evidence>,
}

/// Sort keys accepted by the listing; anything else degrades to newest
/// first.
pub const SORT_KEYS: [&str; 8] = [
    "-created_at",
    "created_at",
    "-updated_at",
    "updated_at",
    "-priority",
    "priority",
    "status",
    "-status",
];

pub fn normalize_sort(sort: Option<&str>) -> &str {
    match sort {
        Some(key) if SORT_KEYS.contains(&key) => key,
        _ => "-created_at",
    }
}

pub async fn create_ticket(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Json(req): Json<CreateTicketRequest>,
) -> Result<(StatusCode, Json<Ticket>), ApiError> {
    let mut conn = state.conn.get()?;

    let input = NewTicket {
        requester_name: req.requester_name.trim().to_string(),
        requester_office_id: req.requester_office_id,
        requester_office_text: req.requester_office_text.unwrap_or_default(),
        description: req.description.trim().to_string(),
        priority: req.priority.unwrap_or_default(),
        assigned_office_id: req.assigned_office_id,
    };
    let (ticket, stored) = lifecycle::create_ticket(&mut conn, &actor, input)?;

    fanout::broadcast_ticket_change(state.broadcaster.as_ref(), &ticket);
    broadcast_stored(&state, &stored);
    Ok((StatusCode::CREATED, Json(ticket)))
}

pub async fn list_tickets(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Ticket>>, ApiError> {
    let mut conn = state.conn.get()?;
    let limit = query.limit.unwrap_or(50).clamp(1, 200);
    let offset = query.offset.unwrap_or(0).max(0);

    let mut q = tickets::table.into_boxed();

    // role-aware base scope
    match actor.role {
        Role::Jefe => {}
        Role::Supervisor => match actor.office_id {
            Some(office_id) => q = q.filter(tickets::assigned_office_id.eq(office_id)),
            None => return Ok(Json(Vec::new())),
        },
        Role::Tecnico | Role::Unassigned => {
            q = q.filter(tickets::technician_id.eq(Some(actor.id)))
        }
    }

    // lenient filters: unparseable values degrade to no filter
    if let Some(status) = query
        .status
        .as_deref()
        .and_then(|s| s.parse::<TicketStatus>().ok())
    {
        q = q.filter(tickets::status.eq(status));
    }
    if let Some(priority) = query
        .priority
        .as_deref()
        .and_then(|p| p.parse::<i16>().ok())
        .and_then(|p| TicketPriority::try_from(p).ok())
    {
        q = q.filter(tickets::priority.eq(priority));
    }
    if let Some(office) = query
        .office
        .as_deref()
        .and_then(|v| Uuid::parse_str(v.trim()).ok())
    {
        q = q.filter(tickets::assigned_office_id.eq(office));
    }
    if let Some(tech) = query
        .tech
        .as_deref()
        .and_then(|v| Uuid::parse_str(v.trim()).ok())
    {
        q = q.filter(tickets::technician_id.eq(Some(tech)));
    }
    if let Some(text) = query.q.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        let pattern = format!("%{text}%");
        q = q.filter(
            tickets::requester_name
                .ilike(pattern.clone())
                .or(tickets::description.ilike(pattern)),
        );
    }

    q = match normalize_sort(query.sort.as_deref()) {
        "created_at" => q.order(tickets::created_at.asc()),
        "-updated_at" => q.order(tickets::updated_at.desc()),
        "updated_at" => q.order(tickets::updated_at.asc()),
        "-priority" => q.order(tickets::priority.desc()),
        "priority" => q.order(tickets::priority.asc()),
        "status" => q.order(tickets::status.asc()),
        "-status" => q.order(tickets::status.desc()),
        _ => q.order(tickets::created_at.desc()),
    };

    let rows = q.limit(limit).offset(offset).load::<Ticket>(&mut conn)?;
    Ok(Json(rows))
}

pub async fn get_ticket(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(ticket_id): Path<Uuid>,
) -> Result<Json<TicketDetail>, ApiError> {
    let mut conn = state.conn.get()?;

    let ticket = tickets::table
        .find(ticket_id)
        .first::<Ticket>(&mut conn)
        .optional()?
        .ok_or(ApiError::NotFound)?;
    if !policy::can_perform(&actor, Operation::ViewDetail, Some(&ticket)) {
        return Err(ApiError::Forbidden);
    }

    let notes = ticket_notes::table
        .filter(ticket_notes::ticket_id.eq(ticket.id))
        .order(ticket_notes::created_at.desc())
        .load::<TicketNote>(&mut conn)?;
    let evidence_rows = evidences::table
        .filter(evidences::ticket_id.eq(ticket.id))
        .order(evidences::uploaded_at.desc())
        .load::<Evidence>(&mut conn)?;

    Ok(Json(TicketDetail {
        ticket,
        notes,
        evidences: evidence_rows,
    }))
}

pub async fn assign_ticket(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(ticket_id): Path<Uuid>,
    Json(req): Json<AssignRequest>,
) -> Result<Json<Ticket>, ApiError> {
    let mut conn = state.conn.get()?;

    let target = match req.technician_id {
        Some(technician_id) => AssignTarget::Technician(technician_id),
        None => AssignTarget::SelfAssign,
    };
    let (ticket, stored, assignee) =
        lifecycle::assign_technician(&mut conn, &actor, ticket_id, target)?;

    fanout::broadcast_ticket_change(state.broadcaster.as_ref(), &ticket);
    broadcast_stored(&state, &stored);

    // best-effort email; failures are logged inside the mailer
    if !assignee.email.trim().is_empty() {
        let (subject, body) = fanout::assignment_email(&ticket, &assignee);
        state.mailer.send(&assignee.email, &subject, &body);
    }

    Ok(Json(ticket))
}

pub async fn update_status(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(ticket_id): Path<Uuid>,
    Json(req): Json<UpdateStatusRequest>,
) -> Result<Json<Ticket>, ApiError> {
    let mut conn = state.conn.get()?;

    let input = StatusUpdate {
        status: req.status,
        equipment_code: req.equipment_code,
        note: req.note,
    };
    let (ticket, stored) = lifecycle::update_status(&mut conn, &actor, ticket_id, input)?;

    fanout::broadcast_ticket_change(state.broadcaster.as_ref(), &ticket);
    broadcast_stored(&state, &stored);
    Ok(Json(ticket))
}

pub async fn add_note(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(ticket_id): Path<Uuid>,
    Json(req): Json<AddNoteRequest>,
) -> Result<(StatusCode, Json<TicketNote>), ApiError> {
    let mut conn = state.conn.get()?;
    let note = lifecycle::add_note(&mut conn, &actor, ticket_id, &req.text)?;
    Ok((StatusCode::CREATED, Json(note)))
}

pub async fn add_evidence(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(ticket_id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<Evidence>), ApiError> {
    // authorize before touching the store so a denied upload leaves no file
    {
        let mut conn = state.conn.get()?;
        let ticket = tickets::table
            .find(ticket_id)
            .first::<Ticket>(&mut conn)
            .optional()?
            .ok_or(ApiError::NotFound)?;
        if !policy::can_perform(&actor, Operation::AddEvidence, Some(&ticket)) {
            return Err(ApiError::Forbidden);
        }
    }

    let mut image: Option<(String, Vec<u8>)> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::validation(format!("invalid multipart body: {e}")))?
    {
        if field.name() == Some("image") {
            let filename = field.file_name().unwrap_or("evidence").to_string();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ApiError::validation(format!("invalid image upload: {e}")))?;
            image = Some((filename, bytes.to_vec()));
        }
    }
    let (filename, bytes) =
        image.ok_or_else(|| ApiError::validation("an image field is required"))?;
    if bytes.is_empty() {
        return Err(ApiError::validation("uploaded image is empty"));
    }

    let asset_ref = state.evidence_store.save(&filename, &bytes)?;

    let mut conn = state.conn.get()?;
    let evidence = lifecycle::add_evidence(&mut conn, &actor, ticket_id, &asset_ref)?;
    Ok((StatusCode::CREATED, Json(evidence)))
}

pub async fn delete_ticket(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(ticket_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let mut conn = state.conn.get()?;
    let ticket = lifecycle::delete_ticket(&mut conn, &actor, ticket_id)?;

    fanout::broadcast_ticket_change(state.broadcaster.as_ref(), &ticket);
    Ok(StatusCode::NO_CONTENT)
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/tickets", get(list_tickets).post(create_ticket))
        .route("/api/tickets/:id", get(get_ticket).delete(delete_ticket))
        .route("/api/tickets/:id/assign", put(assign_ticket))
        .route("/api/tickets/:id/status", put(update_status))
        .route("/api/tickets/:id/notes", post(add_note))
        .route("/api/tickets/:id/evidence", post(add_evidence))
}

#[cfg(test)]
mod tests {
    use super::normalize_sort;

    #[test]
    fn unknown_sort_keys_degrade_to_newest_first() {
        assert_eq!(normalize_sort(Some("-created_at")), "-created_at");
        assert_eq!(normalize_sort(Some("priority")), "priority");
        assert_eq!(normalize_sort(Some("id; DROP TABLE tickets")), "-created_at");
        assert_eq!(normalize_sort(None), "-created_at");
    }
}
