//! Read-only office/user registry lookups.
//!
//! User and office administration happen elsewhere; this module only
//! resolves reference data the ticket flows need, plus the supervisor
//! assign-view support queries.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::{Json, Router};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::Actor;
use crate::error::ApiError;
use crate::shared::enums::{Role, TicketStatus};
use crate::shared::models::{Office, User};
use crate::shared::schema::{offices, tickets, users};
use crate::shared::state::AppState;

/// A supervisor must have an office; without one the role degrades to
/// Técnico. Applied wherever a user row is written.
pub fn normalize_role(role: Role, office_id: Option<Uuid>) -> Role {
    match (role, office_id) {
        (Role::Supervisor, None) => Role::Tecnico,
        (role, _) => role,
    }
}

pub fn get_user(conn: &mut PgConnection, user_id: Uuid) -> Result<Option<User>, ApiError> {
    Ok(users::table.find(user_id).first::<User>(conn).optional()?)
}

pub fn get_office(conn: &mut PgConnection, office_id: Uuid) -> Result<Option<Office>, ApiError> {
    Ok(offices::table
        .find(office_id)
        .first::<Office>(conn)
        .optional()?)
}

/// Active, approved technicians, optionally limited to one office.
pub fn list_technicians(
    conn: &mut PgConnection,
    office_id: Option<Uuid>,
) -> Result<Vec<User>, ApiError> {
    let mut q = users::table
        .filter(users::role.eq(Role::Tecnico))
        .filter(users::is_active.eq(true))
        .filter(users::approved.eq(true))
        .into_boxed();
    if let Some(office_id) = office_id {
        q = q.filter(users::office_id.eq(Some(office_id)));
    }
    Ok(q.order(users::username.asc()).load::<User>(conn)?)
}

/// Open-ticket count per technician of an office, for the assign view.
pub fn technician_workload(
    conn: &mut PgConnection,
    office_id: Uuid,
) -> Result<HashMap<Uuid, i64>, ApiError> {
    let open = [
        TicketStatus::Assigned,
        TicketStatus::InProgress,
        TicketStatus::PendingSupplies,
    ];
    let rows = tickets::table
        .filter(tickets::assigned_office_id.eq(office_id))
        .filter(tickets::status.eq_any(open.to_vec()))
        .select(tickets::technician_id)
        .load::<Option<Uuid>>(conn)?;
    let mut counts = HashMap::new();
    for technician_id in rows.into_iter().flatten() {
        *counts.entry(technician_id).or_insert(0) += 1;
    }
    Ok(counts)
}

#[derive(Debug, Deserialize)]
pub struct TechnicianQuery {
    pub office_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct TechnicianRow {
    #[serde(flatten)]
    pub user: User,
    pub open_tickets: i64,
}

pub async fn get_user_handler(
    State(state): State<Arc<AppState>>,
    _actor: Actor,
    Path(user_id): Path<Uuid>,
) -> Result<Json<User>, ApiError> {
    let mut conn = state.conn.get()?;
    let user = get_user(&mut conn, user_id)?.ok_or(ApiError::NotFound)?;
    Ok(Json(user))
}

pub async fn get_office_handler(
    State(state): State<Arc<AppState>>,
    _actor: Actor,
    Path(office_id): Path<Uuid>,
) -> Result<Json<Office>, ApiError> {
    let mut conn = state.conn.get()?;
    let office = get_office(&mut conn, office_id)?.ok_or(ApiError::NotFound)?;
    Ok(Json(office))
}

pub async fn list_offices_handler(
    State(state): State<Arc<AppState>>,
    _actor: Actor,
) -> Result<Json<Vec<Office>>, ApiError> {
    let mut conn = state.conn.get()?;
    let rows = offices::table
        .order(offices::name.asc())
        .load::<Office>(&mut conn)?;
    Ok(Json(rows))
}

/// Technicians visible to the actor. Supervisors are pinned to their own
/// office regardless of the query; Jefes may browse any office.
pub async fn list_technicians_handler(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Query(query): Query<TechnicianQuery>,
) -> Result<Json<Vec<TechnicianRow>>, ApiError> {
    let office_id = match actor.role {
        Role::Jefe => query.office_id,
        Role::Supervisor => match actor.office_id {
            Some(own) => Some(own),
            None => return Err(ApiError::Forbidden),
        },
        Role::Tecnico | Role::Unassigned => return Err(ApiError::Forbidden),
    };

    let mut conn = state.conn.get()?;
    let technicians = list_technicians(&mut conn, office_id)?;
    let workload = match office_id {
        Some(office_id) => technician_workload(&mut conn, office_id)?,
        None => HashMap::new(),
    };

    let rows = technicians
        .into_iter()
        .map(|user| {
            let open_tickets = workload.get(&user.id).copied().unwrap_or(0);
            TechnicianRow { user, open_tickets }
        })
        .collect();
    Ok(Json(rows))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/directory/users/:id", get(get_user_handler))
        .route("/api/directory/offices", get(list_offices_handler))
        .route("/api/directory/offices/:id", get(get_office_handler))
        .route("/api/directory/technicians", get(list_technicians_handler))
}

#[cfg(test)]
mod tests {
    use super::normalize_role;
    use crate::shared::enums::Role;
    use uuid::Uuid;

    #[test]
    fn supervisor_without_office_degrades_to_tecnico() {
        assert_eq!(normalize_role(Role::Supervisor, None), Role::Tecnico);
    }

    #[test]
    fn supervisor_with_office_is_untouched() {
        let office = Some(Uuid::new_v4());
        assert_eq!(normalize_role(Role::Supervisor, office), Role::Supervisor);
    }

    #[test]
    fn other_roles_never_degrade() {
        assert_eq!(normalize_role(Role::Jefe, None), Role::Jefe);
        assert_eq!(normalize_role(Role::Tecnico, None), Role::Tecnico);
        assert_eq!(normalize_role(Role::Unassigned, None), Role::Unassigned);
    }
}
