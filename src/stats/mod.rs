//! Read-only aggregates behind the dashboards. Derived entirely from the
//! ticket store; never mutates anything.

pub mod filter;

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use chrono::Duration;
use diesel::pg::Pg;
use diesel::prelude::*;
use serde::Serialize;
use uuid::Uuid;

use crate::auth::Actor;
use crate::error::ApiError;
use crate::shared::enums::{Role, TicketStatus};
use crate::shared::schema::{offices, tickets, users};
use crate::shared::state::AppState;

use filter::{StatsFilter, StatsQuery};

/// Visibility scope the aggregates run under.
#[derive(Debug, Clone, Copy)]
enum Scope {
    Global,
    Office(Uuid),
    Technician(Uuid),
}

impl Scope {
    fn for_actor(actor: &crate::shared::models::User) -> Option<Self> {
        match actor.role {
            Role::Jefe => Some(Self::Global),
            Role::Supervisor => actor.office_id.map(Self::Office),
            Role::Tecnico => Some(Self::Technician(actor.id)),
            Role::Unassigned => None,
        }
    }
}

type TicketsBoxed<'a> = tickets::BoxedQuery<'a, Pg>;

fn scoped<'a>(scope: Scope, filter: &StatsFilter) -> TicketsBoxed<'a> {
    let mut q = tickets::table.into_boxed();
    match scope {
        Scope::Global => {}
        Scope::Office(office_id) => q = q.filter(tickets::assigned_office_id.eq(office_id)),
        Scope::Technician(technician_id) => {
            q = q.filter(tickets::technician_id.eq(Some(technician_id)))
        }
    }
    if let Some(from) = filter.from {
        let start = from.and_hms_opt(0, 0, 0).expect("midnight exists").and_utc();
        q = q.filter(tickets::created_at.ge(start));
    }
    if let Some(to) = filter.to {
        // inclusive upper bound on the creation date
        let end = (to + Duration::days(1))
            .and_hms_opt(0, 0, 0)
            .expect("midnight exists")
            .and_utc();
        q = q.filter(tickets::created_at.lt(end));
    }
    if let Some(statuses) = &filter.statuses {
        q = q.filter(tickets::status.eq_any(statuses.clone()));
    }
    if let Some(office_id) = filter.office_id {
        q = q.filter(tickets::assigned_office_id.eq(office_id));
    }
    if let Some(technician_id) = filter.technician_id {
        q = q.filter(tickets::technician_id.eq(Some(technician_id)));
    }
    q
}

#[derive(Debug, Serialize)]
pub struct StatusCount {
    pub status: TicketStatus,
    pub label: &'static str,
    pub total: i64,
}

#[derive(Debug, Serialize)]
pub struct GroupCount {
    pub id: Uuid,
    pub label: String,
    pub total: i64,
}

fn count_by_status(
    conn: &mut PgConnection,
    scope: Scope,
    filter: &StatsFilter,
) -> Result<Vec<StatusCount>, ApiError> {
    let mut rows = Vec::with_capacity(TicketStatus::ALL.len());
    for status in TicketStatus::ALL {
        let total: i64 = scoped(scope, filter)
            .filter(tickets::status.eq(status))
            .count()
            .get_result(conn)?;
        rows.push(StatusCount {
            status,
            label: status.label(),
            total,
        });
    }
    Ok(rows)
}

fn fold_counts(ids: Vec<Option<Uuid>>) -> HashMap<Uuid, i64> {
    let mut counts = HashMap::new();
    for id in ids.into_iter().flatten() {
        *counts.entry(id).or_insert(0) += 1;
    }
    counts
}

fn office_labels(
    conn: &mut PgConnection,
    ids: &[Uuid],
) -> Result<HashMap<Uuid, String>, ApiError> {
    let rows = offices::table
        .filter(offices::id.eq_any(ids.to_vec()))
        .select((offices::id, offices::name))
        .load::<(Uuid, String)>(conn)?;
    Ok(rows.into_iter().collect())
}

fn user_labels(
    conn: &mut PgConnection,
    ids: &[Uuid],
) -> Result<HashMap<Uuid, String>, ApiError> {
    let rows = users::table
        .filter(users::id.eq_any(ids.to_vec()))
        .select((users::id, users::username))
        .load::<(Uuid, String)>(conn)?;
    Ok(rows.into_iter().collect())
}

fn to_group_counts(counts: HashMap<Uuid, i64>, labels: HashMap<Uuid, String>) -> Vec<GroupCount> {
    let mut rows: Vec<GroupCount> = counts
        .into_iter()
        .map(|(id, total)| GroupCount {
            id,
            label: labels.get(&id).cloned().unwrap_or_else(|| id.to_string()),
            total,
        })
        .collect();
    rows.sort_by(|a, b| b.total.cmp(&a.total).then_with(|| a.label.cmp(&b.label)));
    rows
}

fn count_by_office(
    conn: &mut PgConnection,
    scope: Scope,
    filter: &StatsFilter,
) -> Result<Vec<GroupCount>, ApiError> {
    let ids = scoped(scope, filter)
        .select(tickets::assigned_office_id)
        .load::<Uuid>(conn)?;
    let counts = fold_counts(ids.into_iter().map(Some).collect());
    let keys: Vec<Uuid> = counts.keys().copied().collect();
    let labels = office_labels(conn, &keys)?;
    Ok(to_group_counts(counts, labels))
}

fn count_by_user_column(
    conn: &mut PgConnection,
    ids: Vec<Option<Uuid>>,
) -> Result<Vec<GroupCount>, ApiError> {
    let counts = fold_counts(ids);
    let keys: Vec<Uuid> = counts.keys().copied().collect();
    let labels = user_labels(conn, &keys)?;
    Ok(to_group_counts(counts, labels))
}

#[derive(Debug, Serialize)]
pub struct Dashboard {
    pub total: i64,
    pub by_status: Vec<StatusCount>,
    pub by_office: Vec<GroupCount>,
    pub by_technician: Vec<GroupCount>,
    pub by_supervisor: Vec<GroupCount>,
}

/// Global dashboard. Jefe only; supervisors and technicians use `/me`.
pub async fn dashboard(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Query(query): Query<StatsQuery>,
) -> Result<Json<Dashboard>, ApiError> {
    if actor.role != Role::Jefe {
        return Err(ApiError::Forbidden);
    }
    let filter = StatsFilter::from_query(&query);
    let mut conn = state.conn.get()?;
    let scope = Scope::Global;

    let total: i64 = scoped(scope, &filter).count().get_result(&mut conn)?;
    let by_status = count_by_status(&mut conn, scope, &filter)?;
    let by_office = count_by_office(&mut conn, scope, &filter)?;
    let technician_ids = scoped(scope, &filter)
        .select(tickets::technician_id)
        .load::<Option<Uuid>>(&mut conn)?;
    let by_technician = count_by_user_column(&mut conn, technician_ids)?;
    let supervisor_ids = scoped(scope, &filter)
        .select(tickets::supervisor_id)
        .load::<Option<Uuid>>(&mut conn)?;
    let by_supervisor = count_by_user_column(&mut conn, supervisor_ids)?;

    Ok(Json(Dashboard {
        total,
        by_status,
        by_office,
        by_technician,
        by_supervisor,
    }))
}

/// Per-actor dashboard payload, shaped per role.
pub async fn my_stats(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Query(query): Query<StatsQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let filter = StatsFilter::from_query(&query);
    let mut conn = state.conn.get()?;

    let Some(scope) = Scope::for_actor(&actor) else {
        return Ok(Json(serde_json::json!({ "role": Role::Unassigned })));
    };

    let total: i64 = scoped(scope, &filter).count().get_result(&mut conn)?;
    let by_status = count_by_status(&mut conn, scope, &filter)?;

    let payload = match scope {
        Scope::Global => {
            let by_office = count_by_office(&mut conn, scope, &filter)?;
            serde_json::json!({
                "role": Role::Jefe,
                "total_tickets": total,
                "by_status": by_status,
                "by_office": by_office,
            })
        }
        Scope::Office(office_id) => {
            let active_technicians: i64 = users::table
                .filter(users::office_id.eq(Some(office_id)))
                .filter(users::role.eq(Role::Tecnico))
                .filter(users::is_active.eq(true))
                .count()
                .get_result(&mut conn)?;
            let supervised_by_me: i64 = scoped(scope, &filter)
                .filter(tickets::supervisor_id.eq(Some(actor.id)))
                .count()
                .get_result(&mut conn)?;
            let completed_techs = scoped(scope, &filter)
                .filter(tickets::status.eq(TicketStatus::Completed))
                .select(tickets::technician_id)
                .load::<Option<Uuid>>(&mut conn)?;
            let top_technician = count_by_user_column(&mut conn, completed_techs)?
                .into_iter()
                .next();
            let office_name: Option<String> = offices::table
                .find(office_id)
                .select(offices::name)
                .first(&mut conn)
                .optional()?;
            serde_json::json!({
                "role": Role::Supervisor,
                "office": { "id": office_id, "name": office_name },
                "assigned_office": total,
                "by_status": by_status,
                "active_technicians": active_technicians,
                "supervised_by_me": supervised_by_me,
                "top_technician": top_technician,
            })
        }
        Scope::Technician(_) => {
            let completed = by_status
                .iter()
                .find(|row| row.status == TicketStatus::Completed)
                .map_or(0, |row| row.total);
            let pending_supplies = by_status
                .iter()
                .find(|row| row.status == TicketStatus::PendingSupplies)
                .map_or(0, |row| row.total);
            serde_json::json!({
                "role": Role::Tecnico,
                "assigned": total,
                "by_status": by_status,
                "completed": completed,
                "pending_supplies": pending_supplies,
            })
        }
    };

    Ok(Json(payload))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/stats/dashboard", get(dashboard))
        .route("/api/stats/me", get(my_stats))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fold_counts_skips_unassigned_rows() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let counts = fold_counts(vec![Some(a), Some(a), None, Some(b)]);
        assert_eq!(counts[&a], 2);
        assert_eq!(counts[&b], 1);
        assert_eq!(counts.len(), 2);
    }

    #[test]
    fn group_counts_sort_by_total_then_label() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let c = Uuid::new_v4();
        let counts = HashMap::from([(a, 1), (b, 3), (c, 1)]);
        let labels = HashMap::from([
            (a, "zeta".to_string()),
            (b, "mid".to_string()),
            (c, "alpha".to_string()),
        ]);
        let rows = to_group_counts(counts, labels);
        assert_eq!(rows[0].label, "mid");
        assert_eq!(rows[1].label, "alpha");
        assert_eq!(rows[2].label, "zeta");
    }
}
