//! Durable in-app notifications plus the live fan-out helpers.

pub mod broadcaster;
pub mod fanout;

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::Actor;
use crate::error::ApiError;
use crate::shared::models::Notification;
use crate::shared::schema::notifications;
use crate::shared::state::AppState;

use fanout::PlannedNotice;

/// Insert planned notices for a ticket. Runs inside the caller's
/// transaction so the rows commit (or roll back) with the state change.
pub fn store_notices(
    conn: &mut PgConnection,
    ticket_id: Option<Uuid>,
    planned: &[PlannedNotice],
) -> Result<Vec<Notification>, diesel::result::Error> {
    let now = Utc::now();
    let rows: Vec<Notification> = planned
        .iter()
        .map(|notice| Notification {
            id: Uuid::new_v4(),
            recipient_id: notice.recipient_id,
            ticket_id,
            text: notice.text.clone(),
            created_at: now,
            read_at: None,
        })
        .collect();
    diesel::insert_into(notifications::table)
        .values(&rows)
        .execute(conn)?;
    Ok(rows)
}

/// Publish stored notifications to their recipients' live topics.
pub fn broadcast_stored(state: &AppState, stored: &[Notification]) {
    for notification in stored {
        fanout::broadcast_notification(state.broadcaster.as_ref(), notification);
    }
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct InboxSummary {
    pub unread: i64,
    pub items: Vec<Notification>,
}

pub async fn list_notifications(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Notification>>, ApiError> {
    let mut conn = state.conn.get()?;
    let limit = query.limit.unwrap_or(50).clamp(1, 200);
    let offset = query.offset.unwrap_or(0).max(0);

    let rows = notifications::table
        .filter(notifications::recipient_id.eq(actor.id))
        .order(notifications::created_at.desc())
        .limit(limit)
        .offset(offset)
        .load::<Notification>(&mut conn)?;
    Ok(Json(rows))
}

/// Unread count plus the latest five entries, for the navigation badge.
pub async fn notifications_data(
    State(state): State<Arc<AppState>>,
    actor: Actor,
) -> Result<Json<InboxSummary>, ApiError> {
    let mut conn = state.conn.get()?;

    let unread: i64 = notifications::table
        .filter(notifications::recipient_id.eq(actor.id))
        .filter(notifications::read_at.is_null())
        .count()
        .get_result(&mut conn)?;

    let items = notifications::table
        .filter(notifications::recipient_id.eq(actor.id))
        .order(notifications::created_at.desc())
        .limit(5)
        .load::<Notification>(&mut conn)?;

    Ok(Json(InboxSummary { unread, items }))
}

/// Idempotent: marking an already-read notification again changes nothing.
pub async fn mark_read(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(notification_id): Path<Uuid>,
) -> Result<Json<Notification>, ApiError> {
    let mut conn = state.conn.get()?;

    // recipient-scoped lookup: someone else's notification reads as absent
    let notification = notifications::table
        .filter(notifications::id.eq(notification_id))
        .filter(notifications::recipient_id.eq(actor.id))
        .first::<Notification>(&mut conn)
        .optional()?
        .ok_or(ApiError::NotFound)?;

    if notification.read_at.is_some() {
        return Ok(Json(notification));
    }

    let updated = diesel::update(notifications::table.find(notification.id))
        .set(notifications::read_at.eq(Some(Utc::now())))
        .get_result::<Notification>(&mut conn)?;
    Ok(Json(updated))
}

/// Touches only currently-unread rows for this recipient.
pub async fn mark_all_read(
    State(state): State<Arc<AppState>>,
    actor: Actor,
) -> Result<Json<serde_json::Value>, ApiError> {
    let mut conn = state.conn.get()?;

    let updated = diesel::update(
        notifications::table
            .filter(notifications::recipient_id.eq(actor.id))
            .filter(notifications::read_at.is_null()),
    )
    .set(notifications::read_at.eq(Some(Utc::now())))
    .execute(&mut conn)?;

    Ok(Json(serde_json::json!({ "marked": updated })))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/notifications", get(list_notifications))
        .route("/api/notifications/data", get(notifications_data))
        .route("/api/notifications/:id/read", post(mark_read))
        .route("/api/notifications/read-all", post(mark_all_read))
}
