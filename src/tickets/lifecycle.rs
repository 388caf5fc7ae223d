//! Ticket state machine and its orchestration.
//!
//! Each operation is a single database transaction: authorize, validate,
//! write, and insert the notification rows together. Live broadcast and
//! email happen in the handlers, strictly after commit, so a crashed
//! publish can never roll back a persisted transition.

use chrono::Utc;
use diesel::prelude::*;
use uuid::Uuid;

use crate::error::ApiError;
use crate::notify::fanout;
use crate::notify::store_notices;
use crate::shared::enums::{Role, TicketPriority, TicketStatus};
use crate::shared::models::{Evidence, Notification, Office, Ticket, TicketNote, User};
use crate::shared::schema::{evidences, offices, ticket_notes, tickets, users};

use super::policy::{self, Operation};

/// Input for ticket creation, already deserialized and trimmed by the
/// handler layer.
#[derive(Debug, Clone)]
pub struct NewTicket {
    pub requester_name: String,
    pub requester_office_id: Option<Uuid>,
    pub requester_office_text: String,
    pub description: String,
    pub priority: TicketPriority,
    pub assigned_office_id: Uuid,
}

/// Who a supervisor assigns: a technician of their office, or themself.
#[derive(Debug, Clone, Copy)]
pub enum AssignTarget {
    Technician(Uuid),
    SelfAssign,
}

#[derive(Debug, Clone)]
pub struct StatusUpdate {
    pub status: TicketStatus,
    pub equipment_code: Option<String>,
    pub note: Option<String>,
}

/// Validate a technician-driven transition. Completed is terminal
/// (Conflict); only the technician statuses are reachable (Validation);
/// pending-supplies demands a non-empty note (Validation).
pub fn check_technician_transition(
    current: TicketStatus,
    target: TicketStatus,
    note: Option<&str>,
) -> Result<(), ApiError> {
    if current.is_terminal() {
        return Err(ApiError::conflict(
            "ticket is completed and can no longer be updated",
        ));
    }
    if !policy::technician_targets().contains(&target) {
        return Err(ApiError::validation("status not allowed for technician"));
    }
    if target == TicketStatus::PendingSupplies
        && note.map(str::trim).map_or(true, str::is_empty)
    {
        return Err(ApiError::validation(
            "a note describing the required supplies is mandatory",
        ));
    }
    Ok(())
}

fn next_ticket_number(conn: &mut PgConnection) -> Result<String, diesel::result::Error> {
    let count: i64 = tickets::table.count().get_result(conn)?;
    Ok(format!("TKT-{:06}", count + 1))
}

fn load_ticket(conn: &mut PgConnection, ticket_id: Uuid) -> Result<Ticket, ApiError> {
    tickets::table
        .find(ticket_id)
        .first::<Ticket>(conn)
        .optional()?
        .ok_or(ApiError::NotFound)
}

fn load_office(conn: &mut PgConnection, office_id: Uuid) -> Result<Option<Office>, ApiError> {
    Ok(offices::table
        .find(office_id)
        .first::<Office>(conn)
        .optional()?)
}

fn active_jefes(conn: &mut PgConnection) -> Result<Vec<User>, diesel::result::Error> {
    users::table
        .filter(users::role.eq(Role::Jefe))
        .filter(users::is_active.eq(true))
        .load::<User>(conn)
}

fn office_supervisor(
    conn: &mut PgConnection,
    office: &Office,
) -> Result<Option<User>, diesel::result::Error> {
    match office.supervisor_id {
        Some(id) => users::table.find(id).first::<User>(conn).optional(),
        None => Ok(None),
    }
}

/// Jefe creates a ticket: it enters the workflow in `Assigned`, with the
/// supervisor pre-populated from the office. Draft is never produced here.
pub fn create_ticket(
    conn: &mut PgConnection,
    actor: &User,
    input: NewTicket,
) -> Result<(Ticket, Vec<Notification>), ApiError> {
    if !policy::can_perform(actor, Operation::Create, None) {
        return Err(ApiError::Forbidden);
    }
    if input.requester_name.trim().is_empty() {
        return Err(ApiError::validation("requester name is required"));
    }
    if input.description.trim().is_empty() {
        return Err(ApiError::validation("description is required"));
    }

    conn.transaction::<_, ApiError, _>(|conn| {
        let office = load_office(conn, input.assigned_office_id)?
            .ok_or_else(|| ApiError::validation("assigned office does not exist"))?;
        if let Some(requester_office_id) = input.requester_office_id {
            if load_office(conn, requester_office_id)?.is_none() {
                return Err(ApiError::validation("requester office does not exist"));
            }
        }
        let supervisor = office_supervisor(conn, &office)?;

        let now = Utc::now();
        let ticket = Ticket {
            id: Uuid::new_v4(),
            ticket_number: next_ticket_number(conn)?,
            requester_name: input.requester_name,
            requester_office_id: input.requester_office_id,
            requester_office_text: input.requester_office_text,
            description: input.description,
            priority: input.priority,
            assigned_office_id: office.id,
            supervisor_id: supervisor.as_ref().map(|s| s.id),
            technician_id: None,
            equipment_code: String::new(),
            status: TicketStatus::Assigned,
            created_at: now,
            updated_at: now,
        };
        diesel::insert_into(tickets::table)
            .values(&ticket)
            .execute(conn)?;

        let jefes = active_jefes(conn)?;
        let planned =
            fanout::creation_notices(&ticket, &office, &jefes, supervisor.as_ref());
        let stored = store_notices(conn, Some(ticket.id), &planned)?;
        Ok((ticket, stored))
    })
}

/// Supervisor assigns a technician (or themself). Assignment takes
/// ownership: status is forced to InProgress and the acting supervisor
/// replaces any previous one. Last writer wins on concurrent assignment.
pub fn assign_technician(
    conn: &mut PgConnection,
    actor: &User,
    ticket_id: Uuid,
    target: AssignTarget,
) -> Result<(Ticket, Vec<Notification>, User), ApiError> {
    let Some(actor_office) = actor.office_id else {
        return Err(ApiError::Forbidden);
    };
    if actor.role != Role::Supervisor {
        return Err(ApiError::Forbidden);
    }

    conn.transaction::<_, ApiError, _>(|conn| {
        // office-scoped lookup: tickets of other offices read as absent
        let ticket = tickets::table
            .filter(tickets::id.eq(ticket_id))
            .filter(tickets::assigned_office_id.eq(actor_office))
            .first::<Ticket>(conn)
            .optional()?
            .ok_or(ApiError::NotFound)?;

        if ticket.status.is_terminal() {
            return Err(ApiError::conflict(
                "ticket is completed and cannot be (re)assigned",
            ));
        }

        let assignee = match target {
            AssignTarget::SelfAssign => actor.clone(),
            AssignTarget::Technician(technician_id) => users::table
                .filter(users::id.eq(technician_id))
                .filter(users::office_id.eq(Some(actor_office)))
                .filter(users::role.eq(Role::Tecnico))
                .filter(users::is_active.eq(true))
                .filter(users::approved.eq(true))
                .first::<User>(conn)
                .optional()?
                .ok_or(ApiError::NotFound)?,
        };

        let updated = diesel::update(tickets::table.find(ticket.id))
            .set((
                tickets::technician_id.eq(Some(assignee.id)),
                tickets::supervisor_id.eq(Some(actor.id)),
                tickets::status.eq(TicketStatus::InProgress),
                tickets::updated_at.eq(Utc::now()),
            ))
            .get_result::<Ticket>(conn)?;

        let planned = vec![fanout::assignment_notice(&updated, &assignee)];
        let stored = store_notices(conn, Some(updated.id), &planned)?;
        Ok((updated, stored, assignee))
    })
}

/// The assigned technician moves the ticket forward. A transition into
/// PendingSupplies records the mandatory note and fans out to every active
/// Jefe plus the office supervisor.
pub fn update_status(
    conn: &mut PgConnection,
    actor: &User,
    ticket_id: Uuid,
    input: StatusUpdate,
) -> Result<(Ticket, Vec<Notification>), ApiError> {
    conn.transaction::<_, ApiError, _>(|conn| {
        let ticket = load_ticket(conn, ticket_id)?;

        if !policy::is_ticket_technician(actor, &ticket) {
            return Err(ApiError::Forbidden);
        }
        check_technician_transition(ticket.status, input.status, input.note.as_deref())?;

        let previous = ticket.status;
        let now = Utc::now();
        let updated = match input.equipment_code {
            Some(code) => diesel::update(tickets::table.find(ticket.id))
                .set((
                    tickets::status.eq(input.status),
                    tickets::equipment_code.eq(code),
                    tickets::updated_at.eq(now),
                ))
                .get_result::<Ticket>(conn)?,
            None => diesel::update(tickets::table.find(ticket.id))
                .set((
                    tickets::status.eq(input.status),
                    tickets::updated_at.eq(now),
                ))
                .get_result::<Ticket>(conn)?,
        };

        let note_text = input
            .note
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty());
        if let Some(text) = note_text {
            let note = TicketNote {
                id: Uuid::new_v4(),
                ticket_id: updated.id,
                author_id: Some(actor.id),
                text: text.to_string(),
                created_at: now,
            };
            diesel::insert_into(ticket_notes::table)
                .values(&note)
                .execute(conn)?;
        }

        let mut stored = Vec::new();
        if previous != TicketStatus::PendingSupplies
            && updated.status == TicketStatus::PendingSupplies
        {
            let office = load_office(conn, updated.assigned_office_id)?
                .ok_or(ApiError::NotFound)?;
            let jefes = active_jefes(conn)?;
            let supervisor = office_supervisor(conn, &office)?;
            let planned = fanout::supplies_notices(
                &updated,
                &office,
                &jefes,
                supervisor.as_ref(),
                &actor.username,
                note_text.unwrap_or_default(),
            );
            stored = store_notices(conn, Some(updated.id), &planned)?;
        }

        Ok((updated, stored))
    })
}

/// Append a free-text note. Jefes are excluded by policy.
pub fn add_note(
    conn: &mut PgConnection,
    actor: &User,
    ticket_id: Uuid,
    text: &str,
) -> Result<TicketNote, ApiError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ApiError::validation("note text is required"));
    }

    conn.transaction::<_, ApiError, _>(|conn| {
        let ticket = load_ticket(conn, ticket_id)?;
        if !policy::can_perform(actor, Operation::AddNote, Some(&ticket)) {
            return Err(ApiError::Forbidden);
        }

        let note = TicketNote {
            id: Uuid::new_v4(),
            ticket_id: ticket.id,
            author_id: Some(actor.id),
            text: trimmed.to_string(),
            created_at: Utc::now(),
        };
        diesel::insert_into(ticket_notes::table)
            .values(&note)
            .execute(conn)?;
        Ok(note)
    })
}

/// Attach an already-persisted evidence asset to the ticket.
pub fn add_evidence(
    conn: &mut PgConnection,
    actor: &User,
    ticket_id: Uuid,
    image_path: &str,
) -> Result<Evidence, ApiError> {
    conn.transaction::<_, ApiError, _>(|conn| {
        let ticket = load_ticket(conn, ticket_id)?;
        if !policy::can_perform(actor, Operation::AddEvidence, Some(&ticket)) {
            return Err(ApiError::Forbidden);
        }

        let evidence = Evidence {
            id: Uuid::new_v4(),
            ticket_id: ticket.id,
            image_path: image_path.to_string(),
            uploaded_at: Utc::now(),
        };
        diesel::insert_into(evidences::table)
            .values(&evidence)
            .execute(conn)?;
        Ok(evidence)
    })
}

/// Jefe-only removal; notes, evidence and notifications cascade with the
/// row. Returns the deleted ticket so the handler can emit a final event.
pub fn delete_ticket(
    conn: &mut PgConnection,
    actor: &User,
    ticket_id: Uuid,
) -> Result<Ticket, ApiError> {
    conn.transaction::<_, ApiError, _>(|conn| {
        let ticket = load_ticket(conn, ticket_id)?;
        if !policy::can_perform(actor, Operation::Delete, Some(&ticket)) {
            return Err(ApiError::Forbidden);
        }
        diesel::delete(tickets::table.find(ticket.id)).execute(conn)?;
        Ok(ticket)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completed_is_terminal_for_every_target() {
        for target in policy::technician_targets() {
            let result =
                check_technician_transition(TicketStatus::Completed, target, Some("note"));
            assert!(matches!(result, Err(ApiError::Conflict(_))));
        }
    }

    #[test]
    fn pending_supplies_requires_a_note() {
        let missing = check_technician_transition(
            TicketStatus::InProgress,
            TicketStatus::PendingSupplies,
            None,
        );
        assert!(matches!(missing, Err(ApiError::Validation(_))));

        let blank = check_technician_transition(
            TicketStatus::InProgress,
            TicketStatus::PendingSupplies,
            Some("   "),
        );
        assert!(matches!(blank, Err(ApiError::Validation(_))));

        let ok = check_technician_transition(
            TicketStatus::InProgress,
            TicketStatus::PendingSupplies,
            Some("need RAM"),
        );
        assert!(ok.is_ok());
    }

    #[test]
    fn technicians_cannot_reach_draft_or_assigned() {
        for target in [TicketStatus::Draft, TicketStatus::Assigned] {
            let result =
                check_technician_transition(TicketStatus::InProgress, target, Some("x"));
            assert!(matches!(result, Err(ApiError::Validation(_))));
        }
    }

    #[test]
    fn forward_transitions_are_accepted_from_any_open_state() {
        for current in [
            TicketStatus::Draft,
            TicketStatus::Assigned,
            TicketStatus::InProgress,
            TicketStatus::PendingSupplies,
        ] {
            assert!(check_technician_transition(current, TicketStatus::Completed, None).is_ok());
            assert!(check_technician_transition(current, TicketStatus::InProgress, None).is_ok());
        }
    }
}
